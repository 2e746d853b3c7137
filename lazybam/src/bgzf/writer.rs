use crate::gz::{
    BGZF_EOF, BGZF_HEADER_SIZE, BGZF_XLEN, CM_DEFLATE, FLG_FEXTRA, MAGIC_NUMBER, MAX_BLOCK_DATA,
    MAX_BLOCK_SIZE, OS_UNKNOWN, TRAILER_SIZE,
};
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Splits a byte stream into independently compressed BGZF blocks.
///
/// The stream is terminated by the EOF block on [`finish`](Self::finish). If
/// the writer is dropped without it, finishing is attempted and errors are
/// lost.
pub struct Writer<W: Write> {
    inner: Option<W>,
    buf: Vec<u8>,
    compression: Compression,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self::with_compression(inner, Compression::default())
    }

    pub fn with_compression(inner: W, compression: Compression) -> Self {
        Self {
            inner: Some(inner),
            buf: Vec::with_capacity(MAX_BLOCK_DATA),
            compression,
        }
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    fn inner_mut(&mut self) -> io::Result<&mut W> {
        self.inner.as_mut().ok_or_else(finished)
    }

    fn flush_block(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let mut encoder = DeflateEncoder::new(Vec::new(), self.compression);
        encoder.write_all(&self.buf)?;
        let cdata = encoder.finish()?;

        let block_size = BGZF_HEADER_SIZE + cdata.len() + TRAILER_SIZE;
        if block_size > MAX_BLOCK_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("compressed block of {} bytes does not fit BSIZE", block_size),
            ));
        }
        let crc32 = crc32fast::hash(&self.buf);
        let isize = self.buf.len() as u32;

        let inner = self.inner_mut()?;
        inner.write_all(&MAGIC_NUMBER)?;
        inner.write_u8(CM_DEFLATE)?;
        inner.write_u8(FLG_FEXTRA)?;
        inner.write_u32::<LittleEndian>(0)?; // MTIME
        inner.write_u8(0)?; // XFL
        inner.write_u8(OS_UNKNOWN)?;
        inner.write_u16::<LittleEndian>(BGZF_XLEN as u16)?;
        inner.write_all(b"BC")?;
        inner.write_u16::<LittleEndian>(2)?;
        inner.write_u16::<LittleEndian>((block_size - 1) as u16)?;
        inner.write_all(&cdata)?;
        inner.write_u32::<LittleEndian>(crc32)?;
        inner.write_u32::<LittleEndian>(isize)?;

        self.buf.clear();
        Ok(())
    }

    /// Flushes pending data, writes the EOF block and hands back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.try_finish()?;
        self.inner.take().ok_or_else(finished)
    }

    fn try_finish(&mut self) -> io::Result<()> {
        self.flush_block()?;
        let inner = self.inner_mut()?;
        inner.write_all(&BGZF_EOF)?;
        inner.flush()
    }
}

fn finished() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "BGZF writer already finished")
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.buf.len() >= MAX_BLOCK_DATA {
            self.flush_block()?;
        }
        let n = buf.len().min(MAX_BLOCK_DATA - self.buf.len());
        self.buf.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_block()?;
        self.inner_mut()?.flush()
    }
}

impl<W: Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.try_finish();
        }
    }
}
