use super::{split_virtual_position, virtual_position};
use crate::gz::{
    BGZF_HEADER_SIZE, BGZF_XLEN, BSIZE_OFFSET, CM_DEFLATE, FLG_FEXTRA, MAGIC_NUMBER, TRAILER_SIZE,
};
use crate::source::{read_fully, BlockSource};
use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use std::io::{self, Read, Seek, SeekFrom};

/// Inflates BGZF blocks one at a time and serves their bytes in order.
pub struct Reader<R> {
    inner: R,
    cdata: Vec<u8>,
    data: Vec<u8>,
    pos: usize,
    /// Compressed offset of the block currently in `data`.
    block_coffset: u64,
    /// Compressed offset of the block after it.
    next_coffset: u64,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cdata: Vec::new(),
            data: Vec::new(),
            pos: 0,
            block_coffset: 0,
            next_coffset: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Loads the next block into `data`. Returns false at the end of the stream.
    fn read_block(&mut self) -> io::Result<bool> {
        let mut header = [0; BGZF_HEADER_SIZE];
        match read_fully(&mut self.inner, &mut header)? {
            0 => {
                self.data.clear();
                self.pos = 0;
                return Ok(false);
            }
            BGZF_HEADER_SIZE => {}
            got => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes of BGZF header, got {}", BGZF_HEADER_SIZE, got),
                ))
            }
        }
        check_header(&header)?;

        // Add 1 because BSIZE is "total Block SIZE minus 1".
        let block_size = usize::from(LittleEndian::read_u16(&header[BSIZE_OFFSET..])) + 1;
        if block_size < BGZF_HEADER_SIZE + TRAILER_SIZE {
            return Err(invalid(format!(
                "expected clen >= {}, got {}",
                BGZF_HEADER_SIZE + TRAILER_SIZE,
                block_size
            )));
        }

        self.cdata
            .resize(block_size - BGZF_HEADER_SIZE - TRAILER_SIZE, 0);
        self.inner.read_exact(&mut self.cdata)?;
        let mut trailer = [0; TRAILER_SIZE];
        self.inner.read_exact(&mut trailer)?;
        let crc32 = LittleEndian::read_u32(&trailer[..4]);
        let isize = LittleEndian::read_u32(&trailer[4..]) as usize;

        self.data.clear();
        DeflateDecoder::new(&self.cdata[..]).read_to_end(&mut self.data)?;
        if self.data.len() != isize {
            return Err(invalid(format!(
                "block inflated to {} bytes, trailer says {}",
                self.data.len(),
                isize
            )));
        }
        if crc32fast::hash(&self.data) != crc32 {
            return Err(invalid(format!(
                "CRC32 mismatch in block at offset {}",
                self.next_coffset
            )));
        }

        self.pos = 0;
        self.block_coffset = self.next_coffset;
        self.next_coffset += block_size as u64;
        Ok(true)
    }
}

fn check_header(header: &[u8]) -> io::Result<()> {
    let xlen = usize::from(LittleEndian::read_u16(&header[10..12]));
    if header[..2] != MAGIC_NUMBER
        || header[2] != CM_DEFLATE
        || header[3] & FLG_FEXTRA == 0
        || xlen != BGZF_XLEN
        || &header[12..14] != b"BC"
    {
        return Err(invalid("not a BGZF block header".to_string()));
    }
    Ok(())
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // EOF marker blocks are empty, keep going past them.
        while self.pos >= self.data.len() {
            if !self.read_block()? {
                return Ok(0);
            }
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R: Read + Seek> BlockSource for Reader<R> {
    fn seekable(&self) -> bool {
        true
    }

    fn tell(&mut self) -> io::Result<u64> {
        if self.pos >= self.data.len() {
            Ok(virtual_position(self.next_coffset, 0))
        } else {
            Ok(virtual_position(self.block_coffset, self.pos as u16))
        }
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        let (coffset, uoffset) = split_virtual_position(pos);
        self.inner.seek(SeekFrom::Start(coffset))?;
        self.next_coffset = coffset;
        self.data.clear();
        self.pos = 0;
        if uoffset == 0 {
            return Ok(());
        }
        self.read_block()?;
        if usize::from(uoffset) > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "offset {} is past the end of a {} byte block",
                    uoffset,
                    self.data.len()
                ),
            ));
        }
        self.pos = usize::from(uoffset);
        Ok(())
    }
}
