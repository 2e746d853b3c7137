//! Byte sources the alignment reader can pull from.
//!
//! Decompression is somebody else's job: a source hands out decompressed
//! bytes in order and, if it can, reports and restores positions so the
//! reader can rewind to the first alignment without parsing the header again.
use crate::{Error, Result};
use std::io::{self, Read, Seek, SeekFrom};

/// Sequential source of decompressed BAM bytes with optional seek support.
///
/// Positions are opaque to the reader: whatever [`tell`](Self::tell) returns
/// is handed back to [`seek_to`](Self::seek_to) unchanged.
pub trait BlockSource: Read {
    fn seekable(&self) -> bool {
        false
    }

    fn tell(&mut self) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "source does not track positions",
        ))
    }

    fn seek_to(&mut self, _pos: u64) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "source is not seekable",
        ))
    }
}

/// Forward only source: pipes, stdin, gzip streams.
pub struct Sequential<R>(pub R);

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> BlockSource for Sequential<R> {}

/// Seekable, already uncompressed source (files, in-memory cursors).
pub struct Plain<R>(pub R);

impl<R: Read> Read for Plain<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Seek> BlockSource for Plain<R> {
    fn seekable(&self) -> bool {
        true
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.0.stream_position()
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.0.seek(SeekFrom::Start(pos)).map(|_| ())
    }
}

/// Reads until `buf` is full or the source runs dry. Returns bytes read.
pub(crate) fn read_fully<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            // https://rust-lang.github.io/rfcs/0980-read-exact.html#about-errorkindinterrupted
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// `read_exact` reporting a short read as truncated input.
pub(crate) fn read_exact<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<()> {
    let got = read_fully(reader, buf)?;
    if got < buf.len() {
        return Err(Error::truncated(what, buf.len(), got));
    }
    Ok(())
}

/// Appends `len` bytes to `buf`. The buffer only grows as bytes arrive, so a
/// corrupt length in front of a short stream fails without allocating it.
pub(crate) fn read_exact_to_end<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    len: usize,
    what: &'static str,
) -> Result<()> {
    let got = (&mut *reader).take(len as u64).read_to_end(buf)?;
    if got < len {
        return Err(Error::truncated(what, len, got));
    }
    Ok(())
}
