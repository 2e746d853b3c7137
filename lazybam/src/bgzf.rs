//! Minimal BGZF transport: sequential block inflation with virtual position
//! seeking, and a block compressing writer.
//!
//! Positions handed out by the reader are BGZF virtual offsets: compressed
//! block offset in the upper 48 bits, offset inside the inflated block in the
//! lower 16.
mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

pub(crate) fn virtual_position(coffset: u64, uoffset: u16) -> u64 {
    (coffset << 16) | u64::from(uoffset)
}

pub(crate) fn split_virtual_position(pos: u64) -> (u64, u16) {
    (pos >> 16, (pos & 0xffff) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BlockSource;
    use std::io::{Cursor, Read, Write};

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut writer = Writer::new(Vec::new());
        writer.write_all(data).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_virtual_position() {
        let pos = virtual_position(1234, 56);
        assert_eq!(split_virtual_position(pos), (1234, 56));
    }

    #[test]
    fn test_round_trip() {
        // a few blocks worth of data
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&data);
        assert!(compressed.ends_with(&crate::gz::BGZF_EOF));

        let mut reader = Reader::new(Cursor::new(compressed));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_empty_stream() {
        let compressed = compress(&[]);
        assert_eq!(compressed, crate::gz::BGZF_EOF);
        let mut out = Vec::new();
        Reader::new(&compressed[..]).read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_seek() {
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 7) as u8 + b'a').collect();
        let mut reader = Reader::new(Cursor::new(compress(&data)));
        let mut head = vec![0; 70_000];
        reader.read_exact(&mut head).unwrap();
        let pos = reader.tell().unwrap();
        let mut first = vec![0; 1000];
        reader.read_exact(&mut first).unwrap();
        reader.seek_to(pos).unwrap();
        let mut again = vec![0; 1000];
        reader.read_exact(&mut again).unwrap();
        assert_eq!(first, again);
        assert_eq!(&first[..], &data[70_000..71_000]);
    }

    #[test]
    fn test_corrupt_crc() {
        let mut compressed = compress(b"some bytes to protect");
        // last byte of the first block's CRC
        let crc_end = compressed.len() - crate::gz::BGZF_EOF.len() - 4;
        compressed[crc_end - 1] ^= 0xff;
        let mut out = Vec::new();
        let err = Reader::new(&compressed[..]).read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
