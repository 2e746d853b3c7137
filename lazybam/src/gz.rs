// RFC 1952 § 2.3.1
pub(crate) const MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

pub(crate) const CM_DEFLATE: u8 = 8;

pub(crate) const FLG_FEXTRA: u8 = 0x04;

pub(crate) const OS_UNKNOWN: u8 = 0xff;

// ID1 (1) + ID2 (1) + CM (1) + FLG (1) + MTIME (4) + XFL (1) + OS (1)
pub(crate) const HEADER_SIZE: usize = 10;

// CRC32 (4) + ISIZE (4)
pub(crate) const TRAILER_SIZE: usize = 8;

// XLEN (2)
const GZIP_XLEN_SIZE: usize = 2;

// SI1 (1) + SI2 (1) + SLEN (2) + BSIZE (2)
pub(crate) const BGZF_XLEN: usize = 6;

pub(crate) const BGZF_HEADER_SIZE: usize = HEADER_SIZE + GZIP_XLEN_SIZE + BGZF_XLEN;

/// Offset of BSIZE (total block size minus 1) in the block header.
pub(crate) const BSIZE_OFFSET: usize = 16;

pub(crate) const MAX_BLOCK_SIZE: usize = 1 << 16;

/// Uncompressed bytes put into one block, leaving room for deflate overhead.
pub(crate) const MAX_BLOCK_DATA: usize = 0xff00;

/// Empty block terminating a BGZF file.
pub(crate) const BGZF_EOF: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];
