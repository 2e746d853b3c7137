//! Lazy access to BAM alignment files.
//!
//! Records are handed out as raw byte ranges (length prefix included) and
//! decoded field by field on request, so filters and statistics can look at
//! a couple of fields without building a full record.
pub mod bgzf;
mod error;
pub(crate) mod gz;
pub mod header;
pub mod reader;
pub mod references;
pub mod source;
pub mod writer;

pub mod record {
    /// Decoders for packed sequence, CIGAR and quality regions.
    pub mod decode;
    /// Fixed offset accessors for the record fields.
    pub mod fields;
    /// FLAG bitmask.
    pub mod flags;
    /// Owned record view deriving sub-lengths itself.
    pub mod raw;
    /// Optional fields (tags) lookup.
    pub mod tags;
}

pub use error::{Error, Result};
pub use header::{Header, ProgramRecord};
pub use reader::Reader;
pub use record::flags::Flags;
pub use record::raw::RawRecord;
pub use references::ReferenceTable;
pub use source::{BlockSource, Plain, Sequential};
pub use writer::Writer;

use std::mem;

const U32_SIZE: usize = mem::size_of::<u32>();
const U16_SIZE: usize = mem::size_of::<u16>();
const U8_SIZE: usize = mem::size_of::<u8>();
pub const MAGIC_NUMBER: &[u8] = b"BAM\x01";
