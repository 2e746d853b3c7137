use crate::record::fields;
use crate::Result;
use bitflags::bitflags;

bitflags! {
    /// SAM FLAG bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u16 {
        const PAIRED = 0x1;
        const PROPER_PAIR = 0x2;
        const UNMAPPED = 0x4;
        const MATE_UNMAPPED = 0x8;
        const REVERSE = 0x10;
        const MATE_REVERSE = 0x20;
        const FIRST_IN_PAIR = 0x40;
        const SECOND_IN_PAIR = 0x80;
        const SECONDARY = 0x100;
        const QC_FAIL = 0x200;
        const DUPLICATE = 0x400;
        const SUPPLEMENTARY = 0x800;
    }
}

impl Flags {
    /// Reads the FLAG field of a record. Unknown bits are kept.
    pub fn from_record(record: &[u8]) -> Result<Self> {
        fields::flag(record).map(Flags::from_bits_retain)
    }
}

/// True when any bit of `mask` is set in the record's FLAG.
pub fn is_flag(record: &[u8], mask: Flags) -> Result<bool> {
    Ok(Flags::from_record(record)?.intersects(mask))
}
