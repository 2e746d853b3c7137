//! Offsets below are relative to the start of the record *including* its
//! 4 byte `block_size` prefix, so a record can be passed around exactly as
//! it was read and written back untouched.
//!
//! Fixed width fields are read straight from their offset. Variable regions
//! start at [`VARIABLE_DATA_OFFSET`] and are located by accumulating the
//! lengths of the regions before them; the accessors take those lengths as
//! arguments so the caller decides how much of the record to decode.
use crate::{Error, Result, U16_SIZE, U32_SIZE, U8_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::convert::TryFrom;

use self::Fields::*;

/// Offset of the read name, the first variable sized region.
pub const VARIABLE_DATA_OFFSET: usize = 36;

/// Fixed width fields of an alignment record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Fields {
    BlockSize,
    #[allow(clippy::upper_case_acronyms)]
    RefID,
    Pos,
    LName,
    Mapq,
    Bin,
    NCigar,
    Flags,
    SequenceLength,
    #[allow(clippy::upper_case_acronyms)]
    NextRefID,
    NextPos,
    TemplateLength,
}

impl Fields {
    pub fn offset(&self) -> usize {
        match self {
            BlockSize => 0,
            RefID => 4,
            Pos => 8,
            LName => 12,
            Mapq => 13,
            Bin => 14,
            NCigar => 16,
            Flags => 18,
            SequenceLength => 20,
            NextRefID => 24,
            NextPos => 28,
            TemplateLength => 32,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            LName | Mapq => U8_SIZE,
            Bin | NCigar | Flags => U16_SIZE,
            BlockSize | RefID | Pos | SequenceLength | NextRefID | NextPos | TemplateLength => {
                U32_SIZE
            }
        }
    }
}

impl std::fmt::Display for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

fn get_slice<'a>(
    record: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    let end = offset + len;
    record
        .get(offset..end)
        .ok_or_else(|| Error::truncated(what, end, record.len()))
}

/// Returns bytes of specified fixed width field.
pub fn get_bytes(record: &[u8], field: Fields) -> Result<&[u8]> {
    get_slice(record, field.offset(), field.width(), "fixed record fields")
}

fn read_i32(record: &[u8], field: Fields) -> Result<i32> {
    get_bytes(record, field).map(LittleEndian::read_i32)
}

fn read_u16(record: &[u8], field: Fields) -> Result<u16> {
    get_bytes(record, field).map(LittleEndian::read_u16)
}

fn read_u8(record: &[u8], field: Fields) -> Result<u8> {
    get_bytes(record, field).map(|bytes| bytes[0])
}

/// Length of the record body, the prefix itself excluded.
pub fn block_size(record: &[u8]) -> Result<i32> {
    read_i32(record, BlockSize)
}

/// Reference index, -1 for unmapped.
pub fn ref_index(record: &[u8]) -> Result<i32> {
    read_i32(record, RefID)
}

/// Stored (0-based) leftmost position.
pub fn pos(record: &[u8]) -> Result<i32> {
    read_i32(record, Pos)
}

/// 1-based leftmost position, as shown in SAM.
pub fn alignment_start(record: &[u8]) -> Result<i64> {
    pos(record).map(|p| i64::from(p) + 1)
}

/// Read name length, trailing NUL included.
pub fn l_read_name(record: &[u8]) -> Result<u8> {
    read_u8(record, LName)
}

/// Mapping quality, 255 when unavailable.
pub fn mapq(record: &[u8]) -> Result<u8> {
    read_u8(record, Mapq)
}

pub fn bin(record: &[u8]) -> Result<u16> {
    read_u16(record, Bin)
}

pub fn n_cigar_op(record: &[u8]) -> Result<u16> {
    read_u16(record, NCigar)
}

pub fn flag(record: &[u8]) -> Result<u16> {
    read_u16(record, Flags)
}

pub fn l_seq(record: &[u8]) -> Result<i32> {
    read_i32(record, SequenceLength)
}

pub fn next_ref_index(record: &[u8]) -> Result<i32> {
    read_i32(record, NextRefID)
}

/// Stored (0-based) position of the mate.
pub fn next_pos(record: &[u8]) -> Result<i32> {
    read_i32(record, NextPos)
}

pub fn template_len(record: &[u8]) -> Result<i32> {
    read_i32(record, TemplateLength)
}

fn seq_len(l_seq: i32) -> Result<usize> {
    usize::try_from(l_seq)
        .map_err(|_| Error::Format(format!("negative sequence length {}", l_seq)))
}

fn cigar_offset(l_read_name: u8) -> usize {
    VARIABLE_DATA_OFFSET + l_read_name as usize
}

fn seq_offset(l_read_name: u8, n_cigar_op: u16) -> usize {
    cigar_offset(l_read_name) + U32_SIZE * n_cigar_op as usize
}

fn qual_offset(l_read_name: u8, n_cigar_op: u16, l_seq: usize) -> usize {
    seq_offset(l_read_name, n_cigar_op) + (l_seq + 1) / 2
}

fn tags_offset(l_read_name: u8, n_cigar_op: u16, l_seq: usize) -> usize {
    qual_offset(l_read_name, n_cigar_op, l_seq) + l_seq
}

/// Read name bytes with the trailing NUL.
pub fn raw_read_name(record: &[u8], l_read_name: u8) -> Result<&[u8]> {
    get_slice(
        record,
        VARIABLE_DATA_OFFSET,
        l_read_name as usize,
        "read name",
    )
}

/// Read name without the trailing NUL.
pub fn read_name(record: &[u8], l_read_name: u8) -> Result<&str> {
    let raw = raw_read_name(record, l_read_name)?;
    let name = match raw.split_last() {
        Some((0, name)) => name,
        _ => raw,
    };
    std::str::from_utf8(name).map_err(|source| Error::Utf8 {
        what: "read name",
        source,
    })
}

/// Packed CIGAR, 4 bytes per operation.
pub fn raw_cigar(record: &[u8], l_read_name: u8, n_cigar_op: u16) -> Result<&[u8]> {
    get_slice(
        record,
        cigar_offset(l_read_name),
        U32_SIZE * n_cigar_op as usize,
        "cigar",
    )
}

/// Packed sequence, two bases per byte.
pub fn raw_seq(record: &[u8], l_read_name: u8, n_cigar_op: u16, l_seq: i32) -> Result<&[u8]> {
    let l_seq = seq_len(l_seq)?;
    get_slice(
        record,
        seq_offset(l_read_name, n_cigar_op),
        (l_seq + 1) / 2,
        "sequence",
    )
}

/// Phred base qualities, one byte per base.
pub fn raw_qual(record: &[u8], l_read_name: u8, n_cigar_op: u16, l_seq: i32) -> Result<&[u8]> {
    let l_seq = seq_len(l_seq)?;
    get_slice(
        record,
        qual_offset(l_read_name, n_cigar_op, l_seq),
        l_seq,
        "base qualities",
    )
}

/// Everything after the qualities: the optional fields.
pub fn raw_tags(record: &[u8], l_read_name: u8, n_cigar_op: u16, l_seq: i32) -> Result<&[u8]> {
    let offset = tags_offset(l_read_name, n_cigar_op, seq_len(l_seq)?);
    record
        .get(offset..)
        .ok_or_else(|| Error::truncated("optional fields", offset, record.len()))
}
