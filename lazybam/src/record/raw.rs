use super::decode::{decode_cigar, decode_qual, decode_seq};
use super::fields;
use super::flags::Flags;
use super::tags::{self, Tag, TagScan};
use crate::Result;
use std::ops::Deref;

/// One alignment exactly as stored, `block_size` prefix included, so it can
/// be written back bit for bit.
///
/// Every accessor decodes straight from the bytes; nothing is cached. The
/// free functions in [`fields`] do the same work when the caller wants to
/// thread the sub-lengths through itself.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RawRecord(Vec<u8>);

impl RawRecord {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    pub fn ref_index(&self) -> Result<i32> {
        fields::ref_index(self)
    }

    /// Stored (0-based) position.
    pub fn pos(&self) -> Result<i32> {
        fields::pos(self)
    }

    /// 1-based position.
    pub fn alignment_start(&self) -> Result<i64> {
        fields::alignment_start(self)
    }

    pub fn mapq(&self) -> Result<u8> {
        fields::mapq(self)
    }

    pub fn bin(&self) -> Result<u16> {
        fields::bin(self)
    }

    pub fn flags(&self) -> Result<Flags> {
        Flags::from_record(self)
    }

    pub fn l_seq(&self) -> Result<i32> {
        fields::l_seq(self)
    }

    pub fn next_ref_index(&self) -> Result<i32> {
        fields::next_ref_index(self)
    }

    pub fn next_pos(&self) -> Result<i32> {
        fields::next_pos(self)
    }

    pub fn template_len(&self) -> Result<i32> {
        fields::template_len(self)
    }

    pub fn read_name(&self) -> Result<&str> {
        fields::read_name(self, fields::l_read_name(self)?)
    }

    pub fn raw_cigar(&self) -> Result<&[u8]> {
        fields::raw_cigar(self, fields::l_read_name(self)?, fields::n_cigar_op(self)?)
    }

    pub fn cigar(&self) -> Result<String> {
        decode_cigar(self.raw_cigar()?)
    }

    fn lengths(&self) -> Result<(u8, u16, i32)> {
        Ok((
            fields::l_read_name(self)?,
            fields::n_cigar_op(self)?,
            fields::l_seq(self)?,
        ))
    }

    pub fn raw_seq(&self) -> Result<&[u8]> {
        let (l_read_name, n_cigar_op, l_seq) = self.lengths()?;
        fields::raw_seq(self, l_read_name, n_cigar_op, l_seq)
    }

    /// Decoded bases, padding nibble of odd length reads dropped.
    pub fn sequence(&self) -> Result<String> {
        let (l_read_name, n_cigar_op, l_seq) = self.lengths()?;
        let mut seq = decode_seq(fields::raw_seq(self, l_read_name, n_cigar_op, l_seq)?);
        // raw_seq already rejected a negative length
        seq.truncate(l_seq as usize);
        Ok(seq)
    }

    pub fn raw_qual(&self) -> Result<&[u8]> {
        let (l_read_name, n_cigar_op, l_seq) = self.lengths()?;
        fields::raw_qual(self, l_read_name, n_cigar_op, l_seq)
    }

    pub fn qualities(&self, offset: u8) -> Result<String> {
        Ok(decode_qual(self.raw_qual()?, offset))
    }

    /// Optional fields region.
    pub fn raw_tags(&self) -> Result<&[u8]> {
        let (l_read_name, n_cigar_op, l_seq) = self.lengths()?;
        fields::raw_tags(self, l_read_name, n_cigar_op, l_seq)
    }

    pub fn tag(&self, tag: &[u8; 2]) -> Result<Option<Tag<'_>>> {
        tags::get_tag(self.raw_tags()?, tag)
    }

    /// The signature scan runs over the whole record, the structured walk
    /// over the optional fields only.
    fn tag_data(&self, scan: TagScan) -> Result<&[u8]> {
        match scan {
            TagScan::Structured => self.raw_tags(),
            TagScan::Signature => Ok(&self.0),
        }
    }

    pub fn int_tag(&self, tag: &[u8; 2], no_tag: Option<i64>, scan: TagScan) -> Result<Option<i64>> {
        tags::int_tag(self.tag_data(scan)?, tag, no_tag, scan)
    }

    pub fn str_tag<'a>(
        &'a self,
        tag: &[u8; 2],
        no_tag: Option<&'a str>,
        scan: TagScan,
    ) -> Result<Option<&'a str>> {
        tags::str_tag(self.tag_data(scan)?, tag, no_tag, scan)
    }
}

impl From<Vec<u8>> for RawRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// Source: https://github.com/zaeleus/noodles/blob/316ec6f42960e4540bb2acc45b5653fb00b9970c/noodles-bam/src/record.rs#L324
impl Default for RawRecord {
    fn default() -> Self {
        Self::from(vec![
            0x22, 0x00, 0x00, 0x00, // block_size = 34
            0xff, 0xff, 0xff, 0xff, // ref_id = -1
            0xff, 0xff, 0xff, 0xff, // pos = -1
            0x02, // l_read_name = 2
            0xff, // mapq = 255
            0x48, 0x12, // bin = 4680
            0x00, 0x00, // n_cigar_op = 0
            0x04, 0x00, // flag = 4
            0x00, 0x00, 0x00, 0x00, // l_seq = 0
            0xff, 0xff, 0xff, 0xff, // next_ref_id = -1
            0xff, 0xff, 0xff, 0xff, // next_pos = -1
            0x00, 0x00, 0x00, 0x00, // tlen = 0
            0x2a, 0x00, // read_name = "*\x00"
        ])
    }
}

impl Deref for RawRecord {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RawRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
