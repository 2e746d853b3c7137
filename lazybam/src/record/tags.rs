// https://github.com/pezmaster31/bamtools/blob/2391b1a1275816ad89c624586fa02b1a621924f5/src/api/internal/bam/BamReader_p.cpp
//
// Optional fields are laid out as `tag(2) type(1) value(..)` with no count,
// so the only way to find one is to walk from the start of the region.
//
// Two lookup strategies are offered. `TagScan::Structured` walks the region
// tag by tag, advancing by each type's encoded width, and only ever matches
// real tag codes. `TagScan::Signature` searches the bytes for the
// `tag + type` signature the way older tools did; it also works on a whole
// record, but a value can spell out another tag's signature by accident.
use crate::{Error, Result, U16_SIZE, U32_SIZE, U8_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use log::warn;

/// Value returned by the legacy helpers for a missing integer tag.
pub const NO_TAG_INT: i64 = i32::MIN as i64;

/// Strategy used to locate a tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TagScan {
    /// Tag by tag walk of the optional fields region.
    #[default]
    Structured,
    /// Byte signature search, kept for parity with older outputs.
    Signature,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TagType {
    /// Char
    A,
    /// Byte array
    B,
    /// u8
    C,
    /// i8
    #[allow(non_camel_case_types)]
    c,
    /// float
    #[allow(non_camel_case_types)]
    f,
    /// Null-terminated HEX string
    H,
    /// u32
    I,
    /// i32
    #[allow(non_camel_case_types)]
    i,
    /// u16
    S,
    /// i16
    #[allow(non_camel_case_types)]
    s,
    /// Null-terminated char string
    Z,
}

fn get_tag_type(c: u8) -> Result<TagType> {
    match c {
        b'A' => Ok(TagType::A),
        b'B' => Ok(TagType::B),
        b'C' => Ok(TagType::C),
        b'c' => Ok(TagType::c),
        b'f' => Ok(TagType::f),
        b'H' => Ok(TagType::H),
        b'i' => Ok(TagType::i),
        b'I' => Ok(TagType::I),
        b'S' => Ok(TagType::S),
        b's' => Ok(TagType::s),
        b'Z' => Ok(TagType::Z),
        _ => Err(Error::Format(format!(
            "there is no tag type <{}>",
            c.escape_ascii()
        ))),
    }
}

fn tag_size(tag: TagType) -> Option<usize> {
    match tag {
        TagType::C | TagType::c | TagType::A => Some(U8_SIZE),
        TagType::S | TagType::s => Some(U16_SIZE),
        TagType::I | TagType::i | TagType::f => Some(U32_SIZE),
        _ => None,
    }
}

fn take(data: &[u8], len: usize) -> Result<&[u8]> {
    data.get(..len)
        .ok_or_else(|| Error::truncated("tag value", len, data.len()))
}

/// Splits a value off `data` (which starts at the type byte).
/// Returns the type, the value bytes and how many bytes the type and value
/// occupy. For `B` arrays the value keeps its subtype and count header.
fn get_tag_data(data: &[u8]) -> Result<(TagType, &[u8], usize)> {
    let tag_type = get_tag_type(take(data, U8_SIZE)?[0])?;
    let rest = &data[U8_SIZE..];
    match tag_type {
        TagType::B => {
            let header = take(rest, U8_SIZE + U32_SIZE)?;
            let item_size = match get_tag_type(header[0])? {
                TagType::A => None,
                subtype => tag_size(subtype),
            }
            .ok_or_else(|| {
                Error::Format(format!(
                    "array subtype <{}> is not numeric",
                    header[0].escape_ascii()
                ))
            })?;
            let len = LittleEndian::read_u32(&header[U8_SIZE..]) as usize;
            let value = take(rest, U8_SIZE + U32_SIZE + len * item_size)?;
            Ok((tag_type, value, U8_SIZE + value.len()))
        }
        TagType::Z | TagType::H => {
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::truncated("tag string terminator", rest.len() + 1, rest.len()))?;
            // type + text + NUL
            Ok((tag_type, &rest[..nul], U8_SIZE + nul + U8_SIZE))
        }
        _ => {
            let item_size = tag_size(tag_type).unwrap_or(U8_SIZE);
            let value = take(rest, item_size)?;
            Ok((tag_type, value, U8_SIZE + item_size))
        }
    }
}

/// Numeric array held by a `B` tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagArray<'a> {
    pub subtype: TagType,
    pub count: usize,
    /// Little-endian items, `count` of them.
    pub bytes: &'a [u8],
}

/// Decoded tag value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagValue<'a> {
    Char(u8),
    Int(i64),
    Float(f32),
    String(&'a str),
    Hex(&'a str),
    Array(TagArray<'a>),
}

/// One optional field, located in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub code: [u8; 2],
    pub tag_type: TagType,
    raw: &'a [u8],
}

impl<'a> Tag<'a> {
    /// Value bytes as stored (strings without their NUL).
    pub fn raw_value(&self) -> &'a [u8] {
        self.raw
    }

    /// Integer value for any of the integer types, `None` otherwise.
    pub fn as_int(&self) -> Option<i64> {
        let v = self.raw;
        match self.tag_type {
            TagType::c => Some(i64::from(v[0] as i8)),
            TagType::C => Some(i64::from(v[0])),
            TagType::s => Some(i64::from(LittleEndian::read_i16(v))),
            TagType::S => Some(i64::from(LittleEndian::read_u16(v))),
            TagType::i => Some(i64::from(LittleEndian::read_i32(v))),
            TagType::I => Some(i64::from(LittleEndian::read_u32(v))),
            _ => None,
        }
    }

    /// Text of a `Z` or `H` tag, `None` for other types.
    pub fn as_str(&self) -> Result<Option<&'a str>> {
        match self.tag_type {
            TagType::Z | TagType::H => std::str::from_utf8(self.raw)
                .map(Some)
                .map_err(|source| Error::Utf8 {
                    what: "string tag",
                    source,
                }),
            _ => Ok(None),
        }
    }

    pub fn value(&self) -> Result<TagValue<'a>> {
        let v = self.raw;
        let value = match self.tag_type {
            TagType::A => TagValue::Char(v[0]),
            TagType::f => TagValue::Float(LittleEndian::read_f32(v)),
            TagType::Z => TagValue::String(self.as_str()?.unwrap_or_default()),
            TagType::H => TagValue::Hex(self.as_str()?.unwrap_or_default()),
            TagType::B => TagValue::Array(TagArray {
                subtype: get_tag_type(v[0])?,
                count: LittleEndian::read_u32(&v[U8_SIZE..U8_SIZE + U32_SIZE]) as usize,
                bytes: &v[U8_SIZE + U32_SIZE..],
            }),
            _ => TagValue::Int(self.as_int().unwrap_or_default()),
        };
        Ok(value)
    }
}

/// Tag by tag walk over an optional fields region.
///
/// Stops after the first malformed entry.
pub struct Tags<'a> {
    data: &'a [u8],
    idx: usize,
}

impl<'a> Iterator for Tags<'a> {
    type Item = Result<Tag<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.idx..];
        if rest.len() < U16_SIZE + U8_SIZE {
            self.idx = self.data.len();
            return Some(Err(Error::truncated(
                "tag header",
                U16_SIZE + U8_SIZE,
                rest.len(),
            )));
        }
        match get_tag_data(&rest[U16_SIZE..]) {
            Ok((tag_type, raw, used)) => {
                self.idx += U16_SIZE + used;
                Some(Ok(Tag {
                    code: [rest[0], rest[1]],
                    tag_type,
                    raw,
                }))
            }
            Err(e) => {
                self.idx = self.data.len();
                Some(Err(e))
            }
        }
    }
}

/// Iterates over the tags of an optional fields region.
pub fn tags(data: &[u8]) -> Tags<'_> {
    Tags { data, idx: 0 }
}

/// Returns the single tag with code `tag`, `None` when absent.
pub fn get_tag<'a>(data: &'a [u8], tag: &[u8; 2]) -> Result<Option<Tag<'a>>> {
    let mut found = None;
    let mut matches = 0;
    for entry in tags(data) {
        let entry = entry?;
        if &entry.code == tag {
            matches += 1;
            found = Some(entry);
        }
    }
    if matches > 1 {
        return Err(Error::ambiguous(tag, matches));
    }
    Ok(found)
}

/// Non-overlapping matches of `tag + type_code`, each paired with the bytes
/// following the signature. `value_len` tells how long a match's value is,
/// or `None` to reject the candidate.
fn scan_signature<'a, F>(
    data: &'a [u8],
    tag: &[u8; 2],
    type_code: u8,
    value_len: F,
) -> Vec<&'a [u8]>
where
    F: Fn(&[u8]) -> Option<usize>,
{
    let signature = [tag[0], tag[1], type_code];
    let mut found = Vec::new();
    let mut idx = 0;
    while idx + signature.len() <= data.len() {
        if data[idx..idx + signature.len()] == signature {
            let rest = &data[idx + signature.len()..];
            if let Some(len) = value_len(rest) {
                found.push(&rest[..len]);
                idx += signature.len() + len;
                continue;
            }
        }
        idx += 1;
    }
    found
}

fn single<'a>(tag: &[u8; 2], mut found: Vec<&'a [u8]>) -> Result<Option<&'a [u8]>> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        n => {
            warn!(
                "signature scan for {} found {} matches",
                String::from_utf8_lossy(tag),
                n
            );
            Err(Error::ambiguous(tag, n))
        }
    }
}

fn scan_int(data: &[u8], tag: &[u8; 2]) -> Result<Option<i64>> {
    let found = scan_signature(data, tag, b'C', |rest| {
        if rest.is_empty() {
            None
        } else {
            Some(U8_SIZE)
        }
    });
    Ok(single(tag, found)?.map(|value| i64::from(value[0])))
}

fn scan_str<'a, P>(
    data: &'a [u8],
    tag: &[u8; 2],
    allow_empty: bool,
    allowed: P,
) -> Result<Option<&'a [u8]>>
where
    P: Fn(u8) -> bool,
{
    let found = scan_signature(data, tag, b'Z', |rest| {
        let nul = rest.iter().position(|&b| b == 0)?;
        if (allow_empty || nul > 0) && rest[..nul].iter().all(|&b| allowed(b)) {
            Some(nul + 1)
        } else {
            None
        }
    });
    // drop the NUL kept by the length callback
    Ok(single(tag, found)?.map(|value| &value[..value.len() - 1]))
}

fn to_str<'a>(value: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(value).map_err(|source| Error::Utf8 {
        what: "string tag",
        source,
    })
}

/// Integer value of `tag`, or `no_tag` when it is absent.
///
/// The structured walk accepts any integer type; the signature scan only
/// recognises the single byte `C` encoding.
pub fn int_tag(
    data: &[u8],
    tag: &[u8; 2],
    no_tag: Option<i64>,
    scan: TagScan,
) -> Result<Option<i64>> {
    let value = match scan {
        TagScan::Structured => match get_tag(data, tag)? {
            Some(found) => Some(found.as_int().ok_or_else(|| {
                Error::Format(format!(
                    "tag {} has type {:?}, not an integer",
                    String::from_utf8_lossy(tag),
                    found.tag_type
                ))
            })?),
            None => None,
        },
        TagScan::Signature => scan_int(data, tag)?,
    };
    Ok(value.or(no_tag))
}

/// Text value of a `Z` tag, or `no_tag` when it is absent.
pub fn str_tag<'a>(
    data: &'a [u8],
    tag: &[u8; 2],
    no_tag: Option<&'a str>,
    scan: TagScan,
) -> Result<Option<&'a str>> {
    let value = match scan {
        TagScan::Structured => match get_tag(data, tag)? {
            Some(found) => Some(found.as_str()?.ok_or_else(|| {
                Error::Format(format!(
                    "tag {} has type {:?}, not a string",
                    String::from_utf8_lossy(tag),
                    found.tag_type
                ))
            })?),
            None => None,
        },
        TagScan::Signature => scan_str(data, tag, true, |_| true)?.map(to_str).transpose()?,
    };
    Ok(value.or(no_tag))
}

/// Alignment score (`AS`).
pub fn alignment_score(data: &[u8], no_tag: Option<i64>, scan: TagScan) -> Result<Option<i64>> {
    int_tag(data, b"AS", no_tag, scan)
}

/// Suboptimal alignment score as written by genome aligners (`XS:i`).
///
/// Not the spliced aligner `XS:A` strand tag.
pub fn suboptimal_score(data: &[u8], no_tag: Option<i64>, scan: TagScan) -> Result<Option<i64>> {
    int_tag(data, b"XS", no_tag, scan)
}

/// Suboptimal alignment score under the `ZS` code used by HISAT2 and
/// other spliced aligners.
pub fn suboptimal_score_zs(
    data: &[u8],
    no_tag: Option<i64>,
    scan: TagScan,
) -> Result<Option<i64>> {
    int_tag(data, b"ZS", no_tag, scan)
}

/// Mismatch string (`MD`).
///
/// In signature mode the value must look like an MD string
/// (`[0-9ACGTN^]+`), which cuts down on accidental matches.
pub fn mismatch_string<'a>(
    data: &'a [u8],
    no_tag: Option<&'a str>,
    scan: TagScan,
) -> Result<Option<&'a str>> {
    match scan {
        TagScan::Structured => str_tag(data, b"MD", no_tag, scan),
        TagScan::Signature => {
            let is_md = |b: u8| b.is_ascii_digit() || b"ACGTN^".contains(&b);
            let found = scan_str(data, b"MD", false, is_md)?
                .map(to_str)
                .transpose()?;
            Ok(found.or(no_tag))
        }
    }
}
