use crate::source::{read_exact, read_exact_to_end};
use crate::{Error, Result, U32_SIZE};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::ffi::CStr;
use std::io::Read;

/// Name shown for reference index -1.
pub const UNMAPPED_NAME: &str = "*";

/// Reference sequences declared after the header text.
///
/// Keeps the bytes exactly as read so they can be written back untouched,
/// next to the decoded name/length pairs and the name to index lookup.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceTable {
    raw: Vec<u8>,
    refs: Vec<(String, u32)>,
    ref_to_index: HashMap<String, i32>,
}

impl ReferenceTable {
    /// Reads `n_ref` and the entries following it from a stream.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut table = Self::default();
        let n_ref = table.read_count(reader)?;
        for _ in 0..n_ref {
            table.read_entry(reader)?;
        }
        Ok(table)
    }

    /// Parses a complete table. The declared count has to match the entries
    /// actually present, with no bytes left over.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        let mut table = Self::default();
        let n_ref = table.read_count(&mut bytes)?;
        for _ in 0..n_ref {
            if let Err(e) = table.read_entry(&mut bytes) {
                return match e {
                    Error::TruncatedInput { .. } => Err(Error::Format(format!(
                        "reference count {} but only {} entries present",
                        n_ref,
                        table.refs.len()
                    ))),
                    e => Err(e),
                };
            }
        }
        if !bytes.is_empty() {
            return Err(Error::Format(format!(
                "{} bytes left after {} references",
                bytes.len(),
                n_ref
            )));
        }
        Ok(table)
    }

    /// Builds a table (and its binary form) from name/length pairs.
    pub fn from_refs<I, S>(refs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let refs: Vec<(String, u32)> = refs.into_iter().map(|(n, l)| (n.into(), l)).collect();
        let mut raw = Vec::new();
        raw.write_i32::<LittleEndian>(count_i32(refs.len())?)?;
        for (name, len) in &refs {
            raw.write_i32::<LittleEndian>(count_i32(name.len() + 1)?)?;
            raw.extend_from_slice(name.as_bytes());
            raw.push(0);
            raw.write_u32::<LittleEndian>(*len)?;
        }
        Self::from_bytes(&raw)
    }

    fn read_count<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        let mut buf = [0; U32_SIZE];
        read_exact(reader, &mut buf, "reference count")?;
        self.raw.extend_from_slice(&buf);
        let n_ref = LittleEndian::read_i32(&buf);
        usize::try_from(n_ref)
            .map_err(|_| Error::Format(format!("negative reference count {}", n_ref)))
    }

    fn read_entry<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        let mut buf = [0; U32_SIZE];
        read_exact(reader, &mut buf, "reference name length")?;
        let l_name = LittleEndian::read_i32(&buf);
        let l_name = usize::try_from(l_name)
            .map_err(|_| Error::Format(format!("negative reference name length {}", l_name)))?;
        self.raw.extend_from_slice(&buf);

        let mut c_name = Vec::new();
        read_exact_to_end(reader, &mut c_name, l_name, "reference name")?;
        let name = bytes_with_nul_to_string(&c_name)?;
        self.raw.extend_from_slice(&c_name);

        read_exact(reader, &mut buf, "reference length")?;
        let l_ref = LittleEndian::read_u32(&buf);
        self.raw.extend_from_slice(&buf);

        let index = count_i32(self.refs.len())?;
        if self.ref_to_index.insert(name.clone(), index).is_some() {
            return Err(Error::Format(format!("duplicate reference name {}", name)));
        }
        self.refs.push((name, l_ref));
        Ok(())
    }

    /// Binary form, `n_ref` included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Name/length pairs in file order.
    pub fn refs(&self) -> &[(String, u32)] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn ref_length(&self, name: &str) -> Option<u32> {
        self.ref_to_index(name)
            .map(|index| self.refs[index as usize].1)
    }

    pub fn ref_to_index(&self, name: &str) -> Option<i32> {
        self.ref_to_index.get(name).copied()
    }

    /// Reference name for an index as stored in a record; -1 is `"*"`.
    pub fn index_to_ref(&self, index: i32) -> Option<&str> {
        if index == -1 {
            return Some(UNMAPPED_NAME);
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.refs.get(i))
            .map(|(name, _)| name.as_str())
    }
}

fn count_i32(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| Error::Format(format!("{} does not fit a BAM length field", n)))
}

fn bytes_with_nul_to_string(buf: &[u8]) -> Result<String> {
    CStr::from_bytes_with_nul(buf)
        .map_err(|e| Error::Format(format!("reference name: {}", e)))
        .and_then(|c_str| {
            c_str
                .to_str()
                .map(|s| s.to_string())
                .map_err(|source| Error::Utf8 {
                    what: "reference name",
                    source,
                })
        })
}
