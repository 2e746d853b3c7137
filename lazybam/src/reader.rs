mod records;

pub use records::Records;

use crate::header::Header;
use crate::record::fields::VARIABLE_DATA_OFFSET;
use crate::references::ReferenceTable;
use crate::source::{read_exact, read_exact_to_end, read_fully, BlockSource};
use crate::{bgzf, Error, RawRecord, Result, MAGIC_NUMBER, U32_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use std::convert::TryFrom;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Smallest possible record body: the fixed fields alone.
const MIN_BLOCK_SIZE: usize = VARIABLE_DATA_OFFSET - U32_SIZE;

/// Pull based reader over a decompressed BAM stream.
///
/// Magic, header and reference table are parsed on open; alignments are then
/// pulled one at a time and handed out as raw byte ranges. Nothing is
/// buffered beyond the record being assembled.
pub struct Reader<S> {
    inner: S,
    header: Header,
    references: ReferenceTable,
    /// Where the first alignment starts, if the source can seek.
    first_record: Option<u64>,
    eof_reached: bool,
}

impl Reader<bgzf::Reader<BufReader<File>>> {
    /// Opens a BGZF compressed BAM file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Opening {}", path.as_ref().display());
        Self::new(bgzf::Reader::new(BufReader::new(file)))
    }
}

impl<S: BlockSource> Reader<S> {
    pub fn new(mut inner: S) -> Result<Self> {
        let magic = read_magic(&mut inner)?;
        if magic != MAGIC_NUMBER {
            return Err(Error::Format(format!(
                "incorrect start to uncompressed BAM: {:?} is not {:?}, check the data is decompressed",
                magic, MAGIC_NUMBER
            )));
        }
        let header = Header::read_from(&mut inner)?;
        let references = ReferenceTable::read_from(&mut inner)?;
        let first_record = if inner.seekable() {
            Some(inner.tell()?)
        } else {
            None
        };
        debug!(
            "Read BAM header: {} bytes of text, {} references, rewind {}",
            header.text().len(),
            references.len(),
            if first_record.is_some() {
                "supported"
            } else {
                "not supported"
            }
        );
        Ok(Self {
            inner,
            header,
            references,
            first_record,
            eof_reached: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Reads the next record, length prefix included, into `buf`.
    /// Returns the number of bytes in `buf`, 0 once the stream is exhausted.
    pub fn read_record(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        buf.clear();
        if self.eof_reached {
            return Ok(0);
        }
        let block_size = match self.read_block_size() {
            Ok(Some(bs)) => bs,
            Ok(None) => {
                self.eof_reached = true;
                return Ok(0);
            }
            Err(e) => {
                self.eof_reached = true;
                return Err(e);
            }
        };

        buf.extend_from_slice(&(block_size as u32).to_le_bytes());
        if let Err(e) = read_exact_to_end(&mut self.inner, buf, block_size, "record body") {
            self.eof_reached = true;
            buf.clear();
            return Err(e);
        }
        Ok(buf.len())
    }

    /// `None` on a clean end of stream.
    fn read_block_size(&mut self) -> Result<Option<usize>> {
        let mut prefix = [0; U32_SIZE];
        match read_fully(&mut self.inner, &mut prefix)? {
            0 => return Ok(None),
            U32_SIZE => {}
            got => return Err(Error::truncated("record length", U32_SIZE, got)),
        }
        let block_size = LittleEndian::read_i32(&prefix);
        match usize::try_from(block_size) {
            Ok(bs) if bs >= MIN_BLOCK_SIZE => Ok(Some(bs)),
            _ => Err(Error::Format(format!(
                "record length {} is shorter than the fixed fields",
                block_size
            ))),
        }
    }

    /// Pulls the next record, `None` at the end of the stream.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>> {
        let mut buf = Vec::new();
        match self.read_record(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(RawRecord::from(buf))),
        }
    }

    pub fn records(&mut self) -> Records<'_, S> {
        Records::new(self)
    }

    /// Rewinds to the first alignment without parsing the header again.
    pub fn reset_alignments(&mut self) -> Result<()> {
        let pos = self.first_record.ok_or(Error::UnsupportedOperation(
            "rewinding alignments needs a seekable source",
        ))?;
        self.inner.seek_to(pos)?;
        self.eof_reached = false;
        debug!("Rewound to first alignment");
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn read_magic<R: BlockSource>(reader: &mut R) -> Result<[u8; 4]> {
    let mut magic = [0; 4];
    read_exact(reader, &mut magic, "magic number")?;
    Ok(magic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ALIGN0, ALIGN42, PAIRED_END, RAW_HEADER, RAW_REFS};
    use crate::source::{Plain, Sequential};
    use std::io::Cursor;

    #[test]
    fn test_open() {
        let reader = Reader::new(Sequential(PAIRED_END)).unwrap();
        assert_eq!(reader.header().raw_header(), RAW_HEADER);
        assert_eq!(reader.references().raw(), RAW_REFS);
        assert_eq!(reader.header().sort_order(), Some("unsorted"));
        assert_eq!(reader.references().index_to_ref(12), Some("12"));
    }

    #[test]
    fn test_bad_magic() {
        let mut data = PAIRED_END.to_vec();
        data[3] = 2;
        assert!(matches!(
            Reader::new(Sequential(&data[..])),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            Reader::new(Sequential(&b"BA"[..])),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_iteration() {
        let mut reader = Reader::new(Sequential(PAIRED_END)).unwrap();
        let records: Vec<RawRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][..], ALIGN0);
        assert_eq!(&records[1][..], ALIGN42);
        // stays exhausted
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_record() {
        let data = &PAIRED_END[..PAIRED_END.len() - 10];
        let mut reader = Reader::new(Sequential(data)).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(
            reader.next_record(),
            Err(Error::TruncatedInput { .. })
        ));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_prefix() {
        let end = PAIRED_END.len() - ALIGN42.len() + 2;
        let mut reader = Reader::new(Sequential(&PAIRED_END[..end])).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(
            reader.next_record(),
            Err(Error::TruncatedInput { expected: 4, got: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_prefix() {
        let mut data = PAIRED_END[..PAIRED_END.len() - ALIGN42.len()].to_vec();
        data.extend_from_slice(&(-5i32).to_le_bytes());
        let mut reader = Reader::new(Sequential(&data[..])).unwrap();
        reader.next_record().unwrap();
        assert!(matches!(reader.next_record(), Err(Error::Format(_))));
    }

    #[test]
    fn test_huge_prefix_short_stream() {
        let mut data = MAGIC_NUMBER.to_vec();
        data.extend_from_slice(&0i32.to_le_bytes()); // l_text
        data.extend_from_slice(&0i32.to_le_bytes()); // n_ref
        data.extend_from_slice(&0x7fff_fff0i32.to_le_bytes());
        data.extend_from_slice(&[0; 40]);
        let mut reader = Reader::new(Sequential(&data[..])).unwrap();
        let mut buf = Vec::new();
        assert!(matches!(
            reader.read_record(&mut buf),
            Err(Error::TruncatedInput {
                expected: 0x7fff_fff0,
                got: 40,
                ..
            })
        ));
        assert!(buf.capacity() < 1 << 20);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_reset() {
        let mut reader = Reader::new(Plain(Cursor::new(PAIRED_END))).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        while reader.next_record().unwrap().is_some() {}
        reader.reset_alignments().unwrap();
        assert_eq!(reader.next_record().unwrap().unwrap(), first);
    }

    #[test]
    fn test_reset_unsupported() {
        let mut reader = Reader::new(Sequential(PAIRED_END)).unwrap();
        assert!(matches!(
            reader.reset_alignments(),
            Err(Error::UnsupportedOperation(_))
        ));
        // still usable afterwards
        assert!(reader.next_record().unwrap().is_some());
    }
}
