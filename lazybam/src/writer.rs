use crate::header::Header;
use crate::record::fields::block_size;
use crate::references::ReferenceTable;
use crate::{bgzf, Error, Result, MAGIC_NUMBER, U32_SIZE};
use log::debug;
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Magic, header and reference table, as they open a BAM stream.
pub fn full_raw_header(header: &Header, references: &ReferenceTable) -> Result<Vec<u8>> {
    check_header(header)?;
    let mut raw = Vec::with_capacity(MAGIC_NUMBER.len() + U32_SIZE + header.text().len());
    raw.extend_from_slice(MAGIC_NUMBER);
    header.write_to(&mut raw)?;
    raw.extend_from_slice(references.raw());
    Ok(raw)
}

fn check_header(header: &Header) -> Result<()> {
    if !header.is_length_consistent() {
        return Err(Error::InvalidHeaderState(format!(
            "header length prefix {} does not match {} bytes of text, call update_header_length first",
            header.l_text(),
            header.text().len()
        )));
    }
    Ok(())
}

/// Writes a BAM stream into a byte sink: the header once, then records as
/// they come.
///
/// Records are passed through byte for byte, so unmodified records
/// round trip exactly. Compression is the sink's business, see
/// [`bgzf::Writer`].
pub struct Writer<W: Write> {
    inner: W,
    header_written: bool,
    /// Bytes handed to `inner` so far.
    position: u64,
}

impl Writer<bgzf::Writer<BufWriter<File>>> {
    /// Creates (or truncates) a BGZF compressed BAM file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!("Writing {}", path.as_ref().display());
        Ok(Self::new(bgzf::Writer::new(BufWriter::new(file))))
    }
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            header_written: false,
            position: 0,
        }
    }

    /// Writes magic, header and references. Allowed once per stream.
    pub fn write_header(&mut self, header: &Header, references: &ReferenceTable) -> Result<()> {
        if self.header_written {
            return Err(Error::InvalidHeaderState(
                "header has already been written to this stream".to_string(),
            ));
        }
        let raw = full_raw_header(header, references)?;
        self.inner.write_all(&raw)?;
        self.header_written = true;
        self.position += raw.len() as u64;
        debug!(
            "Wrote BAM header: {} bytes, {} references",
            raw.len(),
            references.len()
        );
        Ok(())
    }

    /// Forwards one record, length prefix included, unchanged.
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        if !self.header_written {
            return Err(Error::InvalidHeaderState(
                "records written before the header".to_string(),
            ));
        }
        let prefix = block_size(record)?;
        if usize::try_from(prefix).ok() != Some(record.len() - U32_SIZE) {
            return Err(Error::Format(format!(
                "record length prefix says {} bytes, record body has {}",
                prefix,
                record.len() - U32_SIZE
            )));
        }
        self.inner.write_all(record)?;
        self.position += record.len() as u64;
        Ok(())
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Uncompressed bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Writer<bgzf::Writer<W>> {
    /// Terminates the BGZF stream and returns the underlying sink.
    pub fn finish(self) -> Result<W> {
        let position = self.position;
        let inner = self.inner.finish()?;
        debug!("Finished BAM stream after {} bytes", position);
        Ok(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ALIGN0, ALIGN42, PAIRED_END, RAW_HEADER, RAW_REFS};

    fn header() -> (Header, ReferenceTable) {
        (
            Header::from_raw(RAW_HEADER).unwrap(),
            ReferenceTable::from_bytes(RAW_REFS).unwrap(),
        )
    }

    #[test]
    fn test_write_plain() {
        let (header, refs) = header();
        let mut writer = Writer::new(Vec::new());
        writer.write_header(&header, &refs).unwrap();
        writer.write_record(ALIGN0).unwrap();
        writer.write_record(ALIGN42).unwrap();
        assert_eq!(writer.position(), PAIRED_END.len() as u64);
        assert_eq!(writer.into_inner(), PAIRED_END);
    }

    #[test]
    fn test_full_raw_header() {
        let (header, refs) = header();
        let raw = full_raw_header(&header, &refs).unwrap();
        assert_eq!(&raw[..], &PAIRED_END[..raw.len()]);
        assert!(raw.starts_with(MAGIC_NUMBER));
    }

    #[test]
    fn test_header_written_once() {
        let (header, refs) = header();
        let mut writer = Writer::new(Vec::new());
        writer.write_header(&header, &refs).unwrap();
        let position = writer.position();
        assert!(matches!(
            writer.write_header(&header, &refs),
            Err(Error::InvalidHeaderState(_))
        ));
        // nothing extra reached the sink
        assert_eq!(writer.position(), position);
        assert_eq!(writer.get_ref().len() as u64, position);
    }

    #[test]
    fn test_record_before_header() {
        let mut writer = Writer::new(Vec::new());
        assert!(matches!(
            writer.write_record(ALIGN0),
            Err(Error::InvalidHeaderState(_))
        ));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn test_stale_header_rejected() {
        let (mut header, refs) = header();
        header.push_text("@CO\tappended\n");
        let mut writer = Writer::new(Vec::new());
        assert!(matches!(
            writer.write_header(&header, &refs),
            Err(Error::InvalidHeaderState(_))
        ));
        assert!(!writer.header_written());
        header.update_header_length().unwrap();
        writer.write_header(&header, &refs).unwrap();
    }

    #[test]
    fn test_mismatched_record_length() {
        let (header, refs) = header();
        let mut writer = Writer::new(Vec::new());
        writer.write_header(&header, &refs).unwrap();
        assert!(matches!(
            writer.write_record(&ALIGN0[..ALIGN0.len() - 1]),
            Err(Error::Format(_))
        ));
        assert!(writer.write_record(&ALIGN0[..2]).is_err());
    }

    #[test]
    fn test_position_grows() {
        let (header, refs) = header();
        let mut writer = Writer::new(bgzf::Writer::new(Vec::new()));
        writer.write_header(&header, &refs).unwrap();
        let after_header = writer.position();
        writer.write_record(ALIGN0).unwrap();
        assert!(writer.position() > after_header);
        assert!(!writer.finish().unwrap().is_empty());
    }
}
