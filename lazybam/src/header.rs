mod program;

pub use program::ProgramRecord;

use crate::source::{read_exact, read_exact_to_end};
use crate::{Error, Result, U32_SIZE};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use log::debug;
use program::{record_type, CO_PREFIX, PG_PREFIX};
use std::convert::TryFrom;
use std::io::{Read, Write};
use std::ops::Range;

/// SAM text header with its `l_text` prefix.
///
/// The stored prefix is kept separately from the text so a header edited by
/// hand can be detected as stale: [`push_text`](Self::push_text) leaves it
/// alone and [`update_header_length`](Self::update_header_length) re-derives
/// it. Provenance rewriting and the writer refuse a stale header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    l_text: i32,
    text: String,
}

/// The parts a header is cut into for provenance rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderSpans {
    /// `@HD`, `@SQ`, `@RG` and anything else before the first `@PG`.
    head: Range<usize>,
    /// First `@PG` line through the end of the last one.
    provenance: Range<usize>,
    /// Whatever follows, normally trailing `@CO` lines.
    comment: Range<usize>,
    /// NUL bytes some writers pad the text with (and count in `l_text`).
    padding: Range<usize>,
}

impl HeaderSpans {
    fn new(text: &str) -> Self {
        let body_end = text.trim_end_matches('\0').len();
        let padding = body_end..text.len();
        let text = &text[..body_end];
        let mut first_pg = None;
        let mut last_pg_end = None;
        let mut first_co = None;
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let kind = record_type(line);
            if kind == PG_PREFIX {
                first_pg.get_or_insert(offset);
                last_pg_end = Some(offset + line.len());
            } else if kind == CO_PREFIX {
                first_co.get_or_insert(offset);
            }
            offset += line.len();
        }
        match (first_pg, last_pg_end) {
            (Some(start), Some(end)) => HeaderSpans {
                head: 0..start,
                provenance: start..end,
                comment: end..text.len(),
                padding,
            },
            _ => {
                let split = first_co.unwrap_or(text.len());
                HeaderSpans {
                    head: 0..split,
                    provenance: split..split,
                    comment: split..text.len(),
                    padding,
                }
            }
        }
    }
}

impl Header {
    /// Reads `l_text` and the text following it.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut buf = [0; U32_SIZE];
        read_exact(reader, &mut buf, "header length")?;
        let l_text = LittleEndian::read_i32(&buf);
        let len = usize::try_from(l_text)
            .map_err(|_| Error::Format(format!("negative header length {}", l_text)))?;
        let mut text = Vec::new();
        read_exact_to_end(reader, &mut text, len, "header text")?;
        Ok(Self {
            l_text,
            text: text_from_bytes(text)?,
        })
    }

    /// Takes a raw header as is: the prefix is kept even if it does not
    /// match the text after it.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        if raw.len() < U32_SIZE {
            return Err(Error::truncated("header length", U32_SIZE, raw.len()));
        }
        Ok(Self {
            l_text: LittleEndian::read_i32(raw),
            text: text_from_bytes(raw[U32_SIZE..].to_vec())?,
        })
    }

    pub fn from_text<S: Into<String>>(text: S) -> Result<Self> {
        let mut header = Self {
            l_text: 0,
            text: text.into(),
        };
        header.update_header_length()?;
        Ok(header)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length prefix as stored, which may be stale.
    pub fn l_text(&self) -> i32 {
        self.l_text
    }

    pub fn is_length_consistent(&self) -> bool {
        usize::try_from(self.l_text).map_or(false, |l| l == self.text.len())
    }

    /// Re-derives the length prefix from the text.
    pub fn update_header_length(&mut self) -> Result<()> {
        self.l_text = i32::try_from(self.text.len()).map_err(|_| {
            Error::Format(format!("header text of {} bytes is too long", self.text.len()))
        })?;
        Ok(())
    }

    /// Appends raw text. The length prefix is left as it was.
    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Prefix followed by text, exactly as it would be written.
    pub fn raw_header(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(U32_SIZE + self.text.len());
        raw.extend_from_slice(&self.l_text.to_le_bytes());
        raw.extend_from_slice(self.text.as_bytes());
        raw
    }

    pub(crate) fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.l_text)?;
        writer.write_all(self.text.as_bytes())?;
        Ok(())
    }

    fn lines_with(&self, prefix: &'static str) -> impl Iterator<Item = &str> {
        self.text
            .trim_end_matches('\0')
            .split('\n')
            .filter(move |line| record_type(line) == prefix)
    }

    /// `SO` value of the `@HD` line.
    pub fn sort_order(&self) -> Option<&str> {
        self.lines_with("@HD")
            .next()?
            .split('\t')
            .find_map(|field| field.strip_prefix("SO:"))
            .map(|so| so.trim_end_matches('\r'))
    }

    /// Provenance chain in header order.
    pub fn programs(&self) -> Vec<ProgramRecord> {
        self.lines_with(PG_PREFIX)
            .filter_map(ProgramRecord::parse_line)
            .collect()
    }

    fn unique_id(&self, id: &str) -> String {
        let taken: Vec<String> = self.programs().into_iter().map(|pg| pg.id).collect();
        if !taken.iter().any(|t| t == id) {
            return id.to_string();
        }
        (1..)
            .map(|n| format!("{}.{}", id, n))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| id.to_string())
    }

    /// Appends a `@PG` entry after the existing provenance chain and before
    /// the trailing comments and NUL padding, linked to the last entry
    /// through `PP`. The id gets a `.N` suffix if it is already taken.
    ///
    /// Returns the entry as written. Refuses to work on a header whose
    /// length prefix is stale.
    pub fn update_header(&mut self, program: &ProgramRecord) -> Result<ProgramRecord> {
        if !self.is_length_consistent() {
            return Err(Error::InvalidHeaderState(format!(
                "length prefix {} does not match {} bytes of text, update the header length first",
                self.l_text,
                self.text.len()
            )));
        }
        let spans = HeaderSpans::new(&self.text);
        let mut entry = program.clone();
        entry.id = self.unique_id(&program.id);
        entry.previous = self.programs().pop().map(|tail| tail.id);

        let head = &self.text[spans.head];
        let provenance = &self.text[spans.provenance];
        let comment = &self.text[spans.comment];
        let padding = &self.text[spans.padding];
        let mut text = String::with_capacity(self.text.len() + 128);
        text.push_str(head);
        text.push_str(provenance);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&entry.to_string());
        text.push_str(comment);
        text.push_str(padding);

        self.text = text;
        self.update_header_length()?;
        debug!(
            "Added @PG {} (PP {:?}), header now {} bytes",
            entry.id, entry.previous, self.l_text
        );
        Ok(entry)
    }

    /// Copy of the header with a provenance entry appended.
    pub fn updated_header(&self, program: &ProgramRecord) -> Result<Header> {
        let mut header = self.clone();
        header.update_header(program)?;
        Ok(header)
    }
}

fn text_from_bytes(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::Utf8 {
        what: "header text",
        source: e.utf8_error(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::RAW_HEADER;

    const COMMENT: &str = "@CO\tThis is an extra comment\n";

    fn header() -> Header {
        Header::from_raw(RAW_HEADER).unwrap()
    }

    #[test]
    fn test_parse_header() {
        let header = header();
        assert!(header.is_length_consistent());
        assert_eq!(header.raw_header(), RAW_HEADER);
        assert!(header.text().starts_with("@HD\tVN:1.0\tSO:unsorted\n@SQ\tSN:MT\tLN:16569\n"));
        assert_eq!(header.sort_order(), Some("unsorted"));
        let mut stream = RAW_HEADER;
        assert_eq!(Header::read_from(&mut stream).unwrap(), header);
    }

    #[test]
    fn test_update_header_length() {
        let mut header = header();
        header.push_text(COMMENT);
        assert!(!header.is_length_consistent());
        header.update_header_length().unwrap();
        assert_eq!(header.l_text() as usize, header.text().len());

        let mut stale = 42i32.to_le_bytes().to_vec();
        stale.extend_from_slice(&RAW_HEADER[4..]);
        let mut header = Header::from_raw(&stale).unwrap();
        assert_eq!(header.l_text(), 42);
        header.update_header_length().unwrap();
        assert_eq!(&header.raw_header()[..4], &RAW_HEADER[..4]);
    }

    #[test]
    fn test_spans() {
        let text = "@HD\tVN:1.0\n@PG\tID:a\n@PG\tID:b\tPP:a\n@CO\tx\n";
        let spans = HeaderSpans::new(text);
        assert_eq!(&text[spans.head.clone()], "@HD\tVN:1.0\n");
        assert_eq!(&text[spans.provenance.clone()], "@PG\tID:a\n@PG\tID:b\tPP:a\n");
        assert_eq!(&text[spans.comment.clone()], "@CO\tx\n");

        let spans = HeaderSpans::new("@HD\tVN:1.0\n@CO\tx\n");
        assert!(spans.provenance.is_empty());
        assert_eq!(spans.head, 0..11);
        assert!(spans.padding.is_empty());

        let text = "@HD\tVN:1.0\n@PG\tID:a\n\0\0";
        let spans = HeaderSpans::new(text);
        assert_eq!(&text[spans.provenance.clone()], "@PG\tID:a\n");
        assert!(spans.comment.is_empty());
        assert_eq!(&text[spans.padding.clone()], "\0\0");
    }

    #[test]
    fn test_updated_header() {
        let mut header = header();
        header.push_text(COMMENT);
        header.update_header_length().unwrap();
        let pg = ProgramRecord::new("test", "test", "88.88.8").with_command_line("--argumentative");
        let updated = header.updated_header(&pg).unwrap();
        let mut expected = String::from_utf8(RAW_HEADER[4..].to_vec()).unwrap();
        expected.push_str("@PG\tID:test\tPN:test\tVN:88.88.8\tPP:bowtie2\tCL:--argumentative\n");
        expected.push_str(COMMENT);
        assert_eq!(updated.text(), expected);
        assert!(updated.is_length_consistent());
        // the receiver is left as it was
        assert_eq!(header.programs().len(), 1);
    }

    #[test]
    fn test_provenance_chain() {
        let mut header = header();
        let first = header
            .update_header(&ProgramRecord::new("lazybam", "lazybam", "0.0.0").with_description("testing123"))
            .unwrap();
        assert!(header.is_length_consistent());
        let second = header
            .update_header(&ProgramRecord::new("lazybam", "lazybam", "0.0.1"))
            .unwrap();
        assert!(header.is_length_consistent());
        assert_eq!(first.previous.as_deref(), Some("bowtie2"));
        assert_eq!(second.id, "lazybam.1");
        assert_eq!(second.previous.as_deref(), Some(first.id.as_str()));
        let chain: Vec<String> = header.programs().into_iter().map(|pg| pg.id).collect();
        assert_eq!(chain, vec!["bowtie2", "lazybam", "lazybam.1"]);
        assert!(header
            .text()
            .contains("@PG\tID:lazybam\tPN:lazybam\tVN:0.0.0\tPP:bowtie2\tDS:testing123\n"));
    }

    #[test]
    fn test_stale_rewrite_rejected() {
        let mut header = header();
        header.push_text(COMMENT);
        let pg = ProgramRecord::new("x", "x", "1");
        assert!(matches!(
            header.update_header(&pg),
            Err(Error::InvalidHeaderState(_))
        ));
    }

    #[test]
    fn test_header_without_programs() {
        let mut header = Header::from_text("@HD\tVN:1.6\tSO:coordinate").unwrap();
        assert_eq!(header.sort_order(), Some("coordinate"));
        let pg = header.update_header(&ProgramRecord::new("x", "x", "1")).unwrap();
        assert_eq!(pg.previous, None);
        assert_eq!(header.text(), "@HD\tVN:1.6\tSO:coordinate\n@PG\tID:x\tPN:x\tVN:1\n");
        assert!(header.is_length_consistent());
    }

    #[test]
    fn test_padded_header_without_programs() {
        let mut header =
            Header::from_text("@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:c\tLN:10\n\0").unwrap();
        header.update_header(&ProgramRecord::new("x", "x", "1")).unwrap();
        assert_eq!(
            header.text(),
            "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:c\tLN:10\n@PG\tID:x\tPN:x\tVN:1\n\0"
        );
        assert!(header.is_length_consistent());
        // everything a reader stopping at the first NUL sees
        let visible = header.text().split('\0').next().unwrap();
        assert!(visible.contains("@PG\tID:x"));
    }

    #[test]
    fn test_padded_header_with_programs() {
        let mut header = Header::from_text("@HD\tVN:1.6\n@PG\tID:a\tPN:a\tVN:1\0\0\0").unwrap();
        let pg = header.update_header(&ProgramRecord::new("b", "b", "2")).unwrap();
        assert_eq!(pg.previous.as_deref(), Some("a"));
        assert_eq!(
            header.text(),
            "@HD\tVN:1.6\n@PG\tID:a\tPN:a\tVN:1\n@PG\tID:b\tPN:b\tVN:2\tPP:a\n\0\0\0"
        );
        let ids: Vec<String> = header.programs().into_iter().map(|pg| pg.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_huge_length_short_stream() {
        let mut data = 0x7fff_fff0i32.to_le_bytes().to_vec();
        data.extend_from_slice(b"@HD\tVN:1.6\n");
        assert!(matches!(
            Header::read_from(&mut &data[..]),
            Err(Error::TruncatedInput { got: 11, .. })
        ));
    }
}
