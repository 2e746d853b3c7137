use std::fmt;

pub(crate) const PG_PREFIX: &str = "@PG";
pub(crate) const CO_PREFIX: &str = "@CO";

/// Record type code of a header line (`@HD`, `@PG`, ...).
pub(crate) fn record_type(line: &str) -> &str {
    let line = line.trim_end_matches(['\n', '\r']);
    line.split('\t').next().unwrap_or(line)
}

/// One `@PG` line: a program that processed the file.
///
/// `previous` is the `PP` back-reference linking the entry to the step
/// before it. When the entry is appended through
/// [`Header::update_header`](super::Header::update_header) it is filled in
/// from the current chain tail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramRecord {
    pub id: String,
    pub program: String,
    pub version: String,
    pub command_line: Option<String>,
    pub description: Option<String>,
    pub previous: Option<String>,
}

impl ProgramRecord {
    pub fn new<S: Into<String>>(id: S, program: S, version: S) -> Self {
        Self {
            id: id.into(),
            program: program.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_command_line<S: Into<String>>(mut self, command_line: S) -> Self {
        self.command_line = Some(command_line.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parses a `@PG` line (with or without its newline). Fields other than
    /// ID, PN, VN, PP, CL and DS are ignored.
    pub fn parse_line(line: &str) -> Option<Self> {
        if record_type(line) != PG_PREFIX {
            return None;
        }
        let fields = line.trim_end_matches(['\n', '\r']).split('\t').skip(1);
        let mut record = ProgramRecord::default();
        for field in fields {
            let (key, value) = match field.split_once(':') {
                Some(kv) => kv,
                None => continue,
            };
            let value = value.to_string();
            match key {
                "ID" => record.id = value,
                "PN" => record.program = value,
                "VN" => record.version = value,
                "PP" => record.previous = Some(value),
                "CL" => record.command_line = Some(value),
                "DS" => record.description = Some(value),
                _ => {}
            }
        }
        Some(record)
    }
}

/// Renders the line, newline included, as
/// `@PG ID PN VN [PP] [CL] [DS]`.
impl fmt::Display for ProgramRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\tID:{}\tPN:{}\tVN:{}",
            PG_PREFIX, self.id, self.program, self.version
        )?;
        if let Some(pp) = &self.previous {
            write!(f, "\tPP:{}", pp)?;
        }
        if let Some(cl) = &self.command_line {
            write!(f, "\tCL:{}", cl)?;
        }
        if let Some(ds) = &self.description {
            write!(f, "\tDS:{}", ds)?;
        }
        writeln!(f)
    }
}
