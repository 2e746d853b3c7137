use std::io;

use thiserror::Error;

/// Result type alias for lazybam operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading, decoding or writing BAM data.
///
/// Nothing is retried: a structurally broken stream can't be repaired by
/// reading it again, so every error goes straight back to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Magic mismatch, reference count mismatch, malformed length prefix
    /// or an unknown type code.
    #[error("Invalid BAM data: {0}")]
    Format(String),

    /// The source ran dry in the middle of a structure.
    #[error("Truncated input: expected {expected} bytes of {what}, got {got}")]
    TruncatedInput {
        /// What was being read
        what: &'static str,
        /// Bytes needed
        expected: usize,
        /// Bytes available
        got: usize,
    },

    /// More than one match for a single tag lookup.
    #[error("Tag {tag} matched {matches} times in the optional fields")]
    TagAmbiguity {
        /// Two character tag code
        tag: String,
        /// Number of matches found
        matches: usize,
    },

    /// Header written twice or a rewrite attempted on a stale length prefix.
    #[error("Invalid header state: {0}")]
    InvalidHeaderState(String),

    /// Operation the underlying source can't perform (e.g. seeking a pipe).
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Text field that isn't valid UTF-8.
    #[error("Invalid text in {what}: {source}")]
    Utf8 {
        /// Which part of the file held the text
        what: &'static str,
        /// Decoding failure
        source: std::str::Utf8Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn truncated(what: &'static str, expected: usize, got: usize) -> Self {
        Error::TruncatedInput {
            what,
            expected,
            got,
        }
    }

    pub(crate) fn ambiguous(tag: &[u8; 2], matches: usize) -> Self {
        Error::TagAmbiguity {
            tag: String::from_utf8_lossy(tag).into_owned(),
            matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_message() {
        let error = Error::truncated("record body", 274, 100);
        let msg = format!("{error}");
        assert!(msg.contains("274 bytes of record body"));
        assert!(msg.contains("got 100"));
    }

    #[test]
    fn test_ambiguity_message() {
        let error = Error::ambiguous(b"AS", 2);
        assert_eq!(
            format!("{error}"),
            "Tag AS matched 2 times in the optional fields"
        );
    }

    #[test]
    fn test_io_conversion() {
        let error: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(error, Error::Io(_)));
    }
}
