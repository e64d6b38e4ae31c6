//! Result-log record format.
//!
//! One record per line, three tab-separated fields:
//!
//! ```text
//! <implementation>\t<VERDICT>\t<vector file name>\n
//! ```
//!
//! Logs from separate runs (or from runs split by filters) are merged by concatenating their lines, so parsing
//! is tolerant: a malformed line is reported and skipped, never fatal.

use std::fmt;

use crate::verdict::{self, Verdict};

/// One classified (implementation, vector) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionRecord {
    pub implementation: String,
    pub verdict: Verdict,
    pub vector: String,
}

/// Why a log line could not be read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordParseError {
    FieldCount { found: usize },
    UnknownVerdict { token: String },
    EmptyField { field: &'static str },
    /// The line is not valid UTF-8.
    Encoding,
}

impl fmt::Display for RecordParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordParseError::FieldCount { found } => {
                write!(f, "expected 3 tab-separated fields, found {}", found)
            }
            RecordParseError::UnknownVerdict { token } => write!(f, "unhandled verdict `{}`", token),
            RecordParseError::EmptyField { field } => write!(f, "empty {} field", field),
            RecordParseError::Encoding => write!(f, "line is not valid UTF-8"),
        }
    }
}

impl std::error::Error for RecordParseError {}

impl ExecutionRecord {
    pub fn new(implementation: impl Into<String>, verdict: Verdict, vector: impl Into<String>) -> Self {
        Self {
            implementation: implementation.into(),
            verdict,
            vector: vector.into(),
        }
    }

    /// Encode as a log line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}\t{}\t{}", self.implementation, self.verdict.as_str(), self.vector)
    }

    /// Decode one log line. A trailing `\n` / `\r\n` is tolerated.
    pub fn parse_line(line: &str) -> Result<Self, RecordParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split('\t').collect();
        let &[implementation, token, vector] = fields.as_slice() else {
            return Err(RecordParseError::FieldCount { found: fields.len() });
        };

        if implementation.is_empty() {
            return Err(RecordParseError::EmptyField { field: "implementation" });
        }
        let verdict = verdict::from_str(token).ok_or_else(|| RecordParseError::UnknownVerdict {
            token: token.to_string(),
        })?;
        // Older logs were written with a right-stripped last field; keep that leniency.
        let vector = vector.trim_end();
        if vector.is_empty() {
            return Err(RecordParseError::EmptyField { field: "vector" });
        }

        Ok(Self::new(implementation, verdict, vector))
    }
}

impl fmt::Display for ExecutionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Records read from a log segment plus the lines that were skipped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedLog {
    pub records: Vec<ExecutionRecord>,
    /// `(1-based line number, reason)` for every malformed line.
    pub rejected: Vec<(usize, RecordParseError)>,
}

/// Parse a whole log segment. Blank lines are ignored; malformed lines are collected in
/// [`ParsedLog::rejected`] and parsing continues.
pub fn parse_log(text: &str) -> ParsedLog {
    parse_log_bytes(text.as_bytes())
}

/// Parse a log segment read as raw bytes. Each line is decoded on its own, so an undecodable line is
/// rejected with [`RecordParseError::Encoding`] without losing the lines around it.
pub fn parse_log_bytes(bytes: &[u8]) -> ParsedLog {
    let mut parsed = ParsedLog::default();
    for (idx, chunk) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(chunk) {
            Ok(line) => line,
            Err(_) => {
                parsed.rejected.push((idx + 1, RecordParseError::Encoding));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match ExecutionRecord::parse_line(line) {
            Ok(record) => parsed.records.push(record),
            Err(e) => parsed.rejected.push((idx + 1, e)),
        }
    }
    parsed
}
