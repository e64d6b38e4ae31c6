//! Provide the pure decision logic of the minefield conformance harness.
//!
//! This crate is intentionally small and dependency-free. It holds everything that decides *what an outcome means*,
//! so the harness binary, the report renderer, and offline tooling over old result logs all agree:
//! - the corpus naming convention ([`expectation`]),
//! - the verdict vocabulary and the classification rules ([`verdict`]),
//! - the result-log line format ([`record`]),
//! - grouping vectors by identical cross-implementation behavior ([`grouping`]).
//!
//! ## Notes
//!
//! - No IO, no global state, no process handling. Everything here is deterministic over its inputs.

pub mod expectation;
pub mod grouping;
pub mod record;
pub mod verdict;

pub use expectation::ExpectedTag;
pub use grouping::{EquivalenceClass, VerdictMatrix, group_by_behavior, prune};
pub use record::{ExecutionRecord, ParsedLog, RecordParseError, parse_log, parse_log_bytes};
pub use verdict::{RawOutcome, RawResult, Verdict};
