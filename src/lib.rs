#![forbid(unsafe_code)]
//! Differential conformance harness
//!
//! Runs a corpus of test vectors against many independently sandboxed implementations of the same format parser,
//! classifies each implementation's outcome per vector against the expectation encoded in the vector's name, and
//! groups vectors by identical cross-implementation behavior for the comparison report.
//!
//! The decision logic (expectations, verdicts, the log line format, grouping) lives in `minefield_core`; this
//! crate adds the I/O around it: corpus discovery, the implementation registry, the process sandbox, the result
//! log, run orchestration, the HTML report and the CLI.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Per-pair failures**: A subject that cannot be launched, times out, or crashes is an outcome, never a panic
//!   or an error of the harness.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod harness;
pub mod registry;
pub mod report;
pub mod results;
pub mod sandbox;
pub mod version;

pub use minefield_core::{EquivalenceClass, ExecutionRecord, ExpectedTag, RawOutcome, Verdict, group_by_behavior};

pub use config::{HarnessConfig, SandboxKind};
pub use corpus::{Corpus, TestVector};
pub use error::{HarnessError, HarnessResult};
pub use harness::{ConsoleReporter, Harness, RunReporter, RunSummary, SilentReporter};
pub use registry::{ImplementationTarget, Invocation, Registry, VectorInput};
pub use report::{ReportOptions, render_html, write_report};
pub use results::{FileResultLog, MemoryResultLog, ResultLog, load_segments};
pub use sandbox::{ProcessSandbox, SandboxExecutor};
