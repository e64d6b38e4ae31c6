//! Harness-level errors.
//!
//! Per-pair failures (launch failure, timeout, crash) are outcomes, not errors; they never show up here. These
//! variants cover what stops the harness from running at all or from persisting what it ran.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("cannot read corpus directory {}", path.display())]
    #[diagnostic(code(minefield::corpus), help("pass the directory holding the y_/n_/i_ vectors with --corpus"))]
    Corpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read implementations directory {}", path.display())]
    #[diagnostic(code(minefield::registry), help("pass the directory with one subdirectory per implementation"))]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("implementation `{0}` is registered twice")]
    #[diagnostic(code(minefield::registry::duplicate))]
    DuplicateImplementation(String),

    #[error("invalid name {0:?}: tabs and newlines are not allowed in result-log fields")]
    #[diagnostic(code(minefield::name))]
    InvalidName(String),

    #[error("cannot read implementation filter {}", path.display())]
    #[diagnostic(
        code(minefield::filter),
        help("the filter file must be a JSON array of implementation names, e.g. [\"ujson\", \"rapidjson\"]")
    )]
    Filter {
        path: PathBuf,
        #[source]
        source: FilterSource,
    },

    #[error("result log {} failed", path.display())]
    #[diagnostic(code(minefield::log))]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write report {}", path.display())]
    #[diagnostic(code(minefield::report))]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start async runtime")]
    #[diagnostic(code(minefield::runtime))]
    Runtime(#[source] std::io::Error),
}

/// Underlying cause of a filter-file failure.
#[derive(Debug, Error)]
pub enum FilterSource {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
