//! CLI module for the minefield harness
//!
//! ## Commands
//!
//! - `run [VECTOR]` - Run every implementation against the corpus and write the result log and report
//! - `report` - Render the HTML report from the result segments of a results directory
//! - `classes` - Print the equivalence classes of a results directory
//! - `classify <NAME>` - Print the verdict a hypothetical outcome would get
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.
//! Verdicts never affect the exit status: a run that completes exits 0 whatever the implementations did.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{DEFAULT_ENTRYPOINT, DEFAULT_IMAGE_PREFIX, DEFAULT_VECTOR_EXTENSION};
use crate::error::HarnessError;
use crate::version::MINEFIELD_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(e: HarnessError) -> Self {
        CliError::failure(format!("{:?}", miette::Report::new(e)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Differential conformance harness for parser implementations
#[derive(Parser, Debug)]
#[command(name = "minefield")]
#[command(version = MINEFIELD_VERSION)]
#[command(about = "Run a corpus of test vectors against many parser implementations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every implementation against every vector
    Run(RunArgs),

    /// Render the HTML report from a results directory
    Report {
        /// Directory holding the result log segments (*.txt)
        #[arg(long, value_name = "DIR", default_value = "results")]
        results: PathBuf,
        /// Directory holding the test vectors
        #[arg(long, value_name = "DIR", default_value = "test_parsing")]
        corpus: PathBuf,
        /// Report file (default: <results>/parsing.html)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Keep only one vector per equivalence class
        #[arg(long)]
        pruned: bool,
    },

    /// Print vectors grouped by identical behavior across implementations
    Classes {
        /// Directory holding the result log segments (*.txt)
        #[arg(long, value_name = "DIR", default_value = "results")]
        results: PathBuf,
        /// Compare only these implementations (comma-separated)
        #[arg(long, value_name = "IDS", value_delimiter = ',')]
        implementations: Option<Vec<String>>,
        /// Print one representative vector per class
        #[arg(long)]
        pruned: bool,
    },

    /// Print the verdict for a hypothetical outcome (debug)
    Classify {
        /// Vector file name; its prefix carries the expectation
        #[arg(value_name = "NAME")]
        name: String,
        /// Exit status of the run
        #[arg(long, value_name = "N", allow_hyphen_values = true, required_unless_present = "timeout")]
        exit_code: Option<i32>,
        /// The run hit its deadline
        #[arg(long, conflicts_with = "exit_code")]
        timeout: bool,
    },
}

/// How implementations are sandboxed.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxChoice {
    /// `docker run <image-prefix><id>` with the vector mounted read-only
    Docker,
    /// `<parsers>/<id>/<entrypoint> <vector>` as a child process
    Native,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run only the vector with this file name
    #[arg(value_name = "VECTOR")]
    pub vector: Option<String>,
    /// Directory holding the test vectors
    #[arg(long, value_name = "DIR", default_value = "test_parsing")]
    pub corpus: PathBuf,
    /// Directory with one subdirectory per implementation
    #[arg(long, value_name = "DIR", default_value = "parsers")]
    pub parsers: PathBuf,
    /// JSON array of implementation names to run
    #[arg(long, value_name = "FILE")]
    pub filter: Option<PathBuf>,
    /// Directory for the result log and report
    #[arg(long, value_name = "DIR", default_value = "results")]
    pub results: PathBuf,
    /// Result log file (default: <results>/logs.txt)
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
    /// Per-run deadline in seconds
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    pub timeout: f64,
    /// Maximum number of runs in flight (default: twice the core count)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
    /// Vector file extension
    #[arg(long, value_name = "EXT", default_value = DEFAULT_VECTOR_EXTENSION)]
    pub extension: String,
    /// How implementations are launched
    #[arg(long, value_enum, default_value_t = SandboxChoice::Docker)]
    pub sandbox: SandboxChoice,
    /// Image name prefix for the docker sandbox
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_IMAGE_PREFIX)]
    pub image_prefix: String,
    /// Entrypoint file name for the native sandbox
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ENTRYPOINT)]
    pub entrypoint: String,
    /// Continue the existing log instead of truncating it
    #[arg(long)]
    pub append: bool,
    /// Skip the HTML report
    #[arg(long)]
    pub no_report: bool,
    /// Print one colored character per record instead of the record line
    #[arg(long)]
    pub compact: bool,
    /// Also list every pair that could not be launched
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run(args) => commands::run_harness(args),
        Command::Report {
            results,
            corpus,
            output,
            pruned,
        } => commands::generate_report(&results, &corpus, output.as_deref(), pruned),
        Command::Classes {
            results,
            implementations,
            pruned,
        } => commands::print_classes(&results, implementations.as_deref(), pruned),
        Command::Classify {
            name,
            exit_code,
            timeout,
        } => commands::classify(&name, exit_code, timeout),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::try_parse_from(["minefield", "run"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("Expected Run command");
        };
        assert_eq!(args.vector, None);
        assert_eq!(args.corpus, PathBuf::from("test_parsing"));
        assert_eq!(args.results, PathBuf::from("results"));
        assert_eq!(args.timeout, 5.0);
        assert_eq!(args.sandbox, SandboxChoice::Docker);
        assert_eq!(args.image_prefix, "jsontestsuite-");
        assert!(!args.append);
    }

    #[test]
    fn test_cli_parse_run_single_vector_with_filter() {
        let cli = Cli::try_parse_from([
            "minefield",
            "run",
            "n_array_extra_comma.json",
            "--filter",
            "only.json",
            "--sandbox",
            "native",
            "-j",
            "4",
            "-v",
            "--compact",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("Expected Run command");
        };
        assert_eq!(args.vector.as_deref(), Some("n_array_extra_comma.json"));
        assert_eq!(args.filter, Some(PathBuf::from("only.json")));
        assert_eq!(args.sandbox, SandboxChoice::Native);
        assert_eq!(args.jobs, Some(4));
        assert!(args.verbose);
        assert!(args.compact);
    }

    #[test]
    fn test_cli_parse_report() {
        let cli = Cli::try_parse_from(["minefield", "report", "--pruned", "-o", "out.html"]).unwrap();
        if let Command::Report { pruned, output, .. } = cli.command {
            assert!(pruned);
            assert_eq!(output, Some(PathBuf::from("out.html")));
        } else {
            panic!("Expected Report command");
        }
    }

    #[test]
    fn test_cli_parse_classes_implementation_list() {
        let cli = Cli::try_parse_from(["minefield", "classes", "--implementations", "ujson,rapidjson"]).unwrap();
        if let Command::Classes { implementations, .. } = cli.command {
            assert_eq!(implementations, Some(vec!["ujson".to_string(), "rapidjson".to_string()]));
        } else {
            panic!("Expected Classes command");
        }
    }

    #[test]
    fn test_cli_parse_classify() {
        let cli = Cli::try_parse_from(["minefield", "classify", "y_a.json", "--exit-code", "139"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Classify {
                exit_code: Some(139),
                timeout: false,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["minefield", "classify", "y_a.json", "--timeout"]).unwrap();
        assert!(matches!(cli.command, Command::Classify { timeout: true, .. }));
    }

    #[test]
    fn test_cli_classify_needs_an_outcome() {
        assert!(Cli::try_parse_from(["minefield", "classify", "y_a.json"]).is_err());
        assert!(Cli::try_parse_from(["minefield", "classify", "y_a.json", "--timeout", "--exit-code", "1"]).is_err());
    }

    #[test]
    fn test_harness_error_keeps_diagnostic_code() {
        let err: CliError = HarnessError::DuplicateImplementation("ujson".to_string()).into();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("ujson"));
    }
}
