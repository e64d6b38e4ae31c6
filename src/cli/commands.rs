//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use minefield_core::{ExpectedTag, RawOutcome, Verdict, VerdictMatrix, prune};

use crate::config::{HarnessConfig, SandboxKind, load_allow_list};
use crate::corpus::Corpus;
use crate::error::HarnessError;
use crate::harness::{ConsoleReporter, Harness};
use crate::registry::Registry;
use crate::report::{DEFAULT_REPORT_NAME, ReportOptions, render_html, write_report};
use crate::results::{DEFAULT_SEGMENT_NAME, FileResultLog, ResultLog, load_segments};
use crate::sandbox::ProcessSandbox;

use super::{CliError, CliResult, ExitCode, RunArgs, SandboxChoice};

// ============================================================================
// Run
// ============================================================================

/// Resolve the run configuration, execute every pair, then render the full report.
pub fn run_harness(args: RunArgs) -> CliResult<ExitCode> {
    let timeout = Duration::try_from_secs_f64(args.timeout)
        .ok()
        .filter(|t| !t.is_zero())
        .ok_or_else(|| CliError::failure(format!("Error: invalid timeout '{}': expected positive seconds", args.timeout)))?;

    let mut config = HarnessConfig::new()
        .with_timeout(timeout)
        .with_restrict_to(args.vector.clone())
        .with_vector_extension(&args.extension);
    if let Some(jobs) = args.jobs {
        config = config.with_workers(jobs);
    }

    let allow_list = args.filter.as_deref().map(load_allow_list).transpose()?;

    let corpus = Corpus::load(&args.corpus, &config)?;
    if let (Some(vector), true) = (&config.restrict_to, corpus.is_empty()) {
        return Err(CliError::failure(format!(
            "Error: no vector named '{}' under {}",
            vector,
            args.corpus.display()
        )));
    }

    let sandbox = match args.sandbox {
        SandboxChoice::Docker => SandboxKind::Docker {
            image_prefix: args.image_prefix.clone(),
        },
        SandboxChoice::Native => SandboxKind::Native {
            entrypoint: args.entrypoint.clone(),
        },
    };
    let registry = Registry::discover(&args.parsers, &sandbox, allow_list.as_ref())?;
    tracing::info!(
        implementations = registry.len(),
        vectors = corpus.len(),
        workers = config.workers,
        timeout_ms = config.timeout.as_millis() as u64,
        "starting run"
    );

    let log_path = args
        .log
        .clone()
        .unwrap_or_else(|| args.results.join(DEFAULT_SEGMENT_NAME));
    let log: Arc<dyn ResultLog> = if args.append {
        Arc::new(FileResultLog::append_to(&log_path)?)
    } else {
        Arc::new(FileResultLog::create(&log_path)?)
    };

    let harness = Harness::new(config.clone(), registry, corpus, ProcessSandbox::new(config.timeout));
    let mut reporter = ConsoleReporter::new(args.verbose).with_compact(args.compact);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(HarnessError::Runtime)?;
    runtime.block_on(harness.run(Arc::clone(&log), &mut reporter))?;

    if !args.no_report {
        let report_path = args.results.join(DEFAULT_REPORT_NAME);
        let full_corpus = Corpus::load(&args.corpus, &HarnessConfig::new().with_vector_extension(&args.extension))?;
        write_full_report(&args.results, &full_corpus, &report_path, ReportOptions::default())?;
        println!("Report written to {}", report_path.display());
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Report
// ============================================================================

/// Render the report over every segment in `results`.
pub fn generate_report(results: &Path, corpus: &Path, output: Option<&Path>, pruned: bool) -> CliResult<ExitCode> {
    let report_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| results.join(DEFAULT_REPORT_NAME));
    let corpus = Corpus::load(corpus, &HarnessConfig::new())?;
    write_full_report(results, &corpus, &report_path, ReportOptions::default().with_pruned(pruned))?;
    println!("Report written to {}", report_path.display());
    Ok(ExitCode::SUCCESS)
}

fn write_full_report(results: &Path, corpus: &Corpus, report_path: &Path, options: ReportOptions) -> CliResult<()> {
    let records = load_segments(results)?;
    let html = render_html(&records, corpus, &options);
    write_report(report_path, &html)?;
    Ok(())
}

// ============================================================================
// Classes
// ============================================================================

/// Print the equivalence classes of the merged segments in `results`.
pub fn print_classes(results: &Path, implementations: Option<&[String]>, pruned: bool) -> CliResult<ExitCode> {
    let records = load_segments(results)?;
    if records.is_empty() {
        return Err(CliError::failure(format!("No results found in {}", results.display())));
    }

    let matrix = VerdictMatrix::from_records(&records);
    let classes = match implementations {
        Some(ids) => matrix.group(ids),
        None => matrix.group(&matrix.implementations()),
    };

    if pruned {
        for vector in prune(&classes) {
            println!("{}", vector);
        }
    } else {
        for class in &classes {
            print!("{}", class);
        }
    }
    println!();
    println!("{} vector(s) in {} class(es)", matrix.len(), classes.len());
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Classify
// ============================================================================

/// Print the verdict the classifier assigns to `name` for the given outcome.
pub fn classify(name: &str, exit_code: Option<i32>, timed_out: bool) -> CliResult<ExitCode> {
    let outcome = match (exit_code, timed_out) {
        (_, true) => RawOutcome::TimedOut,
        (Some(code), false) => RawOutcome::Exited { code },
        (None, false) => return Err(CliError::failure("Error: classify requires --exit-code N or --timeout")),
    };

    let expected = ExpectedTag::from_name(name);
    match Verdict::classify(expected, &outcome) {
        Some(verdict) => {
            println!("{}\t{}", verdict, verdict.description());
            Ok(ExitCode::SUCCESS)
        }
        None => Err(CliError::failure("Error: outcome does not produce a verdict")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_classify_accepts_either_outcome() {
        assert_eq!(classify("n_a.json", Some(0), false).unwrap(), ExitCode::SUCCESS);
        assert_eq!(classify("y_a.json", None, true).unwrap(), ExitCode::SUCCESS);
        assert!(classify("y_a.json", None, false).is_err());
    }

    #[test]
    fn test_print_classes_requires_results() {
        let dir = tempfile::tempdir().unwrap();
        let err = print_classes(dir.path(), None, false).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }

    #[test]
    fn test_generate_report_writes_default_path() {
        let results = tempfile::tempdir().unwrap();
        let corpus = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("n_a.json"), "[").unwrap();
        fs::write(results.path().join("logs.txt"), "ujson\tSHOULD_HAVE_FAILED\tn_a.json\n").unwrap();

        generate_report(results.path(), corpus.path(), None, true).unwrap();

        let html = fs::read_to_string(results.path().join("parsing.html")).unwrap();
        assert!(html.contains("<TD class=\"SHOULD_HAVE_FAILED\"></TD>"));
    }

    #[test]
    fn test_generate_report_finds_nested_vectors() {
        let results = tempfile::tempdir().unwrap();
        let corpus = tempfile::tempdir().unwrap();
        fs::create_dir_all(corpus.path().join("sub")).unwrap();
        fs::write(corpus.path().join("sub").join("n_nested.json"), "[1,]").unwrap();
        fs::write(results.path().join("logs.txt"), "ujson\tSHOULD_HAVE_FAILED\tn_nested.json\n").unwrap();

        generate_report(results.path(), corpus.path(), None, false).unwrap();

        let html = fs::read_to_string(results.path().join("parsing.html")).unwrap();
        assert!(html.contains("<TD>n_nested.json</TD>"));
    }
}
