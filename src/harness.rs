//! Run orchestration: dispatch every (implementation, vector) pair to the sandbox, classify, and log.
//!
//! ## RunReporter Trait
//!
//! Progress output is separated from execution through [`RunReporter`]. The harness calls it from the
//! orchestrating task only, as pairs complete, so implementations need no synchronization.
//!
//! ## Scheduling
//!
//! At most `workers` pairs are in flight. Pairs complete in any order and are appended to the log in completion
//! order. A pair's record is appended by the task that ran it, before the task finishes. Nothing is retried,
//! and only the per-run deadline cancels a pair.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use minefield_core::{ExecutionRecord, RawOutcome, Verdict};
use tokio::task::{JoinError, JoinSet};

use crate::config::HarnessConfig;
use crate::corpus::{Corpus, TestVector};
use crate::error::HarnessResult;
use crate::registry::{ImplementationTarget, Registry};
use crate::results::ResultLog;
use crate::sandbox::SandboxExecutor;

// ============================================================================
// Run Reporter Trait
// ============================================================================

/// Trait for reporting run progress.
pub trait RunReporter: Send {
    /// Called once, before any pair is dispatched
    fn on_run_start(&mut self, _task_count: usize) {}

    /// Called when a pair's record has been appended
    fn on_record(&mut self, record: &ExecutionRecord);

    /// Called when a pair was skipped because the implementation could not be launched
    fn on_launch_failure(&mut self, _implementation: &str, _vector: &str, _reason: &str) {}

    /// Called when every pair has completed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tasks: usize,
    pub recorded: usize,
    pub launch_failures: usize,
    pub panicked: usize,
    pub by_verdict: BTreeMap<Verdict, usize>,
    /// Implementations that failed to launch for at least one vector
    pub unlaunchable: BTreeSet<String>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn count(&self, verdict: Verdict) -> usize {
        self.by_verdict.get(&verdict).copied().unwrap_or(0)
    }
}

/// Console reporter: one `<impl>\t<VERDICT>\t<vector>` line per record, or one colored character per record
/// when compact. Verbose mode also lists every skipped pair.
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
    pub compact: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose, compact: false }
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    fn record_text(&self, record: &ExecutionRecord) -> String {
        if self.compact {
            progress_mark(record.verdict).to_string()
        } else {
            record.to_line()
        }
    }
}

fn progress_mark(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::ExpectedResult | Verdict::Pass => "\x1b[32m.\x1b[0m",
        Verdict::ShouldHavePassed | Verdict::ShouldHaveFailed => "\x1b[31mF\x1b[0m",
        Verdict::ImplementationPass | Verdict::ImplementationFail => "\x1b[33mi\x1b[0m",
        Verdict::Crash => "\x1b[1;31mC\x1b[0m",
        Verdict::Timeout => "\x1b[1;35mT\x1b[0m",
    }
}

impl RunReporter for ConsoleReporter {
    fn on_run_start(&mut self, task_count: usize) {
        if task_count == 0 {
            eprintln!("Nothing to run");
        } else {
            println!("dispatching {} run(s)", task_count);
        }
    }

    fn on_record(&mut self, record: &ExecutionRecord) {
        let text = self.record_text(record);
        if self.compact {
            eprint!("{}", text);
        } else {
            println!("{}", text);
        }
    }

    fn on_launch_failure(&mut self, implementation: &str, vector: &str, reason: &str) {
        if self.verbose {
            eprintln!("\x1b[33mSKIPPED\x1b[0m {} {} ({})", implementation, vector, reason);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if self.compact {
            eprintln!();
        }
        eprintln!();

        let mut parts: Vec<String> = summary
            .by_verdict
            .iter()
            .map(|(verdict, count)| format!("{} {}", count, verdict))
            .collect();
        if summary.launch_failures > 0 {
            parts.push(format!("\x1b[33m{} skipped\x1b[0m", summary.launch_failures));
        }
        if parts.is_empty() {
            parts.push("no results".to_string());
        }

        eprintln!(
            "====== {} in {:.2}s ======",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
        for implementation in &summary.unlaunchable {
            eprintln!("\x1b[33mcould not launch `{}` for some vectors\x1b[0m", implementation);
        }
    }
}

/// Reporter that prints nothing.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl RunReporter for SilentReporter {
    fn on_record(&mut self, _record: &ExecutionRecord) {}

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

// ============================================================================
// Harness
// ============================================================================

/// One (implementation, vector) pair.
#[derive(Debug, Clone)]
pub struct Task {
    pub target: Arc<ImplementationTarget>,
    pub vector: Arc<TestVector>,
}

enum TaskOutcome {
    Recorded(ExecutionRecord),
    LaunchFailed {
        implementation: String,
        vector: String,
        reason: String,
    },
}

/// The loaded inputs of a run plus the sandbox that executes it.
pub struct Harness<E> {
    config: HarnessConfig,
    registry: Registry,
    corpus: Corpus,
    executor: Arc<E>,
}

impl<E: SandboxExecutor> Harness<E> {
    pub fn new(config: HarnessConfig, registry: Registry, corpus: Corpus, executor: E) -> Self {
        Self {
            config,
            registry,
            corpus,
            executor: Arc::new(executor),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// The task set: every registered implementation × every vector passing the single-vector filter.
    pub fn tasks(&self) -> Vec<Task> {
        let vectors: Vec<Arc<TestVector>> = self
            .corpus
            .vectors()
            .iter()
            .filter(|v| self.config.restrict_to.as_ref().is_none_or(|only| &v.id == only))
            .cloned()
            .map(Arc::new)
            .collect();

        self.registry
            .targets()
            .flat_map(|target| {
                vectors.iter().map(move |vector| Task {
                    target: Arc::clone(target),
                    vector: Arc::clone(vector),
                })
            })
            .collect()
    }

    /// Run every task, appending one record per pair that ran.
    ///
    /// ## Errors
    /// - A log append failure stops the run: outstanding tasks are aborted and their children killed.
    #[tracing::instrument(skip_all, fields(implementations = self.registry.len(), vectors = self.corpus.len(), workers = self.config.workers))]
    pub async fn run(&self, log: Arc<dyn ResultLog>, reporter: &mut dyn RunReporter) -> HarnessResult<RunSummary> {
        let started = Instant::now();
        let tasks = self.tasks();
        let workers = self.config.workers.max(1);

        let mut summary = RunSummary {
            tasks: tasks.len(),
            ..RunSummary::default()
        };
        reporter.on_run_start(tasks.len());

        let mut pending = tasks.into_iter();
        let mut in_flight: JoinSet<HarnessResult<TaskOutcome>> = JoinSet::new();
        loop {
            while in_flight.len() < workers {
                let Some(task) = pending.next() else { break };
                tracing::debug!(implementation = %task.target.id, vector = %task.vector.id, "dispatch");
                in_flight.spawn(run_task(Arc::clone(&self.executor), Arc::clone(&log), task));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            self.settle(joined, &mut summary, reporter)?;
        }

        summary.duration = started.elapsed();
        tracing::info!(
            tasks = summary.tasks,
            recorded = summary.recorded,
            launch_failures = summary.launch_failures,
            panicked = summary.panicked,
            elapsed_ms = summary.duration.as_millis() as u64,
            "run complete"
        );
        reporter.on_run_complete(&summary);
        Ok(summary)
    }

    fn settle(
        &self,
        joined: Result<HarnessResult<TaskOutcome>, JoinError>,
        summary: &mut RunSummary,
        reporter: &mut dyn RunReporter,
    ) -> HarnessResult<()> {
        match joined {
            Ok(Ok(TaskOutcome::Recorded(record))) => {
                summary.recorded += 1;
                *summary.by_verdict.entry(record.verdict).or_default() += 1;
                reporter.on_record(&record);
            }
            Ok(Ok(TaskOutcome::LaunchFailed {
                implementation,
                vector,
                reason,
            })) => {
                summary.launch_failures += 1;
                tracing::debug!(%implementation, %vector, %reason, "launch failed, pair skipped");
                if summary.unlaunchable.insert(implementation.clone()) {
                    tracing::warn!(%implementation, %reason, "implementation could not be launched");
                }
                reporter.on_launch_failure(&implementation, &vector, &reason);
            }
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                summary.panicked += 1;
                tracing::error!(error = %e, "worker task failed");
            }
        }
        Ok(())
    }
}

async fn run_task<E: SandboxExecutor>(
    executor: Arc<E>,
    log: Arc<dyn ResultLog>,
    task: Task,
) -> HarnessResult<TaskOutcome> {
    let outcome = executor.execute(&task.target, &task.vector).await;

    match Verdict::classify(task.vector.expected, &outcome) {
        Some(verdict) => {
            let record = ExecutionRecord::new(task.target.id.as_str(), verdict, task.vector.id.as_str());
            log.append(record.clone())?;
            Ok(TaskOutcome::Recorded(record))
        }
        None => {
            let reason = match outcome {
                RawOutcome::LaunchFailed { reason } => reason,
                other => format!("{:?}", other),
            };
            Ok(TaskOutcome::LaunchFailed {
                implementation: task.target.id.clone(),
                vector: task.vector.id.clone(),
                reason,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use minefield_core::ExpectedTag;

    use super::*;
    use crate::registry::Invocation;
    use crate::results::MemoryResultLog;

    /// Executor that answers from a table instead of launching processes.
    #[derive(Default)]
    struct ScriptedSandbox {
        outcomes: HashMap<(String, String), RawOutcome>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedSandbox {
        fn with(mut self, implementation: &str, vector: &str, outcome: RawOutcome) -> Self {
            self.outcomes
                .insert((implementation.to_string(), vector.to_string()), outcome);
            self
        }
    }

    impl SandboxExecutor for ScriptedSandbox {
        async fn execute(&self, target: &ImplementationTarget, vector: &TestVector) -> RawOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.outcomes
                .get(&(target.id.clone(), vector.id.clone()))
                .cloned()
                .unwrap_or(RawOutcome::Exited { code: 0 })
        }
    }

    #[derive(Default)]
    struct CollectingReporter {
        started: Option<usize>,
        records: Vec<ExecutionRecord>,
        skipped: Vec<(String, String)>,
        completed: bool,
    }

    impl RunReporter for CollectingReporter {
        fn on_run_start(&mut self, task_count: usize) {
            self.started = Some(task_count);
        }

        fn on_record(&mut self, record: &ExecutionRecord) {
            self.records.push(record.clone());
        }

        fn on_launch_failure(&mut self, implementation: &str, vector: &str, _reason: &str) {
            self.skipped.push((implementation.to_string(), vector.to_string()));
        }

        fn on_run_complete(&mut self, _summary: &RunSummary) {
            self.completed = true;
        }
    }

    fn registry(ids: &[&str]) -> Registry {
        let targets = ids
            .iter()
            .map(|id| ImplementationTarget::new(*id, Invocation::new(format!("/opt/{id}"))))
            .collect();
        Registry::new(targets, None).unwrap()
    }

    fn corpus(names: &[&str]) -> Corpus {
        Corpus::from_vectors(
            names
                .iter()
                .map(|n| TestVector::new(format!("/corpus/{n}")).unwrap())
                .collect(),
        )
    }

    fn harness(ids: &[&str], names: &[&str], sandbox: ScriptedSandbox) -> Harness<ScriptedSandbox> {
        Harness::new(HarnessConfig::default().with_workers(2), registry(ids), corpus(names), sandbox)
    }

    #[test]
    fn test_console_prints_record_lines_unless_compact() {
        let record = ExecutionRecord::new("ujson", Verdict::Crash, "i_deep.json");
        assert_eq!(ConsoleReporter::new(false).record_text(&record), "ujson\tCRASH\ti_deep.json");

        let compact = ConsoleReporter::new(false).with_compact(true);
        assert_eq!(compact.record_text(&record), "\x1b[1;31mC\x1b[0m");
    }

    #[test]
    fn test_task_set_is_the_cross_product() {
        let h = harness(&["a", "b"], &["y_1.json", "n_2.json", "i_3.json"], ScriptedSandbox::default());
        assert_eq!(h.tasks().len(), 6);
    }

    #[test]
    fn test_task_set_honours_single_vector_filter() {
        let h = Harness::new(
            HarnessConfig::default().with_restrict_to(Some("n_2.json".to_string())),
            registry(&["a", "b"]),
            corpus(&["y_1.json", "n_2.json"]),
            ScriptedSandbox::default(),
        );
        let tasks = h.tasks();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.vector.id == "n_2.json"));
        assert_eq!(tasks[0].vector.expected, ExpectedTag::MustFail);
    }

    #[tokio::test]
    async fn test_run_classifies_and_logs_every_pair() {
        let sandbox = ScriptedSandbox::default()
            .with("a", "n_2.json", RawOutcome::Exited { code: 0 })
            .with("b", "n_2.json", RawOutcome::Exited { code: 1 })
            .with("b", "i_3.json", RawOutcome::Exited { code: 1 })
            .with("b", "y_1.json", RawOutcome::TimedOut)
            .with("a", "i_3.json", RawOutcome::Exited { code: 139 });
        let h = harness(&["a", "b"], &["y_1.json", "n_2.json", "i_3.json"], sandbox);
        let log = Arc::new(MemoryResultLog::new());
        let mut reporter = CollectingReporter::default();

        let summary = h.run(log.clone(), &mut reporter).await.unwrap();

        assert_eq!(summary.tasks, 6);
        assert_eq!(summary.recorded, 6);
        assert_eq!(summary.count(Verdict::ShouldHaveFailed), 1);
        assert_eq!(summary.count(Verdict::ImplementationFail), 1);
        assert_eq!(summary.count(Verdict::Timeout), 1);
        assert_eq!(summary.count(Verdict::Crash), 1);
        assert_eq!(summary.count(Verdict::ExpectedResult), 2);
        assert_eq!(summary.count(Verdict::ShouldHavePassed), 0);

        let logged = log.snapshot();
        assert_eq!(logged.len(), 6);
        assert!(logged.contains(&ExecutionRecord::new("a", Verdict::ShouldHaveFailed, "n_2.json")));
        assert!(logged.contains(&ExecutionRecord::new("b", Verdict::ExpectedResult, "n_2.json")));
        assert!(logged.contains(&ExecutionRecord::new("b", Verdict::ImplementationFail, "i_3.json")));
        assert!(logged.contains(&ExecutionRecord::new("a", Verdict::Crash, "i_3.json")));

        assert_eq!(reporter.started, Some(6));
        assert_eq!(reporter.records.len(), 6);
        assert!(reporter.completed);
    }

    #[tokio::test]
    async fn test_launch_failure_emits_no_record() {
        let sandbox = ScriptedSandbox::default()
            .with("absent", "y_1.json", RawOutcome::LaunchFailed { reason: "missing".into() })
            .with("absent", "n_2.json", RawOutcome::LaunchFailed { reason: "missing".into() });
        let h = harness(&["absent", "present"], &["y_1.json", "n_2.json"], sandbox);
        let log = Arc::new(MemoryResultLog::new());
        let mut reporter = CollectingReporter::default();

        let summary = h.run(log.clone(), &mut reporter).await.unwrap();

        assert_eq!(summary.recorded, 2);
        assert_eq!(summary.launch_failures, 2);
        assert_eq!(summary.unlaunchable, BTreeSet::from(["absent".to_string()]));
        assert!(log.snapshot().iter().all(|r| r.implementation == "present"));
        assert_eq!(reporter.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let names: Vec<String> = (0..20).map(|i| format!("y_{i}.json")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let h = Harness::new(
            HarnessConfig::default().with_workers(3),
            registry(&["a", "b"]),
            corpus(&names),
            ScriptedSandbox::default(),
        );
        let log = Arc::new(MemoryResultLog::new());

        let summary = h.run(log.clone(), &mut SilentReporter).await.unwrap();

        assert_eq!(summary.recorded, 40);
        assert_eq!(log.len(), 40);
        assert!(h.executor.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_task_set_completes() {
        let h = harness(&[], &["y_1.json"], ScriptedSandbox::default());
        let log = Arc::new(MemoryResultLog::new());
        let summary = h.run(log.clone(), &mut SilentReporter).await.unwrap();
        assert_eq!(summary.tasks, 0);
        assert!(log.is_empty());
    }
}
