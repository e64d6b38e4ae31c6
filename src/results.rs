//! Result log: the append-only, concurrency-safe sink of execution records.
//!
//! Workers append from many tasks at once; appends are serialized by one lock per log. A record is durable
//! (written and flushed, for the file log) before `append` returns, so a pair is never considered complete
//! before its record is.
//!
//! On disk a log is a *segment*: one record per line in the format defined by
//! [`minefield_core::record`]. Results from several runs (or from one run split by filters) are merged by
//! loading every segment in a directory and concatenating them.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use minefield_core::{ExecutionRecord, parse_log_bytes};

use crate::error::{HarnessError, HarnessResult};

/// File extension of log segments.
pub const SEGMENT_EXTENSION: &str = "txt";

/// Default segment file name inside a results directory.
pub const DEFAULT_SEGMENT_NAME: &str = "logs.txt";

/// Sink of execution records shared by all workers of a run.
pub trait ResultLog: Send + Sync {
    /// Append one record. Safe to call concurrently.
    fn append(&self, record: ExecutionRecord) -> HarnessResult<()>;

    /// Every record appended before this call, in append order.
    fn snapshot(&self) -> Vec<ExecutionRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A poisoned guard only means another appender panicked; the Vec and the file are still line-consistent
// because each append pushes/writes one whole record under the lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory log for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryResultLog {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemoryResultLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultLog for MemoryResultLog {
    fn append(&self, record: ExecutionRecord) -> HarnessResult<()> {
        lock(&self.records).push(record);
        Ok(())
    }

    fn snapshot(&self) -> Vec<ExecutionRecord> {
        lock(&self.records).clone()
    }

    fn len(&self) -> usize {
        lock(&self.records).len()
    }
}

struct FileState {
    writer: BufWriter<File>,
    records: Vec<ExecutionRecord>,
}

/// File-backed log segment with append-only writes.
pub struct FileResultLog {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileResultLog {
    /// Start a fresh segment, truncating any existing file.
    pub fn create(path: impl Into<PathBuf>) -> HarnessResult<Self> {
        let path = path.into();
        Self::open(path, OpenOptions::new().create(true).write(true).truncate(true), false)
    }

    /// Continue an existing segment. Records already in the file are part of the snapshot.
    pub fn append_to(path: impl Into<PathBuf>) -> HarnessResult<Self> {
        let path = path.into();
        Self::open(path, OpenOptions::new().create(true).append(true), true)
    }

    fn open(path: PathBuf, options: &OpenOptions, keep_existing: bool) -> HarnessResult<Self> {
        let log_error = |source| HarnessError::Log {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(log_error)?;
        }
        let existing = if keep_existing && path.exists() {
            fs::read(&path).map_err(log_error)?
        } else {
            Vec::new()
        };
        let records = parse_segment(&path, &existing);
        let file = options.open(&path).map_err(log_error)?;

        let mut writer = BufWriter::new(file);
        // An unterminated last line would swallow the first appended record.
        if existing.last().is_some_and(|b| *b != b'\n') {
            writer.write_all(b"\n").and_then(|()| writer.flush()).map_err(log_error)?;
        }

        Ok(Self {
            state: Mutex::new(FileState { writer, records }),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultLog for FileResultLog {
    fn append(&self, record: ExecutionRecord) -> HarnessResult<()> {
        let mut state = lock(&self.state);
        writeln!(state.writer, "{}", record.to_line())
            .and_then(|()| state.writer.flush())
            .map_err(|source| HarnessError::Log {
                path: self.path.clone(),
                source,
            })?;
        state.records.push(record);
        Ok(())
    }

    fn snapshot(&self) -> Vec<ExecutionRecord> {
        lock(&self.state).records.clone()
    }

    fn len(&self) -> usize {
        lock(&self.state).records.len()
    }
}

/// Read one segment. Malformed or undecodable lines are reported and skipped.
pub fn read_segment(path: &Path) -> HarnessResult<Vec<ExecutionRecord>> {
    let bytes = fs::read(path).map_err(|source| HarnessError::Log {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_segment(path, &bytes))
}

fn parse_segment(path: &Path, bytes: &[u8]) -> Vec<ExecutionRecord> {
    let parsed = parse_log_bytes(bytes);
    for (line, reason) in &parsed.rejected {
        tracing::warn!(segment = %path.display(), line, %reason, "skipping malformed record");
    }
    parsed.records
}

/// Union of every segment in `dir`, in file-name order.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_segments(dir: &Path) -> HarnessResult<Vec<ExecutionRecord>> {
    let log_error = |source| HarnessError::Log {
        path: dir.to_path_buf(),
        source,
    };

    let mut segments = Vec::new();
    for entry in fs::read_dir(dir).map_err(log_error)? {
        let path = entry.map_err(log_error)?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SEGMENT_EXTENSION) {
            segments.push(path);
        }
    }
    segments.sort();

    let mut records = Vec::new();
    for segment in &segments {
        records.extend(read_segment(segment)?);
    }
    tracing::debug!(segments = segments.len(), records = records.len(), "segments loaded");
    Ok(records)
}
