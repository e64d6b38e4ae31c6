//! Harness configuration.
//!
//! Everything that shapes a run is resolved into a [`HarnessConfig`] before the run starts; nothing is read
//! ad hoc afterwards.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::error::{FilterSource, HarnessError, HarnessResult};

/// Default per-run wall-clock deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default vector file extension.
pub const DEFAULT_VECTOR_EXTENSION: &str = "json";

/// Default image name prefix for Docker-sandboxed implementations.
pub const DEFAULT_IMAGE_PREFIX: &str = "jsontestsuite-";

/// Default entrypoint file name for natively sandboxed implementations.
pub const DEFAULT_ENTRYPOINT: &str = "run";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Wall-clock deadline for one (implementation, vector) run
    pub timeout: Duration,
    /// Maximum number of runs in flight
    pub workers: usize,
    /// Run only the vector with this file name
    pub restrict_to: Option<String>,
    /// Extension of vector files, without the dot
    pub vector_extension: String,
}

/// How registry entries are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxKind {
    /// `docker run` an image named `<image_prefix><id>` with the vector mounted read-only.
    Docker { image_prefix: String },
    /// Execute `<parsers>/<id>/<entrypoint> <vector>` directly.
    Native { entrypoint: String },
}

impl Default for SandboxKind {
    fn default() -> Self {
        SandboxKind::Docker {
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            workers: default_workers(),
            restrict_to: None,
            vector_extension: DEFAULT_VECTOR_EXTENSION.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-run deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the worker count (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Restrict the run to a single vector file name
    pub fn with_restrict_to(mut self, vector: Option<String>) -> Self {
        self.restrict_to = vector;
        self
    }

    /// Set the vector file extension (a leading dot is ignored)
    pub fn with_vector_extension(mut self, extension: &str) -> Self {
        self.vector_extension = extension.trim_start_matches('.').to_string();
        self
    }
}

/// Two runs per hardware lane: runs mostly wait on child processes.
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1) * 2
}

/// Read an implementation allow-list: a JSON array of implementation names.
pub fn load_allow_list(path: &Path) -> HarnessResult<BTreeSet<String>> {
    let filter_error = |source: FilterSource| HarnessError::Filter {
        path: path.to_path_buf(),
        source,
    };
    let text = fs::read_to_string(path).map_err(|e| filter_error(e.into()))?;
    let names: Vec<String> = serde_json::from_str(&text).map_err(|e| filter_error(e.into()))?;
    Ok(names.into_iter().collect())
}
