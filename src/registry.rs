//! Implementation registry: the subjects under test and how to launch each one.
//!
//! The registry is built once, after the allow-list has been resolved, and is read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SandboxKind;
use crate::corpus::TestVector;
use crate::error::{HarnessError, HarnessResult};

/// Placeholder replaced by the vector's path in [`VectorInput::Argument`] mode.
pub const VECTOR_PLACEHOLDER: &str = "{vector}";

/// Mount point of the vector inside Docker sandboxes.
pub const CONTAINER_PAYLOAD_PATH: &str = "/tmp/test-payload.json";

/// Docker's own failure statuses: daemon error, command not invokable, command not found.
pub const DOCKER_LAUNCH_FAILURE_CODES: &[i32] = &[125, 126, 127];

/// How the vector reaches the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorInput {
    /// Vector bytes are written to stdin, which is then closed.
    Stdin,
    /// `{vector}` in the arguments is replaced with the vector's absolute path.
    Argument,
}

/// Command line that runs one implementation in its sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub input: VectorInput,
    /// Exit statuses meaning the sandbox never started the subject.
    pub launch_failure_codes: Vec<i32>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: VectorInput::Argument,
            launch_failure_codes: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, input: VectorInput) -> Self {
        self.input = input;
        self
    }

    pub fn launch_failure_codes(mut self, codes: &[i32]) -> Self {
        self.launch_failure_codes = codes.to_vec();
        self
    }

    /// `docker run` an image with the vector mounted at [`CONTAINER_PAYLOAD_PATH`].
    ///
    /// Host networking skips network namespace setup, which dominates container start time.
    pub fn docker(image: &str) -> Self {
        Self::new("docker")
            .args(["run", "--rm", "--net", "host", "--mount"])
            .arg(format!("type=bind,src={VECTOR_PLACEHOLDER},dst={CONTAINER_PAYLOAD_PATH},readonly"))
            .arg(image)
            .launch_failure_codes(DOCKER_LAUNCH_FAILURE_CODES)
    }

    /// Execute `entrypoint <vector>` directly.
    pub fn native(entrypoint: impl Into<PathBuf>) -> Self {
        Self::new(entrypoint).arg(VECTOR_PLACEHOLDER)
    }

    /// Arguments for one run, with the placeholder substituted in `Argument` mode.
    pub fn command_line(&self, vector: &TestVector) -> Vec<String> {
        match self.input {
            VectorInput::Stdin => self.args.clone(),
            VectorInput::Argument => {
                let path = absolute(&vector.path);
                let path = path.to_string_lossy();
                self.args.iter().map(|a| a.replace(VECTOR_PLACEHOLDER, &path)).collect()
            }
        }
    }

    pub fn is_launch_failure(&self, code: i32) -> bool {
        self.launch_failure_codes.contains(&code)
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// One subject under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationTarget {
    pub id: String,
    pub invocation: Invocation,
}

impl ImplementationTarget {
    pub fn new(id: impl Into<String>, invocation: Invocation) -> Self {
        Self {
            id: id.into(),
            invocation,
        }
    }
}

/// The implementations to exercise, keyed by unique id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    targets: BTreeMap<String, Arc<ImplementationTarget>>,
}

impl Registry {
    /// Build a registry, keeping only ids present in `allow_list` when one is given.
    pub fn new(targets: Vec<ImplementationTarget>, allow_list: Option<&BTreeSet<String>>) -> HarnessResult<Self> {
        let mut map = BTreeMap::new();
        for target in targets {
            if target.id.is_empty() || target.id.contains(['\t', '\n', '\r']) {
                return Err(HarnessError::InvalidName(target.id));
            }
            if map.contains_key(&target.id) {
                return Err(HarnessError::DuplicateImplementation(target.id));
            }
            if allow_list.is_some_and(|allowed| !allowed.contains(&target.id)) {
                tracing::debug!(implementation = %target.id, "not in allow-list");
                continue;
            }
            map.insert(target.id.clone(), Arc::new(target));
        }

        if let Some(allowed) = allow_list {
            for missing in allowed.iter().filter(|id| !map.contains_key(*id)) {
                tracing::warn!(implementation = %missing, "allow-listed implementation is not registered");
            }
        }

        Ok(Self { targets: map })
    }

    /// One target per non-hidden subdirectory of `parsers_dir`.
    #[tracing::instrument(skip_all, fields(dir = %parsers_dir.display()))]
    pub fn discover(
        parsers_dir: &Path,
        sandbox: &SandboxKind,
        allow_list: Option<&BTreeSet<String>>,
    ) -> HarnessResult<Self> {
        let registry_error = |source| HarnessError::Registry {
            path: parsers_dir.to_path_buf(),
            source,
        };

        let mut targets = Vec::new();
        for entry in fs::read_dir(parsers_dir).map_err(registry_error)? {
            let path = entry.map_err(registry_error)?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(id) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }

            let invocation = match sandbox {
                SandboxKind::Docker { image_prefix } => Invocation::docker(&format!("{image_prefix}{id}")),
                SandboxKind::Native { entrypoint } => Invocation::native(path.join(entrypoint)),
            };
            targets.push(ImplementationTarget::new(id, invocation));
        }

        Self::new(targets, allow_list)
    }

    /// Ids in lexicographic order.
    pub fn ids(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    pub fn targets(&self) -> impl Iterator<Item = &Arc<ImplementationTarget>> {
        self.targets.values()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ImplementationTarget>> {
        self.targets.get(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
