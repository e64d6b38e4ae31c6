//! Sandboxed executor: run one implementation against one vector under a wall-clock deadline.
//!
//! ## Teardown
//!
//! Every child is spawned with `kill_on_drop`, so whichever way [`ProcessSandbox::execute`] returns (normal
//! exit, timeout, or the task being aborted) the process and its stdin pipe do not outlive the call. On timeout
//! the child is additionally killed and reaped explicitly before returning.

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use minefield_core::RawOutcome;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::DEFAULT_TIMEOUT;
use crate::corpus::TestVector;
use crate::registry::{ImplementationTarget, Invocation, VectorInput};

/// Runs one (implementation, vector) pair in isolation.
///
/// Implementations must not fail: anything that prevents a run is reported as [`RawOutcome::LaunchFailed`].
pub trait SandboxExecutor: Send + Sync + 'static {
    fn execute(&self, target: &ImplementationTarget, vector: &TestVector) -> impl Future<Output = RawOutcome> + Send;
}

/// Child-process sandbox.
#[derive(Debug, Clone, Copy)]
pub struct ProcessSandbox {
    timeout: Duration,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessSandbox {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl SandboxExecutor for ProcessSandbox {
    async fn execute(&self, target: &ImplementationTarget, vector: &TestVector) -> RawOutcome {
        let invocation = &target.invocation;

        let input = match invocation.input {
            VectorInput::Stdin => match vector.read_bytes() {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    return RawOutcome::LaunchFailed {
                        reason: format!("cannot read {}: {}", vector.path.display(), e),
                    };
                }
            },
            VectorInput::Argument => None,
        };

        let mut command = Command::new(&invocation.program);
        command
            .args(invocation.command_line(vector))
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RawOutcome::LaunchFailed {
                    reason: format!("cannot launch {}: {}", invocation.program.display(), e),
                };
            }
        };

        let feeder = match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => Some(tokio::spawn(async move {
                // The subject may exit without draining its input; a broken pipe is its business.
                let _ = stdin.write_all(&bytes).await;
                let _ = stdin.shutdown().await;
            })),
            _ => None,
        };

        let outcome = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => exit_outcome(invocation, status),
            Ok(Err(e)) => {
                let _ = child.kill().await;
                RawOutcome::LaunchFailed {
                    reason: format!("lost track of {}: {}", invocation.program.display(), e),
                }
            }
            Err(_) => {
                tracing::debug!(
                    implementation = %target.id,
                    vector = %vector.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "deadline elapsed, terminating"
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!(implementation = %target.id, vector = %vector.id, error = %e, "kill after timeout failed");
                }
                RawOutcome::TimedOut
            }
        };

        if let Some(feeder) = feeder {
            feeder.abort();
        }
        outcome
    }
}

fn exit_outcome(invocation: &Invocation, status: ExitStatus) -> RawOutcome {
    let code = status.code().unwrap_or_else(|| signal_exit_code(status));
    if invocation.is_launch_failure(code) {
        RawOutcome::LaunchFailed {
            reason: format!("sandbox could not start {} (status {})", invocation.program.display(), code),
        }
    } else {
        RawOutcome::Exited { code }
    }
}

/// Shell convention: a death by signal `n` reads as `128 + n`.
#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| 128 + signal).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i32 {
    -1
}
