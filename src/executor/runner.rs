//! Step execution seam
//!
//! [`StepRunner`] is the boundary between orchestration and the host system:
//! the orchestrator only ever sees a [`StepResult`]. A non-zero exit code is
//! data in the result, never an `Err`; how a failure affects the run is the
//! orchestrator's decision, made per stage.

use super::context::ExecutionContext;
use crate::pipeline::{PipelineError, StepStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Result of executing one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The command that was executed
    pub command: String,

    /// Exit code of the child process
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Wall-clock duration
    pub duration: Duration,
}

impl StepResult {
    /// Returns true if the step exited with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Maps the exit code to a report status
    #[must_use]
    pub fn status(&self) -> StepStatus {
        if self.exit_code == 0 {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed(self.exit_code)
        }
    }
}

/// Trait for executing a single step under an execution context.
///
/// Implementations must report non-zero exits through
/// [`StepResult::exit_code`]; `Err` is reserved for steps that could not be
/// started at all.
#[allow(clippy::missing_errors_doc)]
pub trait StepRunner: Send + Sync {
    /// Executes a command and captures its outcome
    fn run(&self, command: &str, ctx: &ExecutionContext) -> Result<StepResult, PipelineError>;
}

/// Cooperative cancellation handle shared with the host.
///
/// Once cancelled, the orchestrator stops launching new steps; the step
/// currently running is the host's to finish or kill.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been signalled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
