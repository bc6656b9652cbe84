//! Core types for the pipeline domain
//!
//! This module contains the fundamental status types threaded through
//! orchestration: the run-level state machine and per-step outcomes.

#![allow(clippy::must_use_candidate)]

use super::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall state of a pipeline run.
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal. A run that the host
/// cancelled is never reported as `Failed`; the two are distinct outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "stage")]
pub enum RunStatus {
    /// Run has not started yet
    Pending,
    /// Run is currently executing the given stage
    Running(Stage),
    /// Run completed successfully
    Succeeded,
    /// Run failed in the given stage
    Failed(Stage),
    /// Run was cancelled by the host while in the given stage
    Cancelled(Stage),
}

impl RunStatus {
    /// Returns true if the run finished successfully
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the run failed
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if the run was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns true if no further stages may start
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::Cancelled(_))
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running(stage) => write!(f, "RUNNING({stage})"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed(stage) => write!(f, "FAILED({stage})"),
            Self::Cancelled(stage) => write!(f, "CANCELLED({stage})"),
        }
    }
}

/// Outcome of a single step within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "code")]
pub enum StepStatus {
    /// Step exited with code 0
    Succeeded,
    /// Step exited with the given non-zero code
    Failed(i32),
    /// Step never started because the run was cancelled
    Cancelled,
    /// Step never started because an earlier failure aborted the stage
    Skipped,
}

impl StepStatus {
    /// Returns true if the step succeeded
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the step failed
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the exit code, if the step actually ran
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Succeeded => Some(0),
            Self::Failed(code) => Some(*code),
            Self::Cancelled | Self::Skipped => None,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "ok"),
            Self::Failed(code) => write!(f, "failed({code})"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Trait for types that can be validated
#[allow(clippy::missing_errors_doc)]
pub trait Validate {
    /// Type of validation error
    type Error;

    /// Validates this type
    fn validate(&self) -> std::result::Result<(), Self::Error>;
}
