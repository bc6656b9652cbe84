//! The fixed stage sequence and its per-stage failure policy
//!
//! The stage list is host-defined and total: ordering and failure semantics
//! are intrinsic to each stage, not configuration. This is why `Stage` is a
//! closed enum rather than a user-extensible list.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named stage in the fixed pipeline sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Environment preparation before dependency installation
    BeforeInstall,
    /// Dependency installation
    Install,
    /// Preparation immediately before the test commands
    BeforeScript,
    /// The test commands themselves
    Script,
    /// Post steps that run only when `script` succeeded
    AfterSuccess,
    /// Post steps that run only when the run failed
    AfterFailure,
    /// Conditional artifact publication
    Deploy,
}

/// How step failures inside a stage affect the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// First non-zero step aborts the stage and fails the run immediately.
    ///
    /// Setup stages establish preconditions for testing; once one is broken
    /// there is nothing meaningful left to run.
    Abort,

    /// Every step runs; any non-zero step fails the run at stage end.
    ///
    /// The test stage is diagnostic, so partial results are worth more than
    /// early termination.
    RunToCompletion,

    /// Failures are logged and never change the run's final status.
    BestEffort,
}

impl Stage {
    /// The complete stage sequence, in execution order.
    ///
    /// `after_success` and `after_failure` occupy the same slot at runtime;
    /// the orchestrator picks one based on the state after `script`.
    pub const ORDER: [Stage; 7] = [
        Stage::BeforeInstall,
        Stage::Install,
        Stage::BeforeScript,
        Stage::Script,
        Stage::AfterSuccess,
        Stage::AfterFailure,
        Stage::Deploy,
    ];

    /// Stage name as it appears in the pipeline descriptor
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeInstall => "before_install",
            Self::Install => "install",
            Self::BeforeScript => "before_script",
            Self::Script => "script",
            Self::AfterSuccess => "after_success",
            Self::AfterFailure => "after_failure",
            Self::Deploy => "deploy",
        }
    }

    /// Failure policy intrinsic to this stage
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Self::BeforeInstall | Self::Install | Self::BeforeScript => FailurePolicy::Abort,
            Self::Script => FailurePolicy::RunToCompletion,
            Self::AfterSuccess | Self::AfterFailure => FailurePolicy::BestEffort,
            // A deploy failure fails the run but cannot abort anything later
            Self::Deploy => FailurePolicy::Abort,
        }
    }

    /// Returns true for the setup stages that precede `script`
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::BeforeInstall | Self::Install | Self::BeforeScript)
    }

    /// Returns true for the best-effort post stages
    pub fn is_post(&self) -> bool {
        matches!(self, Self::AfterSuccess | Self::AfterFailure)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
