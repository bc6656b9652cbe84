//! The final run report
//!
//! The report lists every stage, its steps, and each step's exit code and
//! captured output, regardless of where the run stopped. It renders as plain
//! text for terminals and serializes to JSON for machine consumers.

#![allow(clippy::must_use_candidate)]

use super::stage::Stage;
use super::types::{RunStatus, StepStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of one step, as recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// The command as declared in the descriptor
    pub command: String,

    /// Step outcome
    pub status: StepStatus,

    /// Captured standard output
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    /// Captured standard error
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    /// Wall-clock duration
    #[serde(default)]
    pub duration: Duration,
}

impl StepReport {
    /// Records a step that never ran
    pub fn unstarted(command: impl Into<String>, status: StepStatus) -> Self {
        Self {
            command: command.into(),
            status,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }
}

/// Why a stage did not execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An earlier stage failed
    EarlierFailure,
    /// The run was cancelled
    Cancelled,
    /// The stage's post-condition did not hold (wrong final state)
    WrongFinalState,
    /// The deploy condition evaluated to false
    ConditionNotMet,
    /// Deploy was due but no publisher is wired in
    PublisherUnavailable,
    /// The descriptor declared no commands for this stage
    NothingDeclared,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EarlierFailure => write!(f, "earlier stage failed"),
            Self::Cancelled => write!(f, "run cancelled"),
            Self::WrongFinalState => write!(f, "final state did not match"),
            Self::ConditionNotMet => write!(f, "deploy condition not met"),
            Self::PublisherUnavailable => write!(f, "no publisher available"),
            Self::NothingDeclared => write!(f, "no commands declared"),
        }
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage
    pub stage: Stage,

    /// Step outcomes, in declared order
    pub steps: Vec<StepReport>,

    /// Present when the stage was skipped, with the stated reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl StageReport {
    /// Records a skipped stage
    pub fn skipped(stage: Stage, reason: SkipReason) -> Self {
        Self { stage, steps: Vec::new(), skipped: Some(reason) }
    }

    /// Records an executed stage
    pub fn executed(stage: Stage, steps: Vec<StepReport>) -> Self {
        Self { stage, steps, skipped: None }
    }

    /// Returns true if any step in this stage failed
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status.is_failed())
    }
}

/// The complete report for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: String,

    /// Final run state
    pub status: RunStatus,

    /// Per-stage outcomes, always one entry per stage in execution order
    pub stages: Vec<StageReport>,

    /// Remote location of the published artifact, when deploy ran and
    /// succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_to: Option<String>,
}

impl RunReport {
    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns the report for a single stage, if present
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Returns the error that terminated the run, if it did not succeed
    pub fn terminal_error(&self) -> Option<super::errors::PipelineError> {
        use super::errors::PipelineError;

        match self.status {
            RunStatus::Failed(stage) if stage.is_setup() => {
                let step = self
                    .stage(stage)?
                    .steps
                    .iter()
                    .find(|s| s.status.is_failed())?;
                Some(PipelineError::Setup {
                    stage,
                    command: step.command.clone(),
                    code: step.status.exit_code().unwrap_or(-1),
                })
            }
            RunStatus::Failed(Stage::Script) => {
                let failed = self
                    .stage(Stage::Script)
                    .map(|s| s.steps.iter().filter(|x| x.status.is_failed()).count())
                    .unwrap_or(0);
                Some(PipelineError::Script { failed })
            }
            RunStatus::Failed(Stage::Deploy) => {
                let message = self
                    .stage(Stage::Deploy)
                    .and_then(|s| s.steps.iter().find(|x| x.status.is_failed()))
                    .map(|s| s.stderr.clone())
                    .unwrap_or_default();
                Some(PipelineError::Publish(message))
            }
            RunStatus::Cancelled(stage) => Some(PipelineError::Cancelled { stage }),
            _ => None,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {} - {}", self.run_id, self.status)?;
        for stage in &self.stages {
            match &stage.skipped {
                Some(reason) => writeln!(f, "  {}: skipped ({reason})", stage.stage)?,
                None => {
                    writeln!(f, "  {}:", stage.stage)?;
                    for step in &stage.steps {
                        writeln!(
                            f,
                            "    [{}] {} ({:?})",
                            step.status, step.command, step.duration
                        )?;
                    }
                }
            }
        }
        if let Some(location) = &self.published_to {
            writeln!(f, "  published to {location}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        RunReport {
            run_id: "test-run".to_string(),
            status: RunStatus::Failed(Stage::Script),
            stages: vec![
                StageReport::executed(
                    Stage::BeforeInstall,
                    vec![StepReport {
                        command: "echo prep".to_string(),
                        status: StepStatus::Succeeded,
                        stdout: "prep\n".to_string(),
                        stderr: String::new(),
                        duration: Duration::from_millis(3),
                    }],
                ),
                StageReport::executed(
                    Stage::Script,
                    vec![
                        StepReport::unstarted("pytest", StepStatus::Failed(1)),
                        StepReport::unstarted("make docs", StepStatus::Succeeded),
                    ],
                ),
                StageReport::skipped(Stage::Deploy, SkipReason::EarlierFailure),
            ],
            published_to: None,
        }
    }

    #[test]
    fn test_report_lists_every_stage() {
        let report = sample_report();
        assert!(report.stage(Stage::BeforeInstall).is_some());
        assert!(report.stage(Stage::Script).is_some());
        assert!(report.stage(Stage::Deploy).is_some());
    }

    #[test]
    fn test_stage_has_failures() {
        let report = sample_report();
        assert!(report.stage(Stage::Script).unwrap().has_failures());
        assert!(!report.stage(Stage::BeforeInstall).unwrap().has_failures());
    }

    #[test]
    fn test_display_includes_skip_reason() {
        let rendered = sample_report().to_string();
        assert!(rendered.contains("deploy: skipped (earlier stage failed)"));
        assert!(rendered.contains("[failed(1)] pytest"));
    }

    #[test]
    fn test_terminal_error_for_script_failure() {
        let err = sample_report().terminal_error().unwrap();
        assert_eq!(err.to_string(), "1 script step(s) failed");
    }

    #[test]
    fn test_terminal_error_for_publish_failure() {
        let mut report = sample_report();
        report.status = RunStatus::Failed(Stage::Deploy);
        let mut step = StepReport::unstarted("publish pkg 1.0.0 via pypi", StepStatus::Failed(1));
        step.stderr = "Version 1.0.0 of 'pkg' is already published".to_string();
        report.stages.retain(|s| s.stage != Stage::Deploy);
        report.stages.push(StageReport::executed(Stage::Deploy, vec![step]));

        let err = report.terminal_error().unwrap();
        assert_eq!(
            err.to_string(),
            "Publish failed: Version 1.0.0 of 'pkg' is already published"
        );
    }

    #[test]
    fn test_terminal_error_absent_on_success() {
        let mut report = sample_report();
        report.status = RunStatus::Succeeded;
        assert!(report.terminal_error().is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
