//! Stage orchestration
//!
//! The orchestrator drives a run through the fixed stage sequence
//! `before_install → install → before_script → script →
//! after_success|after_failure → deploy`, applying each stage's intrinsic
//! failure policy: fail-fast for setup stages, run-to-completion for
//! `script`, best-effort for the post stages, and condition-gated for
//! `deploy`. It always produces a complete [`RunReport`], whatever point the
//! run stopped at.

use super::context::ExecutionContext;
use super::runner::{CancellationToken, StepRunner};
use crate::infrastructure::{Artifact, CacheStore, Credential, Publisher};
use crate::pipeline::{
    FailurePolicy, PipelineSpec, RunMetadata, RunReport, RunStatus, SkipReason, Stage,
    StageReport, StepReport, StepStatus,
};
use std::time::Duration;

/// How a stage's step loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    /// All steps accounted for; stage does not fail the run
    Completed,
    /// Stage fails the run per its policy
    Failed,
    /// Cancellation arrived while the stage was executing
    Cancelled,
}

/// Drives pipeline runs through the fixed stage sequence.
pub struct Orchestrator<R: StepRunner> {
    runner: R,
    cache: Option<CacheStore>,
    publisher: Option<Box<dyn Publisher>>,
    credential: Option<Credential>,
    artifact: Option<Artifact>,
    cancel: CancellationToken,
}

impl<R: StepRunner> Orchestrator<R> {
    /// Creates an orchestrator over the given step runner
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            cache: None,
            publisher: None,
            credential: None,
            artifact: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Enables the cache store
    #[must_use]
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Wires in a publisher and the decrypted deploy credential
    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>, credential: Credential) -> Self {
        self.publisher = Some(publisher);
        self.credential = Some(credential);
        self
    }

    /// Overrides the artifact to publish.
    ///
    /// Without an override the artifact is derived from run metadata: the
    /// repository name, the tag (or branch) as version, and `dist/` under
    /// the working directory as path.
    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Returns the cancellation handle for the host to signal on
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Executes the full stage sequence and returns the run report.
    pub fn run(
        &self,
        spec: &PipelineSpec,
        meta: &RunMetadata,
        mut ctx: ExecutionContext,
    ) -> RunReport {
        let run_id = ctx.run_id.clone();
        let mut stages: Vec<StageReport> = Vec::with_capacity(Stage::ORDER.len());
        let mut status = RunStatus::Pending;

        tracing::info!(run_id = %run_id, repo = %meta.repo, branch = %meta.branch, "Run started");

        self.restore_cache(spec, &ctx);

        // Setup stages: fail-fast, any failure invalidates the rest.
        for stage in [Stage::BeforeInstall, Stage::Install, Stage::BeforeScript] {
            if status.is_terminal() {
                stages.push(StageReport::skipped(stage, skip_reason_for(status)));
                continue;
            }
            status = RunStatus::Running(stage);
            let (steps, outcome) = self.run_stage(stage, spec, &mut ctx);
            stages.push(StageReport::executed(stage, steps));
            match outcome {
                StageOutcome::Cancelled => status = RunStatus::Cancelled(stage),
                StageOutcome::Failed => status = RunStatus::Failed(stage),
                StageOutcome::Completed => {}
            }
        }

        // Script: run to completion, failures surface at stage end.
        let script_reached = !status.is_terminal();
        if script_reached {
            status = RunStatus::Running(Stage::Script);
            let (steps, outcome) = self.run_stage(Stage::Script, spec, &mut ctx);
            stages.push(StageReport::executed(Stage::Script, steps));
            status = match outcome {
                StageOutcome::Cancelled => RunStatus::Cancelled(Stage::Script),
                StageOutcome::Failed => RunStatus::Failed(Stage::Script),
                StageOutcome::Completed => RunStatus::Succeeded,
            };
        } else {
            stages.push(StageReport::skipped(Stage::Script, skip_reason_for(status)));
        }

        // Dependencies installed during this run are worth keeping even when
        // script failed; a cancelled run may have half-written trees.
        if script_reached && !status.is_cancelled() {
            self.save_cache(spec, &ctx);
        }

        // Post stages: best-effort, never change the final status.
        for (stage, wants_success) in [(Stage::AfterSuccess, true), (Stage::AfterFailure, false)] {
            if status.is_cancelled() {
                stages.push(StageReport::skipped(stage, SkipReason::Cancelled));
            } else if status.is_succeeded() != wants_success {
                stages.push(StageReport::skipped(stage, SkipReason::WrongFinalState));
            } else if spec.commands(stage).is_empty() {
                stages.push(StageReport::skipped(stage, SkipReason::NothingDeclared));
            } else {
                let (steps, _) = self.run_stage(stage, spec, &mut ctx);
                stages.push(StageReport::executed(stage, steps));
            }
        }

        // Deploy: only from a succeeded run whose condition holds.
        let (deploy_report, published_to, final_status) =
            self.run_deploy(spec, meta, &ctx, status);
        stages.push(deploy_report);
        status = final_status;

        tracing::info!(run_id = %run_id, status = %status, "Run finished");

        RunReport { run_id, status, stages, published_to }
    }

    /// Runs one stage's declared steps under the stage's failure policy.
    fn run_stage(
        &self,
        stage: Stage,
        spec: &PipelineSpec,
        ctx: &mut ExecutionContext,
    ) -> (Vec<StepReport>, StageOutcome) {
        let policy = stage.failure_policy();
        let commands = spec.commands(stage);
        tracing::info!(stage = %stage, steps = commands.len(), "Executing stage");

        let mut steps = Vec::with_capacity(commands.len());
        let mut failed = false;
        let mut cancelled = false;

        for command in commands {
            if cancelled || self.cancel.is_cancelled() {
                cancelled = true;
                steps.push(StepReport::unstarted(command, StepStatus::Cancelled));
                continue;
            }
            if failed && policy == FailurePolicy::Abort {
                steps.push(StepReport::unstarted(command, StepStatus::Skipped));
                continue;
            }

            if ctx.apply_export(command) {
                steps.push(StepReport {
                    command: command.clone(),
                    status: StepStatus::Succeeded,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::ZERO,
                });
                continue;
            }

            match self.runner.run(command, ctx) {
                Ok(result) => {
                    if !result.is_success() {
                        failed = true;
                        tracing::warn!(
                            stage = %stage,
                            command = %command,
                            code = result.exit_code,
                            "Step failed"
                        );
                    }
                    steps.push(StepReport {
                        command: command.clone(),
                        status: result.status(),
                        stdout: result.stdout,
                        stderr: result.stderr,
                        duration: result.duration,
                    });
                }
                Err(e) => {
                    failed = true;
                    tracing::error!(stage = %stage, command = %command, error = %e, "Step could not start");
                    steps.push(StepReport {
                        command: command.clone(),
                        status: StepStatus::Failed(-1),
                        stdout: String::new(),
                        stderr: e.to_string(),
                        duration: Duration::ZERO,
                    });
                }
            }
        }

        let outcome = if cancelled {
            StageOutcome::Cancelled
        } else if failed && policy != FailurePolicy::BestEffort {
            StageOutcome::Failed
        } else {
            if failed {
                tracing::warn!(stage = %stage, "Best-effort stage had failures; final status unchanged");
            }
            StageOutcome::Completed
        };
        (steps, outcome)
    }

    /// Gates and runs the deploy stage, returning its report, the remote
    /// location on success, and the final run status.
    fn run_deploy(
        &self,
        spec: &PipelineSpec,
        meta: &RunMetadata,
        ctx: &ExecutionContext,
        status: RunStatus,
    ) -> (StageReport, Option<String>, RunStatus) {
        if status.is_cancelled() || self.cancel.is_cancelled() {
            let reason = if status.is_cancelled() {
                skip_reason_for(status)
            } else {
                SkipReason::Cancelled
            };
            return (StageReport::skipped(Stage::Deploy, reason), None, status);
        }
        if !status.is_succeeded() {
            return (
                StageReport::skipped(Stage::Deploy, SkipReason::EarlierFailure),
                None,
                status,
            );
        }

        let Some(deploy) = &spec.deploy else {
            return (
                StageReport::skipped(Stage::Deploy, SkipReason::NothingDeclared),
                None,
                status,
            );
        };

        let condition = deploy.on.clone().unwrap_or_default();
        if !condition.evaluate(meta) {
            tracing::info!(condition = %condition, "Deploy condition not met");
            return (
                StageReport::skipped(Stage::Deploy, SkipReason::ConditionNotMet),
                None,
                status,
            );
        }

        let (Some(publisher), Some(credential)) = (&self.publisher, &self.credential) else {
            tracing::warn!("Deploy due but no publisher configured");
            return (
                StageReport::skipped(Stage::Deploy, SkipReason::PublisherUnavailable),
                None,
                status,
            );
        };

        let artifact = self
            .artifact
            .clone()
            .unwrap_or_else(|| derive_artifact(meta, ctx));
        let step_name = format!("publish {} {} via {}", artifact.name, artifact.version, deploy.provider);

        match publisher.publish(&artifact, credential) {
            Ok(receipt) => {
                let step = StepReport::unstarted(&step_name, StepStatus::Succeeded);
                (
                    StageReport::executed(Stage::Deploy, vec![step]),
                    Some(receipt.remote_location),
                    RunStatus::Succeeded,
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "Publish failed");
                let mut step = StepReport::unstarted(&step_name, StepStatus::Failed(1));
                step.stderr = e.to_string();
                (
                    StageReport::executed(Stage::Deploy, vec![step]),
                    None,
                    RunStatus::Failed(Stage::Deploy),
                )
            }
        }
    }

    fn restore_cache(&self, spec: &PipelineSpec, ctx: &ExecutionContext) {
        let Some(cache) = &self.cache else { return };
        let keys = spec.cache_keys(&ctx.env);
        if keys.is_empty() {
            return;
        }
        // Cache trouble never stops a run; worst case is a cold build.
        if let Err(e) = cache.restore(&keys) {
            tracing::warn!(error = %e, "Cache restore failed, continuing without cache");
        }
    }

    fn save_cache(&self, spec: &PipelineSpec, ctx: &ExecutionContext) {
        let Some(cache) = &self.cache else { return };
        let keys = spec.cache_keys(&ctx.env);
        if keys.is_empty() {
            return;
        }
        if let Err(e) = cache.save(&keys) {
            tracing::warn!(error = %e, "Cache save failed, next run starts cold");
        }
    }
}

/// Maps a terminal status to the reason later stages are skipped.
fn skip_reason_for(status: RunStatus) -> SkipReason {
    if status.is_cancelled() {
        SkipReason::Cancelled
    } else {
        SkipReason::EarlierFailure
    }
}

/// Default artifact when none was configured: repository name, tag (or
/// branch) as version, `dist/` under the working directory.
fn derive_artifact(meta: &RunMetadata, ctx: &ExecutionContext) -> Artifact {
    let name = meta
        .repo
        .rsplit_once('/')
        .map_or(meta.repo.as_str(), |(_, name)| name)
        .to_string();
    let version = meta
        .tag
        .clone()
        .unwrap_or_else(|| format!("0.0.0-{}", meta.branch));
    Artifact { name, version, path: ctx.cwd.join("dist") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{DirRegistry, PublishError, PublishReceipt};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Scripted runner: maps commands to exit codes and records invocations.
    struct FakeRunner {
        exit_codes: HashMap<String, i32>,
        invoked: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(failures: &[(&str, i32)]) -> Self {
            Self {
                exit_codes: failures
                    .iter()
                    .map(|(c, code)| ((*c).to_string(), *code))
                    .collect(),
                invoked: Mutex::new(Vec::new()),
            }
        }

        fn invocations(&self) -> Vec<String> {
            self.invoked.lock().clone()
        }
    }

    impl StepRunner for FakeRunner {
        fn run(
            &self,
            command: &str,
            _ctx: &ExecutionContext,
        ) -> Result<super::super::runner::StepResult, crate::pipeline::PipelineError> {
            self.invoked.lock().push(command.to_string());
            Ok(super::super::runner::StepResult {
                command: command.to_string(),
                exit_code: self.exit_codes.get(command).copied().unwrap_or(0),
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::ZERO,
            })
        }
    }

    fn spec(yaml: &str) -> PipelineSpec {
        PipelineSpec::from_yaml(yaml).unwrap()
    }

    fn full_spec() -> PipelineSpec {
        spec(r#"
before_install: ["prep"]
install: ["deps"]
before_script: ["lint"]
script: ["test-a", "test-b"]
after_success: ["notify-ok"]
after_failure: ["notify-bad"]
"#)
    }

    fn meta() -> RunMetadata {
        RunMetadata::push("ga4gh/ga4gh-server", "main")
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("/tmp")
    }

    #[test]
    fn test_stage_order_on_success() {
        let runner = FakeRunner::new(&[]);
        let orchestrator = Orchestrator::new(runner);
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert!(report.status.is_succeeded());
        let order: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(order, Stage::ORDER.to_vec());
        assert_eq!(
            orchestrator.runner.invocations(),
            vec!["prep", "deps", "lint", "test-a", "test-b", "notify-ok"]
        );
    }

    #[test]
    fn test_before_install_failure_runs_nothing_later() {
        let runner = FakeRunner::new(&[("prep", 1)]);
        let orchestrator = Orchestrator::new(runner);
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert_eq!(report.status, RunStatus::Failed(Stage::BeforeInstall));
        assert_eq!(orchestrator.runner.invocations(), vec!["prep", "notify-bad"]);

        assert_eq!(
            report.stage(Stage::Install).unwrap().skipped,
            Some(SkipReason::EarlierFailure)
        );
        assert_eq!(
            report.stage(Stage::Script).unwrap().skipped,
            Some(SkipReason::EarlierFailure)
        );
    }

    #[test]
    fn test_setup_failure_skips_remaining_steps_in_stage() {
        let runner = FakeRunner::new(&[("deps-a", 1)]);
        let orchestrator = Orchestrator::new(runner);
        let two_installs = spec("install: [\"deps-a\", \"deps-b\"]\nscript: [\"t\"]\n");
        let report = orchestrator.run(&two_installs, &meta(), ctx());

        let install = report.stage(Stage::Install).unwrap();
        assert_eq!(install.steps[0].status, StepStatus::Failed(1));
        assert_eq!(install.steps[1].status, StepStatus::Skipped);
        assert!(!orchestrator.runner.invocations().contains(&"deps-b".to_string()));
    }

    #[test]
    fn test_script_runs_to_completion_despite_failure() {
        let runner = FakeRunner::new(&[("test-b", 2)]);
        let orchestrator = Orchestrator::new(runner);
        let three = spec("script: [\"test-a\", \"test-b\", \"test-c\"]\n");
        let report = orchestrator.run(&three, &meta(), ctx());

        assert_eq!(report.status, RunStatus::Failed(Stage::Script));
        // B failed, C still executed exactly once
        assert_eq!(orchestrator.runner.invocations(), vec!["test-a", "test-b", "test-c"]);

        let script = report.stage(Stage::Script).unwrap();
        assert_eq!(script.steps[1].status, StepStatus::Failed(2));
        assert_eq!(script.steps[2].status, StepStatus::Succeeded);
    }

    #[test]
    fn test_after_failure_runs_only_on_failure() {
        let runner = FakeRunner::new(&[("test-a", 1)]);
        let orchestrator = Orchestrator::new(runner);
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert!(orchestrator.runner.invocations().contains(&"notify-bad".to_string()));
        assert!(!orchestrator.runner.invocations().contains(&"notify-ok".to_string()));
        assert_eq!(
            report.stage(Stage::AfterSuccess).unwrap().skipped,
            Some(SkipReason::WrongFinalState)
        );
    }

    #[test]
    fn test_post_stage_failure_does_not_change_status() {
        let runner = FakeRunner::new(&[("notify-ok", 1)]);
        let orchestrator = Orchestrator::new(runner);
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert!(report.status.is_succeeded());
        let post = report.stage(Stage::AfterSuccess).unwrap();
        assert_eq!(post.steps[0].status, StepStatus::Failed(1));
    }

    #[test]
    fn test_cancellation_marks_steps_cancelled_not_failed() {
        let runner = FakeRunner::new(&[]);
        let orchestrator = Orchestrator::new(runner);
        orchestrator.cancellation_token().cancel();
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert!(report.status.is_cancelled());
        let first = report.stage(Stage::BeforeInstall).unwrap();
        assert_eq!(first.steps[0].status, StepStatus::Cancelled);
        assert!(report
            .stages
            .iter()
            .flat_map(|s| &s.steps)
            .all(|s| !s.status.is_failed()));
    }

    #[test]
    fn test_export_steps_mutate_context_for_later_steps() {
        struct EnvProbe {
            seen: Mutex<Option<String>>,
        }
        impl StepRunner for EnvProbe {
            fn run(
                &self,
                command: &str,
                ctx: &ExecutionContext,
            ) -> Result<super::super::runner::StepResult, crate::pipeline::PipelineError>
            {
                if command == "probe" {
                    *self.seen.lock() = ctx.get_env("STAGING").cloned();
                }
                Ok(super::super::runner::StepResult {
                    command: command.to_string(),
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::ZERO,
                })
            }
        }

        let orchestrator = Orchestrator::new(EnvProbe { seen: Mutex::new(None) });
        let exported = spec("before_install: [\"export STAGING=yes\"]\nscript: [\"probe\"]\n");
        let report = orchestrator.run(&exported, &meta(), ctx());

        assert!(report.status.is_succeeded());
        assert_eq!(*orchestrator.runner.seen.lock(), Some("yes".to_string()));
    }

    #[test]
    fn test_compound_export_command_reaches_runner() {
        let runner = FakeRunner::new(&[]);
        let orchestrator = Orchestrator::new(runner);
        let compound = spec(
            "before_install: [\"export A=1 && touch marker\"]\nscript: [\"test-a\"]\n",
        );
        let report = orchestrator.run(&compound, &meta(), ctx());

        assert!(report.status.is_succeeded());
        // The whole command line must execute; it is not a pure env mutation
        assert_eq!(
            orchestrator.runner.invocations(),
            vec!["export A=1 && touch marker", "test-a"]
        );
    }

    #[test]
    fn test_deploy_skipped_without_deploy_block() {
        let runner = FakeRunner::new(&[]);
        let orchestrator = Orchestrator::new(runner);
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert_eq!(
            report.stage(Stage::Deploy).unwrap().skipped,
            Some(SkipReason::NothingDeclared)
        );
    }

    fn deploy_spec() -> PipelineSpec {
        spec(r#"
script: ["test-a"]
deploy:
  provider: pypi
  on:
    repo: ga4gh/ga4gh-server
    tags: true
"#)
    }

    #[test]
    fn test_deploy_skipped_when_condition_not_met() {
        let runner = FakeRunner::new(&[]);
        let orchestrator = Orchestrator::new(runner);
        // push without tag: condition requires tags
        let report = orchestrator.run(&deploy_spec(), &meta(), ctx());

        assert!(report.status.is_succeeded());
        assert_eq!(
            report.stage(Stage::Deploy).unwrap().skipped,
            Some(SkipReason::ConditionNotMet)
        );
    }

    #[test]
    fn test_deploy_publishes_on_tagged_build() {
        let registry_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let dist = work.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("pkg.tar.gz"), b"bytes").unwrap();

        let registry = DirRegistry::open(registry_dir.path()).unwrap();
        let orchestrator = Orchestrator::new(FakeRunner::new(&[]))
            .with_publisher(Box::new(registry), Credential::new("token"));

        let tagged = meta().with_tag("v1.0");
        let report = orchestrator.run(
            &deploy_spec(),
            &tagged,
            ExecutionContext::new(work.path()),
        );

        assert!(report.status.is_succeeded());
        assert!(report.published_to.is_some());
        let deploy = report.stage(Stage::Deploy).unwrap();
        assert!(deploy.skipped.is_none());
        assert_eq!(deploy.steps[0].status, StepStatus::Succeeded);
    }

    #[test]
    fn test_publish_failure_fails_deploy_but_keeps_script_results() {
        struct AlwaysDuplicate;
        impl Publisher for AlwaysDuplicate {
            fn publish(
                &self,
                artifact: &Artifact,
                _credential: &Credential,
            ) -> Result<PublishReceipt, PublishError> {
                Err(PublishError::Duplicate {
                    name: artifact.name.clone(),
                    version: artifact.version.clone(),
                })
            }
        }

        let orchestrator = Orchestrator::new(FakeRunner::new(&[]))
            .with_publisher(Box::new(AlwaysDuplicate), Credential::new("token"));
        let tagged = meta().with_tag("v1.0");
        let report = orchestrator.run(&deploy_spec(), &tagged, ctx());

        assert_eq!(report.status, RunStatus::Failed(Stage::Deploy));
        // script results are untouched by the publish failure
        let script = report.stage(Stage::Script).unwrap();
        assert_eq!(script.steps[0].status, StepStatus::Succeeded);
        assert!(report
            .stage(Stage::Deploy)
            .unwrap()
            .steps[0]
            .stderr
            .contains("already published"));
    }

    #[test]
    fn test_deploy_skipped_after_failure() {
        let runner = FakeRunner::new(&[("test-a", 1)]);
        let orchestrator = Orchestrator::new(runner);
        let tagged = meta().with_tag("v1.0");
        let report = orchestrator.run(&deploy_spec(), &tagged, ctx());

        assert_eq!(
            report.stage(Stage::Deploy).unwrap().skipped,
            Some(SkipReason::EarlierFailure)
        );
    }

    #[test]
    fn test_cache_restore_and_save_across_runs() {
        let cache_root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let cached = work.path().join("pip-cache");

        let yaml = format!(
            "cache:\n  directories:\n    - \"{}\"\nscript: [\"test-a\"]\n",
            cached.display()
        );
        let cached_spec = spec(&yaml);

        // First run: populate the cached directory during the run
        struct CacheWriter {
            dir: std::path::PathBuf,
        }
        impl StepRunner for CacheWriter {
            fn run(
                &self,
                command: &str,
                _ctx: &ExecutionContext,
            ) -> Result<super::super::runner::StepResult, crate::pipeline::PipelineError>
            {
                std::fs::create_dir_all(&self.dir).unwrap();
                std::fs::write(self.dir.join("wheel"), b"cached").unwrap();
                Ok(super::super::runner::StepResult {
                    command: command.to_string(),
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::ZERO,
                })
            }
        }

        let first = Orchestrator::new(CacheWriter { dir: cached.clone() })
            .with_cache(CacheStore::open(cache_root.path()).unwrap());
        assert!(first.run(&cached_spec, &meta(), ctx()).status.is_succeeded());

        // Fresh workspace, same cache root: the file must come back
        std::fs::remove_dir_all(&cached).unwrap();
        let second = Orchestrator::new(FakeRunner::new(&[]))
            .with_cache(CacheStore::open(cache_root.path()).unwrap());
        assert!(second.run(&cached_spec, &meta(), ctx()).status.is_succeeded());
        assert_eq!(std::fs::read(cached.join("wheel")).unwrap(), b"cached");
    }

    #[test]
    fn test_cache_directory_variables_resolve_against_context() {
        let cache_root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let home = work.path().join("home");
        let cached = home.join(".cache/pip");
        std::fs::create_dir_all(&cached).unwrap();
        std::fs::write(cached.join("wheel"), b"bytes").unwrap();

        let var_spec = spec(
            "cache:\n  directories:\n    - \"$HOME/.cache/pip\"\nscript: [\"test-a\"]\n",
        );

        let orchestrator = Orchestrator::new(FakeRunner::new(&[]))
            .with_cache(CacheStore::open(cache_root.path()).unwrap());
        let mut context = ctx();
        context.set_env("HOME", home.display().to_string());
        let report = orchestrator.run(&var_spec, &meta(), context);

        assert!(report.status.is_succeeded());
        // Saved under the resolved path's key, no literal $HOME tree anywhere
        let saved: Vec<String> = std::fs::read_dir(cache_root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(!saved[0].contains("$HOME"));
        assert!(!work.path().join("$HOME").exists());
        assert!(!std::path::Path::new("$HOME").exists());
    }

    #[test]
    fn test_report_lists_all_stages_even_on_early_failure() {
        let runner = FakeRunner::new(&[("prep", 9)]);
        let orchestrator = Orchestrator::new(runner);
        let report = orchestrator.run(&full_spec(), &meta(), ctx());

        assert_eq!(report.stages.len(), Stage::ORDER.len());
    }
}
