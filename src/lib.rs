//! # Stagecoach
//!
//! A CI/CD pipeline orchestrator driven by a declarative YAML descriptor.
//!
//! A descriptor declares commands for a fixed sequence of stages
//! (`before_install`, `install`, `before_script`, `script`, `after_success`
//! / `after_failure`, `deploy`), plus a language runtime, environment
//! entries, cached directories, and an optional gated deploy block. The
//! orchestrator runs the stages in order under each stage's failure policy
//! and always produces a complete run report.
//!
//! ## Architecture
//!
//! The crate is organized in bounded contexts:
//!
//! - `pipeline`: descriptor parsing, stages, conditions, run reports
//! - `executor`: execution context, step runners, stage orchestration
//! - `infrastructure`: cache store, artifact registry, logging, config
//! - `cli`: the `stagecoach` command-line interface
//!
//! ## Example
//!
//! ```rust
//! use stagecoach::executor::{ExecutionContext, Orchestrator, ShellRunner};
//! use stagecoach::pipeline::{PipelineSpec, RunMetadata};
//!
//! let spec = PipelineSpec::from_yaml(
//!     r#"
//! install: ["echo installing"]
//! script: ["echo testing"]
//! "#,
//! )
//! .unwrap();
//!
//! let orchestrator = Orchestrator::new(ShellRunner::new());
//! let meta = RunMetadata::push("owner/repo", "main");
//! let report = orchestrator.run(&spec, &meta, ExecutionContext::new("/tmp"));
//! assert!(report.status.is_succeeded());
//! ```

#![warn(missing_docs)]
#![warn(unused)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod executor;
pub mod infrastructure;
pub mod pipeline;
pub mod prelude;

// Re-exports for common use
pub use executor::{CancellationToken, ExecutionContext, Orchestrator, Provisioner, ShellRunner};
pub use infrastructure::{Artifact, CacheStore, Credential, DirRegistry, Publisher};
pub use pipeline::{
    DeployCondition, EventType, PipelineError, PipelineSpec, RunMetadata, RunReport, RunStatus,
    Stage,
};

// Version
/// Stagecoach version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
