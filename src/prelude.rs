//! prelude - Common imports for stagecoach
//!
//! Re-exports the types needed to load a descriptor and drive a run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagecoach::prelude::*;
//!
//! let spec = PipelineSpec::from_file(Path::new(".stagecoach.yml"))?;
//! let orchestrator = Orchestrator::new(ShellRunner::new());
//! let report = orchestrator.run(&spec, &meta, ctx);
//! ```

pub use crate::executor::{
    CancellationToken, ExecutionContext, Orchestrator, Provisioner, ShellRunner, StepRunner,
};
pub use crate::infrastructure::{
    Artifact, CacheStore, Credential, DirRegistry, PublishError, Publisher,
};
pub use crate::pipeline::{
    ConfigError, DeployCondition, EventType, PipelineError, PipelineSpec, RunMetadata, RunReport,
    RunStatus, SkipReason, Stage, StepStatus, Validate,
};
