//! Step execution and stage orchestration

pub mod context;
pub mod orchestrator;
pub mod provision;
pub mod runner;
pub mod shell;

pub use context::ExecutionContext;
pub use orchestrator::Orchestrator;
pub use provision::Provisioner;
pub use runner::{CancellationToken, StepResult, StepRunner};
pub use shell::{expand_variables, ShellRunner};
