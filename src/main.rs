//! stagecoach - CI/CD pipeline orchestrator
//!
//! Runs a declarative YAML pipeline descriptor through a fixed stage
//! sequence with caching, environment provisioning, and condition-gated
//! artifact publication.
//!
//! ## Commands
//!
//! - `stagecoach run` - Execute a pipeline descriptor
//! - `stagecoach check` - Validate a descriptor without running it
//! - `stagecoach explain` - Show the execution plan and deploy decision
//! - `stagecoach completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate a descriptor
//! stagecoach check .stagecoach.yml
//!
//! # See what would run
//! stagecoach explain .stagecoach.yml --repo owner/name --tag v1.0
//!
//! # Execute it
//! stagecoach run .stagecoach.yml --repo owner/name --branch main
//! ```

use std::process::ExitCode;

use stagecoach::infrastructure::init_logging;

fn main() -> ExitCode {
    let level = std::env::var("STAGECOACH_LOG").unwrap_or_else(|_| "info".to_string());
    init_logging(&level);

    match stagecoach::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if std::env::var("STAGECOACH_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
