//! `stagecoach run` - Execute a pipeline descriptor
//!
//! Loads and validates the descriptor, provisions an execution context,
//! drives the orchestrator over a real shell runner, and renders the run
//! report. The process exits zero only when the run (publication included)
//! succeeded.
//!
//! The deploy credential comes from `STAGECOACH_DEPLOY_TOKEN` when set,
//! otherwise from the descriptor's encrypted `password.secure` blob as-is.
//! With `--dry-run` the command prints the plan the `explain` command would
//! and executes nothing.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::check::check_descriptor;
use super::{explain, ReportFormat};
use crate::executor::{Orchestrator, Provisioner, ShellRunner};
use crate::infrastructure::{CacheStore, Config, Credential, DirRegistry};
use crate::pipeline::{EventType, PipelineSpec};

/// Options for one `run` invocation, from CLI flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Repository slug
    pub repo: String,
    /// Branch name
    pub branch: String,
    /// Tag, for tagged builds
    pub tag: Option<String>,
    /// Triggering event
    pub event: EventType,
    /// Working directory; defaults to the current directory
    pub workdir: Option<PathBuf>,
    /// Cache store root; defaults to the configured location
    pub cache_dir: Option<PathBuf>,
    /// Report output format
    pub format: ReportFormat,
    /// Plan only, execute nothing
    pub dry_run: bool,
}

/// Executes the descriptor, renders the report, and returns whether the
/// run (publication included) succeeded.
///
/// # Errors
///
/// Returns an error when the run cannot start at all: unreadable or invalid
/// descriptor, unusable working directory, or an unopenable cache or
/// registry root. Step failures are not errors; they land in the report and
/// in the returned outcome.
pub fn run_pipeline(file: &Path, options: &RunOptions) -> Result<bool> {
    let spec = check_descriptor(file)?;

    let meta = explain::metadata(
        options.repo.clone(),
        options.branch.clone(),
        options.tag.clone(),
        options.event,
    );

    if options.dry_run {
        let plan = explain::explain_descriptor(file, &meta)?;
        println!("{plan}");
        return Ok(true);
    }

    let workdir = match &options.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Cannot determine working directory")?,
    };

    let config = Config::default();
    let provisioner = Provisioner::new(&config.runtimes_dir);
    let ctx = provisioner.provision(&spec, &meta, &workdir);

    let cache_root = options
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.cache_dir));
    let cache = CacheStore::open(&cache_root)
        .with_context(|| format!("Cannot open cache store at {}", cache_root.display()))?;

    let mut orchestrator = Orchestrator::new(ShellRunner::new()).with_cache(cache);

    if spec.deploy.is_some() {
        let registry = DirRegistry::open(&config.registry_dir)
            .with_context(|| format!("Cannot open registry at {}", config.registry_dir))?;
        orchestrator =
            orchestrator.with_publisher(Box::new(registry), deploy_credential(&spec));
    }

    let report = orchestrator.run(&spec, &meta, ctx);

    match options.format {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(err) = report.terminal_error() {
        eprintln!("Error: {err}");
    }

    Ok(report.status.is_succeeded())
}

/// Resolves the deploy credential for this invocation.
fn deploy_credential(spec: &PipelineSpec) -> Credential {
    if let Ok(token) = std::env::var("STAGECOACH_DEPLOY_TOKEN") {
        return Credential::new(token);
    }
    let secure = spec
        .deploy
        .as_ref()
        .and_then(|d| d.password.as_ref())
        .map(|p| p.secure.clone())
        .unwrap_or_default();
    Credential::new(secure)
}
