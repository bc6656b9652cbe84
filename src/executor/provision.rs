//! Environment provisioning
//!
//! Builds the initial [`ExecutionContext`] for a run: runtime PATH entry for
//! the requested language version, the descriptor's global environment, and
//! the CI metadata variables steps can reference.

#![allow(clippy::must_use_candidate)]

use super::context::ExecutionContext;
use crate::pipeline::{Environment, PipelineSpec, RunMetadata};
use std::path::{Path, PathBuf};

/// Provisions execution contexts from pipeline descriptors.
#[derive(Debug, Clone)]
pub struct Provisioner {
    /// Root directory holding installed runtimes,
    /// laid out as `<root>/<language>/<version>/bin`
    runtimes_root: PathBuf,
}

impl Provisioner {
    /// Creates a provisioner over the given runtimes root
    pub fn new(runtimes_root: impl Into<PathBuf>) -> Self {
        Self { runtimes_root: runtimes_root.into() }
    }

    /// Builds the execution context for one run.
    ///
    /// The context is seeded from the host environment, gains the runtime
    /// `bin` directory on PATH, the descriptor's `env` entries, and the CI
    /// metadata variables. Only the first declared runtime version is
    /// provisioned; additional versions are ignored with a warning (matrix
    /// builds are out of scope).
    pub fn provision(
        &self,
        spec: &PipelineSpec,
        meta: &RunMetadata,
        workdir: &Path,
    ) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(workdir);

        let versions = spec.runtime_versions();
        if versions.len() > 1 {
            tracing::warn!(
                language = %spec.language,
                declared = versions.len(),
                "Multiple runtime versions declared; provisioning only the first"
            );
        }
        if let Some(version) = versions.first() {
            let bin = self
                .runtimes_root
                .join(&spec.language)
                .join(version)
                .join("bin");
            tracing::info!(runtime = %spec.language, version = %version, "Provisioning runtime");
            ctx.prepend_path(bin);
            ctx.set_env("RUNTIME_VERSION", version.clone());
        }

        let declared = Environment::from_entries(&spec.env);
        for (key, value) in &declared.vars {
            ctx.set_env(key.clone(), declared.resolve(value));
        }

        ctx.set_env("CI", "true");
        ctx.set_env("STAGECOACH", "true");
        ctx.set_env("BUILD_ID", ctx.run_id.clone());
        ctx.set_env("REPO_SLUG", meta.repo.clone());
        ctx.set_env("BRANCH", meta.branch.clone());
        ctx.set_env("EVENT_TYPE", meta.event.to_string());
        if let Some(tag) = &meta.tag {
            ctx.set_env("TAG", tag.clone());
        }

        ctx
    }
}
