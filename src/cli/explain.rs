//! `stagecoach explain` - Show the execution plan for a descriptor
//!
//! Renders the stage-by-stage plan and evaluates the deploy condition
//! against the given run metadata, so a user can see whether a deploy
//! would happen without running anything.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

use super::check::check_descriptor;
use crate::pipeline::{EventType, PipelineSpec, RunMetadata, Stage};

/// Builds run metadata from CLI flags
#[must_use]
pub fn metadata(repo: String, branch: String, tag: Option<String>, event: EventType) -> RunMetadata {
    let mut meta = RunMetadata::push(repo, branch).with_event(event);
    meta.tag = tag;
    meta
}

/// Validates the descriptor and renders its execution plan.
///
/// # Errors
///
/// Returns an error when the descriptor cannot be loaded or fails
/// validation.
pub fn explain_descriptor(file: &Path, meta: &RunMetadata) -> Result<String> {
    let spec = check_descriptor(file)?;
    Ok(render_plan(&spec, meta))
}

fn render_plan(spec: &PipelineSpec, meta: &RunMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "plan for {} on {} ({})", meta.repo, meta.branch, meta.event);

    if !spec.language.is_empty() {
        let versions = spec.runtime_versions().join(", ");
        let _ = writeln!(out, "  runtime: {} [{versions}]", spec.language);
    }

    // Host environment only; explain runs outside any provisioned context
    for (key, _) in spec.cache_keys(&std::collections::HashMap::new()) {
        let _ = writeln!(out, "  cache: {key}");
    }

    for stage in Stage::ORDER {
        if stage == Stage::Deploy {
            continue;
        }
        let commands = spec.commands(stage);
        if commands.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {stage}:");
        for command in commands {
            let _ = writeln!(out, "    $ {command}");
        }
    }

    match &spec.deploy {
        None => {
            let _ = writeln!(out, "  deploy: none declared");
        }
        Some(deploy) => {
            let condition = deploy.on.clone().unwrap_or_default();
            let decision = if condition.evaluate(meta) { "would deploy" } else { "skipped" };
            let _ = writeln!(
                out,
                "  deploy: {} via {} - {decision}",
                condition, deploy.provider
            );
        }
    }

    out
}
