//! Shell step execution
//!
//! Commands run as `sh -c` child processes inheriting the execution
//! context's environment, with `${VAR}` and `$VAR` references expanded
//! against the context (host environment as fallback) before spawning.

use super::context::ExecutionContext;
use super::runner::{StepResult, StepRunner};
use crate::pipeline::PipelineError;
use regex::Regex;
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Runs steps through the system shell.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// Shell binary to use
    shell: String,
}

impl ShellRunner {
    /// Creates a runner using `sh`
    #[must_use]
    pub fn new() -> Self {
        Self { shell: "sh".to_string() }
    }

    /// Overrides the shell binary
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRunner for ShellRunner {
    fn run(&self, command: &str, ctx: &ExecutionContext) -> Result<StepResult, PipelineError> {
        let expanded = expand_variables(command, &ctx.env);

        tracing::debug!(command = %expanded, cwd = %ctx.cwd.display(), "Executing step");

        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c");
        cmd.arg(&expanded);
        cmd.current_dir(&ctx.cwd);
        cmd.env_clear();
        cmd.envs(&ctx.env);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().map_err(|e| PipelineError::Io(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        tracing::debug!(exit_code, duration_ms = start.elapsed().as_millis(), "Step finished");

        Ok(StepResult {
            command: command.to_string(),
            exit_code,
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }
}

/// Expands `${VAR}` and `$VAR` references in a command string.
///
/// Names are looked up in `env` first and the host environment second.
/// References that resolve nowhere are left unchanged in the output.
#[must_use]
pub fn expand_variables(input: &str, env: &HashMap<String, String>) -> String {
    static VAR_PATTERN: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
    });

    VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or("");
            if let Some(value) = env.get(name) {
                value.clone()
            } else if let Ok(value) = std::env::var(name) {
                value
            } else {
                // Keep the original reference if not found
                caps.get(0)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            }
        })
        .to_string()
}
