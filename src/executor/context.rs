//! Execution context threaded through every step
//!
//! Process-wide state for one run (environment variables, working directory,
//! PATH) is modeled as an explicit value passed to every step execution,
//! never as ambient mutable global state. That keeps runs reproducible and
//! testable in isolation.

#![allow(clippy::must_use_candidate)]

use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// The environment a step runs under.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Environment variables
    pub env: HashMap<String, String>,

    /// Current working directory
    pub cwd: PathBuf,

    /// Unique identifier of this run
    pub run_id: String,
}

impl ExecutionContext {
    /// Creates a context seeded from the host environment.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            env: std::env::vars().collect(),
            cwd: cwd.into(),
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Sets an environment variable
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Gets an environment variable
    #[must_use]
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }

    /// Prepends a directory to PATH
    pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into().to_string_lossy().to_string();
        let path = match self.env.get("PATH") {
            Some(existing) if !existing.is_empty() => format!("{dir}:{existing}"),
            _ => dir,
        };
        self.env.insert("PATH".to_string(), path);
    }

    /// Applies a command's environment effect if it is a plain `export`
    /// statement.
    ///
    /// Setup-stage commands may mutate the environment for later steps; the
    /// recognized form is exactly `export NAME=value` with a bare or quoted
    /// value, expanded against the current context. Anything more (compound
    /// commands, substitutions, redirections) is a real shell command and is
    /// left for the runner to execute. Returns true when the command was an
    /// export and has been applied.
    pub fn apply_export(&mut self, command: &str) -> bool {
        let Some(rest) = command.trim().strip_prefix("export ") else {
            return false;
        };
        let Some((name, value)) = rest.split_once('=') else {
            return false;
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return false;
        }

        let value = value.trim();
        let quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
        let bare = if quoted { &value[1..value.len() - 1] } else { value };
        if bare.chars().any(|c| "&;|<>()`'\"".contains(c))
            || (!quoted && bare.contains(char::is_whitespace))
        {
            return false;
        }

        let resolved = super::expand_variables(bare, &self.env);
        self.env.insert(name.to_string(), resolved);
        true
    }
}
