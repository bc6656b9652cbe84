//! Pipeline domain types and logic

// Make submodules public
pub mod condition;
pub mod errors;
pub mod report;
pub mod spec;
pub mod stage;
pub mod types;

use serde::{Deserialize, Serialize};

// Re-export public types from submodules
pub use condition::{DeployCondition, EventType, RunMetadata};
pub use errors::{ConfigError, PipelineError};
pub use report::{RunReport, SkipReason, StageReport, StepReport};
pub use spec::{CacheConfig, DeployConfig, PipelineSpec, SecretRef};
pub use stage::{FailurePolicy, Stage};
pub use types::{RunStatus, StepStatus, Validate};

/// Environment variables declared by a pipeline descriptor.
///
/// Values can be resolved with the [`resolve`][Environment::resolve] method,
/// which supports `${VAR}` and `$VAR` syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Environment {
    /// Environment variables as key-value pairs.
    #[serde(flatten)]
    pub vars: std::collections::HashMap<String, String>,
}

impl Environment {
    /// Creates a new empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `NAME=value` entries, as they appear under the descriptor's
    /// `env` key. Entries without `=` are ignored.
    #[must_use]
    pub fn from_entries(entries: &[String]) -> Self {
        let vars = entries
            .iter()
            .filter_map(|entry| {
                entry
                    .split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { vars }
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Gets an environment variable by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// Resolves `${VAR}` and `$VAR` references in a value against this
    /// environment, falling back to the host environment for unknown names.
    /// References that resolve nowhere are left unchanged.
    #[must_use]
    pub fn resolve(&self, value: &str) -> String {
        crate::executor::expand_variables(value, &self.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_entries() {
        let env = Environment::from_entries(&[
            "CI=true".to_string(),
            "NAME=stagecoach".to_string(),
            "garbage".to_string(),
        ]);
        assert_eq!(env.get("CI"), Some(&"true".to_string()));
        assert_eq!(env.get("NAME"), Some(&"stagecoach".to_string()));
        assert_eq!(env.vars.len(), 2);
    }

    #[test]
    fn test_environment_resolve() {
        let env = Environment::new().set("TARGET", "dist");
        assert_eq!(env.resolve("cp build ${TARGET}"), "cp build dist");
        assert_eq!(env.resolve("cp build $TARGET"), "cp build dist");
    }

    #[test]
    fn test_environment_value_with_equals_sign() {
        let env = Environment::from_entries(&["OPTS=--level=3".to_string()]);
        assert_eq!(env.get("OPTS"), Some(&"--level=3".to_string()));
    }
}
