//! Pipeline descriptor loading and validation
//!
//! The descriptor is a YAML document with a fixed set of top-level keys:
//! `language` plus a per-language version list, `sudo`, `env`,
//! `cache.directories`, one command list per stage, and an optional `deploy`
//! block. A [`PipelineSpec`] is immutable once loaded.

#![allow(clippy::must_use_candidate)]

use super::condition::DeployCondition;
use super::errors::ConfigError;
use super::stage::Stage;
use super::types::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Deploy providers this orchestrator knows how to gate.
const KNOWN_PROVIDERS: &[&str] = &["pypi", "npm", "rubygems", "script"];

/// A parsed pipeline descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Language runtime the pipeline targets
    #[serde(default)]
    pub language: String,

    /// Whether the pipeline requests elevated privileges
    #[serde(default)]
    pub sudo: bool,

    /// Global environment entries in `NAME=value` form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    /// Cache configuration
    #[serde(default, skip_serializing_if = "CacheConfig::is_empty")]
    pub cache: CacheConfig,

    /// Commands for the `before_install` stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_install: Vec<String>,

    /// Commands for the `install` stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install: Vec<String>,

    /// Commands for the `before_script` stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_script: Vec<String>,

    /// Commands for the `script` stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script: Vec<String>,

    /// Commands for the `after_success` stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after_success: Vec<String>,

    /// Commands for the `after_failure` stage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after_failure: Vec<String>,

    /// Deploy block, absent when the pipeline never deploys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployConfig>,

    /// Remaining top-level keys, including the per-language version list
    /// (e.g. `python: ["2.7"]`)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl PipelineSpec {
    /// Parses a descriptor from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        Ok(spec)
    }

    /// Reads and parses a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its content is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Returns the commands declared for a stage, in declared order
    pub fn commands(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::BeforeInstall => &self.before_install,
            Stage::Install => &self.install,
            Stage::BeforeScript => &self.before_script,
            Stage::Script => &self.script,
            Stage::AfterSuccess => &self.after_success,
            Stage::AfterFailure => &self.after_failure,
            Stage::Deploy => &[],
        }
    }

    /// Runtime versions declared for the pipeline's language.
    ///
    /// The versions live under a top-level key named after the language
    /// itself (`python: ["2.7"]`), so they land in the flattened map.
    pub fn runtime_versions(&self) -> Vec<String> {
        match self.extra.get(&self.language) {
            Some(serde_yaml::Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| match v {
                    serde_yaml::Value::String(s) => Some(s.clone()),
                    serde_yaml::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(serde_yaml::Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Cache keys derived from the configured directories.
    ///
    /// `$VAR` and `${VAR}` references in each directory are resolved against
    /// the given environment (host environment as fallback), so the target
    /// is the real path, not a literal `$HOME/...`. The key is the resolved
    /// path with separators flattened, so one key maps to exactly one
    /// directory across runs.
    pub fn cache_keys(&self, env: &HashMap<String, String>) -> Vec<(String, PathBuf)> {
        self.cache
            .directories
            .iter()
            .map(|dir| {
                let resolved = crate::executor::expand_variables(dir, env);
                let key = resolved
                    .trim_matches('/')
                    .replace(['/', '\\'], "-")
                    .replace('$', "");
                (key, PathBuf::from(resolved))
            })
            .collect()
    }
}

impl Validate for PipelineSpec {
    type Error = ConfigError;

    fn validate(&self) -> Result<(), Self::Error> {
        for stage in Stage::ORDER {
            if self.commands(stage).iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::EmptyCommand { stage });
            }
        }

        if !self.language.is_empty() && self.runtime_versions().is_empty() {
            return Err(ConfigError::MissingRuntimeVersions(self.language.clone()));
        }

        if let Some(deploy) = &self.deploy {
            deploy.validate()?;
        }

        Ok(())
    }
}

impl fmt::Display for PipelineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: usize = Stage::ORDER.iter().map(|s| self.commands(*s).len()).sum();
        write!(f, "PipelineSpec({}): {} steps", self.language, steps)
    }
}

/// Cache configuration: the directory trees persisted across runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directories to restore before the run and save after it
    #[serde(default)]
    pub directories: Vec<String>,
}

impl CacheConfig {
    /// Returns true when no directories are cached
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

/// An opaque encrypted credential blob.
///
/// Decryption is the host's concern; this core only ever hands the decrypted
/// value to the publisher. The blob itself is never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    /// The encrypted payload
    pub secure: String,
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRef").field("secure", &"[redacted]").finish()
    }
}

/// The `deploy` block of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Registry provider name
    pub provider: String,

    /// Account used for publication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Encrypted credential reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretRef>,

    /// Skip uploading generated documentation alongside the artifact
    #[serde(default)]
    pub skip_upload_docs: bool,

    /// Gating condition
    #[serde(default, rename = "on", skip_serializing_if = "Option::is_none")]
    pub on: Option<DeployCondition>,
}

impl Validate for DeployConfig {
    type Error = ConfigError;

    fn validate(&self) -> Result<(), Self::Error> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(ConfigError::UnknownProvider(self.provider.clone()));
        }
        if self.on.is_none() {
            return Err(ConfigError::MissingDeployCondition);
        }
        Ok(())
    }
}
