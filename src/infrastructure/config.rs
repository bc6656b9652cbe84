//! Configuration management

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cache store root
    pub cache_dir: String,
    /// Registry root for the filesystem publisher
    pub registry_dir: String,
    /// Installed runtimes root
    pub runtimes_dir: String,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: ".stagecoach/cache".to_string(),
            registry_dir: ".stagecoach/registry".to_string(),
            runtimes_dir: ".stagecoach/runtimes".to_string(),
            log_level: "info".to_string(),
        }
    }
}
