//! `stagecoach check` - Validate a descriptor without running it
//!
//! Loads the YAML descriptor, applies the same validation the `run` command
//! applies before its first stage, and reports the first problem found.
//! Nothing is executed.

use anyhow::{Context, Result};
use std::path::Path;

use crate::pipeline::{PipelineSpec, Validate};

/// Load and validate a pipeline descriptor.
///
/// # Errors
///
/// Returns an error when the file cannot be read, the YAML is malformed, or
/// any validation rule fails (empty commands, unknown deploy provider, a
/// deploy block without a condition, a language without versions).
pub fn check_descriptor(file: &Path) -> Result<PipelineSpec> {
    let spec = PipelineSpec::from_file(file)
        .with_context(|| format!("Cannot load descriptor: {}", file.display()))?;

    spec.validate()
        .with_context(|| format!("Descriptor is invalid: {}", file.display()))?;

    tracing::debug!(descriptor = %file.display(), "Descriptor validated");
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_descriptor(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("pipeline.yml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_check_valid_descriptor() {
        let dir = TempDir::new().unwrap();
        let path = write_descriptor(&dir, "script:\n  - \"pytest\"\n");
        assert!(check_descriptor(&path).is_ok());
    }

    #[test]
    fn test_check_nonexistent_file() {
        let result = check_descriptor(Path::new("/nonexistent/pipeline.yml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_rejects_unknown_provider() {
        let dir = TempDir::new().unwrap();
        let path = write_descriptor(
            &dir,
            "script: [\"true\"]\ndeploy:\n  provider: carrier-pigeon\n  on:\n    tags: true\n",
        );
        let result = check_descriptor(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_rejects_empty_command() {
        let dir = TempDir::new().unwrap();
        let path = write_descriptor(&dir, "script:\n  - \"   \"\n");
        assert!(check_descriptor(&path).is_err());
    }
}
