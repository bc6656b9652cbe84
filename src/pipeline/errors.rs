//! Error types for the pipeline domain

use super::stage::Stage;
use thiserror::Error;

/// Errors that can occur while loading or validating a pipeline descriptor.
///
/// All of these are fatal before the run starts; the pipeline never begins
/// on a malformed descriptor.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Descriptor file could not be read
    #[error("Cannot read pipeline descriptor '{path}': {source}")]
    Read {
        /// Path to the descriptor file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Descriptor is not valid YAML or has the wrong shape
    #[error("Malformed pipeline descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A stage declares an empty command string
    #[error("Stage '{stage}' contains an empty command")]
    EmptyCommand {
        /// Stage with the offending entry.
        stage: Stage,
    },

    /// Deploy block references an unknown provider
    #[error("Unknown deploy provider: '{0}'")]
    UnknownProvider(String),

    /// Deploy block has no gating condition
    #[error("Deploy block must declare an 'on' condition")]
    MissingDeployCondition,

    /// The declared language has no version entry
    #[error("No runtime versions declared for language '{0}'")]
    MissingRuntimeVersions(String),
}

/// Errors that abort a pipeline run.
///
/// Script-step failures are deliberately absent: they are recorded in the
/// run report and surfaced at stage end, not propagated as errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Descriptor failed to load or validate
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A setup-stage step exited non-zero
    #[error("Setup stage '{stage}' failed: '{command}' exited with code {code}")]
    Setup {
        /// Stage in which the step failed.
        stage: Stage,
        /// Command that failed.
        command: String,
        /// Exit code of the failed command.
        code: i32,
    },

    /// One or more `script` steps exited non-zero
    #[error("{failed} script step(s) failed")]
    Script {
        /// Number of failed steps.
        failed: usize,
    },

    /// The deploy stage failed to publish the artifact
    #[error("Publish failed: {0}")]
    Publish(String),

    /// A step could not be spawned at all
    #[error("IO error: {0}")]
    Io(String),

    /// The host cancelled the run
    #[error("Run cancelled during stage '{stage}'")]
    Cancelled {
        /// Stage that was executing when cancellation arrived.
        stage: Stage,
    },
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<crate::infrastructure::PublishError> for PipelineError {
    fn from(err: crate::infrastructure::PublishError) -> Self {
        Self::Publish(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_message_names_stage_and_code() {
        let err = PipelineError::Setup {
            stage: Stage::Install,
            command: "pip install -r requirements.txt".to_string(),
            code: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("install"));
        assert!(msg.contains("code 1"));
    }

    #[test]
    fn test_config_error_from_yaml() {
        let parse_err = serde_yaml::from_str::<super::super::spec::PipelineSpec>(": :")
            .expect_err("must not parse");
        let err = ConfigError::from(parse_err);
        assert!(err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PipelineError::from(io);
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_publish_error_conversion_keeps_message() {
        let publish = crate::infrastructure::PublishError::Duplicate {
            name: "pkg".to_string(),
            version: "1.0.0".to_string(),
        };
        let err = PipelineError::from(publish);
        assert!(err.to_string().contains("already published"));
    }
}
