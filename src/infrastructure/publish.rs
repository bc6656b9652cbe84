//! Artifact publication
//!
//! The publisher pushes a build artifact to a registry, gated upstream by
//! the deploy condition. Credentials are opaque handles whose secret is only
//! readable inside `publish`; they never appear in logs, `Debug` output, or
//! captured step results. Republishing an existing version is a user-visible
//! error, never a silent no-op and never a retry condition.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from artifact publication.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The registry already holds this artifact version
    #[error("Version {version} of '{name}' is already published")]
    Duplicate {
        /// Artifact name.
        name: String,
        /// The rejected version.
        version: String,
    },

    /// The artifact path does not exist
    #[error("Artifact not found at '{0}'")]
    ArtifactMissing(String),

    /// The supplied credential was rejected
    #[error("Registry rejected the supplied credential")]
    Unauthorized,

    /// Registry IO failed
    #[error("Registry IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An opaque deploy credential.
///
/// Holds the decrypted secret the host resolved from the descriptor's
/// `password.secure` blob. The value is only readable through
/// [`Credential::reveal`], which publishers call at the last moment.
#[derive(Clone)]
pub struct Credential {
    secret: String,
}

impl Credential {
    /// Wraps a decrypted secret
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Reads the secret. Publisher implementations only.
    pub(crate) fn reveal(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([redacted])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

/// The artifact being published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Path to the built artifact
    pub path: PathBuf,
}

/// Successful publication receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Where the artifact landed
    pub remote_location: String,
}

/// Trait for registry backends.
#[allow(clippy::missing_errors_doc)]
pub trait Publisher: Send + Sync {
    /// Publishes an artifact under the given credential
    fn publish(&self, artifact: &Artifact, credential: &Credential)
    -> Result<PublishReceipt, PublishError>;
}

/// Filesystem-backed registry.
///
/// Stores one directory per `name/version` pair and rejects duplicates,
/// which is the behavior package indexes present to publishers.
#[derive(Debug)]
pub struct DirRegistry {
    root: PathBuf,
    // Guards the exists-check-then-create window between concurrent publishes
    publishing: Mutex<HashSet<String>>,
}

impl DirRegistry {
    /// Opens a registry rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Io`] when the root cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PublishError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, publishing: Mutex::new(HashSet::new()) })
    }

    fn slot(&self, artifact: &Artifact) -> PathBuf {
        self.root.join(&artifact.name).join(&artifact.version)
    }
}

impl Publisher for DirRegistry {
    fn publish(
        &self,
        artifact: &Artifact,
        credential: &Credential,
    ) -> Result<PublishReceipt, PublishError> {
        if credential.reveal().is_empty() {
            return Err(PublishError::Unauthorized);
        }

        if !artifact.path.exists() {
            return Err(PublishError::ArtifactMissing(
                artifact.path.display().to_string(),
            ));
        }

        let slot = self.slot(artifact);
        let claim = format!("{}/{}", artifact.name, artifact.version);
        {
            let mut publishing = self.publishing.lock();
            if slot.exists() || !publishing.insert(claim.clone()) {
                return Err(PublishError::Duplicate {
                    name: artifact.name.clone(),
                    version: artifact.version.clone(),
                });
            }
        }

        let result = store_artifact(&artifact.path, &slot);
        self.publishing.lock().remove(&claim);
        result?;

        tracing::info!(
            name = %artifact.name,
            version = %artifact.version,
            "Artifact published"
        );

        Ok(PublishReceipt { remote_location: slot.display().to_string() })
    }
}

fn store_artifact(from: &Path, slot: &Path) -> Result<(), PublishError> {
    fs::create_dir_all(slot)?;
    if from.is_dir() {
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::copy(entry.path(), slot.join(entry.file_name()))?;
            }
        }
    } else {
        let file_name = from.file_name().unwrap_or_default();
        fs::copy(from, slot.join(file_name))?;
    }
    Ok(())
}
