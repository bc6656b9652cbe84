//! Cache store for directory trees persisted across runs
//!
//! Each cache key maps to one directory tree under the store root. Restoring
//! a key that was never saved is not an error; it reports the key as absent
//! and leaves an empty target directory. Saves are atomic per key: content
//! is staged into a sibling directory and renamed into place, so a
//! concurrent reader never observes a partial write (last writer wins).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors from cache IO.
///
/// These are never fatal to a run: the orchestrator logs them and proceeds
/// with an empty or stale cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store root could not be created
    #[error("Cannot create cache root '{path}': {source}")]
    Root {
        /// The store root path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A key's tree could not be copied
    #[error("Cache IO for key '{key}': {source}")]
    Io {
        /// The affected cache key.
        key: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Whether a key had saved content at restore time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePresence {
    /// Saved content was restored
    Present,
    /// No saved content; target directory left empty
    Absent,
}

/// Filesystem-backed cache store.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Opens a store rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Root`] when the root cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| CacheError::Root {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Restores each key's saved tree into its target directory.
    ///
    /// Missing keys yield [`CachePresence::Absent`] and an empty target
    /// directory, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when a present key's tree cannot be copied.
    pub fn restore(
        &self,
        keys: &[(String, PathBuf)],
    ) -> Result<HashMap<String, CachePresence>, CacheError> {
        let mut presence = HashMap::new();

        for (key, target) in keys {
            let saved = self.root.join(key);
            if saved.is_dir() {
                copy_tree(&saved, target).map_err(|source| CacheError::Io {
                    key: key.clone(),
                    source,
                })?;
                tracing::info!(key = %key, target = %target.display(), "Cache restored");
                presence.insert(key.clone(), CachePresence::Present);
            } else {
                fs::create_dir_all(target).map_err(|source| CacheError::Io {
                    key: key.clone(),
                    source,
                })?;
                tracing::info!(key = %key, "Cache miss, starting empty");
                presence.insert(key.clone(), CachePresence::Absent);
            }
        }

        Ok(presence)
    }

    /// Saves each key's current directory contents, overwriting prior
    /// content for that key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when staging or renaming fails.
    pub fn save(&self, keys: &[(String, PathBuf)]) -> Result<(), CacheError> {
        for (key, source_dir) in keys {
            if !source_dir.is_dir() {
                tracing::warn!(key = %key, dir = %source_dir.display(), "Nothing to save");
                continue;
            }

            // Stage next to the final location so the rename stays on one
            // filesystem and is atomic per key.
            let staging = self.root.join(format!("{key}.{}", Uuid::new_v4()));
            let final_dir = self.root.join(key);

            let result = copy_tree(source_dir, &staging)
                .and_then(|()| {
                    if final_dir.exists() {
                        fs::remove_dir_all(&final_dir)?;
                    }
                    fs::rename(&staging, &final_dir)
                })
                .map_err(|source| CacheError::Io { key: key.clone(), source });

            if result.is_err() {
                let _ = fs::remove_dir_all(&staging);
                return result;
            }

            tracing::info!(key = %key, "Cache saved");
        }

        Ok(())
    }
}

/// Recursively copies a directory tree, creating the destination.
fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_tree(&entry.path(), &dest)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &dest)?;
        }
        // Symlinks are skipped; cached trees are plain file trees.
    }
    Ok(())
}
