//! Credential persistence
//!
//! The cached credential is a small versioned JSON record. Saves go through a
//! temp file in the same directory followed by a rename, so a crash leaves
//! either the old record or the new one, never a torn file.

use crate::auth::{AuthError, Credential};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current version of the on-disk record
const RECORD_VERSION: u32 = 1;

/// Storage for the cached credential
pub trait CredentialStore: Send + Sync {
    /// Loads the cached credential, if one exists for the requested scopes
    fn load(&self) -> Result<Option<Credential>, AuthError>;

    /// Replaces the cached credential
    fn save(&self, credential: &Credential) -> Result<(), AuthError>;

    /// Removes the cached credential
    fn clear(&self) -> Result<(), AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialRecord {
    version: u32,
    credential: Credential,
}

/// File-backed credential store
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    scopes: Vec<String>,
}

impl FileCredentialStore {
    /// Creates a store at `path` for credentials covering `scopes`
    pub fn new(path: impl Into<PathBuf>, scopes: Vec<String>) -> Self {
        Self {
            path: path.into(),
            scopes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, AuthError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Persist(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let record: CredentialRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable credential file {}: {}",
                    self.path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if record.version != RECORD_VERSION {
            tracing::warn!(
                "Ignoring credential file {} with unsupported version {}",
                self.path.display(),
                record.version
            );
            return Ok(None);
        }

        if !record.credential.covers_scopes(&self.scopes) {
            tracing::info!("Cached credential does not cover the requested scopes");
            return Ok(None);
        }

        Ok(Some(record.credential))
    }

    fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let persist_error =
            |e: &dyn std::fmt::Display| AuthError::Persist(format!("{}: {}", self.path.display(), e));

        let dir = self.parent_dir();
        std::fs::create_dir_all(&dir).map_err(|e| persist_error(&e))?;

        let record = CredentialRecord {
            version: RECORD_VERSION,
            credential: credential.clone(),
        };
        let json = serde_json::to_vec_pretty(&record).map_err(|e| persist_error(&e))?;

        let mut file = NamedTempFile::new_in(&dir).map_err(|e| persist_error(&e))?;
        file.write_all(&json).map_err(|e| persist_error(&e))?;
        file.as_file().sync_all().map_err(|e| persist_error(&e))?;
        file.persist(&self.path).map_err(|e| persist_error(&e.error))?;

        tracing::info!("Authentication token saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Deleted cached credential {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Persist(format!(
                "failed to delete {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
