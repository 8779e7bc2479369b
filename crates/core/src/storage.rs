//! Blob storage for uploaded files.
//!
//! Files are addressed by a relative storage key such as
//! `contractors/<contractor>/<file>-report.pdf`. [`BlobStorage`] is the seam
//! the rest of the system writes through; [`LocalBlobStorage`] keeps blobs on
//! the local filesystem under a root directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::types::DbId;

/// Longest filename kept in a storage key (characters).
const MAX_KEY_FILENAME_LEN: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where file bytes live.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `bytes` under `key`, replacing any previous content.
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove the blob under `key`. Deleting a missing blob succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Build the storage key for a newly uploaded file.
pub fn storage_key(contractor_id: DbId, file_id: DbId, filename: &str) -> String {
    format!(
        "contractors/{contractor_id}/{file_id}-{}",
        sanitize_filename(filename)
    )
}

/// Reduce a client filename to a safe single path segment.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_KEY_FILENAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

// ---------------------------------------------------------------------------
// Local filesystem
// ---------------------------------------------------------------------------

/// Filesystem-backed storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing anything that could
    /// escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !only_normal {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
