//! Storage abstraction traits
//!
//! This module defines the `SnapshotStore` trait for repository snapshots and the
//! `Storage` trait for opaque blobs such as generated audio.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use explainer_core::models::{FileEntry, Snapshot};
use explainer_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path rejected: {0}")]
    PathRejected(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::PathRejected(msg) => AppError::PathRejected(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Repository snapshot storage.
///
/// A snapshot is the complete, immutable file set of one repository plus its
/// catalog. Readers either see the previous snapshot or the new one, never a
/// mixture.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Take ownership of a fully staged tree and publish it as the repository's
    /// snapshot, replacing any previous one atomically.
    ///
    /// `staged_root` is consumed (moved into the store). Every entry path must be
    /// normalized and unique.
    async fn put(
        &self,
        repository_id: &str,
        staged_root: &Path,
        entries: Vec<FileEntry>,
    ) -> StorageResult<Arc<Snapshot>>;

    /// Current snapshot of a repository.
    async fn get(&self, repository_id: &str) -> StorageResult<Arc<Snapshot>>;

    /// Raw bytes of one cataloged file of a snapshot obtained from
    /// [`SnapshotStore::get`].
    ///
    /// Returns `PathRejected` for any path that would leave the repository
    /// root, before the catalog is consulted. Reads come from that snapshot's
    /// generation even after a newer one is published; once the generation has
    /// been removed the result is `NotFound`.
    async fn read_file(&self, snapshot: &Snapshot, path: &str) -> StorageResult<Bytes>;

    /// Remove all data of a repository. Deleting a missing repository succeeds.
    async fn delete(&self, repository_id: &str) -> StorageResult<()>;

    /// Identifiers with a published snapshot, sorted.
    async fn list_ids(&self) -> Vec<String>;
}

/// Blob storage abstraction
///
/// Keys are relative paths such as `audio/{id}.mp3`; they must not contain `..`
/// or a leading `/`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write data under a key, replacing existing content.
    async fn upload_with_key(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Read a blob by its key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a blob by its key; missing keys are not an error
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a blob exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
