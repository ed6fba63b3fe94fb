//! Storage driver capability trait
//!
//! Every backend implements [`StorageDriver`] on its own terms; callers only
//! see put/get/delete/id.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::StorageType;
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

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl StorageError {
    /// Deleting or reading an absent object; callers that only need the
    /// object gone treat this as success.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What a read returns: the content itself, or where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredObject {
    Bytes(Bytes),
    Redirect(String),
}

/// Storage driver capability trait
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Id of the StorageConfig this driver was built from
    fn id(&self) -> i32;

    fn storage_type(&self) -> StorageType;

    /// Write `content` under `key`.
    ///
    /// Returns `Some(name)` only when the backend assigned its own name, which
    /// must then be used for every later get/delete. An existing object under
    /// `key` is never overwritten; that case is `StorageError::AlreadyExists`.
    ///
    /// `expires_at` is advisory. Backends without native expiry ignore it.
    async fn put(
        &self,
        key: &str,
        content: Bytes,
        expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>>;

    async fn get(&self, key: &str) -> StorageResult<StoredObject>;

    /// Remove an object. An absent object yields `StorageError::NotFound`
    /// where the backend can tell, and `Ok` where it cannot.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
