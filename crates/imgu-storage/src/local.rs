use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::StorageType;
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::keys::validate_key;
use crate::traits::{StorageDriver, StorageError, StorageResult, StoredObject};

/// Persisted configuration of a local driver
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    #[serde(default)]
    pub path: String,
}

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    id: i32,
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`, creating the directory
    /// if needed.
    pub async fn new(id: i32, base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        if base_path.as_os_str().is_empty() {
            return Err(StorageError::ConfigError(
                "local storage path is empty".to_string(),
            ));
        }

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { id, base_path })
    }

    pub async fn from_config(id: i32, config: &str) -> StorageResult<Self> {
        let config: LocalConfig = serde_json::from_str(config)
            .map_err(|e| StorageError::ConfigError(format!("invalid local config: {}", e)))?;
        Self::new(id, config.path).await
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl StorageDriver for LocalStorage {
    fn id(&self) -> i32 {
        self.id
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Local
    }

    async fn put(
        &self,
        key: &str,
        content: Bytes,
        _expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>> {
        let path = self.key_to_path(key)?;
        let size = content.len();
        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(key.to_string())
                } else {
                    StorageError::UploadFailed(format!(
                        "Failed to create file {}: {}",
                        path.display(),
                        e
                    ))
                }
            })?;

        let written = async {
            file.write_all(&content).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Do not leave a truncated object behind under a name we own
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            storage_id = self.id,
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(None)
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(StoredObject::Bytes(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(storage_id = self.id, key = %key, "Local file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
