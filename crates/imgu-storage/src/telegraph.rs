//! Telegraph paste host driver
//!
//! The host picks object names itself and offers no delete, so `put` always
//! returns the assigned name and `delete` succeeds without doing anything.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::{ImageFormat, StorageType};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::keys::validate_key;
use crate::traits::{StorageDriver, StorageError, StorageResult, StoredObject};

const DEFAULT_PUBLIC_URL: &str = "https://telegra.ph";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Persisted configuration of a telegraph driver
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegraphConfig {
    /// Base URL files are served from, `https://telegra.ph` when empty
    #[serde(default)]
    pub public_url: String,
    /// Upload endpoint, `<public_url>/upload` when empty
    #[serde(default)]
    pub upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    src: String,
}

/// Telegraph storage implementation
#[derive(Clone)]
pub struct TelegraphStorage {
    id: i32,
    client: Client,
    public_url: String,
    upload_url: String,
}

impl TelegraphStorage {
    pub fn new(id: i32, config: TelegraphConfig) -> StorageResult<Self> {
        let public_url = if config.public_url.is_empty() {
            DEFAULT_PUBLIC_URL.to_string()
        } else {
            config.public_url.trim_end_matches('/').to_string()
        };
        let upload_url = if config.upload_url.is_empty() {
            format!("{}/upload", public_url)
        } else {
            config.upload_url
        };

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(TelegraphStorage {
            id,
            client,
            public_url,
            upload_url,
        })
    }

    pub fn from_config(id: i32, config: &str) -> StorageResult<Self> {
        let config: TelegraphConfig = serde_json::from_str(config)
            .map_err(|e| StorageError::ConfigError(format!("invalid telegraph config: {}", e)))?;
        Self::new(id, config)
    }
}

#[async_trait]
impl StorageDriver for TelegraphStorage {
    fn id(&self) -> i32 {
        self.id
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Telegraph
    }

    async fn put(
        &self,
        _key: &str,
        content: Bytes,
        _expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>> {
        let size = content.len();
        let start = std::time::Instant::now();

        let part = Part::bytes(content.to_vec())
            .file_name("blob")
            .mime_str(ImageFormat::content_type_of(&content))
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(StorageError::UploadFailed(format!(
                "telegraph upload returned {}",
                response.status()
            )));
        }

        let files: Vec<UploadedFile> = response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("unexpected telegraph response: {}", e)))?;

        let name = files
            .first()
            .and_then(|file| file.src.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StorageError::UploadFailed("telegraph returned no file".to_string()))?;

        tracing::info!(
            storage_id = self.id,
            key = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Telegraph upload successful"
        );

        Ok(Some(name))
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;
        Ok(StoredObject::Redirect(format!(
            "{}/file/{}",
            self.public_url, key
        )))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        tracing::debug!(storage_id = self.id, key = %key, "Telegraph has no delete, skipping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(server: &mockito::ServerGuard) -> TelegraphStorage {
        TelegraphStorage::new(
            6,
            TelegraphConfig {
                public_url: server.url(),
                upload_url: String::new(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_adopts_assigned_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"src":"/file/6c5d3e2f1a.png"}]"#)
            .create_async()
            .await;

        let assigned = storage(&server)
            .put("Ab3kQ9xz.png", Bytes::from_static(b"\x89PNG\r\n\x1a\n"), None)
            .await
            .unwrap();
        assert_eq!(assigned.as_deref(), Some("6c5d3e2f1a.png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_rejects_empty_and_failed_responses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let result = storage(&server)
            .put("a.png", Bytes::from_static(b"x"), None)
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(500)
            .create_async()
            .await;
        let result = storage(&server)
            .put("a.png", Bytes::from_static(b"x"), None)
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn test_get_redirects_and_delete_is_noop() {
        let driver = TelegraphStorage::from_config(6, "{}").unwrap();
        let object = driver.get("6c5d3e2f1a.png").await.unwrap();
        assert_eq!(
            object,
            StoredObject::Redirect("https://telegra.ph/file/6c5d3e2f1a.png".to_string())
        );
        driver.delete("6c5d3e2f1a.png").await.unwrap();
    }
}
