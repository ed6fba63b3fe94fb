use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::{ImageFormat, StorageType};
use reqwest::header::{CONTENT_TYPE, IF_NONE_MATCH};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;

use crate::keys::validate_key;
use crate::traits::{StorageDriver, StorageError, StorageResult, StoredObject};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Persisted configuration of a WebDAV driver
#[derive(Debug, Clone, Deserialize)]
pub struct WebdavConfig {
    /// Collection URL objects are stored under
    pub endpoint: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

/// WebDAV storage implementation
#[derive(Clone)]
pub struct WebdavStorage {
    id: i32,
    client: Client,
    endpoint: String,
    user: String,
    password: String,
}

impl WebdavStorage {
    pub fn new(id: i32, config: WebdavConfig) -> StorageResult<Self> {
        Url::parse(&config.endpoint).map_err(|e| {
            StorageError::ConfigError(format!("invalid WebDAV endpoint {}: {}", config.endpoint, e))
        })?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(WebdavStorage {
            id,
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            user: config.user,
            password: config.password,
        })
    }

    pub fn from_config(id: i32, config: &str) -> StorageResult<Self> {
        let config: WebdavConfig = serde_json::from_str(config)
            .map_err(|e| StorageError::ConfigError(format!("invalid webdav config: {}", e)))?;
        Self::new(id, config)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.user.is_empty() {
            request
        } else {
            request.basic_auth(&self.user, Some(&self.password))
        }
    }
}

#[async_trait]
impl StorageDriver for WebdavStorage {
    fn id(&self) -> i32 {
        self.id
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Webdav
    }

    async fn put(
        &self,
        key: &str,
        content: Bytes,
        _expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>> {
        validate_key(key)?;
        let size = content.len();
        let start = std::time::Instant::now();
        let content_type = ImageFormat::content_type_of(&content);

        let response = self
            .authorize(self.client.put(self.object_url(key)))
            .header(IF_NONE_MATCH, "*")
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        match response.status() {
            StatusCode::PRECONDITION_FAILED => Err(StorageError::AlreadyExists(key.to_string())),
            status if status.is_success() => {
                tracing::info!(
                    storage_id = self.id,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "WebDAV upload successful"
                );
                Ok(None)
            }
            status => Err(StorageError::UploadFailed(format!(
                "WebDAV PUT returned {}",
                status
            ))),
        }
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;

        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if status.is_success() => {
                let data = response
                    .bytes()
                    .await
                    .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
                Ok(StoredObject::Bytes(data))
            }
            status => Err(StorageError::DownloadFailed(format!(
                "WebDAV GET returned {}",
                status
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;

        let response = self
            .authorize(self.client.delete(self.object_url(key)))
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if status.is_success() => {
                tracing::info!(storage_id = self.id, key = %key, "WebDAV file deleted");
                Ok(())
            }
            status => Err(StorageError::DeleteFailed(format!(
                "WebDAV DELETE returned {}",
                status
            ))),
        }
    }
}
