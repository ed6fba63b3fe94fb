use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::{ImageFormat, StorageType};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload,
};
use serde::Deserialize;

use crate::keys::validate_key;
use crate::traits::{StorageDriver, StorageError, StorageResult, StoredObject};

/// Persisted configuration of an S3-compatible driver
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub key_id: String,
    pub secret: String,
    #[serde(default)]
    pub token: String,
    /// Custom endpoint for S3-compatible providers; empty means AWS
    #[serde(default)]
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Base URL objects are publicly served from; empty means proxy bytes
    #[serde(default)]
    pub public_url: String,
}

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    id: i32,
    store: AmazonS3,
    bucket: String,
    public_url: Option<String>,
}

impl S3Storage {
    /// Build a client from `config`. Requests use path-style addressing so
    /// that MinIO-like providers work without DNS wildcards.
    pub fn new(id: i32, config: S3Config) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::ConfigError("S3 bucket is empty".to_string()));
        }

        let mut builder = AmazonS3Builder::new()
            .with_access_key_id(config.key_id)
            .with_secret_access_key(config.secret)
            .with_region(config.region)
            .with_bucket_name(config.bucket.clone())
            .with_virtual_hosted_style_request(false);

        if !config.token.is_empty() {
            builder = builder.with_token(config.token);
        }

        if !config.endpoint.is_empty() {
            let allow_http = config.endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(config.endpoint)
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let public_url = Some(config.public_url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(S3Storage {
            id,
            store,
            bucket: config.bucket,
            public_url,
        })
    }

    pub fn from_config(id: i32, config: &str) -> StorageResult<Self> {
        let config: S3Config = serde_json::from_str(config)
            .map_err(|e| StorageError::ConfigError(format!("invalid s3 config: {}", e)))?;
        Self::new(id, config)
    }

    fn public_url_for(&self, key: &str) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/{}", base, key))
    }
}

/// Cache lifetime header matching the object's expiry
fn cache_control_for(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = (expires_at - now).num_seconds().max(0);
    format!("public, max-age={}", remaining)
}

#[async_trait]
impl StorageDriver for S3Storage {
    fn id(&self) -> i32 {
        self.id
    }

    fn storage_type(&self) -> StorageType {
        StorageType::S3
    }

    async fn put(
        &self,
        key: &str,
        content: Bytes,
        expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>> {
        validate_key(key)?;
        let size = content.len();
        let location = Path::from(key);
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            ImageFormat::content_type_of(&content).into(),
        );
        if let Some(expires_at) = expires_at {
            attributes.insert(
                Attribute::CacheControl,
                cache_control_for(expires_at, Utc::now()).into(),
            );
        }

        let options = PutOptions {
            mode: PutMode::Create,
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(content), options)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                match e {
                    ObjectStoreError::AlreadyExists { .. } => {
                        StorageError::AlreadyExists(key.to_string())
                    }
                    other => StorageError::UploadFailed(other.to_string()),
                }
            })?;

        tracing::info!(
            storage_id = self.id,
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(None)
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;

        if let Some(url) = self.public_url_for(key) {
            return Ok(StoredObject::Redirect(url));
        }

        let location = Path::from(key);
        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(StoredObject::Bytes(data))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let location = Path::from(key);

        self.store.delete(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::DeleteFailed(other.to_string()),
        })?;

        tracing::info!(storage_id = self.id, bucket = %self.bucket, key = %key, "S3 object deleted");
        Ok(())
    }
}
