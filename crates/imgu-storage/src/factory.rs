use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use imgu_core::{StorageConfig, StorageType};

#[cfg(feature = "storage-ftp")]
use crate::FtpStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
#[cfg(feature = "storage-telegraph")]
use crate::TelegraphStorage;
#[cfg(feature = "storage-webdav")]
use crate::WebdavStorage;
use crate::{StorageDriver, StorageError, StorageResult, TimeoutDriver};

/// Builds a driver from one persisted StorageConfig
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, config: &StorageConfig) -> StorageResult<Arc<dyn StorageDriver>>;
}

/// Dispatches on the configured type and bounds every driver call by `io_timeout`
#[derive(Debug, Clone)]
pub struct BackendDriverFactory {
    io_timeout: Duration,
}

impl BackendDriverFactory {
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }

    async fn build(&self, config: &StorageConfig) -> StorageResult<Arc<dyn StorageDriver>> {
        let kind: StorageType = config
            .kind()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        match kind {
            #[cfg(feature = "storage-local")]
            StorageType::Local => Ok(Arc::new(
                LocalStorage::from_config(config.id, &config.config).await?,
            )),

            #[cfg(feature = "storage-s3")]
            StorageType::S3 => Ok(Arc::new(S3Storage::from_config(config.id, &config.config)?)),

            #[cfg(feature = "storage-ftp")]
            StorageType::Ftp => Ok(Arc::new(
                FtpStorage::from_config(config.id, &config.config, self.io_timeout).await?,
            )),

            #[cfg(feature = "storage-webdav")]
            StorageType::Webdav => Ok(Arc::new(WebdavStorage::from_config(
                config.id,
                &config.config,
            )?)),

            #[cfg(feature = "storage-telegraph")]
            StorageType::Telegraph => Ok(Arc::new(TelegraphStorage::from_config(
                config.id,
                &config.config,
            )?)),

            #[allow(unreachable_patterns)]
            other => Err(StorageError::ConfigError(format!(
                "{} storage backend not available (feature not enabled)",
                other
            ))),
        }
    }
}

#[async_trait]
impl DriverFactory for BackendDriverFactory {
    async fn create(&self, config: &StorageConfig) -> StorageResult<Arc<dyn StorageDriver>> {
        let driver = tokio::time::timeout(self.io_timeout, self.build(config))
            .await
            .map_err(|_| StorageError::Timeout {
                operation: "connect",
                after: self.io_timeout,
            })??;

        Ok(Arc::new(TimeoutDriver::new(driver, self.io_timeout)))
    }
}
