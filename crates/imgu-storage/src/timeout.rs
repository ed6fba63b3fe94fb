//! Bounded driver I/O
//!
//! Backends may hang indefinitely (stalled TCP peers, unresponsive FTP
//! servers). Every driver the factory builds is wrapped so that each call
//! fails with [`StorageError::Timeout`] after a fixed duration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::StorageType;

use crate::traits::{StorageDriver, StorageError, StorageResult, StoredObject};

/// Applies a per-call deadline to an inner driver
pub struct TimeoutDriver {
    inner: Arc<dyn StorageDriver>,
    limit: Duration,
}

impl TimeoutDriver {
    pub fn new(inner: Arc<dyn StorageDriver>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    storage_id = self.inner.id(),
                    key = %key,
                    operation,
                    timeout_ms = self.limit.as_millis() as u64,
                    "Storage call timed out"
                );
                Err(StorageError::Timeout {
                    operation,
                    after: self.limit,
                })
            }
        }
    }
}

#[async_trait]
impl StorageDriver for TimeoutDriver {
    fn id(&self) -> i32 {
        self.inner.id()
    }

    fn storage_type(&self) -> StorageType {
        self.inner.storage_type()
    }

    async fn put(
        &self,
        key: &str,
        content: Bytes,
        expires_at: Option<DateTime<Utc>>,
    ) -> StorageResult<Option<String>> {
        self.bounded("put", key, self.inner.put(key, content, expires_at))
            .await
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        self.bounded("get", key, self.inner.get(key)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.bounded("delete", key, self.inner.delete(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StalledDriver;

    #[async_trait]
    impl StorageDriver for StalledDriver {
        fn id(&self) -> i32 {
            9
        }

        fn storage_type(&self) -> StorageType {
            StorageType::Ftp
        }

        async fn put(
            &self,
            _key: &str,
            _content: Bytes,
            _expires_at: Option<DateTime<Utc>>,
        ) -> StorageResult<Option<String>> {
            std::future::pending().await
        }

        async fn get(&self, key: &str) -> StorageResult<StoredObject> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_calls_time_out() {
        let driver = TimeoutDriver::new(Arc::new(StalledDriver), Duration::from_secs(30));

        let result = driver.put("a.png", Bytes::from_static(b"x"), None).await;
        assert!(matches!(
            result,
            Err(StorageError::Timeout { operation: "put", .. })
        ));

        let result = driver.delete("a.png").await;
        assert!(matches!(
            result,
            Err(StorageError::Timeout { operation: "delete", .. })
        ));
    }

    #[tokio::test]
    async fn test_fast_calls_pass_through() {
        let driver = TimeoutDriver::new(Arc::new(StalledDriver), Duration::from_secs(30));
        assert_eq!(driver.id(), 9);
        assert!(driver.get("a.png").await.unwrap_err().is_not_found());
    }
}
