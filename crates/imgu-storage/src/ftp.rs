//! FTP storage driver
//!
//! suppaftp's client is blocking, so every operation runs on the blocking
//! pool against one shared control connection. A dropped connection is
//! re-established once per operation before the error is reported.
//!
//! The control socket carries read and write timeouts equal to the driver
//! I/O timeout, so a stalled server releases the blocking thread and the
//! connection lock instead of holding them after the caller gave up.

use std::io::Cursor;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use imgu_core::StorageType;
use serde::Deserialize;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};

use crate::keys::validate_key;
use crate::traits::{StorageDriver, StorageError, StorageResult, StoredObject};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Persisted configuration of an FTP driver
#[derive(Debug, Clone, Deserialize)]
pub struct FtpConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// `host:port`
    pub address: String,
}

/// FTP storage implementation
#[derive(Clone)]
pub struct FtpStorage {
    id: i32,
    config: Arc<FtpConfig>,
    io_timeout: Duration,
    stream: Arc<Mutex<Option<FtpStream>>>,
}

fn resolve(address: &str) -> StorageResult<SocketAddr> {
    address
        .to_socket_addrs()
        .map_err(|e| StorageError::ConfigError(format!("invalid FTP address {}: {}", address, e)))?
        .next()
        .ok_or_else(|| StorageError::ConfigError(format!("FTP address {} did not resolve", address)))
}

fn connect(config: &FtpConfig, io_timeout: Duration) -> StorageResult<FtpStream> {
    let addr = resolve(&config.address)?;
    let mut stream = FtpStream::connect_timeout(addr, CONNECT_TIMEOUT)
        .map_err(|e| StorageError::BackendError(format!("FTP connect failed: {}", e)))?;
    let socket = stream.get_ref();
    socket
        .set_read_timeout(Some(io_timeout))
        .and_then(|()| socket.set_write_timeout(Some(io_timeout)))
        .map_err(|e| StorageError::BackendError(format!("FTP socket setup failed: {}", e)))?;
    stream
        .login(&config.user, &config.password)
        .map_err(|e| StorageError::BackendError(format!("FTP login failed: {}", e)))?;
    stream
        .transfer_type(FileType::Binary)
        .map_err(|e| StorageError::BackendError(format!("FTP binary mode failed: {}", e)))?;
    Ok(stream)
}

fn is_file_unavailable(err: &FtpError) -> bool {
    matches!(err, FtpError::UnexpectedResponse(response) if matches!(response.status, Status::FileUnavailable))
}

impl FtpStorage {
    /// Connect and log in. Failing here keeps a misconfigured server out of
    /// the registry.
    pub async fn new(id: i32, config: FtpConfig, io_timeout: Duration) -> StorageResult<Self> {
        let config = Arc::new(config);
        let for_connect = Arc::clone(&config);
        let stream = tokio::task::spawn_blocking(move || connect(&for_connect, io_timeout))
            .await
            .map_err(|e| StorageError::BackendError(format!("FTP connect task failed: {}", e)))??;

        tracing::info!(storage_id = id, address = %config.address, "FTP storage connected");

        Ok(FtpStorage {
            id,
            config,
            io_timeout,
            stream: Arc::new(Mutex::new(Some(stream))),
        })
    }

    pub async fn from_config(id: i32, config: &str, io_timeout: Duration) -> StorageResult<Self> {
        let config: FtpConfig = serde_json::from_str(config)
            .map_err(|e| StorageError::ConfigError(format!("invalid ftp config: {}", e)))?;
        Self::new(id, config, io_timeout).await
    }

    /// Run `op` on the shared connection, reconnecting once if it was lost
    async fn run<T, F>(&self, op: F) -> StorageResult<Result<T, FtpError>>
    where
        T: Send + 'static,
        F: Fn(&mut FtpStream) -> Result<T, FtpError> + Send + 'static,
    {
        let config = Arc::clone(&self.config);
        let stream = Arc::clone(&self.stream);
        let io_timeout = self.io_timeout;

        tokio::task::spawn_blocking(move || {
            let mut guard = stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            if let Some(conn) = guard.as_mut() {
                match op(conn) {
                    Err(FtpError::ConnectionError(e)) => {
                        tracing::warn!(error = %e, "FTP connection lost, reconnecting");
                        *guard = None;
                    }
                    other => return Ok(other),
                }
            }

            let mut conn = connect(&config, io_timeout)?;
            let result = op(&mut conn);
            *guard = Some(conn);
            Ok(result)
        })
        .await
        .map_err(|e| StorageError::BackendError(format!("FTP task failed: {}", e)))?
    }
}

#[async_trait]
impl StorageDriver for FtpStorage {
    fn id(&self) -> i32 {
        self.id
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Ftp
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

        let name = key.to_string();
        let exists = self
            .run(move |conn| conn.size(&name))
            .await?
            .is_ok();
        if exists {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        let name = key.to_string();
        self.run(move |conn| conn.put_file(&name, &mut Cursor::new(content.clone())))
            .await?
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::info!(
            storage_id = self.id,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "FTP upload successful"
        );

        Ok(None)
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;

        let name = key.to_string();
        match self.run(move |conn| conn.retr_as_buffer(&name)).await? {
            Ok(buffer) => Ok(StoredObject::Bytes(Bytes::from(buffer.into_inner()))),
            Err(e) if is_file_unavailable(&e) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;

        let name = key.to_string();
        match self.run(move |conn| conn.rm(&name)).await? {
            Ok(()) => {
                tracing::info!(storage_id = self.id, key = %key, "FTP file deleted");
                Ok(())
            }
            Err(e) if is_file_unavailable(&e) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }
}
