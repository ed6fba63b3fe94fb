//! Persisted storage backend configuration.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Backend kinds a StorageConfig row may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Local,
    S3,
    Ftp,
    Webdav,
    Telegraph,
}

impl StorageType {
    pub const ALL: [StorageType; 5] = [
        StorageType::Local,
        StorageType::S3,
        StorageType::Ftp,
        StorageType::Webdav,
        StorageType::Telegraph,
    ];
}

impl FromStr for StorageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageType::Local),
            "s3" => Ok(StorageType::S3),
            "ftp" => Ok(StorageType::Ftp),
            "webdav" => Ok(StorageType::Webdav),
            "telegraph" => Ok(StorageType::Telegraph),
            _ => Err(anyhow::anyhow!("Invalid storage type: {}", s)),
        }
    }
}

impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageType::Local => write!(f, "local"),
            StorageType::S3 => write!(f, "s3"),
            StorageType::Ftp => write!(f, "ftp"),
            StorageType::Webdav => write!(f, "webdav"),
            StorageType::Telegraph => write!(f, "telegraph"),
        }
    }
}

/// A configured storage backend.
///
/// `config` is a JSON object whose keys depend on `storage_type`. `enabled`
/// decides whether a driver is built at boot; `allow_upload` whether that
/// driver receives new objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StorageConfig {
    pub id: i32,
    pub name: String,
    pub storage_type: String,
    pub config: String,
    pub enabled: bool,
    pub allow_upload: bool,
}

impl StorageConfig {
    /// The typed backend kind; fails for rows written with an unknown type
    pub fn kind(&self) -> Result<StorageType, anyhow::Error> {
        self.storage_type.parse()
    }
}

/// Admin request to register a new backend
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStorageRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Storage name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Storage type is required"))]
    pub storage_type: String,
}

/// Mutable fields of a StorageConfig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfigUpdate {
    pub enabled: bool,
    pub allow_upload: bool,
    pub config: String,
}
