use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one stored image. Written once per upload and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ImageRecord {
    pub id: i64,
    pub storage_id: i32,
    /// `None` for guest uploads
    pub uploader_id: Option<i32>,
    pub public_name: String,
    /// Key inside the driver, frozen at creation time
    pub internal_name: String,
    pub uploader_ip: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub storage_id: i32,
    pub uploader_id: Option<i32>,
    pub public_name: String,
    pub internal_name: String,
    pub uploader_ip: String,
    pub expires_at: Option<DateTime<Utc>>,
}
