use serde::{Deserialize, Serialize};
use validator::Validate;

/// A bundle of upload limits applied to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub allow_upload: bool,
    /// Bytes
    pub max_file_size: i64,
    pub upload_per_minute: i32,
    pub upload_per_hour: i32,
    pub upload_per_day: i32,
    pub upload_per_month: i32,
    pub total_uploads: i32,
    /// 0 means uploads may be kept forever
    pub max_retention_seconds: i64,
}

/// Editable limits of a group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupLimits {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Group name must be between 1 and 255 characters"
    ))]
    pub name: String,
    pub allow_upload: bool,
    #[validate(range(min = 0, message = "Limits must not be negative"))]
    pub max_file_size: i64,
    #[validate(range(min = 0, message = "Limits must not be negative"))]
    pub upload_per_minute: i32,
    #[validate(range(min = 0, message = "Limits must not be negative"))]
    pub upload_per_hour: i32,
    #[validate(range(min = 0, message = "Limits must not be negative"))]
    pub upload_per_day: i32,
    #[validate(range(min = 0, message = "Limits must not be negative"))]
    pub upload_per_month: i32,
    #[validate(range(min = 0, message = "Limits must not be negative"))]
    pub total_uploads: i32,
    /// 0 means forever
    #[validate(range(min = 0, message = "Retention must not be negative"))]
    pub max_retention_seconds: i64,
}

impl Default for GroupLimits {
    fn default() -> Self {
        Self {
            name: String::new(),
            allow_upload: true,
            max_file_size: 16_000_000,
            upload_per_minute: 30,
            upload_per_hour: 100,
            upload_per_day: 1000,
            upload_per_month: 1000,
            total_uploads: 10000,
            max_retention_seconds: 0,
        }
    }
}
