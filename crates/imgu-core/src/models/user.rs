use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin = 0,
    User = 1,
    Banned = 2,
}

/// A registered account as seen by the upload and admin paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub email_verified: bool,
    pub role: UserRole,
    pub group_id: i32,
    /// When set, the user falls back to the default user group after this instant
    pub group_expires_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_banned(&self) -> bool {
        self.role == UserRole::Banned
    }
}

/// Authentication session; the token is what clients present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    pub token: String,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
}
