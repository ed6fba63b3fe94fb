//! Error types module
//!
//! `AppError` covers the metadata store and the admin surfaces. `UploadError`
//! is the closed set of outcomes the upload path reports to its caller. Both
//! describe themselves through `ErrorMetadata` so the HTTP layer can render
//! them uniformly.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::format::ImageFormat;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and policy rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "EXPIRE_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// (http_status, error_code, recoverable, suggested_action, sensitive, log_level)
type StaticMetadata = (u16, &'static str, bool, Option<&'static str>, bool, LogLevel);

fn app_error_static_metadata(err: &AppError) -> StaticMetadata {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "INTERNAL_STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Remove the referencing records first"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Sign in and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "PERMISSION_DENIED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Variant name, used as the log category
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg)
            | AppError::NotFound(ref msg)
            | AppError::Conflict(ref msg)
            | AppError::Unauthorized(ref msg)
            | AppError::Forbidden(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Outcome of a rejected or failed upload.
///
/// Policy and validation variants carry precise reasons. Codec and storage
/// variants keep their detail for the logs only; clients see the generic
/// `IMAGE_PROCESSING_ERROR` / `INTERNAL_STORAGE_ERROR` codes.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("guest uploads are not allowed")]
    GuestUploadNotAllowed,

    #[error("user is banned")]
    UserBanned,

    #[error("email address is not verified")]
    EmailNotVerified,

    #[error("group does not allow uploads")]
    PermissionDenied,

    #[error("requested retention {requested}s exceeds group limit {max}s")]
    ExpireTooLarge { requested: i64, max: i64 },

    #[error("file size {size} exceeds group limit {max}")]
    FileTooLarge { size: usize, max: i64 },

    #[error("encoding {0} is disabled")]
    UnsupportedEncoding(ImageFormat),

    #[error("invalid upload: {0}")]
    InvalidInput(String),

    #[error("image processing failed: {0}")]
    ImageProcessing(String),

    #[error("no storage driver available for upload")]
    NoStorageAvailable,

    #[error("storage failure: {0}")]
    Storage(String),

    /// The object was written but its metadata row was not.
    #[error("object {internal_name} on storage {storage_id} has no metadata record: {message}")]
    Integrity {
        storage_id: i32,
        internal_name: String,
        message: String,
    },

    #[error("metadata store failure: {0}")]
    Metadata(#[from] AppError),
}

fn upload_error_static_metadata(err: &UploadError) -> StaticMetadata {
    match err {
        UploadError::GuestUploadNotAllowed => (
            403,
            "GUEST_UPLOAD_NOT_ALLOWED",
            false,
            Some("Sign in to upload"),
            false,
            LogLevel::Debug,
        ),
        UploadError::UserBanned => (403, "USER_BANNED", false, None, false, LogLevel::Debug),
        UploadError::EmailNotVerified => (
            403,
            "EMAIL_NOT_VERIFIED",
            false,
            Some("Verify your email address"),
            false,
            LogLevel::Debug,
        ),
        UploadError::PermissionDenied => {
            (403, "PERMISSION_DENIED", false, None, false, LogLevel::Debug)
        }
        UploadError::ExpireTooLarge { .. } => (
            400,
            "EXPIRE_TOO_LARGE",
            false,
            Some("Request a shorter retention"),
            false,
            LogLevel::Debug,
        ),
        UploadError::FileTooLarge { .. } => (
            413,
            "FILE_TOO_LARGE",
            false,
            Some("Reduce file size or pick a smaller output format"),
            false,
            LogLevel::Debug,
        ),
        UploadError::UnsupportedEncoding(_) => (
            400,
            "UNSUPPORTED_ENCODING",
            false,
            Some("Pick another output format"),
            false,
            LogLevel::Debug,
        ),
        UploadError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        UploadError::ImageProcessing(_) => (
            400,
            "IMAGE_PROCESSING_ERROR",
            false,
            Some("Check image format and try a different file"),
            true,
            LogLevel::Warn,
        ),
        UploadError::NoStorageAvailable => (
            503,
            "NO_STORAGE_AVAILABLE",
            true,
            Some("Retry later"),
            false,
            LogLevel::Error,
        ),
        UploadError::Storage(_)
        | UploadError::Integrity { .. }
        | UploadError::Metadata(_) => (
            500,
            "INTERNAL_STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for UploadError {
    fn http_status_code(&self) -> u16 {
        upload_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        upload_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        upload_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::ImageProcessing(_) => "Failed to process image".to_string(),
            UploadError::Storage(_)
            | UploadError::Integrity { .. }
            | UploadError::Metadata(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}
