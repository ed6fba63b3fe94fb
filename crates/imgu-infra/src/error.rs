//! JSON body of every error response
//!
//! The `IntoResponse` impls live in the binary crate: axum's trait and the
//! core error types are both foreign to this crate.

use imgu_core::ErrorMetadata;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
}

impl ErrorResponse {
    /// Client-facing view of `err`. Sensitive errors expose only their
    /// generic message.
    pub fn from_metadata<E: ErrorMetadata>(err: &E) -> Self {
        Self {
            error: err.client_message(),
            code: err.error_code(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
        }
    }
}

#[cfg(test)]
mod tests {
    use imgu_core::{AppError, UploadError};

    use super::*;

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let err = UploadError::Storage("ftp 421 at 10.0.0.7:21".to_string());
        let body = serde_json::to_value(ErrorResponse::from_metadata(&err)).unwrap();
        assert_eq!(body["code"], "INTERNAL_STORAGE_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("10.0.0.7"));
    }

    #[test]
    fn test_policy_errors_keep_their_reason() {
        let err = AppError::Conflict("storage 3 still holds 2 images".to_string());
        let body = serde_json::to_value(ErrorResponse::from_metadata(&err)).unwrap();
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["error"], "storage 3 still holds 2 images");
        assert_eq!(body["recoverable"], false);
    }
}
