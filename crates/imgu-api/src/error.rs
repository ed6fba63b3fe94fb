//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>` or, on the upload path,
//! `Result<_, HttpUploadError>`. Both render the same JSON body through
//! [`ErrorResponse`] and log at the level the error declares.

use std::fmt::Display;

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgu_core::{AppError, ErrorMetadata, LogLevel, UploadError};
use imgu_infra::ErrorResponse;
use serde::de::DeserializeOwned;

/// Wrapper type for AppError to implement IntoResponse.
/// Needed because of the orphan rule: neither the trait nor the type is local.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        log_error(&self.0, self.0.error_type());
        render(&self.0)
    }
}

/// Same rendering for the closed upload error set
#[derive(Debug)]
pub struct HttpUploadError(pub UploadError);

impl From<UploadError> for HttpUploadError {
    fn from(err: UploadError) -> Self {
        HttpUploadError(err)
    }
}

impl From<MultipartError> for HttpUploadError {
    fn from(err: MultipartError) -> Self {
        HttpUploadError(UploadError::InvalidInput(err.body_text()))
    }
}

impl IntoResponse for HttpUploadError {
    fn into_response(self) -> Response {
        log_error(&self.0, self.0.error_code());
        render(&self.0)
    }
}

/// JSON body extractor that answers malformed bodies with a 400 in the
/// usual error shape instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error<E: ErrorMetadata + Display>(error: &E, error_type: &str) {
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

fn render<E: ErrorMetadata>(error: &E) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from_metadata(error))).into_response()
}
