use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use imgu_core::{ImageFormat, UploadError};
use imgu_services::{UploadRequest, UploadedImage};

use crate::auth::Identity;
use crate::error::HttpUploadError;
use crate::state::AppState;
use crate::utils::ip_extraction::ClientIp;

const DEFAULT_QUALITY: i32 = 80;
const DEFAULT_EFFORT: i32 = 4;

/// Raw multipart fields before validation
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Bytes>,
    format: Option<String>,
    expire: Option<String>,
    lossless: Option<String>,
    quality: Option<String>,
    effort: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, HttpUploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => form.file = Some(field.bytes().await?),
            "format" => form.format = Some(field.text().await?),
            "expire" => form.expire = Some(field.text().await?),
            "lossless" => form.lossless = Some(field.text().await?),
            "Q" => form.quality = Some(field.text().await?),
            "effort" => form.effort = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

fn parse_number<T: std::str::FromStr>(
    value: Option<&str>,
    field: &str,
    default: T,
) -> Result<T, UploadError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| UploadError::InvalidInput(format!("{} must be an integer", field))),
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool, UploadError> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("off") => Ok(false),
        Some("1") | Some("true") | Some("on") => Ok(true),
        Some(other) => Err(UploadError::InvalidInput(format!(
            "lossless must be a boolean, got {}",
            other
        ))),
    }
}

impl UploadForm {
    fn into_request(
        self,
        identity: Option<imgu_core::User>,
        client_ip: String,
    ) -> Result<UploadRequest, UploadError> {
        let content = self
            .file
            .ok_or_else(|| UploadError::InvalidInput("file field is required".to_string()))?;
        let format = self
            .format
            .as_deref()
            .ok_or_else(|| UploadError::InvalidInput("format field is required".to_string()))?
            .parse::<ImageFormat>()
            .map_err(|e| UploadError::InvalidInput(e.to_string()))?;

        Ok(UploadRequest {
            identity,
            content,
            format,
            expire_seconds: parse_number(self.expire.as_deref(), "expire", 0)?,
            lossless: parse_flag(self.lossless.as_deref())?,
            quality: parse_number(self.quality.as_deref(), "Q", DEFAULT_QUALITY)?,
            effort: parse_number(self.effort.as_deref(), "effort", DEFAULT_EFFORT)?,
            client_ip,
        })
    }
}

/// `POST /api/upload`
///
/// Multipart fields: `file`, `format` (png, jpeg, gif, webp, avif), `expire`
/// (seconds, 0 or absent for forever), `lossless`, `Q`, `effort`.
#[tracing::instrument(skip_all, fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    ClientIp(client_ip): ClientIp,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedImage>), HttpUploadError> {
    let request = read_form(multipart).await?.into_request(identity, client_ip)?;
    let uploaded = state.uploads.upload(request).await?;
    Ok((StatusCode::CREATED, Json(uploaded)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_absent_fields() {
        let form = UploadForm {
            file: Some(Bytes::from_static(b"x")),
            format: Some("WEBP".to_string()),
            ..Default::default()
        };
        let request = form.into_request(None, "192.0.2.1".to_string()).unwrap();
        assert_eq!(request.format, ImageFormat::Webp);
        assert_eq!(request.expire_seconds, 0);
        assert!(!request.lossless);
        assert_eq!(request.quality, DEFAULT_QUALITY);
        assert_eq!(request.effort, DEFAULT_EFFORT);
    }

    #[test]
    fn test_malformed_fields_are_invalid_input() {
        let form = UploadForm {
            file: Some(Bytes::from_static(b"x")),
            format: Some("bmp".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            form.into_request(None, String::new()),
            Err(UploadError::InvalidInput(_))
        ));

        let form = UploadForm {
            file: Some(Bytes::from_static(b"x")),
            format: Some("png".to_string()),
            expire: Some("soon".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            form.into_request(None, String::new()),
            Err(UploadError::InvalidInput(_))
        ));

        assert!(parse_flag(Some("maybe")).is_err());
        assert!(parse_flag(Some("TRUE")).unwrap());
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let form = UploadForm {
            format: Some("png".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            form.into_request(None, String::new()),
            Err(UploadError::InvalidInput(_))
        ));
    }
}
