//! Upload orchestration
//!
//! Policy checks run cheapest first so that oversized or forbidden uploads
//! never reach the codec. After a successful `put` the object exists in
//! storage; a metadata failure from that point on is an integrity error.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use imgu_core::constants::{PUBLIC_NAME_ALPHABET, PUBLIC_NAME_TOKEN_LEN};
use imgu_core::{ImageFormat, NewImageRecord, UploadError, User};
use imgu_db::ImageStore;
use imgu_processing::{is_animated, EncodeParams, ImageCodec};
use imgu_storage::{RegistryError, StorageDriver, StorageRegistry};
use rand::Rng;
use serde::Serialize;

use crate::policy::{check_identity, check_retention, check_size, GroupResolver};
use crate::settings::SiteSettings;

/// One inbound upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// `None` for guests
    pub identity: Option<User>,
    pub content: Bytes,
    pub format: ImageFormat,
    /// Requested retention in seconds, 0 for forever
    pub expire_seconds: i64,
    pub lossless: bool,
    pub quality: i32,
    pub effort: i32,
    pub client_ip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub public_name: String,
    /// Where the image is served; absolute once `SITE_URL` is set
    pub url: String,
    pub storage_id: i32,
    pub size_bytes: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct UploadService {
    resolver: GroupResolver,
    settings: SiteSettings,
    codec: Arc<dyn ImageCodec>,
    registry: Arc<StorageRegistry>,
    images: Arc<dyn ImageStore>,
}

/// Fresh unguessable public name: random token plus the format extension
pub fn generate_public_name(format: ImageFormat) -> String {
    let mut rng = rand::rng();
    let token: String = (0..PUBLIC_NAME_TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..PUBLIC_NAME_ALPHABET.len());
            PUBLIC_NAME_ALPHABET[idx] as char
        })
        .collect();
    format!("{}.{}", token, format.extension())
}

/// Absolute expiry for a retention of `seconds`, `None` for forever.
/// Retentions past the representable date range are invalid input.
fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Result<Option<DateTime<Utc>>, UploadError> {
    if seconds == 0 {
        return Ok(None);
    }
    Duration::try_seconds(seconds)
        .and_then(|retention| now.checked_add_signed(retention))
        .map(Some)
        .ok_or_else(|| {
            UploadError::InvalidInput(format!("retention of {} seconds is out of range", seconds))
        })
}

impl UploadService {
    pub fn new(
        resolver: GroupResolver,
        settings: SiteSettings,
        codec: Arc<dyn ImageCodec>,
        registry: Arc<StorageRegistry>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            resolver,
            settings,
            codec,
            registry,
            images,
        }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            user_id = request.identity.as_ref().map(|u| u.id),
            format = %request.format,
            size_bytes = request.content.len(),
            client_ip = %request.client_ip,
        )
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadedImage, UploadError> {
        let start = std::time::Instant::now();
        let identity = request.identity.as_ref();

        check_identity(identity)?;

        let group = self.resolver.resolve(identity).await?;
        if !group.allow_upload {
            return Err(match identity {
                None => UploadError::GuestUploadNotAllowed,
                Some(_) => UploadError::PermissionDenied,
            });
        }

        check_retention(&group, request.expire_seconds)?;
        let expires_at = expiry_after(Utc::now(), request.expire_seconds)?;

        if request.content.is_empty() {
            return Err(UploadError::InvalidInput("file is empty".to_string()));
        }
        check_size(&group, request.content.len())?;

        if !self.settings.encoding_enabled(request.format).await? {
            return Err(UploadError::UnsupportedEncoding(request.format));
        }

        let params = EncodeParams::new(
            request.format,
            is_animated(&request.content),
            request.lossless,
            request.quality,
            request.effort,
        );
        let encoded = self.encode(request.content.clone(), params).await?;
        check_size(&group, encoded.len())?;

        let public_name = generate_public_name(request.format);
        let url = image_url(self.settings.site_url().await?.as_deref(), &public_name);

        let driver = self.registry.select_for_upload().map_err(|e| match e {
            RegistryError::NoDriverAvailable => {
                tracing::error!("Upload rejected, no storage accepts uploads");
                UploadError::NoStorageAvailable
            }
            other => UploadError::Storage(other.to_string()),
        })?;

        let size_bytes = encoded.len();
        let internal_name = match driver
            .put(&public_name, Bytes::from(encoded), expires_at)
            .await
        {
            Ok(Some(assigned)) => assigned,
            Ok(None) => public_name.clone(),
            Err(e) => {
                tracing::error!(
                    storage_id = driver.id(),
                    public_name = %public_name,
                    error = %e,
                    "Storage put failed"
                );
                return Err(UploadError::Storage(e.to_string()));
            }
        };

        let record = NewImageRecord {
            storage_id: driver.id(),
            uploader_id: identity.map(|u| u.id),
            public_name: public_name.clone(),
            internal_name,
            uploader_ip: request.client_ip.clone(),
            expires_at,
        };

        if let Err(e) = self.images.insert_image(&record).await {
            return Err(self.compensate(driver.as_ref(), &record, e.to_string()).await);
        }

        tracing::info!(
            storage_id = record.storage_id,
            public_name = %public_name,
            internal_name = %record.internal_name,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image uploaded"
        );

        Ok(UploadedImage {
            public_name,
            url,
            storage_id: record.storage_id,
            size_bytes,
            expires_at,
        })
    }

    /// Run the codec on the blocking pool
    async fn encode(&self, content: Bytes, params: EncodeParams) -> Result<Vec<u8>, UploadError> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || codec.encode(&content, &params))
            .await
            .map_err(|e| UploadError::ImageProcessing(format!("encoder task failed: {}", e)))?
            .ok_or_else(|| {
                UploadError::ImageProcessing(format!("cannot encode input as {}", params.format))
            })
    }

    /// The object was stored but its record was not: remove it once, best
    /// effort, and report the inconsistency.
    async fn compensate(
        &self,
        driver: &dyn StorageDriver,
        record: &NewImageRecord,
        message: String,
    ) -> UploadError {
        let cleanup = driver.delete(&record.internal_name).await;
        tracing::error!(
            storage_id = record.storage_id,
            internal_name = %record.internal_name,
            public_name = %record.public_name,
            error = %message,
            orphan_removed = cleanup.is_ok(),
            "Integrity error: image stored without metadata record"
        );
        UploadError::Integrity {
            storage_id: record.storage_id,
            internal_name: record.internal_name.clone(),
            message,
        }
    }
}

fn image_url(site_url: Option<&str>, public_name: &str) -> String {
    format!("{}/i/{}", site_url.unwrap_or_default(), public_name)
}

#[cfg(test)]
mod tests {
    use imgu_core::settings::{AVIF_ENCODING, DEFAULT_GROUP_GUEST, SITE_URL};
    use imgu_core::ErrorMetadata;
    use imgu_db::{MemoryStore, SettingStore};

    use super::*;
    use crate::testing::{group, magic, storage_row, user, CountingCodec, FakeDriver};

    struct Harness {
        store: Arc<MemoryStore>,
        codec: Arc<CountingCodec>,
        driver: Arc<FakeDriver>,
        service: UploadService,
    }

    fn harness_with(codec: CountingCodec, driver: FakeDriver, drivers: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        store.put_storage(storage_row(driver.id()));
        let driver = Arc::new(driver);
        let codec = Arc::new(codec);
        let registry = if drivers {
            StorageRegistry::from_drivers(vec![(driver.clone() as Arc<dyn StorageDriver>, true)])
        } else {
            StorageRegistry::default()
        };
        let settings = SiteSettings::new(store.clone());
        let service = UploadService::new(
            GroupResolver::new(store.clone(), settings.clone()),
            settings,
            codec.clone(),
            Arc::new(registry),
            store.clone(),
        );
        Harness {
            store,
            codec,
            driver,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(CountingCodec::default(), FakeDriver::new(1), true)
    }

    fn request(identity: Option<User>, size: usize, expire_seconds: i64) -> UploadRequest {
        let mut content = magic(ImageFormat::Png);
        content.resize(size.max(content.len()), 7);
        UploadRequest {
            identity,
            content: Bytes::from(content),
            format: ImageFormat::Webp,
            expire_seconds,
            lossless: false,
            quality: 80,
            effort: 4,
            client_ip: "203.0.113.9".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retention_scenario() {
        let h = harness();
        h.store.put_group(group(9, 1000, 3600));
        let member = user(1, 9);
        h.store.put_user(member.clone());

        let err = h
            .service
            .upload(request(Some(member.clone()), 500, 7200))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "EXPIRE_TOO_LARGE");
        assert_eq!(h.codec.calls(), 0);

        let before = Utc::now();
        let uploaded = h
            .service
            .upload(request(Some(member), 500, 1800))
            .await
            .unwrap();
        let expires_at = uploaded.expires_at.unwrap();
        let expected = before + Duration::seconds(1800);
        assert!((expires_at - expected).num_seconds().abs() <= 5);

        let images = h.store.images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].public_name, uploaded.public_name);
        assert_eq!(images[0].uploader_id, Some(1));
        assert_eq!(images[0].uploader_ip, "203.0.113.9");
        assert!(h.driver.contains(&uploaded.public_name));
    }

    #[tokio::test]
    async fn test_forever_rejected_under_finite_ceiling() {
        let h = harness();
        h.store.put_group(group(9, 1000, 3600));
        let err = h
            .service
            .upload(request(Some(user(1, 9)), 100, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::ExpireTooLarge { requested: 0, max: 3600 }));
    }

    #[tokio::test]
    async fn test_oversized_upload_never_reaches_codec() {
        let h = harness();
        h.store.put_group(group(9, 1000, 0));
        let err = h
            .service
            .upload(request(Some(user(1, 9)), 1001, 0))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "FILE_TOO_LARGE");
        assert_eq!(h.codec.calls(), 0);
        assert_eq!(h.driver.object_count(), 0);
    }

    #[tokio::test]
    async fn test_encoded_output_is_rechecked() {
        let h = harness_with(CountingCodec::growing(2000), FakeDriver::new(1), true);
        h.store.put_group(group(9, 1000, 0));
        let err = h
            .service
            .upload(request(Some(user(1, 9)), 500, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { .. }));
        assert_eq!(h.codec.calls(), 1);
        assert_eq!(h.driver.object_count(), 0);
    }

    #[tokio::test]
    async fn test_codec_failure_is_processing_error() {
        let h = harness_with(CountingCodec::failing(), FakeDriver::new(1), true);
        let err = h.service.upload(request(None, 100, 0)).await.unwrap_err();
        assert_eq!(err.error_code(), "IMAGE_PROCESSING_ERROR");
        assert!(h.store.images().is_empty());
    }

    #[tokio::test]
    async fn test_group_denials_distinguish_guests() {
        let h = harness();
        let mut closed = group(9, 1000, 0);
        closed.allow_upload = false;
        h.store.put_group(closed);
        h.store.set_setting(DEFAULT_GROUP_GUEST, "9").await.unwrap();

        let err = h.service.upload(request(None, 100, 0)).await.unwrap_err();
        assert!(matches!(err, UploadError::GuestUploadNotAllowed));

        let err = h
            .service
            .upload(request(Some(user(1, 9)), 100, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_disabled_encoding_is_rejected() {
        let h = harness();
        h.store.set_setting(AVIF_ENCODING, "false").await.unwrap();
        let mut req = request(None, 100, 0);
        req.format = ImageFormat::Avif;
        let err = h.service.upload(req).await.unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ENCODING");
        assert_eq!(h.codec.calls(), 0);
    }

    #[tokio::test]
    async fn test_url_follows_site_url() {
        let h = harness();
        let relative = h.service.upload(request(None, 100, 0)).await.unwrap();
        assert_eq!(relative.url, format!("/i/{}", relative.public_name));

        h.store
            .set_setting(SITE_URL, "https://img.example.com/")
            .await
            .unwrap();
        let absolute = h.service.upload(request(None, 100, 0)).await.unwrap();
        assert_eq!(
            absolute.url,
            format!("https://img.example.com/i/{}", absolute.public_name)
        );
    }

    #[tokio::test]
    async fn test_no_driver_available_is_distinct() {
        let h = harness_with(CountingCodec::default(), FakeDriver::new(1), false);
        let err = h.service.upload(request(None, 100, 0)).await.unwrap_err();
        assert!(matches!(err, UploadError::NoStorageAvailable));
        assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_assigned_name_becomes_internal_name() {
        let h = harness_with(
            CountingCodec::default(),
            FakeDriver::assigning(1, "host-chosen.webp"),
            true,
        );
        let uploaded = h.service.upload(request(None, 100, 0)).await.unwrap();

        let images = h.store.images();
        assert_eq!(images[0].public_name, uploaded.public_name);
        assert_eq!(images[0].internal_name, "host-chosen.webp");
        assert_eq!(images[0].uploader_id, None);
    }

    #[tokio::test]
    async fn test_metadata_failure_removes_orphan_and_reports_integrity() {
        let h = harness();
        h.store.set_fail_image_inserts(true);
        let err = h.service.upload(request(None, 100, 0)).await.unwrap_err();

        assert!(matches!(err, UploadError::Integrity { storage_id: 1, .. }));
        assert_eq!(err.error_code(), "INTERNAL_STORAGE_ERROR");
        assert_eq!(h.driver.delete_calls(), 1);
        assert_eq!(h.driver.object_count(), 0);
    }

    #[tokio::test]
    async fn test_identity_gate_runs_first() {
        let h = harness();
        let mut unverified = user(1, 0);
        unverified.email_verified = false;
        let err = h
            .service
            .upload(request(Some(unverified), 100, 0))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "EMAIL_NOT_VERIFIED");
        assert_eq!(h.codec.calls(), 0);
    }

    #[tokio::test]
    async fn test_codec_receives_clamped_params() {
        let h = harness();
        let mut req = request(None, 100, 0);
        req.quality = 400;
        req.effort = -1;
        req.lossless = true;
        h.service.upload(req).await.unwrap();

        let params = h.codec.last_params().unwrap();
        assert_eq!(params.format, ImageFormat::Webp);
        assert_eq!(params.quality, 100);
        assert_eq!(params.effort, 0);
        assert!(params.lossless);
        assert!(!params.animated);
    }

    #[tokio::test]
    async fn test_huge_retention_without_ceiling_is_invalid_input() {
        let h = harness();
        h.store.put_group(group(9, 100_000, 0));

        for expire_seconds in [10_000_000_000_000, i64::MAX] {
            let err = h
                .service
                .upload(request(Some(user(1, 9)), 500, expire_seconds))
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }
        assert_eq!(h.codec.calls(), 0);
        assert!(h.store.images().is_empty());

        // A long but representable retention still works
        let uploaded = h
            .service
            .upload(request(Some(user(1, 9)), 500, 100 * 365 * 24 * 3600))
            .await
            .unwrap();
        assert!(uploaded.expires_at.is_some());
    }

    #[test]
    fn test_public_name_shape() {
        let name = generate_public_name(ImageFormat::Jpeg);
        let (token, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "jpg");
        assert_eq!(token.len(), PUBLIC_NAME_TOKEN_LEN);
        assert!(token.bytes().all(|b| PUBLIC_NAME_ALPHABET.contains(&b)));
        assert_ne!(generate_public_name(ImageFormat::Jpeg), name);
    }
}
