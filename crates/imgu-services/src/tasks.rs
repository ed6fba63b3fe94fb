//! The periodic sweeps run by the [`TaskScheduler`](crate::TaskScheduler)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use imgu_core::ImageRecord;
use imgu_db::{ImageStore, SessionStore, UserStore};
use imgu_storage::StorageRegistry;

use crate::scheduler::ScheduledTask;
use crate::settings::SiteSettings;

/// Records fetched per page. A cycle pages through every expired record.
const EXPIRY_BATCH_SIZE: i64 = 1000;

/// Outcome of one image expiry cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Deletes expired images from their driver, then their record.
///
/// A record is removed only after its object is gone, so a failed delete
/// is retried on every following cycle. Records that keep failing do not
/// hide newer ones: each cycle walks all expired records by id.
pub struct ImageExpirySweep {
    images: Arc<dyn ImageStore>,
    registry: Arc<StorageRegistry>,
    every: Duration,
    batch_size: i64,
}

impl ImageExpirySweep {
    pub fn new(images: Arc<dyn ImageStore>, registry: Arc<StorageRegistry>, every: Duration) -> Self {
        Self {
            images,
            registry,
            every,
            batch_size: EXPIRY_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[tracing::instrument(skip(self), fields(cleanup.media_type = "images"))]
    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        let now = Utc::now();
        let mut report = SweepReport::default();
        let mut cursor = 0;

        loop {
            let page = self
                .images
                .list_expired_images(now, cursor, self.batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.id;
            let full_page = page.len() as i64 >= self.batch_size;

            for image in page {
                self.expire(image, &mut report).await;
            }

            if !full_page {
                break;
            }
        }

        tracing::info!(
            deleted = report.deleted,
            failed = report.failed,
            "Image expiry sweep completed"
        );
        Ok(report)
    }

    /// Delete one expired object, then its record
    async fn expire(&self, image: ImageRecord, report: &mut SweepReport) {
        let driver = match self.registry.resolve(image.storage_id) {
            Ok(driver) => driver,
            Err(e) => {
                tracing::error!(
                    image_id = image.id,
                    storage_id = image.storage_id,
                    internal_name = %image.internal_name,
                    error = %e,
                    "Integrity error: expired image references a storage that is not loaded"
                );
                report.failed += 1;
                return;
            }
        };

        match driver.delete(&image.internal_name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    storage_id = image.storage_id,
                    internal_name = %image.internal_name,
                    "Expired object already absent"
                );
            }
            Err(e) => {
                tracing::warn!(
                    image_id = image.id,
                    storage_id = image.storage_id,
                    internal_name = %image.internal_name,
                    error = %e,
                    "Failed to delete expired object, will retry next cycle"
                );
                report.failed += 1;
                return;
            }
        }

        match self.images.delete_image(image.id).await {
            Ok(_) => report.deleted += 1,
            Err(e) => {
                tracing::error!(
                    image_id = image.id,
                    error = %e,
                    "Failed to delete expired image record"
                );
                report.failed += 1;
            }
        }
    }
}

#[async_trait]
impl ScheduledTask for ImageExpirySweep {
    fn name(&self) -> &'static str {
        "image_expiry"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.sweep().await.map(|_| ())
    }
}

/// Prunes expired sessions
pub struct SessionExpirySweep {
    sessions: Arc<dyn SessionStore>,
    every: Duration,
}

impl SessionExpirySweep {
    pub fn new(sessions: Arc<dyn SessionStore>, every: Duration) -> Self {
        Self { sessions, every }
    }
}

#[async_trait]
impl ScheduledTask for SessionExpirySweep {
    fn name(&self) -> &'static str {
        "session_expiry"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn run(&self) -> anyhow::Result<()> {
        let pruned = self.sessions.delete_expired_sessions(Utc::now()).await?;
        tracing::info!(pruned, "Session expiry sweep completed");
        Ok(())
    }
}

/// Returns users whose group assignment lapsed to the default user group
pub struct GroupReversionSweep {
    users: Arc<dyn UserStore>,
    settings: SiteSettings,
    every: Duration,
}

impl GroupReversionSweep {
    pub fn new(users: Arc<dyn UserStore>, settings: SiteSettings, every: Duration) -> Self {
        Self {
            users,
            settings,
            every,
        }
    }
}

#[async_trait]
impl ScheduledTask for GroupReversionSweep {
    fn name(&self) -> &'static str {
        "group_reversion"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn run(&self) -> anyhow::Result<()> {
        let default_group = self.settings.default_user_group().await?;
        let reverted = self
            .users
            .revert_expired_groups(Utc::now(), default_group)
            .await?;
        tracing::info!(reverted, default_group, "Group reversion sweep completed");
        Ok(())
    }
}
