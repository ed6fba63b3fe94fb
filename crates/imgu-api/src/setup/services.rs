//! Background task wiring

use std::sync::Arc;

use imgu_core::Config;
use imgu_services::{
    GroupReversionSweep, ImageExpirySweep, SessionExpirySweep, SiteSettings, TaskScheduler,
};
use imgu_storage::StorageRegistry;

use crate::state::Stores;

/// Spawn the image, session and group sweeps. The returned scheduler must be
/// shut down to stop them.
pub fn start_background_tasks(
    config: &Config,
    stores: &Stores,
    registry: Arc<StorageRegistry>,
) -> TaskScheduler {
    let mut scheduler = TaskScheduler::new();

    scheduler.spawn(Arc::new(ImageExpirySweep::new(
        stores.images.clone(),
        registry,
        config.image_expiry_interval(),
    )));
    scheduler.spawn(Arc::new(SessionExpirySweep::new(
        stores.sessions.clone(),
        config.session_expiry_interval(),
    )));
    scheduler.spawn(Arc::new(GroupReversionSweep::new(
        stores.users.clone(),
        SiteSettings::new(stores.settings.clone()),
        config.group_reversion_interval(),
    )));

    scheduler
}
