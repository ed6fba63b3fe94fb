//! Storage registry setup

use std::sync::Arc;

use anyhow::{Context, Result};
use imgu_core::Config;
use imgu_storage::{BackendDriverFactory, StorageRegistry};

use crate::state::Stores;

/// Build a driver for every enabled backend. Backends that fail are
/// disabled and skipped; startup continues without them.
pub async fn setup_storage(config: &Config, stores: &Stores) -> Result<Arc<StorageRegistry>> {
    let factory = BackendDriverFactory::new(config.storage_io_timeout());
    let registry = StorageRegistry::init(stores.storages.as_ref(), &factory)
        .await
        .context("Failed to load storage configuration")?;

    tracing::info!(
        drivers = registry.driver_count(),
        upload_drivers = registry.upload_driver_count(),
        io_timeout_secs = config.storage_io_timeout().as_secs(),
        "Storage registry ready"
    );

    Ok(Arc::new(registry))
}
