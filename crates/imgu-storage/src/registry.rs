//! Storage registry
//!
//! Built once at startup from the persisted StorageConfig rows and read-only
//! afterwards. Configuration changes take effect on the next restart.

use std::sync::Arc;

use imgu_core::AppError;
use imgu_db::StorageConfigStore;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::factory::DriverFactory;
use crate::traits::StorageDriver;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no storage driver available for upload")]
    NoDriverAvailable,

    #[error("unknown storage driver {0}")]
    UnknownDriver(i32),

    #[error(transparent)]
    Store(#[from] AppError),
}

/// The set of live drivers
#[derive(Clone, Default)]
pub struct StorageRegistry {
    drivers: Vec<Arc<dyn StorageDriver>>,
    upload_drivers: Vec<Arc<dyn StorageDriver>>,
}

impl StorageRegistry {
    /// Build a driver for every enabled StorageConfig.
    ///
    /// A driver that fails to construct is skipped and its row is flipped to
    /// `enabled = false`, so the same bad configuration is not retried on
    /// every restart. One failing backend never aborts initialization.
    pub async fn init(
        store: &dyn StorageConfigStore,
        factory: &dyn DriverFactory,
    ) -> Result<Self, RegistryError> {
        let configs = store.list_storages().await?;
        let mut registry = StorageRegistry::default();

        for config in configs.into_iter().filter(|c| c.enabled) {
            match factory.create(&config).await {
                Ok(driver) => {
                    tracing::info!(
                        storage_id = config.id,
                        name = %config.name,
                        storage_type = %config.storage_type,
                        allow_upload = config.allow_upload,
                        "Storage driver initialized"
                    );
                    registry.push(driver, config.allow_upload);
                }
                Err(e) => {
                    tracing::error!(
                        storage_id = config.id,
                        name = %config.name,
                        storage_type = %config.storage_type,
                        error = %e,
                        "Storage driver failed to initialize, disabling"
                    );
                    if let Err(e) = store.set_storage_enabled(config.id, false).await {
                        tracing::error!(
                            storage_id = config.id,
                            error = %e,
                            "Failed to persist disabled storage"
                        );
                    }
                }
            }
        }

        if registry.upload_drivers.is_empty() {
            tracing::warn!("No storage driver accepts uploads");
        }

        Ok(registry)
    }

    /// Assemble a registry from already-built drivers
    pub fn from_drivers(drivers: Vec<(Arc<dyn StorageDriver>, bool)>) -> Self {
        let mut registry = StorageRegistry::default();
        for (driver, allow_upload) in drivers {
            registry.push(driver, allow_upload);
        }
        registry
    }

    fn push(&mut self, driver: Arc<dyn StorageDriver>, allow_upload: bool) {
        if allow_upload {
            self.upload_drivers.push(Arc::clone(&driver));
        }
        self.drivers.push(driver);
    }

    /// Uniformly random choice among upload-eligible drivers
    pub fn select_for_upload(&self) -> Result<Arc<dyn StorageDriver>, RegistryError> {
        self.upload_drivers
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(RegistryError::NoDriverAvailable)
    }

    /// Driver for an existing record. Fails for ids whose configuration was
    /// deleted or disabled after the record was written.
    pub fn resolve(&self, storage_id: i32) -> Result<Arc<dyn StorageDriver>, RegistryError> {
        self.drivers
            .iter()
            .find(|driver| driver.id() == storage_id)
            .cloned()
            .ok_or(RegistryError::UnknownDriver(storage_id))
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn upload_driver_count(&self) -> usize {
        self.upload_drivers.len()
    }
}
