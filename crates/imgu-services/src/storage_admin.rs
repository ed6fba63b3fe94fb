//! Admin operations on storage backends
//!
//! Changes are persisted only; the running registry picks them up on the
//! next restart.

use std::sync::Arc;

use imgu_core::{AppError, CreateStorageRequest, StorageConfig, StorageConfigUpdate, StorageType};
use imgu_db::StorageConfigStore;
use validator::Validate;

#[derive(Clone)]
pub struct StorageAdminService {
    store: Arc<dyn StorageConfigStore>,
}

impl StorageAdminService {
    pub fn new(store: Arc<dyn StorageConfigStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<StorageConfig>, AppError> {
        self.store.list_storages().await
    }

    /// New backends start disabled, closed for uploads and with an empty
    /// config, so a half-configured backend never receives traffic.
    pub async fn create(&self, mut request: CreateStorageRequest) -> Result<StorageConfig, AppError> {
        request.name = request.name.trim().to_string();
        request.validate()?;
        let kind: StorageType = request.storage_type.parse().map_err(|_| {
            AppError::InvalidInput(format!("unknown storage type {}", request.storage_type))
        })?;

        let storage = self.store.create_storage(&request.name, kind).await?;
        tracing::info!(storage_id = storage.id, name = %storage.name, storage_type = %kind, "Storage created");
        Ok(storage)
    }

    /// `config` must be a JSON object; its keys are interpreted by the driver
    pub async fn update(
        &self,
        id: i32,
        enabled: bool,
        allow_upload: bool,
        config: &serde_json::Value,
    ) -> Result<StorageConfig, AppError> {
        if !config.is_object() {
            return Err(AppError::InvalidInput(
                "storage config must be a JSON object".to_string(),
            ));
        }

        let update = StorageConfigUpdate {
            enabled,
            allow_upload,
            config: config.to_string(),
        };
        let storage = self.store.update_storage(id, &update).await?;
        tracing::info!(storage_id = id, enabled, allow_upload, "Storage updated");
        Ok(storage)
    }

    /// Fails with `Conflict` while any image lives on the backend
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        self.store.delete_storage_if_unreferenced(id).await?;
        tracing::info!(storage_id = id, "Storage deleted");
        Ok(())
    }
}
