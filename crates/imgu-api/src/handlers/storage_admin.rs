//! Storage backend administration. Changes apply to the registry on the
//! next restart.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use imgu_core::{CreateStorageRequest, StorageConfig};
use serde::Deserialize;

use crate::auth::RequireAdmin;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStorageRequest {
    pub enabled: bool,
    pub allow_upload: bool,
    pub config: serde_json::Value,
}

pub async fn list_storages(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<StorageConfig>>, HttpAppError> {
    Ok(Json(state.storage_admin.list().await?))
}

pub async fn create_storage(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    ValidatedJson(body): ValidatedJson<CreateStorageRequest>,
) -> Result<(StatusCode, Json<StorageConfig>), HttpAppError> {
    let storage = state.storage_admin.create(body).await?;
    tracing::info!(admin_id = admin.id, storage_id = storage.id, "Storage created by admin");
    Ok((StatusCode::CREATED, Json(storage)))
}

pub async fn update_storage(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateStorageRequest>,
) -> Result<Json<StorageConfig>, HttpAppError> {
    let storage = state
        .storage_admin
        .update(id, body.enabled, body.allow_upload, &body.config)
        .await?;
    Ok(Json(storage))
}

pub async fn delete_storage(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
) -> Result<StatusCode, HttpAppError> {
    state.storage_admin.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
