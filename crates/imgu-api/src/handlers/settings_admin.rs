//! Site settings administration. Edits apply to the next request.

use std::sync::Arc;

use axum::{extract::State, Json};
use imgu_core::settings::{SettingsUpdate, SettingsView};

use crate::auth::RequireAdmin;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<Json<SettingsView>, HttpAppError> {
    Ok(Json(state.settings_admin.get().await?))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    ValidatedJson(body): ValidatedJson<SettingsUpdate>,
) -> Result<Json<SettingsView>, HttpAppError> {
    let view = state.settings_admin.update(body).await?;
    tracing::info!(admin_id = admin.id, "Settings updated by admin");
    Ok(Json(view))
}
