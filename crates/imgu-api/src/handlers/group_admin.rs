use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use imgu_core::{AppError, Group, GroupLimits};
use serde::Deserialize;
use validator::Validate;

use crate::auth::RequireAdmin;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Group>>, HttpAppError> {
    Ok(Json(state.group_admin.list().await?))
}

/// Omitted fields take the default limits; an omitted name is generated
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    ValidatedJson(limits): ValidatedJson<GroupLimitsBody>,
) -> Result<(StatusCode, Json<Group>), HttpAppError> {
    let group = state.group_admin.create(limits.into()).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
    ValidatedJson(limits): ValidatedJson<GroupLimits>,
) -> Result<Json<Group>, HttpAppError> {
    Ok(Json(state.group_admin.update(id, limits).await?))
}

/// 409 while users are members or while the group is a configured default
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<i32>,
) -> Result<StatusCode, HttpAppError> {
    state.group_admin.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignGroupRequest {
    #[validate(range(min = 0, message = "Group id must not be negative"))]
    pub group_id: i32,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// `PUT /api/admin/users/{id}/group`
pub async fn assign_user_group(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<AssignGroupRequest>,
) -> Result<StatusCode, HttpAppError> {
    body.validate().map_err(AppError::from)?;
    state
        .group_admin
        .assign_user(user_id, body.group_id, body.expires_at)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Partial limits accepted on create
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroupLimitsBody {
    pub name: Option<String>,
    pub allow_upload: Option<bool>,
    pub max_file_size: Option<i64>,
    pub upload_per_minute: Option<i32>,
    pub upload_per_hour: Option<i32>,
    pub upload_per_day: Option<i32>,
    pub upload_per_month: Option<i32>,
    pub total_uploads: Option<i32>,
    pub max_retention_seconds: Option<i64>,
}

impl From<GroupLimitsBody> for GroupLimits {
    fn from(body: GroupLimitsBody) -> Self {
        let d = GroupLimits::default();
        GroupLimits {
            name: body.name.unwrap_or(d.name),
            allow_upload: body.allow_upload.unwrap_or(d.allow_upload),
            max_file_size: body.max_file_size.unwrap_or(d.max_file_size),
            upload_per_minute: body.upload_per_minute.unwrap_or(d.upload_per_minute),
            upload_per_hour: body.upload_per_hour.unwrap_or(d.upload_per_hour),
            upload_per_day: body.upload_per_day.unwrap_or(d.upload_per_day),
            upload_per_month: body.upload_per_month.unwrap_or(d.upload_per_month),
            total_uploads: body.total_uploads.unwrap_or(d.total_uploads),
            max_retention_seconds: body
                .max_retention_seconds
                .unwrap_or(d.max_retention_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_body_falls_back_to_defaults() {
        let body: GroupLimitsBody =
            serde_json::from_str(r#"{"max_retention_seconds": 3600}"#).unwrap();
        let limits = GroupLimits::from(body);
        assert_eq!(limits.max_retention_seconds, 3600);
        assert_eq!(limits.max_file_size, GroupLimits::default().max_file_size);
        assert!(limits.name.is_empty());
    }
}
