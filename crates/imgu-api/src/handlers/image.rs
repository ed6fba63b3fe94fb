use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use imgu_core::{ImageFormat, ImageRecord};
use imgu_storage::StoredObject;
use serde::Deserialize;

use crate::auth::{RequireAdmin, RequireUser};
use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /i/{name}`: the stored bytes, or a redirect for backends that serve
/// objects themselves
#[tracing::instrument(skip(state))]
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, HttpAppError> {
    let response = match state.images.get(&name).await? {
        StoredObject::Bytes(bytes) => (
            [(header::CONTENT_TYPE, ImageFormat::content_type_of(&bytes))],
            bytes,
        )
            .into_response(),
        StoredObject::Redirect(url) => Redirect::temporary(&url).into_response(),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// `GET /api/images`: the caller's uploads, newest first
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ImageRecord>>, HttpAppError> {
    let images = state
        .images
        .list_mine(&user, query.limit, query.offset)
        .await?;
    Ok(Json(images))
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub uploader: Option<i32>,
}

/// `GET /api/admin/images`: every upload, newest first
pub async fn list_all_images(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Vec<ImageRecord>>, HttpAppError> {
    let images = state
        .images
        .list_all(query.uploader, query.limit, query.offset)
        .await?;
    Ok(Json(images))
}

/// `DELETE /api/images/{name}`
#[tracing::instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(name): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    state.images.delete_owned(&user, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
