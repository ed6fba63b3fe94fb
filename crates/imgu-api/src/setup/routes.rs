//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use imgu_infra::{request_id_middleware, security_headers_middleware};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Every route with the shared middleware stack. `max_body_bytes` caps
/// request bodies before any group limit is consulted.
pub fn setup_routes(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let admin = Router::new()
        .route(
            "/storages",
            get(handlers::storage_admin::list_storages)
                .post(handlers::storage_admin::create_storage),
        )
        .route(
            "/storages/{id}",
            put(handlers::storage_admin::update_storage)
                .delete(handlers::storage_admin::delete_storage),
        )
        .route(
            "/groups",
            get(handlers::group_admin::list_groups).post(handlers::group_admin::create_group),
        )
        .route(
            "/groups/{id}",
            put(handlers::group_admin::update_group).delete(handlers::group_admin::delete_group),
        )
        .route(
            "/users/{id}/group",
            put(handlers::group_admin::assign_user_group),
        )
        .route("/images", get(handlers::image::list_all_images))
        .route(
            "/settings",
            get(handlers::settings_admin::get_settings)
                .put(handlers::settings_admin::update_settings),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/i/{name}", get(handlers::image::serve_image))
        .route("/api/upload", post(handlers::upload::upload_image))
        .route("/api/images", get(handlers::image::list_images))
        .route(
            "/api/images/{name}",
            axum::routing::delete(handlers::image::delete_image),
        )
        .nest("/api/admin", admin)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .with_state(state)
}
