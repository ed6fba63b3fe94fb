//! Application setup and initialization
//!
//! Builds every component explicitly and hands the pieces to the server:
//! nothing is stored in process-wide state.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use imgu_core::Config;
use imgu_infra::{init_telemetry, LogFormat};
use imgu_processing::NativeCodec;
use imgu_services::TaskScheduler;

use crate::state::{AppState, Stores};

/// Everything the server needs to run and to shut down
pub struct App {
    pub state: Arc<AppState>,
    pub router: Router,
    pub scheduler: TaskScheduler,
}

pub async fn initialize_app(config: &Config) -> Result<App> {
    init_telemetry(LogFormat::from_env()).context("Failed to initialize telemetry")?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(config).await?;
    let stores = Stores::postgres(pool);

    let registry = storage::setup_storage(config, &stores).await?;

    let state = Arc::new(AppState::new(
        &stores,
        registry.clone(),
        Arc::new(NativeCodec::new()),
        config.trusted_proxy_count(),
    ));

    let scheduler = services::start_background_tasks(config, &stores, registry);

    let router = routes::setup_routes(state.clone(), config.max_upload_body_bytes());

    Ok(App {
        state,
        router,
        scheduler,
    })
}
