//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use adlens_core::Config;
use anyhow::Result;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Telemetry first so service initialization is observable
    crate::telemetry::init_telemetry();

    tracing::info!(environment = %config.environment, "Configuration loaded");

    let state = services::initialize_services(&config).await?;
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}
