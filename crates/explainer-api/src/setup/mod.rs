//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use explainer_core::Config;
use std::sync::Arc;

pub use services::{initialize_services, Providers};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        data_dir = %config.data_dir().display(),
        "Configuration loaded and validated successfully"
    );

    let providers = Providers::from_config(&config)?;
    let state = initialize_services(&config, providers).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
