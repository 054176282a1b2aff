//! migru-api library - migraine tracking backend
//!
//! Voice-first migraine management service: attack logging, voice
//! biomarker analysis, 48-hour risk forecasting, therapeutic
//! interventions, and Hume EVI integration, all over a shared SQLite
//! database.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod agents;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

use agents::hume::HumeAgent;
use config::ServiceConfig;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
    /// Hume EVI bridge with its token cache
    pub hume: Arc<HumeAgent>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServiceConfig) -> Self {
        let hume = Arc::new(HumeAgent::new(
            config.hume_api_key.clone(),
            config.hume_secret_key.clone(),
        ));
        Self {
            db,
            config: Arc::new(config),
            hume,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::status_routes())
        .merge(api::log_routes())
        .merge(api::voice_routes())
        .merge(api::forecast_routes())
        .merge(api::intervention_routes())
        .merge(api::analytics_routes())
        .merge(api::onboarding_routes())
        .merge(api::hume_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
