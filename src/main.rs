//! Predictive Maintenance Server
//!
//! Classifies one machine sensor record as normal operation, anomaly, or one
//! of five failure types, using models trained offline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PREDICTIVE MAINTENANCE                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  HTML     │  │  JSON     │  │  Engine Status          │ │
//! │  │  Form     │  │  API      │  │  (counters, layout)     │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │   encode → engineer → scale → anomaly → binary → multiclass │
//! │                       ▲                                     │
//! │                ┌──────┴──────┐                              │
//! │                │  Artifacts  │  (loaded once, read-only)    │
//! │                └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod models;
mod handlers;
mod logic;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::model::{registry, Pipeline};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "predictive_maintenance=debug,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Predictive Maintenance Server starting...");
    tracing::info!("Artifacts: {}", config.artifact_dir.display());

    // Load models once; a broken artifact set stops the server here
    let pipeline = registry::init(&config.artifact_dir)
        .with_context(|| format!("failed to load artifacts from {}", config.artifact_dir.display()))?;

    let info = pipeline.info();
    tracing::info!(
        "Pipeline mode: {:?}, layout: {} (v{}, hash {:08x})",
        info.mode,
        info.layout.layout,
        info.layout.version,
        info.layout.hash
    );

    // Build application state
    let state = AppState {
        pipeline,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from((config.host, config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Interactive form
    let form_routes = Router::new()
        .route("/", get(handlers::form::index))
        .route("/predict", post(handlers::form::submit));

    // JSON API
    let api_routes = Router::new()
        .route("/api/v1/predict", post(handlers::predict::predict))
        .route("/api/v1/predict/batch", post(handlers::predict::predict_batch))
        .route("/api/v1/engine/status", get(handlers::status::engine));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(form_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
