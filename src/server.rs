//! HTTP surface: a liveness route and the scrape trigger.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::{Environment, ServerConfig};
use crate::error::ScrapeError;
use crate::models::{ErrorResponse, HealthResponse, ScrapeResponse};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::scraping::{BrowserLauncher, BrowserPool, ChromeLauncher};
use crate::sources::ScrapeTarget;

pub const SERVICE_STATUS: &str = "PSX Scraper Service Running";

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    environment: Environment,
}

impl AppState {
    pub fn new(pipeline: Pipeline, environment: Environment) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            environment,
        }
    }

    /// Wire the pipeline for `config` on top of `launcher`
    pub fn from_config(config: &ServerConfig, launcher: Arc<dyn BrowserLauncher>) -> Result<Self> {
        let target = ScrapeTarget::new(
            config.source,
            config.source_url.clone(),
            config.names_url.clone(),
        )?;
        let pool = BrowserPool::new(launcher, config.max_browsers);
        let options = PipelineOptions {
            enrichment: config.enrichment,
            ..Default::default()
        };
        let pipeline = Pipeline::new(pool, target, options)?;
        Ok(Self::new(pipeline, config.environment))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/scrape-kse100", get(scrape_kse100))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: SERVICE_STATUS.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn scrape_kse100(State(state): State<AppState>) -> Response {
    match state.pipeline.run().await {
        Ok(report) => Json(ScrapeResponse::from(report)).into_response(),
        Err(e) => {
            error!("Scraping error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_payload(&e, state.environment)),
            )
                .into_response()
        }
    }
}

pub fn error_payload(err: &ScrapeError, environment: Environment) -> ErrorResponse {
    ErrorResponse {
        success: false,
        error: err.to_string(),
        stack: environment.include_trace().then(|| err.diagnostic()),
    }
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<()> {
    let launcher = Arc::new(ChromeLauncher::new(config.chrome_path.clone()));
    let state = AppState::from_config(&config, launcher)?;

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        "PSX Scraper Service running on {} ({}, source {}, up to {} browsers)",
        config.bind,
        config.environment.as_str(),
        config.source.key,
        state.pipeline.pool().capacity()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
