//! HTTP server wiring: routes, middleware layers, metrics exporter.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use survey_core::config::AppConfig;
use survey_core::{AssignmentResolver, ResultRecorder};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    resolver: Arc<AssignmentResolver>,
    results: Arc<dyn ResultRecorder>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        resolver: Arc<AssignmentResolver>,
        results: Arc<dyn ResultRecorder>,
    ) -> Self {
        Self {
            config,
            resolver,
            results,
        }
    }

    /// Build the application router. Split out so tests can exercise the
    /// full routing table without binding a socket.
    pub fn router(&self) -> Router {
        let state = AppState {
            resolver: self.resolver.clone(),
            results: self.results.clone(),
            service_name: self.config.service_name.clone(),
            content_dir: self.config.surveys.content_dir.clone().into(),
            static_dir: self.config.surveys.static_dir.clone().into(),
            cookie_max_age_secs: self.config.cookie.max_age_secs,
        };

        Router::new()
            // Assignment endpoints, with and without a language segment
            .route("/feedback", get(rest::assign_feedback))
            .route("/feedback/:lang", get(rest::assign_feedback))
            .route("/poll", get(rest::assign_poll))
            .route("/poll/:lang", get(rest::assign_poll))
            .route("/employee", get(rest::assign_employee))
            .route("/employee/:lang", get(rest::assign_employee))
            // Survey rendering and content
            .route("/survey/:survey_name/:lang", get(rest::survey_page))
            .route("/api/surveys/:survey_name/:lang", get(rest::get_survey))
            .route("/api/save-survey", post(rest::save_survey))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            // Static assets
            .fallback(get(rest::static_file))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server (blocks until shutdown).
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
