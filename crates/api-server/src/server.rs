//! API server — assembles the router and starts the HTTP listener.

use crate::rest::{self, AppState};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use storefront_core::config::AppConfig;
use storefront_provisioning::{DomainOrchestrator, EmailOrchestrator};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    domains: Arc<DomainOrchestrator>,
    email: Arc<EmailOrchestrator>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        domains: Arc<DomainOrchestrator>,
        email: Arc<EmailOrchestrator>,
    ) -> Self {
        Self {
            config,
            domains,
            email,
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            domains: self.domains.clone(),
            email: self.email.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        Router::new()
            // Domain lifecycle
            .route("/v1/domain", post(rest::add_domain))
            .route("/v1/domain", delete(rest::remove_domain))
            .route("/v1/domain/verify", post(rest::verify_domain))
            // Email lifecycle
            .route("/v1/email", post(rest::setup_email))
            .route("/v1/email", delete(rest::disable_email))
            .route("/v1/email/forward-to-cal", patch(rest::forward_to_cal))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus metrics exporter on its own port.
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
