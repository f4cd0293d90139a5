//! Gateway server implementation

use axum::{
    extract::FromRef,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use portico_auth::{DirectoryConnector, DirectoryService};
use portico_core::{config::PorticoConfig, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};
use crate::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DirectoryService>,
    pub metrics: Arc<MetricsRecorder>,
    pub request_timeout: Duration,
    pub start_time: Instant,
}

impl FromRef<AppState> for Arc<MetricsRecorder> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Directory gateway server
pub struct GatewayServer {
    config: PorticoConfig,
    connector: Arc<dyn DirectoryConnector>,
}

impl GatewayServer {
    pub fn new(config: PorticoConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self { config, connector }
    }

    pub async fn run(self) -> Result<()> {
        let start_time = Instant::now();

        let metrics = Arc::new(MetricsRecorder::install()?);
        info!("Prometheus metrics initialized");

        let service = Arc::new(DirectoryService::new(&self.config, self.connector.clone()));
        info!(
            endpoints = service.pool().len(),
            "Directory pool configured"
        );

        let state = AppState {
            service,
            metrics,
            request_timeout: Duration::from_secs(self.config.server.request_timeout_secs),
            start_time,
        };

        let app = create_router(state);
        let addr = self.config.server.socket_address();
        let listener = TcpListener::bind(&addr).await?;

        info!("Portico gateway listening on http://{}", addr);
        info!("Prometheus metrics at http://{}/metrics", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Portico gateway stopped");
        Ok(())
    }
}

/// Build the gateway router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(routes::health))
        .route("/auth", post(routes::authenticate))
        .route("/lookup/{login}", get(routes::lookup))
        // Routes of the service this gateway replaces
        .route("/ldap/autenticar", post(routes::authenticate))
        .route("/ldap/buscar-por-login/{login}", get(routes::lookup))
        .layer(middleware::from_fn_with_state(state.metrics.clone(), metrics_middleware))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.request_timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
