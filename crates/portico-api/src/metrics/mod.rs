//! Prometheus metrics for Portico
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format. Directory
//! metrics (attempts, endpoint state, pool status) are recorded by
//! `portico-auth`; this module adds the HTTP and process ones.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use portico_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "portico_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "portico_http_request_duration_seconds";

    // System metrics
    pub const UPTIME_SECONDS: &str = "portico_uptime_seconds";
    pub const INFO: &str = "portico_info";

    pub use portico_auth::metric_names::*;
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the Prometheus recorder as the process-wide recorder
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::Other(anyhow::Error::new(e).context("failed to install Prometheus recorder")))?;

        gauge!(names::INFO, "version" => portico_core::VERSION).set(1.0);

        Ok(Self {
            handle,
            start_time: Instant::now(),
        })
    }

    /// A recorder that is not installed globally.
    ///
    /// Rendering works but only reflects metrics recorded through the global
    /// recorder, so the output stays empty unless one was installed elsewhere.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();

        Self {
            handle: recorder.handle(),
            start_time: Instant::now(),
        }
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_class = format!("{}xx", status / 100);

        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "route" => route.to_string(),
            "status" => status.to_string(),
            "status_class" => status_class
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string(),
            "route" => route.to_string()
        )
        .record(duration_secs);
    }
}

/// Axum middleware for recording HTTP metrics
///
/// Requests are labelled by route template, never by raw path, so logins in
/// lookup URLs do not end up in label values.
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics.record_http_request(&method, &route, status, duration);

    debug!(
        method = %method,
        route = %route,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(metrics): State<Arc<MetricsRecorder>>) -> impl IntoResponse {
    let output = metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}
