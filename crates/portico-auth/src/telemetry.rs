//! Directory metrics

use metrics::{counter, gauge};
use portico_core::types::{Endpoint, EndpointFailure, HealthSnapshot};

/// Metric names
pub mod names {
    pub const DIRECTORY_ATTEMPTS_TOTAL: &str = "portico_directory_attempts_total";
    pub const ENDPOINT_UP: &str = "portico_endpoint_up";
    pub const HEALTH_STATUS: &str = "portico_health_status";
    pub const HEALTHY_ENDPOINTS: &str = "portico_healthy_endpoints";
}

pub(crate) fn record_attempt(operation: &'static str, outcome: Result<(), &EndpointFailure>) {
    let outcome = match outcome {
        Ok(()) => "success",
        Err(failure) => failure.kind.as_str(),
    };

    counter!(
        names::DIRECTORY_ATTEMPTS_TOTAL,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub(crate) fn record_endpoint(endpoint: &Endpoint, up: bool) {
    gauge!(names::ENDPOINT_UP, "endpoint" => endpoint.to_string()).set(if up { 1.0 } else { 0.0 });
}

pub(crate) fn record_health(snapshot: &HealthSnapshot) {
    gauge!(names::HEALTH_STATUS).set(f64::from(snapshot.status.level()));
    gauge!(names::HEALTHY_ENDPOINTS).set(snapshot.ok_endpoints.len() as f64);
}
