//! HTTP API for Portico

pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use metrics::MetricsRecorder;
pub use server::{create_router, AppState, GatewayServer};
