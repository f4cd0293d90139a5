//! Portico Core Library
//!
//! Configuration, error taxonomy and the shared data model for the portico
//! directory gateway.

pub mod config;
pub mod error;
pub mod types;

pub use config::PorticoConfig;
pub use error::{Error, Result};

/// Portico version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Highest number of failed endpoints for which the pool still reports OK
pub const DEFAULT_OK_MAX_ERRORS: usize = 4;

/// Highest number of failed endpoints for which the pool reports WARNING
pub const DEFAULT_WARNING_MAX_ERRORS: usize = 8;

/// Department filter used when a lookup does not name one
pub const DEFAULT_DEPARTMENT: &str = "SMUL";

/// Country code stripped from the front of normalized phone numbers
pub const DEFAULT_PHONE_COUNTRY_CODE: &str = "55";

/// Default per-endpoint timeout (seconds)
pub const DEFAULT_ENDPOINT_TIMEOUT_SECS: u64 = 5;
