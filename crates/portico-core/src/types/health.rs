//! Aggregate health of the directory pool

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Endpoint, EndpointStatus};

/// Aggregate status of the whole pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Numeric form used for the health gauge (0 = OK, 2 = ERROR)
    pub fn level(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Error => 2,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds mapping a failed-endpoint count to an aggregate status.
///
/// The thresholds are absolute counts against the configured pool, not
/// proportions of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Highest error count still reported as OK
    pub ok_max_errors: usize,
    /// Highest error count reported as WARNING; anything above is ERROR
    pub warning_max_errors: usize,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            ok_max_errors: crate::DEFAULT_OK_MAX_ERRORS,
            warning_max_errors: crate::DEFAULT_WARNING_MAX_ERRORS,
        }
    }
}

impl HealthPolicy {
    pub fn classify(&self, error_count: usize) -> HealthStatus {
        if error_count <= self.ok_max_errors {
            HealthStatus::Ok
        } else if error_count <= self.warning_max_errors {
            HealthStatus::Warning
        } else {
            HealthStatus::Error
        }
    }
}

/// Point-in-time view of the pool. Never cached between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub total_endpoints: usize,
    pub ok_endpoints: Vec<Endpoint>,
    pub error_endpoints: Vec<Endpoint>,
    /// Per-endpoint check results in pool order
    pub servers: Vec<EndpointStatus>,
}

impl HealthSnapshot {
    /// Build a snapshot from one check per pool endpoint, in pool order.
    pub fn from_statuses(servers: Vec<EndpointStatus>, policy: &HealthPolicy) -> Self {
        let (ok, failed): (Vec<&EndpointStatus>, Vec<&EndpointStatus>) =
            servers.iter().partition(|s| s.is_ok());

        let ok_endpoints: Vec<Endpoint> = ok.into_iter().map(|s| s.server.clone()).collect();
        let error_endpoints: Vec<Endpoint> =
            failed.into_iter().map(|s| s.server.clone()).collect();

        Self {
            status: policy.classify(error_endpoints.len()),
            total_endpoints: servers.len(),
            ok_endpoints,
            error_endpoints,
            servers,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == HealthStatus::Error
    }

    pub fn error_count(&self) -> usize {
        self.error_endpoints.len()
    }
}
