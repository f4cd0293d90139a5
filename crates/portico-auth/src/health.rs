//! Pool health evaluation
//!
//! Every evaluation checks each endpoint once with a service-account bind.
//! Any failure (connection, bind, timeout) marks the endpoint ERROR. Results
//! are never cached: each call costs one round-trip per endpoint.

use futures::future::join_all;
use portico_core::types::{Endpoint, EndpointStatus, HealthPolicy, HealthSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::connector::{with_session, CredentialBind, DirectoryConnector};
use crate::telemetry;

pub struct HealthEvaluator {
    connector: Arc<dyn DirectoryConnector>,
    check_bind: CredentialBind,
    policy: HealthPolicy,
    timeout: Duration,
    parallel: bool,
}

impl HealthEvaluator {
    pub fn new(
        connector: Arc<dyn DirectoryConnector>,
        check_bind: CredentialBind,
        policy: HealthPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            check_bind,
            policy,
            timeout,
            parallel: true,
        }
    }

    /// Check endpoints one after another instead of concurrently
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Check every endpoint of `pool` and classify the pool.
    pub async fn evaluate(&self, pool: &[Endpoint]) -> HealthSnapshot {
        let statuses = if self.parallel {
            join_all(pool.iter().map(|endpoint| self.check_endpoint(endpoint))).await
        } else {
            let mut statuses = Vec::with_capacity(pool.len());
            for endpoint in pool {
                statuses.push(self.check_endpoint(endpoint).await);
            }
            statuses
        };

        let snapshot = HealthSnapshot::from_statuses(statuses, &self.policy);

        info!(
            status = %snapshot.status,
            ok = snapshot.ok_endpoints.len(),
            errors = snapshot.error_count(),
            total = snapshot.total_endpoints,
            "Directory pool evaluated"
        );
        telemetry::record_health(&snapshot);

        snapshot
    }

    async fn check_endpoint(&self, endpoint: &Endpoint) -> EndpointStatus {
        let result = with_session(self.connector.as_ref(), endpoint, self.timeout, &self.check_bind).await;
        telemetry::record_endpoint(endpoint, result.is_ok());

        match result {
            Ok(()) => {
                debug!(endpoint = %endpoint, "Health check succeeded");
                EndpointStatus::ok(endpoint.clone())
            }
            Err(failure) => {
                warn!(endpoint = %endpoint, error = %failure, "Health check failed");
                EndpointStatus::error(endpoint.clone())
            }
        }
    }
}
