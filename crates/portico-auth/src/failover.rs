//! Failover across directory endpoints
//!
//! Candidates are tried strictly in order, one at a time. The first success
//! short-circuits: later candidates are never contacted. Failures are
//! recorded and only surface, as an [`AttemptLog`], once every candidate has
//! failed.

use portico_core::types::{AttemptLog, Endpoint};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::connector::{with_session, DirectoryConnector, EndpointOperation};
use crate::telemetry;

pub struct FailoverOrchestrator {
    connector: Arc<dyn DirectoryConnector>,
    timeout: Duration,
}

impl FailoverOrchestrator {
    pub fn new(connector: Arc<dyn DirectoryConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    /// Run `operation` against each candidate until one succeeds.
    pub async fn try_in_order<O: EndpointOperation>(
        &self,
        candidates: &[Endpoint],
        operation: &O,
    ) -> Result<O::Output, AttemptLog> {
        let mut attempts = AttemptLog::new();

        for endpoint in candidates {
            debug!(endpoint = %endpoint, operation = operation.name(), "Trying endpoint");

            match with_session(self.connector.as_ref(), endpoint, self.timeout, operation).await {
                Ok(output) => {
                    telemetry::record_attempt(operation.name(), Ok(()));
                    if !attempts.is_empty() {
                        info!(
                            endpoint = %endpoint,
                            operation = operation.name(),
                            failed = attempts.len(),
                            "Succeeded after failover"
                        );
                    }
                    return Ok(output);
                }
                Err(failure) => {
                    telemetry::record_attempt(operation.name(), Err(&failure));
                    if failure.is_soft() {
                        debug!(endpoint = %endpoint, operation = operation.name(), error = %failure, "Endpoint had no match");
                    } else {
                        warn!(endpoint = %endpoint, operation = operation.name(), error = %failure, "Endpoint failed");
                    }
                    attempts.record(endpoint.clone(), failure);
                }
            }
        }

        Err(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{CredentialBind, DirectorySession};
    use crate::memory::{StaticDirectory, StaticServer};
    use async_trait::async_trait;
    use portico_core::types::{EndpointFailure, FailureKind};

    fn endpoints(names: &[&str]) -> Vec<Endpoint> {
        names.iter().map(|n| Endpoint::new(format!("ldap://{}", n))).collect()
    }

    fn orchestrator(directory: Arc<StaticDirectory>) -> FailoverOrchestrator {
        FailoverOrchestrator::new(directory, Duration::from_secs(1))
    }

    /// Binds, then reports which endpoint answered
    struct WhoAnswered {
        bind: CredentialBind,
    }

    #[async_trait]
    impl EndpointOperation for WhoAnswered {
        type Output = String;

        fn name(&self) -> &'static str {
            "who"
        }

        async fn run(&self, session: &mut dyn DirectorySession) -> Result<String, EndpointFailure> {
            self.bind.apply(session).await?;
            let records = session
                .search("", crate::connector::SearchScope::Base, "(cn=*)", &["cn"])
                .await?;
            records
                .first()
                .and_then(|r| r.first("cn"))
                .map(str::to_string)
                .ok_or_else(EndpointFailure::no_match)
        }
    }

    fn server(cn: &str) -> StaticServer {
        StaticServer::online()
            .account("svc", "pw")
            .entry(portico_core::types::DirectoryRecord::new("").with_attr("cn", cn))
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let directory = Arc::new(
            StaticDirectory::new()
                .server("ldap://a", StaticServer::unreachable())
                .server("ldap://b", server("b").failing_search("busy"))
                .server("ldap://c", server("c"))
                .server("ldap://d", server("d")),
        );
        let op = WhoAnswered {
            bind: CredentialBind::new("svc", "pw"),
        };

        let answer = orchestrator(directory.clone())
            .try_in_order(&endpoints(&["a", "b", "c"]), &op)
            .await
            .unwrap();

        assert_eq!(answer, "c");
        assert_eq!(directory.contacted(), endpoints(&["a", "b", "c"]));
        assert_eq!(directory.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_attempt_log_lists_failures_in_order() {
        let directory = Arc::new(
            StaticDirectory::new()
                .server("ldap://a", StaticServer::unreachable())
                .server("ldap://b", StaticServer::online().account("svc", "other"))
                .server("ldap://c", server("c")),
        );

        let log = orchestrator(directory.clone())
            .try_in_order(&endpoints(&["a", "b"]), &CredentialBind::new("svc", "pw"))
            .await
            .unwrap_err();

        assert_eq!(log.len(), 2);
        let kinds: Vec<FailureKind> = log.iter().map(|a| a.failure.kind).collect();
        assert_eq!(kinds, vec![FailureKind::Connect, FailureKind::Bind]);
        let servers: Vec<&Endpoint> = log.endpoints();
        assert_eq!(servers, endpoints(&["a", "b"]).iter().collect::<Vec<_>>());
        // c was not a candidate
        assert!(!directory.contacted().contains(&Endpoint::new("ldap://c")));
    }

    #[tokio::test]
    async fn test_success_discards_earlier_failures() {
        let directory = Arc::new(
            StaticDirectory::new()
                .server("ldap://a", StaticServer::unreachable())
                .server("ldap://b", server("b")),
        );
        let op = WhoAnswered {
            bind: CredentialBind::new("svc", "pw"),
        };

        let result = orchestrator(directory).try_in_order(&endpoints(&["a", "b"]), &op).await;
        assert_eq!(result, Ok("b".to_string()));
    }

    #[tokio::test]
    async fn test_no_candidates_yields_empty_log() {
        let directory = Arc::new(StaticDirectory::new());
        let log = orchestrator(directory.clone())
            .try_in_order(&[], &CredentialBind::new("svc", "pw"))
            .await
            .unwrap_err();

        assert!(log.is_empty());
        assert!(directory.contacted().is_empty());
    }

    #[tokio::test]
    async fn test_soft_failure_advances() {
        let directory = Arc::new(
            StaticDirectory::new()
                .server("ldap://a", StaticServer::online().account("svc", "pw"))
                .server("ldap://b", server("b")),
        );
        let op = WhoAnswered {
            bind: CredentialBind::new("svc", "pw"),
        };

        let answer = orchestrator(directory).try_in_order(&endpoints(&["a", "b"]), &op).await;
        assert_eq!(answer, Ok("b".to_string()));
    }
}
