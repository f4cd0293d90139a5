//! Directory protocol seam
//!
//! Everything above this module talks to directory servers through
//! [`DirectoryConnector`] and [`DirectorySession`]. The LDAP implementation
//! lives in [`crate::ldap`], an in-memory one in [`crate::memory`].

use async_trait::async_trait;
use portico_core::types::{DirectoryRecord, Endpoint, EndpointFailure};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

/// Opens sessions against individual endpoints
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Open a fresh connection. Sessions are never pooled or reused.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DirectorySession>, EndpointFailure>;
}

/// One open connection to one endpoint
#[async_trait]
pub trait DirectorySession: Send {
    /// Authenticate the session as `principal`
    async fn bind(&mut self, principal: &str, credential: &str) -> Result<(), EndpointFailure>;

    /// Search for records matching `filter` under `base`
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryRecord>, EndpointFailure>;

    /// Release the connection. Errors are swallowed.
    async fn close(&mut self);
}

/// Work performed against one endpoint once a session is open
#[async_trait]
pub trait EndpointOperation: Send + Sync {
    type Output: Send;

    /// Short label used in logs and metrics
    fn name(&self) -> &'static str;

    async fn run(&self, session: &mut dyn DirectorySession) -> Result<Self::Output, EndpointFailure>;
}

/// Open a session on `endpoint`, run `operation`, and close the session
/// whatever the outcome. Every step is bounded by `limit`.
pub async fn with_session<O: EndpointOperation>(
    connector: &dyn DirectoryConnector,
    endpoint: &Endpoint,
    limit: Duration,
    operation: &O,
) -> Result<O::Output, EndpointFailure> {
    let mut session = bounded(limit, connector.connect(endpoint)).await?;

    let outcome = bounded(limit, operation.run(session.as_mut())).await;

    if tokio::time::timeout(limit, session.close()).await.is_err() {
        debug!(endpoint = %endpoint, "Closing session timed out");
    }

    outcome
}

async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, EndpointFailure>
where
    F: Future<Output = Result<T, EndpointFailure>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EndpointFailure::timeout(limit)),
    }
}

/// Bind with a fixed principal and credential
#[derive(Clone)]
pub struct CredentialBind {
    principal: String,
    credential: String,
}

impl CredentialBind {
    pub fn new(principal: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            credential: credential.into(),
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub async fn apply(&self, session: &mut dyn DirectorySession) -> Result<(), EndpointFailure> {
        session.bind(&self.principal, &self.credential).await
    }
}

impl std::fmt::Debug for CredentialBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBind")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EndpointOperation for CredentialBind {
    type Output = ();

    fn name(&self) -> &'static str {
        "bind"
    }

    async fn run(&self, session: &mut dyn DirectorySession) -> Result<(), EndpointFailure> {
        self.apply(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{StaticDirectory, StaticServer};
    use portico_core::types::FailureKind;

    #[tokio::test]
    async fn test_session_closed_after_success_and_failure() {
        let directory = StaticDirectory::new()
            .server("ldap://dc1", StaticServer::online().account("svc@corp", "pw"));
        let endpoint = Endpoint::new("ldap://dc1");
        let limit = Duration::from_secs(1);

        let ok = with_session(&directory, &endpoint, limit, &CredentialBind::new("svc@corp", "pw")).await;
        assert!(ok.is_ok());
        assert_eq!(directory.open_sessions(), 0);

        let rejected =
            with_session(&directory, &endpoint, limit, &CredentialBind::new("svc@corp", "bad")).await;
        assert_eq!(rejected.unwrap_err().kind, FailureKind::Bind);
        assert_eq!(directory.open_sessions(), 0);
        assert_eq!(directory.contacted().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connect_failure() {
        let directory = StaticDirectory::new().server("ldap://dc1", StaticServer::unreachable());
        let result = with_session(
            &directory,
            &Endpoint::new("ldap://dc1"),
            Duration::from_secs(1),
            &CredentialBind::new("svc", "pw"),
        )
        .await;

        assert_eq!(result.unwrap_err().kind, FailureKind::Connect);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let directory = StaticDirectory::new().server(
            "ldap://dc1",
            StaticServer::online()
                .account("svc", "pw")
                .with_delay(Duration::from_secs(5)),
        );
        let result = with_session(
            &directory,
            &Endpoint::new("ldap://dc1"),
            Duration::from_millis(50),
            &CredentialBind::new("svc", "pw"),
        )
        .await;

        assert_eq!(result.unwrap_err().kind, FailureKind::Timeout);
        assert_eq!(directory.open_sessions(), 0);
    }

    #[test]
    fn test_debug_hides_credential() {
        let rendered = format!("{:?}", CredentialBind::new("jdoe@corp", "hunter2"));
        assert!(rendered.contains("jdoe@corp"));
        assert!(!rendered.contains("hunter2"));
    }
}
