//! Directory records and per-endpoint failure types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::Endpoint;

/// Stage at which an endpoint failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Could not open a connection
    Connect,
    /// Bind was rejected or errored
    Bind,
    /// Search was rejected or errored
    Search,
    /// Search succeeded with zero records
    NoMatch,
    /// Endpoint did not answer within the configured timeout
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Bind => "bind",
            Self::Search => "search",
            Self::NoMatch => "no_match",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one operation against one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct EndpointFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl EndpointFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Connect, message)
    }

    pub fn bind(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Bind, message)
    }

    pub fn search(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Search, message)
    }

    pub fn no_match() -> Self {
        Self::new(FailureKind::NoMatch, "search returned no entries")
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("no answer within {}ms", limit.as_millis()),
        )
    }

    /// Soft failures mean "not here", not "broken"
    pub fn is_soft(&self) -> bool {
        self.kind == FailureKind::NoMatch
    }
}

/// One failed attempt during a failover sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub server: Endpoint,
    #[serde(flatten)]
    pub failure: EndpointFailure,
}

/// Ordered failures accumulated while trying candidates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptLog(Vec<FailedAttempt>);

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, server: Endpoint, failure: EndpointFailure) {
        self.0.push(FailedAttempt { server, failure });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailedAttempt> {
        self.0.iter()
    }

    pub fn endpoints(&self) -> Vec<&Endpoint> {
        self.0.iter().map(|a| &a.server).collect()
    }

    /// True when every recorded failure was a soft one
    pub fn all_soft(&self) -> bool {
        self.0.iter().all(|a| a.failure.is_soft())
    }
}

/// One entry returned by a directory search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryRecord {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.entry(name.into()).or_default().push(value.into());
        self
    }

    /// First value of an attribute. Directory attribute names are
    /// case-insensitive, so an exact match is preferred but not required.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .or_else(|| {
                self.attrs
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_log_order_and_softness() {
        let mut log = AttemptLog::new();
        assert!(log.is_empty());

        log.record(Endpoint::new("ldap://a"), EndpointFailure::no_match());
        log.record(Endpoint::new("ldap://b"), EndpointFailure::no_match());
        assert!(log.all_soft());

        log.record(Endpoint::new("ldap://c"), EndpointFailure::connect("refused"));
        assert!(!log.all_soft());
        assert_eq!(log.len(), 3);

        let servers: Vec<&str> = log.endpoints().into_iter().map(|e| e.as_str()).collect();
        assert_eq!(servers, vec!["ldap://a", "ldap://b", "ldap://c"]);
    }

    #[test]
    fn test_attempt_log_serialization() {
        let mut log = AttemptLog::new();
        log.record(Endpoint::new("ldap://a"), EndpointFailure::bind("invalid credentials"));

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["server"], "ldap://a");
        assert_eq!(json[0]["kind"], "bind");
        assert_eq!(json[0]["message"], "invalid credentials");
    }

    #[test]
    fn test_record_attribute_lookup_ignores_case() {
        let record = DirectoryRecord::new("cn=jdoe,dc=example,dc=com")
            .with_attr("sAMAccountName", "JDoe")
            .with_attr("mail", "JDoe@Example.com");

        assert_eq!(record.first("sAMAccountName"), Some("JDoe"));
        assert_eq!(record.first("samaccountname"), Some("JDoe"));
        assert_eq!(record.first("telephoneNumber"), None);
    }

    #[test]
    fn test_timeout_failure_message() {
        let failure = EndpointFailure::timeout(Duration::from_millis(1500));
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.to_string(), "timeout: no answer within 1500ms");
        assert!(!failure.is_soft());
    }
}
