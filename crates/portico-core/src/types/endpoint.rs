//! Directory endpoint types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of one directory server in the configured pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the URL uses a scheme the directory client understands
    pub fn has_directory_scheme(&self) -> bool {
        self.0.starts_with("ldap://") || self.0.starts_with("ldaps://")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Endpoint {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// Outcome of probing a single endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointOutcome {
    Ok,
    Error,
}

impl EndpointOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for EndpointOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check result for one endpoint, recomputed on every health evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub server: Endpoint,
    pub status: EndpointOutcome,
}

impl EndpointStatus {
    pub fn ok(server: Endpoint) -> Self {
        Self {
            server,
            status: EndpointOutcome::Ok,
        }
    }

    pub fn error(server: Endpoint) -> Self {
        Self {
            server,
            status: EndpointOutcome::Error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EndpointOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_detection() {
        assert!(Endpoint::new("ldap://10.0.0.1").has_directory_scheme());
        assert!(Endpoint::new("ldaps://dc.example.com:636").has_directory_scheme());
        assert!(!Endpoint::new("http://dc.example.com").has_directory_scheme());
        assert!(!Endpoint::new("").has_directory_scheme());
    }

    #[test]
    fn test_status_serialization() {
        let status = EndpointStatus::error(Endpoint::new("ldap://dc1"));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["server"], "ldap://dc1");
        assert_eq!(json["status"], "ERROR");
    }
}
