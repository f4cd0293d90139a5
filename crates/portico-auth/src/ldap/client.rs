//! LDAP client implementation
//!
//! Opens one `ldap3` connection per session. Supports LDAP, LDAPS (SSL) and
//! STARTTLS connections; certificate handling is left to `ldap3`.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use portico_core::config::DirectoryConfig;
use portico_core::types::{DirectoryRecord, Endpoint, EndpointFailure};
use std::time::Duration;
use tracing::debug;

use crate::connector::{DirectoryConnector, DirectorySession, SearchScope};

/// Connects to real directory servers
#[derive(Debug, Clone)]
pub struct LdapConnector {
    timeout: Duration,
    start_tls: bool,
}

impl LdapConnector {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            timeout: config.timeout(),
            start_tls: config.start_tls,
        }
    }

    /// STARTTLS only applies to plain ldap:// URLs
    fn uses_starttls(&self, endpoint: &Endpoint) -> bool {
        self.start_tls && endpoint.as_str().starts_with("ldap://")
    }

    fn settings(&self, endpoint: &Endpoint) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.uses_starttls(endpoint))
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DirectorySession>, EndpointFailure> {
        debug!("Connecting to LDAP server: {}", endpoint);

        let (conn, ldap) = LdapConnAsync::with_settings(self.settings(endpoint), endpoint.as_str())
            .await
            .map_err(|e| EndpointFailure::connect(format!("Failed to connect to LDAP server: {}", e)))?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapSession {
            ldap,
            endpoint: endpoint.clone(),
        }))
    }
}

struct LdapSession {
    ldap: Ldap,
    endpoint: Endpoint,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&mut self, principal: &str, credential: &str) -> Result<(), EndpointFailure> {
        self.ldap
            .simple_bind(principal, credential)
            .await
            .map_err(|e| EndpointFailure::bind(format!("Bind failed: {}", e)))?
            .success()
            .map_err(|e| EndpointFailure::bind(format!("Bind rejected: {}", e)))?;

        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryRecord>, EndpointFailure> {
        debug!(endpoint = %self.endpoint, "Searching with filter: {}", filter);

        let (rs, _res) = self
            .ldap
            .search(base, scope.into(), filter, attributes.to_vec())
            .await
            .map_err(|e| EndpointFailure::search(format!("Search failed: {}", e)))?
            .success()
            .map_err(|e| EndpointFailure::search(format!("Search error: {}", e)))?;

        Ok(rs
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryRecord {
                dn: entry.dn,
                attrs: entry.attrs,
            })
            .collect())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!(endpoint = %self.endpoint, "Unbind failed: {}", e);
        }
    }
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}
