//! Authentication and lookup over the directory pool
//!
//! Both operations follow the same path:
//!
//! ```text
//! evaluate health ─┬─ ERROR, or no endpoint OK ──▶ DirectoryUnavailable
//!                  └─ OK / WARNING ──▶ healthy endpoints, pool order
//!                                      └─▶ failover ─┬─ success
//!                                                    └─ exhausted ──▶ Unauthorized
//!                                                                     NotFound
//!                                                                     DirectoryDegraded
//! ```

use async_trait::async_trait;
use portico_core::config::{AttributeMappings, DirectoryConfig, PorticoConfig};
use portico_core::types::{
    parse_departments, AuthOutcome, Endpoint, EndpointFailure, HealthSnapshot, LookupResult,
};
use portico_core::{Error, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::connector::{CredentialBind, DirectoryConnector, DirectorySession, EndpointOperation, SearchScope};
use crate::failover::FailoverOrchestrator;
use crate::health::HealthEvaluator;
use crate::ldap::lookup_filter;

pub struct DirectoryService {
    config: Arc<DirectoryConfig>,
    health: HealthEvaluator,
    failover: FailoverOrchestrator,
}

impl DirectoryService {
    pub fn new(config: &PorticoConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        let directory = Arc::new(config.directory.clone());
        let timeout = directory.timeout();

        let check_bind = CredentialBind::new(directory.service_principal(), directory.service_password.clone());
        let mut health = HealthEvaluator::new(connector.clone(), check_bind, config.health.policy(), timeout);
        if !config.health.parallel_checks {
            health = health.sequential();
        }

        Self {
            config: directory,
            health,
            failover: FailoverOrchestrator::new(connector, timeout),
        }
    }

    /// The configured pool, in try-order
    pub fn pool(&self) -> &[Endpoint] {
        &self.config.endpoints
    }

    /// Check the whole pool
    pub async fn health(&self) -> HealthSnapshot {
        self.health.evaluate(&self.config.endpoints).await
    }

    /// Verify a caller's credentials by binding as them.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<AuthOutcome> {
        let login = login.trim();
        if login.is_empty() {
            return Err(Error::InvalidInput("login is required".into()));
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("password is required".into()));
        }

        let (_health, candidates) = self.candidates("authenticate").await?;
        let bind = CredentialBind::new(self.config.user_principal(login), password);

        match self.failover.try_in_order(&candidates, &bind).await {
            Ok(()) => {
                info!(login = %login, "User authenticated");
                Ok(AuthOutcome::authenticated(login))
            }
            Err(attempts) => {
                warn!(login = %login, attempts = attempts.len(), "Authentication rejected");
                Err(Error::Unauthorized { attempts })
            }
        }
    }

    /// Find one user by login within the given departments.
    ///
    /// `departments` is a comma-separated list; blank means the configured
    /// default. An endpoint answering with no entries does not end the
    /// search: the next candidate may hold a different part of the
    /// directory.
    pub async fn find_by_login(&self, login: &str, departments: Option<&str>) -> Result<LookupResult> {
        let login = login.trim();
        if login.is_empty() {
            return Err(Error::InvalidInput("login is required".into()));
        }

        let departments = parse_departments(departments, &self.config.default_departments);
        let (health, candidates) = self.candidates("lookup").await?;

        let lookup = AccountLookup {
            bind: CredentialBind::new(self.config.service_principal(), self.config.service_password.clone()),
            base: self.config.search_base.clone(),
            filter: lookup_filter(
                &self.config.attribute_mappings.account,
                login,
                &self.config.attribute_mappings.department,
                &departments,
            ),
            login: login.to_string(),
            mappings: self.config.attribute_mappings.clone(),
            phone_country_code: self.config.phone_country_code.clone(),
        };

        match self.failover.try_in_order(&candidates, &lookup).await {
            Ok(user) => {
                info!(login = %user.login, "User found");
                Ok(user)
            }
            Err(attempts) if health.is_ok() && attempts.all_soft() => {
                info!(login = %login, searched = attempts.len(), "User not found");
                Err(Error::NotFound {
                    login: login.to_string(),
                })
            }
            Err(attempts) => {
                error!(
                    login = %login,
                    status = %health.status,
                    attempts = attempts.len(),
                    "Lookup exhausted all candidates"
                );
                Err(Error::DirectoryDegraded { health, attempts })
            }
        }
    }

    /// Evaluate health and derive the candidate list, failing fast when the
    /// pool is unusable.
    async fn candidates(&self, operation: &str) -> Result<(HealthSnapshot, Vec<Endpoint>)> {
        let health = self.health().await;

        if health.is_error() || health.ok_endpoints.is_empty() {
            error!(
                operation = operation,
                status = %health.status,
                errors = health.error_count(),
                "Directory pool unavailable, failing fast"
            );
            return Err(Error::DirectoryUnavailable { health });
        }

        let candidates = health.ok_endpoints.clone();
        Ok((health, candidates))
    }
}

/// Service bind, search, then normalize the first record
struct AccountLookup {
    bind: CredentialBind,
    base: String,
    filter: String,
    login: String,
    mappings: AttributeMappings,
    phone_country_code: String,
}

#[async_trait]
impl EndpointOperation for AccountLookup {
    type Output = LookupResult;

    fn name(&self) -> &'static str {
        "lookup"
    }

    async fn run(&self, session: &mut dyn DirectorySession) -> std::result::Result<LookupResult, EndpointFailure> {
        self.bind.apply(session).await?;

        let records = session
            .search(&self.base, SearchScope::Subtree, &self.filter, &self.mappings.requested())
            .await?;

        let record = records.first().ok_or_else(EndpointFailure::no_match)?;
        Ok(LookupResult::from_record(
            record,
            &self.login,
            &self.mappings,
            &self.phone_country_code,
        ))
    }
}
