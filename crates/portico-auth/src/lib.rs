//! Directory access for Portico
//!
//! The pool of directory endpoints sits behind [`DirectoryConnector`]. On top
//! of it:
//! - [`HealthEvaluator`] checks the pool and classifies it OK/WARNING/ERROR
//! - [`FailoverOrchestrator`] tries an operation on candidates in order
//! - [`DirectoryService`] combines both into authenticate and lookup
//!
//! [`LdapConnector`] talks to real servers. With the `test-util` feature,
//! `StaticDirectory` serves in-memory data for tests.

pub mod connector;
pub mod failover;
pub mod health;
pub mod ldap;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod service;
mod telemetry;

pub use connector::{
    with_session, CredentialBind, DirectoryConnector, DirectorySession, EndpointOperation, SearchScope,
};
pub use failover::FailoverOrchestrator;
pub use health::HealthEvaluator;
pub use ldap::{lookup_filter, LdapConnector};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{StaticDirectory, StaticServer};
pub use service::DirectoryService;
pub use telemetry::names as metric_names;
