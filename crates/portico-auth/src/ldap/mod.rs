//! LDAP/Active Directory access
//!
//! Provides:
//! - [`LdapConnector`], the `ldap3` implementation of the directory seam
//! - Lookup filter construction with RFC 4515 escaping

mod client;
mod filter;

pub use client::LdapConnector;
pub use filter::lookup_filter;
