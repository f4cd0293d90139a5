//! In-memory directory
//!
//! A [`DirectoryConnector`] backed by static data. Each endpoint can be made
//! unreachable, slow, or broken for searches, and every connection attempt is
//! recorded. Only built for tests and with the `test-util` feature.
//!
//! Search filters support `&`, `|`, `!`, equality and presence (`attr=*`)
//! with case-insensitive matching.

use async_trait::async_trait;
use parking_lot::Mutex;
use portico_core::types::{DirectoryRecord, Endpoint, EndpointFailure};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::connector::{DirectoryConnector, DirectorySession, SearchScope};

/// Behaviour and contents of one in-memory endpoint
#[derive(Debug, Clone, Default)]
pub struct StaticServer {
    reachable: bool,
    accounts: HashMap<String, String>,
    entries: Vec<DirectoryRecord>,
    search_error: Option<String>,
    delay: Option<Duration>,
}

impl StaticServer {
    pub fn online() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Accept binds for `principal` with `credential`
    pub fn account(mut self, principal: impl Into<String>, credential: impl Into<String>) -> Self {
        self.accounts.insert(principal.into(), credential.into());
        self
    }

    pub fn entry(mut self, record: DirectoryRecord) -> Self {
        self.entries.push(record);
        self
    }

    /// Fail every search with `message`
    pub fn failing_search(mut self, message: impl Into<String>) -> Self {
        self.search_error = Some(message.into());
        self
    }

    /// Delay every connection by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// In-memory pool of directory endpoints
#[derive(Default)]
pub struct StaticDirectory {
    servers: HashMap<Endpoint, Arc<StaticServer>>,
    contacted: Mutex<Vec<Endpoint>>,
    open: Arc<AtomicUsize>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(mut self, endpoint: impl Into<Endpoint>, server: StaticServer) -> Self {
        self.servers.insert(endpoint.into(), Arc::new(server));
        self
    }

    /// Endpoints contacted so far, in order
    pub fn contacted(&self) -> Vec<Endpoint> {
        self.contacted.lock().clone()
    }

    pub fn reset_contacts(&self) {
        self.contacted.lock().clear();
    }

    /// Sessions opened and not yet closed
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryConnector for StaticDirectory {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DirectorySession>, EndpointFailure> {
        self.contacted.lock().push(endpoint.clone());

        let server = match self.servers.get(endpoint) {
            Some(server) => server.clone(),
            None => return Err(EndpointFailure::connect(format!("unknown endpoint {}", endpoint))),
        };

        if let Some(delay) = server.delay {
            tokio::time::sleep(delay).await;
        }

        if !server.reachable {
            return Err(EndpointFailure::connect(format!("connection refused by {}", endpoint)));
        }

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticSession {
            server,
            open: self.open.clone(),
            bound: false,
            closed: false,
        }))
    }
}

struct StaticSession {
    server: Arc<StaticServer>,
    open: Arc<AtomicUsize>,
    bound: bool,
    closed: bool,
}

#[async_trait]
impl DirectorySession for StaticSession {
    async fn bind(&mut self, principal: &str, credential: &str) -> Result<(), EndpointFailure> {
        match self.server.accounts.get(principal) {
            Some(expected) if expected == credential => {
                self.bound = true;
                Ok(())
            }
            _ => {
                self.bound = false;
                Err(EndpointFailure::bind("invalid credentials (rc=49)"))
            }
        }
    }

    async fn search(
        &mut self,
        _base: &str,
        _scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryRecord>, EndpointFailure> {
        if !self.bound {
            return Err(EndpointFailure::search("operations error: bind required"));
        }
        if let Some(message) = &self.server.search_error {
            return Err(EndpointFailure::search(message.clone()));
        }

        let filter = Filter::parse(filter)
            .ok_or_else(|| EndpointFailure::search(format!("bad search filter: {}", filter)))?;

        Ok(self
            .server
            .entries
            .iter()
            .filter(|record| filter.matches(record))
            .map(|record| project(record, attributes))
            .collect())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for StaticSession {
    fn drop(&mut self) {
        if !self.closed {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Keep only requested attributes; an empty request keeps everything
fn project(record: &DirectoryRecord, attributes: &[&str]) -> DirectoryRecord {
    if attributes.is_empty() {
        return record.clone();
    }

    DirectoryRecord {
        dn: record.dn.clone(),
        attrs: record
            .attrs
            .iter()
            .filter(|(name, _)| attributes.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect(),
    }
}

#[derive(Debug, PartialEq)]
enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal(String, String),
    Present(String),
}

impl Filter {
    fn parse(input: &str) -> Option<Self> {
        let (filter, rest) = Self::parse_one(input.trim())?;
        rest.is_empty().then_some(filter)
    }

    fn parse_one(input: &str) -> Option<(Self, &str)> {
        let body = input.strip_prefix('(')?;

        if let Some(rest) = body.strip_prefix('&') {
            let (children, rest) = Self::parse_list(rest)?;
            return Some((Filter::And(children), rest));
        }
        if let Some(rest) = body.strip_prefix('|') {
            let (children, rest) = Self::parse_list(rest)?;
            return Some((Filter::Or(children), rest));
        }
        if let Some(rest) = body.strip_prefix('!') {
            let (child, rest) = Self::parse_one(rest)?;
            let rest = rest.strip_prefix(')')?;
            return Some((Filter::Not(Box::new(child)), rest));
        }

        let end = body.find(')')?;
        let (attr, value) = body[..end].split_once('=')?;
        let filter = if value == "*" {
            Filter::Present(attr.to_string())
        } else {
            Filter::Equal(attr.to_string(), unescape(value)?)
        };
        Some((filter, &body[end + 1..]))
    }

    fn parse_list(mut input: &str) -> Option<(Vec<Self>, &str)> {
        let mut children = Vec::new();
        while !input.starts_with(')') {
            let (child, rest) = Self::parse_one(input)?;
            children.push(child);
            input = rest;
        }
        Some((children, &input[1..]))
    }

    fn matches(&self, record: &DirectoryRecord) -> bool {
        match self {
            Filter::And(children) => children.iter().all(|c| c.matches(record)),
            Filter::Or(children) => children.iter().any(|c| c.matches(record)),
            Filter::Not(child) => !child.matches(record),
            Filter::Present(attr) => record.first(attr).is_some(),
            Filter::Equal(attr, value) => record
                .attrs
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case(attr))
                .flat_map(|(_, values)| values)
                .any(|v| v.eq_ignore_ascii_case(value)),
        }
    }
}

/// Undo RFC 4515 `\XX` escapes
fn unescape(value: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut iter = value.bytes();
    while let Some(b) = iter.next() {
        if b == b'\\' {
            let hi = iter.next()?;
            let lo = iter.next()?;
            let hex = [hi, lo];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(b);
        }
    }
    String::from_utf8(bytes).ok()
}
