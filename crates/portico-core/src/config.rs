//! Configuration for Portico

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::types::{Endpoint, HealthPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PorticoConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PorticoConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Build configuration from the environment. Besides the `PORTICO_*`
    /// variables, the `LDAP_USER`, `LDAP_PASS`, `LDAP_DOMAIN` and `LDAP_BASE`
    /// names used by existing deployments are honoured.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load from `path` when given, otherwise from the environment. A file
    /// never has to carry the service password: `PORTICO_LDAP_PASSWORD` or
    /// `LDAP_PASS` override whatever it holds.
    pub fn load(path: Option<&str>) -> crate::Result<Self> {
        match path {
            Some(path) => {
                let mut config = Self::from_file(path)?;
                config.apply_secret_env(|key| std::env::var(key).ok());
                Ok(config)
            }
            None => Ok(Self::from_env()),
        }
    }

    fn apply_secret_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(pass) = ["PORTICO_LDAP_PASSWORD", "LDAP_PASS"].iter().find_map(|k| var(*k)) {
            self.directory.service_password = pass;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| var(*k));

        if let Some(addr) = var("PORTICO_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(port) = var("PORTICO_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(level) = var("PORTICO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("PORTICO_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(servers) = var("PORTICO_LDAP_SERVERS") {
            self.directory.endpoints = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Endpoint::from)
                .collect();
        }
        if let Some(user) = first(&["PORTICO_LDAP_USER", "LDAP_USER"]) {
            self.directory.service_user = user;
        }
        if let Some(domain) = first(&["PORTICO_LDAP_DOMAIN", "LDAP_DOMAIN"]) {
            self.directory.domain_suffix = domain;
        }
        if let Some(base) = first(&["PORTICO_LDAP_BASE", "LDAP_BASE"]) {
            self.directory.search_base = base;
        }
        self.apply_secret_env(&var);
        if let Some(departments) = var("PORTICO_DEFAULT_DEPARTMENTS") {
            self.directory.default_departments = departments;
        }
        if let Some(timeout) = var("PORTICO_LDAP_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.directory.timeout_seconds = t;
            }
        }
        if var("PORTICO_LDAP_STARTTLS").map(|v| v == "true").unwrap_or(false) {
            self.directory.start_tls = true;
        }
        if let Some(parallel) = var("PORTICO_HEALTH_PARALLEL") {
            self.health.parallel_checks = parallel != "false";
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.directory.validate()?;
        self.health.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Directory pool and service account settings
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Ordered pool of directory servers (ldap:// or ldaps://).
    /// Order is the default try-order.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// Service account used for health checks and lookups
    #[serde(default)]
    pub service_user: String,

    #[serde(default, skip_serializing)]
    pub service_password: String,

    /// Appended to the service user and to caller logins to form bind
    /// principals. Example: "@corp.example"
    #[serde(default)]
    pub domain_suffix: String,

    /// Base DN for user searches
    #[serde(default)]
    pub search_base: String,

    /// Comma-separated departments used when a lookup names none
    #[serde(default = "default_departments")]
    pub default_departments: String,

    #[serde(default)]
    pub attribute_mappings: AttributeMappings,

    /// Country code stripped from normalized phone numbers
    #[serde(default = "default_phone_country_code")]
    pub phone_country_code: String,

    /// Per-endpoint timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Use STARTTLS for plain ldap:// endpoints
    #[serde(default)]
    pub start_tls: bool,
}

fn default_departments() -> String {
    crate::DEFAULT_DEPARTMENT.to_string()
}

fn default_phone_country_code() -> String {
    crate::DEFAULT_PHONE_COUNTRY_CODE.to_string()
}

fn default_timeout() -> u64 {
    crate::DEFAULT_ENDPOINT_TIMEOUT_SECS
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            service_user: String::new(),
            service_password: String::new(),
            domain_suffix: String::new(),
            search_base: String::new(),
            default_departments: default_departments(),
            attribute_mappings: AttributeMappings::default(),
            phone_country_code: default_phone_country_code(),
            timeout_seconds: default_timeout(),
            start_tls: false,
        }
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("endpoints", &self.endpoints)
            .field("service_user", &self.service_user)
            .field("service_password", &"<redacted>")
            .field("domain_suffix", &self.domain_suffix)
            .field("search_base", &self.search_base)
            .field("default_departments", &self.default_departments)
            .field("attribute_mappings", &self.attribute_mappings)
            .field("phone_country_code", &self.phone_country_code)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("start_tls", &self.start_tls)
            .finish()
    }
}

impl DirectoryConfig {
    /// Bind principal of the service account
    pub fn service_principal(&self) -> String {
        self.user_principal(&self.service_user)
    }

    /// Bind principal for a caller login
    pub fn user_principal(&self, login: &str) -> String {
        format!("{}{}", login, self.domain_suffix)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.endpoints.is_empty() {
            return Err(crate::Error::Config(
                "At least one directory endpoint is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !endpoint.has_directory_scheme() {
                return Err(crate::Error::Config(format!(
                    "Endpoint must start with ldap:// or ldaps://: {}",
                    endpoint
                )));
            }
            if !seen.insert(endpoint) {
                return Err(crate::Error::Config(format!(
                    "Duplicate directory endpoint: {}",
                    endpoint
                )));
            }
        }

        if self.service_user.is_empty() {
            return Err(crate::Error::Config("Service user is required".into()));
        }

        if self.service_password.is_empty() {
            return Err(crate::Error::Config(
                "Service password is required (set PORTICO_LDAP_PASSWORD or LDAP_PASS)".into(),
            ));
        }

        if self.search_base.is_empty() {
            return Err(crate::Error::Config("Search base is required".into()));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::Config(
                "Endpoint timeout must be at least one second".into(),
            ));
        }

        Ok(())
    }
}

/// Directory attribute names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeMappings {
    /// Account (login) attribute
    #[serde(default = "default_account_attr")]
    pub account: String,

    /// Department attribute used by lookup filters
    #[serde(default = "default_department_attr")]
    pub department: String,

    #[serde(default = "default_name_attr")]
    pub name: String,

    #[serde(default = "default_email_attr")]
    pub email: String,

    #[serde(default = "default_phone_attr")]
    pub phone: String,
}

fn default_account_attr() -> String {
    "sAMAccountName".to_string()
}

fn default_department_attr() -> String {
    "company".to_string()
}

fn default_name_attr() -> String {
    "name".to_string()
}

fn default_email_attr() -> String {
    "mail".to_string()
}

fn default_phone_attr() -> String {
    "telephoneNumber".to_string()
}

impl Default for AttributeMappings {
    fn default() -> Self {
        Self {
            account: default_account_attr(),
            department: default_department_attr(),
            name: default_name_attr(),
            email: default_email_attr(),
            phone: default_phone_attr(),
        }
    }
}

impl AttributeMappings {
    /// Attributes requested from every lookup search
    pub fn requested(&self) -> Vec<&str> {
        vec![
            self.account.as_str(),
            self.name.as_str(),
            self.email.as_str(),
            self.phone.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_ok_max_errors")]
    pub ok_max_errors: usize,

    #[serde(default = "default_warning_max_errors")]
    pub warning_max_errors: usize,

    /// Check endpoints concurrently instead of one after another
    #[serde(default = "default_parallel_checks")]
    pub parallel_checks: bool,
}

fn default_ok_max_errors() -> usize {
    crate::DEFAULT_OK_MAX_ERRORS
}

fn default_warning_max_errors() -> usize {
    crate::DEFAULT_WARNING_MAX_ERRORS
}

fn default_parallel_checks() -> bool {
    true
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ok_max_errors: default_ok_max_errors(),
            warning_max_errors: default_warning_max_errors(),
            parallel_checks: default_parallel_checks(),
        }
    }
}

impl HealthConfig {
    pub fn policy(&self) -> HealthPolicy {
        HealthPolicy {
            ok_max_errors: self.ok_max_errors,
            warning_max_errors: self.warning_max_errors,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.ok_max_errors > self.warning_max_errors {
            return Err(crate::Error::Config(format!(
                "ok_max_errors ({}) must not exceed warning_max_errors ({})",
                self.ok_max_errors, self.warning_max_errors
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn valid_directory() -> DirectoryConfig {
        DirectoryConfig {
            endpoints: vec![Endpoint::new("ldap://dc1"), Endpoint::new("ldaps://dc2:636")],
            service_user: "svc-portico".to_string(),
            service_password: "secret".to_string(),
            domain_suffix: "@corp.example".to_string(),
            search_base: "DC=corp,DC=example".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_principals() {
        let directory = valid_directory();
        assert_eq!(directory.service_principal(), "svc-portico@corp.example");
        assert_eq!(directory.user_principal("jdoe"), "jdoe@corp.example");
    }

    #[test]
    fn test_directory_validation() {
        assert!(valid_directory().validate().is_ok());

        let mut config = valid_directory();
        config.endpoints.clear();
        assert!(config.validate().is_err());

        let mut config = valid_directory();
        config.endpoints.push(Endpoint::new("ldap://dc1"));
        assert!(config.validate().is_err());

        let mut config = valid_directory();
        config.endpoints.push(Endpoint::new("http://dc3"));
        assert!(config.validate().is_err());

        let mut config = valid_directory();
        config.service_password.clear();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let mut config = valid_directory();
        config.search_base.clear();
        assert!(config.validate().is_err());

        let mut config = valid_directory();
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_health_validation() {
        let health = HealthConfig {
            ok_max_errors: 9,
            warning_max_errors: 8,
            parallel_checks: false,
        };
        assert!(health.validate().is_err());
        assert!(HealthConfig::default().validate().is_ok());
        assert_eq!(HealthConfig::default().policy(), HealthPolicy::default());
    }

    #[test]
    fn test_password_is_redacted() {
        let rendered = format!("{:?}", valid_directory());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret"));

        let serialized = serde_json::to_string(&valid_directory()).unwrap();
        assert!(!serialized.contains("secret"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
bind_address = "127.0.0.1"
port = 8080
request_timeout_secs = 10

[directory]
endpoints = ["ldap://10.0.0.1", "ldap://10.0.0.2"]
service_user = "svc"
service_password = "pw"
domain_suffix = "@corp"
search_base = "DC=corp"

[directory.attribute_mappings]
department = "department"

[health]
ok_max_errors = 1
"#
        )
        .unwrap();

        let config = PorticoConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.socket_address(), "127.0.0.1:8080");
        assert_eq!(config.directory.endpoints.len(), 2);
        assert_eq!(config.directory.service_password, "pw");
        assert_eq!(config.directory.default_departments, "SMUL");
        assert_eq!(config.directory.attribute_mappings.department, "department");
        assert_eq!(config.directory.attribute_mappings.account, "sAMAccountName");
        assert_eq!(config.health.ok_max_errors, 1);
        assert_eq!(config.health.warning_max_errors, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            PorticoConfig::from_toml("[directory\nendpoints = 3"),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_password_from_env_over_file() {
        let mut config = PorticoConfig::from_toml(
            r#"
[directory]
endpoints = ["ldap://10.0.0.1"]
service_user = "svc"
service_password = ""
search_base = "DC=corp"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let vars: HashMap<&str, &str> = [("LDAP_PASS", "legacy"), ("PORTICO_LDAP_PASSWORD", "pw")]
            .into_iter()
            .collect();
        config.apply_secret_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.directory.service_password, "pw");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file_keeps_file_password_without_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[directory]
endpoints = ["ldap://10.0.0.1"]
service_user = "svc"
service_password = "from-file"
search_base = "DC=corp"
"#
        )
        .unwrap();

        let mut config = PorticoConfig::from_file(file.path().to_str().unwrap()).unwrap();
        config.apply_secret_env(|_| None);
        assert_eq!(config.directory.service_password, "from-file");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORTICO_PORT", "9090"),
            ("PORTICO_LDAP_SERVERS", "ldap://a, ldap://b,,"),
            ("LDAP_USER", "legacy-user"),
            ("PORTICO_LDAP_USER", "svc"),
            ("LDAP_PASS", "pw"),
            ("LDAP_DOMAIN", "@corp"),
            ("LDAP_BASE", "DC=corp"),
            ("PORTICO_HEALTH_PARALLEL", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = PorticoConfig::default();
        config.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.directory.endpoints,
            vec![Endpoint::new("ldap://a"), Endpoint::new("ldap://b")]
        );
        assert_eq!(config.directory.service_user, "svc");
        assert_eq!(config.directory.service_password, "pw");
        assert_eq!(config.directory.service_principal(), "svc@corp");
        assert_eq!(config.directory.search_base, "DC=corp");
        assert!(!config.health.parallel_checks);
        assert!(config.validate().is_ok());
    }
}
