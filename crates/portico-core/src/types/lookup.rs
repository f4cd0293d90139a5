//! Lookup and authentication results, and attribute normalization

use serde::{Deserialize, Serialize};

use super::DirectoryRecord;
use crate::config::AttributeMappings;
use crate::DEFAULT_DEPARTMENT;

/// Normalized view of one directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl LookupResult {
    /// Normalize a search record. `requested_login` is used when the record
    /// does not carry the account attribute.
    pub fn from_record(
        record: &DirectoryRecord,
        requested_login: &str,
        mappings: &AttributeMappings,
        phone_country_code: &str,
    ) -> Self {
        let login = record
            .first(&mappings.account)
            .filter(|v| !v.is_empty())
            .unwrap_or(requested_login)
            .to_string();

        Self {
            login,
            name: record
                .first(&mappings.name)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string),
            email: record
                .first(&mappings.email)
                .map(normalize_email)
                .filter(|v| !v.is_empty()),
            phone: record
                .first(&mappings.phone)
                .and_then(|raw| normalize_phone(raw, phone_country_code)),
        }
    }
}

/// Successful credential verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub status: String,
    pub message: String,
    pub login: String,
}

impl AuthOutcome {
    pub fn authenticated(login: impl Into<String>) -> Self {
        Self {
            status: "OK".to_string(),
            message: "authenticated".to_string(),
            login: login.into(),
        }
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Keep digits only, then drop one leading country code.
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = if country_code.is_empty() {
        digits.as_str()
    } else {
        digits.strip_prefix(country_code).unwrap_or(&digits)
    };

    if local.is_empty() {
        None
    } else {
        Some(local.to_string())
    }
}

/// Split a comma-separated department list. Blank input, or input with only
/// blank elements, yields `default`, itself a comma-separated list. A blank
/// default falls back to [`DEFAULT_DEPARTMENT`].
pub fn parse_departments(raw: Option<&str>, default: &str) -> Vec<String> {
    let departments = split_list(raw.unwrap_or_default());
    if !departments.is_empty() {
        return departments;
    }

    let defaults = split_list(default);
    if defaults.is_empty() {
        vec![DEFAULT_DEPARTMENT.to_string()]
    } else {
        defaults
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("+55 (11) 3333-4444", "55"), Some("1133334444".to_string()));
        assert_eq!(normalize_phone("11 3333-4444", "55"), Some("1133334444".to_string()));
        // Only a leading country code is stripped
        assert_eq!(normalize_phone("(11) 5555-0000", "55"), Some("1155550000".to_string()));
        assert_eq!(normalize_phone("ramal", "55"), None);
        assert_eq!(normalize_phone("+55", "55"), None);
        assert_eq!(normalize_phone("+1 555 0100", ""), Some("15550100".to_string()));
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email(" JDoe@Example.COM "), "jdoe@example.com");
    }

    #[test]
    fn test_department_parsing() {
        assert_eq!(parse_departments(None, "SMUL"), vec!["SMUL"]);
        assert_eq!(parse_departments(Some(""), "SMUL"), vec!["SMUL"]);
        assert_eq!(parse_departments(Some(" , "), "SMUL"), vec!["SMUL"]);
        assert_eq!(parse_departments(Some("A,B"), "SMUL"), vec!["A", "B"]);
        assert_eq!(parse_departments(Some(" A , ,B "), "SMUL"), vec!["A", "B"]);
    }

    #[test]
    fn test_default_departments_are_a_list() {
        assert_eq!(parse_departments(None, "SMUL, SEHAB"), vec!["SMUL", "SEHAB"]);
        assert_eq!(parse_departments(Some(" "), "SMUL,SEHAB"), vec!["SMUL", "SEHAB"]);
        assert_eq!(
            parse_departments(Some(""), "SMUL,SEHAB"),
            parse_departments(Some("SMUL,SEHAB"), "SMUL")
        );
        assert_eq!(parse_departments(None, " , "), vec![DEFAULT_DEPARTMENT]);
        assert_eq!(parse_departments(None, ""), vec![DEFAULT_DEPARTMENT]);
    }

    #[test]
    fn test_empty_name_and_email_are_absent() {
        let record = DirectoryRecord::new("CN=jdoe,DC=corp")
            .with_attr("sAMAccountName", "jdoe")
            .with_attr("name", "")
            .with_attr("mail", "  ");

        let result = LookupResult::from_record(&record, "jdoe", &AttributeMappings::default(), "55");

        assert!(result.name.is_none());
        assert!(result.email.is_none());
        assert_eq!(serde_json::to_value(&result).unwrap(), serde_json::json!({ "login": "jdoe" }));
    }

    #[test]
    fn test_lookup_from_full_record() {
        let record = DirectoryRecord::new("CN=John Doe,OU=Users,DC=corp")
            .with_attr("sAMAccountName", "JDoe")
            .with_attr("name", "John Doe")
            .with_attr("mail", "John.Doe@Corp.Example")
            .with_attr("telephoneNumber", "+55 11 3333-4444");

        let result = LookupResult::from_record(&record, "jdoe", &AttributeMappings::default(), "55");

        assert_eq!(result.login, "JDoe");
        assert_eq!(result.name.as_deref(), Some("John Doe"));
        assert_eq!(result.email.as_deref(), Some("john.doe@corp.example"));
        assert_eq!(result.phone.as_deref(), Some("1133334444"));
    }

    #[test]
    fn test_lookup_from_sparse_record() {
        let record = DirectoryRecord::new("CN=jdoe,OU=Users,DC=corp");
        let result = LookupResult::from_record(&record, "jdoe", &AttributeMappings::default(), "55");

        assert_eq!(result.login, "jdoe");
        assert!(result.name.is_none());
        assert!(result.email.is_none());
        assert!(result.phone.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "login": "jdoe" }));
    }
}
