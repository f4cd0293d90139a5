//! Search filter construction

use ldap3::ldap_escape;

/// Filter matching `login` on the account attribute within any of
/// `departments`:
///
/// `(&(account=login)(|(department=A)(department=B)))`
///
/// All values are escaped, so neither argument can alter the filter's shape.
pub fn lookup_filter(
    account_attribute: &str,
    login: &str,
    department_attribute: &str,
    departments: &[String],
) -> String {
    let departments: String = departments
        .iter()
        .map(|d| format!("({}={})", department_attribute, ldap_escape(d.as_str())))
        .collect();

    format!(
        "(&({}={})(|{}))",
        account_attribute,
        ldap_escape(login),
        departments
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_department() {
        assert_eq!(
            lookup_filter("sAMAccountName", "jdoe", "company", &["SMUL".to_string()]),
            "(&(sAMAccountName=jdoe)(|(company=SMUL)))"
        );
    }

    #[test]
    fn test_multiple_departments() {
        let departments = vec!["SMUL".to_string(), "SEHAB".to_string()];
        assert_eq!(
            lookup_filter("sAMAccountName", "jdoe", "company", &departments),
            "(&(sAMAccountName=jdoe)(|(company=SMUL)(company=SEHAB)))"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let filter = lookup_filter(
            "sAMAccountName",
            "*)(objectClass=*",
            "company",
            &["A)(company=*".to_string()],
        );
        assert_eq!(
            filter,
            "(&(sAMAccountName=\\2a\\29\\28objectClass=\\2a)(|(company=A\\29\\28company=\\2a)))"
        );
    }
}
