//! Argument validators shared across adapters.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ProviderError, ProviderResult};

static ACCOUNT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]{1,63}$").expect("valid account name regex")
});

static SUBDOMAIN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,62}[a-z0-9])?$").expect("valid subdomain regex")
});

static CHILD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]{0,63}$").expect("valid child name regex")
});

static RAI_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{2,64}$").expect("valid rai name regex"));

static RESOURCE_GROUP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-\w._()]{1,90}$").expect("valid resource group regex")
});

/// 2-64 characters, starting alphanumeric, then alphanumerics, `_`, `.` or `-`.
pub fn account_name(value: &str) -> ProviderResult<()> {
    if ACCOUNT_NAME.is_match(value) {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "name {value:?} must be 2-64 characters, start with a letter or digit, and contain \
             only letters, digits, '_', '.' and '-'"
        )))
    }
}

/// Lower-case DNS label used as the account's custom subdomain.
pub fn custom_subdomain_name(value: &str) -> ProviderResult<()> {
    if SUBDOMAIN_NAME.is_match(value) {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "custom_subdomain_name {value:?} must be 1-64 lower-case letters, digits or '-', and \
             cannot start or end with '-'"
        )))
    }
}

/// Name of a deployment, project, connection or commitment plan.
pub fn child_name(field: &str, value: &str) -> ProviderResult<()> {
    if CHILD_NAME.is_match(value) {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "{field} {value:?} must be 1-64 characters, start with a letter or digit, and \
             contain only letters, digits, '_', '.' and '-'"
        )))
    }
}

/// Name of an RAI policy, blocklist or blocklist item.
pub fn rai_name(field: &str, value: &str) -> ProviderResult<()> {
    if RAI_NAME.is_match(value) {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "{field} {value:?} must be 2-64 characters of letters, digits, '_' or '-'"
        )))
    }
}

pub fn resource_group_name(value: &str) -> ProviderResult<()> {
    if RESOURCE_GROUP_NAME.is_match(value) && !value.ends_with('.') {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "resource_group_name {value:?} must be 1-90 characters of letters, digits, '_', '-', \
             '.', '(' or ')' and cannot end with '.'"
        )))
    }
}

pub fn not_empty(field: &str, value: &str) -> ProviderResult<()> {
    if value.trim().is_empty() {
        Err(ProviderError::Validation(format!("{field} cannot be empty")))
    } else {
        Ok(())
    }
}

/// Case-sensitive membership check against the values ARM accepts.
pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> ProviderResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ProviderError::Validation(format!(
            "{field} must be one of {allowed:?}, got {value:?}"
        )))
    }
}

pub fn url(field: &str, value: &str) -> ProviderResult<()> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ProviderError::Validation(format!(
            "{field} must be an http(s) URL, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_names() {
        assert!(account_name("my-account.1").is_ok());
        assert!(account_name("a").is_err());
        assert!(account_name("-leading").is_err());
        assert!(account_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn subdomains() {
        assert!(custom_subdomain_name("contoso-ai").is_ok());
        assert!(custom_subdomain_name("x").is_ok());
        assert!(custom_subdomain_name("Contoso").is_err());
        assert!(custom_subdomain_name("trailing-").is_err());
    }

    #[test]
    fn rai_names() {
        assert!(rai_name("name", "strict_policy-1").is_ok());
        assert!(rai_name("name", "a").is_err());
        assert!(rai_name("name", "has space").is_err());
    }

    #[test]
    fn resource_group_names() {
        assert!(resource_group_name("rg-(prod)_1").is_ok());
        assert!(resource_group_name("ends.").is_err());
        assert!(resource_group_name("").is_err());
    }

    #[test]
    fn one_of_lists_allowed_values() {
        let err = one_of("mode", "Sometimes", &["Default", "Blocking"]).unwrap_err();
        assert!(err.to_string().contains("Default"));
        assert!(one_of("mode", "Blocking", &["Default", "Blocking"]).is_ok());
    }

    #[test]
    fn urls() {
        assert!(url("endpoint", "https://contoso.azurewebsites.net").is_ok());
        assert!(url("endpoint", "ftp://x").is_err());
        assert!(url("endpoint", "nope").is_err());
    }
}
