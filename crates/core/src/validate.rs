//! Input validation for the provisioning API boundary.
//!
//! Invariants are enforced here before any external call is issued, so
//! a malformed request never leaves side effects in the registrar or
//! the email identity service.

use crate::error::{ProvisioningError, ProvisioningResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Alphanumeric/hyphen labels separated by dots, TLD at least 2 letters.
static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$").unwrap()
});

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static EMAIL_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap());

/// Normalize a raw domain to its canonical lowercase form and validate
/// it against the hostname pattern.
pub fn normalize_domain(raw: &str) -> ProvisioningResult<String> {
    let domain = raw.trim().to_lowercase();
    if domain.is_empty() {
        return Err(ProvisioningError::Validation(
            "domain must not be empty".to_string(),
        ));
    }
    if !HOSTNAME_RE.is_match(&domain) {
        return Err(ProvisioningError::Validation(format!(
            "'{domain}' is not a valid domain name"
        )));
    }
    Ok(domain)
}

pub fn validate_forward_email(email: &str) -> ProvisioningResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ProvisioningError::Validation(format!(
            "'{email}' is not a valid email address"
        )))
    }
}

pub fn validate_email_prefix(prefix: &str) -> ProvisioningResult<()> {
    if EMAIL_PREFIX_RE.is_match(prefix) {
        Ok(())
    } else {
        Err(ProvisioningError::Validation(
            "email prefix may only contain letters, digits, '.', '_' and '-'"
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain_lowercases_and_trims() {
        assert_eq!(normalize_domain(" MyShop.Com ").unwrap(), "myshop.com");
        assert_eq!(normalize_domain("shop.example.co").unwrap(), "shop.example.co");
    }

    #[test]
    fn test_normalize_domain_rejects_garbage() {
        assert!(normalize_domain("").is_err());
        assert!(normalize_domain("no-tld").is_err());
        assert!(normalize_domain("shop.c").is_err());
        assert!(normalize_domain("-shop.com").is_err());
        assert!(normalize_domain("shop .com").is_err());
        assert!(normalize_domain("shop_underscore.com").is_err());
    }

    #[test]
    fn test_forward_email_pattern() {
        assert!(validate_forward_email("owner@example.com").is_ok());
        assert!(validate_forward_email("owner@example").is_err());
        assert!(validate_forward_email("owner example.com").is_err());
        assert!(validate_forward_email("@example.com").is_err());
    }

    #[test]
    fn test_email_prefix_pattern() {
        assert!(validate_email_prefix("hello").is_ok());
        assert!(validate_email_prefix("first.last_01-x").is_ok());
        assert!(validate_email_prefix("bad prefix").is_err());
        assert!(validate_email_prefix("bad+tag").is_err());
        assert!(validate_email_prefix("").is_err());
    }
}
