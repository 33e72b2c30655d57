//! Shared data model for tenant domain and email provisioning.
//!
//! These types cross crate boundaries: the directory stores them, the
//! orchestrators mutate them, and the API server serializes them into
//! responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single DNS record the registrar should host for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    /// Fully-qualified record name, e.g. `abc123._domainkey.shop.com`.
    pub name: String,
    pub value: String,
    /// MX priority; `None` for every other record type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    Cname,
    Mx,
    Txt,
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cname => write!(f, "CNAME"),
            Self::Mx => write!(f, "MX"),
            Self::Txt => write!(f, "TXT"),
        }
    }
}

/// Ownership-verification challenge the registrar asks the tenant to
/// publish before it will serve the domain (typically a TXT record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVerification {
    #[serde(rename = "type")]
    pub record_type: String,
    pub domain: String,
    pub value: String,
}

/// A tenant's primary custom domain, created by the add-domain workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDomainConfig {
    /// Normalized lowercase host string.
    pub domain: String,
    pub added_at: DateTime<Utc>,
    pub registrar_verified: bool,
    pub registrar_verified_at: Option<DateTime<Utc>>,
}

/// A tenant's domain-branded email identity. Only exists while the
/// primary domain is registrar-verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantEmailConfig {
    /// Full sending address, `prefix@domain`.
    pub domain_email: String,
    pub email_prefix: String,
    pub dkim_tokens: Vec<String>,
    pub dkim_verified: bool,
    pub dkim_status: String,
    pub mx_verified: bool,
    pub spf_verified: bool,
    pub forward_to_email: String,
    pub forwarding_enabled: bool,
    pub forward_to_cal: bool,
    pub enabled_at: DateTime<Utc>,
}

/// Extra domains a tenant attached beyond the primary one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalDomain {
    pub domain: String,
    pub added_at: DateTime<Utc>,
    pub verified: bool,
}

/// Row in the global domain lookup index. The index is the sole
/// arbiter of domain ownership; registrar state is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLookupEntry {
    pub tenant_id: Uuid,
    pub forward_to_cal: bool,
}
