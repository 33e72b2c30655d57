//! Email identity service client: wraps the transactional-email API
//! that authorizes sending as a tenant's custom domain.
//!
//! Also owns the computation of the DNS records a domain needs before
//! the provider will sign and route its mail — DKIM CNAMEs derived
//! from the verification tokens, an inbound MX, and an SPF TXT record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::config::EmailIdentityConfig;
use storefront_core::types::{DnsRecord, DnsRecordType};
use thiserror::Error;

mod http;
mod memory;

pub use http::HttpEmailIdentity;
pub use memory::InMemoryEmailIdentity;

/// DKIM verification state reported by the provider on creation.
pub const DKIM_STATUS_SUCCESS: &str = "SUCCESS";
pub const DKIM_STATUS_PENDING: &str = "PENDING";

#[derive(Error, Debug)]
pub enum EmailIdentityError {
    #[error("email identity request timed out")]
    Timeout,

    #[error("email identity service error: {0}")]
    Upstream(String),
}

/// A provisioned sending identity for one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainIdentity {
    pub dkim_tokens: Vec<String>,
    /// `SUCCESS` once the provider has observed the DKIM records,
    /// `PENDING` until then.
    pub verification_status: String,
}

#[async_trait]
pub trait EmailIdentityService: Send + Sync {
    async fn create_domain_identity(
        &self,
        domain: &str,
    ) -> Result<DomainIdentity, EmailIdentityError>;

    async fn delete_domain_identity(&self, domain: &str) -> Result<(), EmailIdentityError>;
}

/// Compute the DNS records a domain must publish for its email
/// identity: one DKIM CNAME per token, the inbound MX, and SPF.
pub fn dns_records_for_domain(
    domain: &str,
    dkim_tokens: &[String],
    config: &EmailIdentityConfig,
) -> Vec<DnsRecord> {
    let mut records: Vec<DnsRecord> = dkim_tokens
        .iter()
        .map(|token| DnsRecord {
            record_type: DnsRecordType::Cname,
            name: format!("{token}._domainkey.{domain}"),
            value: format!("{token}.{}", config.dkim_host),
            priority: None,
        })
        .collect();
    records.push(DnsRecord {
        record_type: DnsRecordType::Mx,
        name: domain.to_string(),
        value: config.inbound_mx.clone(),
        priority: Some(10),
    });
    records.push(DnsRecord {
        record_type: DnsRecordType::Txt,
        name: domain.to_string(),
        value: format!("v=spf1 include:{} ~all", config.spf_include),
        priority: None,
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_records_cover_dkim_mx_and_spf() {
        let config = EmailIdentityConfig::default();
        let tokens = vec!["tok1".to_string(), "tok2".to_string(), "tok3".to_string()];
        let records = dns_records_for_domain("shop.com", &tokens, &config);

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].record_type, DnsRecordType::Cname);
        assert_eq!(records[0].name, "tok1._domainkey.shop.com");
        assert!(records[0].value.starts_with("tok1."));

        let mx = records
            .iter()
            .find(|r| r.record_type == DnsRecordType::Mx)
            .unwrap();
        assert_eq!(mx.name, "shop.com");
        assert_eq!(mx.priority, Some(10));

        let spf = records
            .iter()
            .find(|r| r.record_type == DnsRecordType::Txt)
            .unwrap();
        assert!(spf.value.starts_with("v=spf1 include:"));
    }
}
