//! Domain registrar client: wraps the external domain-hosting API that
//! serves tenants' custom domains.
//!
//! The orchestrators talk to the [`DomainRegistrar`] trait so they can
//! run against the real upstream ([`HttpRegistrar`]) or the simulated
//! one ([`InMemoryRegistrar`]) in local mode and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::types::{DnsRecord, DomainVerification};
use thiserror::Error;

mod http;
mod memory;

pub use http::HttpRegistrar;
pub use memory::InMemoryRegistrar;

#[derive(Error, Debug)]
pub enum RegistrarError {
    /// The domain is already attached somewhere in the registrar —
    /// possibly to a project row nobody owns anymore.
    #[error("domain '{0}' is already in use at the registrar")]
    AlreadyInUse(String),

    #[error("registrar request timed out")]
    Timeout,

    #[error("registrar error: {0}")]
    Upstream(String),
}

impl RegistrarError {
    pub fn is_already_in_use(&self) -> bool {
        matches!(self, Self::AlreadyInUse(_))
    }
}

/// Result of a successful domain add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedDomain {
    pub verified: bool,
    /// Challenge the tenant must publish when the registrar could not
    /// verify ownership automatically.
    pub verification: Option<DomainVerification>,
}

/// Registrar-side view of a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainStatus {
    /// Whether the domain is attached to *our* registrar project.
    pub exists: bool,
    pub verified: bool,
    pub verification: Option<DomainVerification>,
}

/// A record the registrar refused, with the reason it gave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsRecordError {
    /// `TYPE name` of the rejected record.
    pub record: String,
    pub reason: String,
}

/// Per-record outcome of a DNS batch push. Never a hard failure:
/// rejected records land in `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsPushOutcome {
    pub added: Vec<DnsRecord>,
    pub errors: Vec<DnsRecordError>,
}

/// External domain-hosting API. All calls are retry-safe: the reclaim
/// workflow issues remove/add pairs against the same domain.
#[async_trait]
pub trait DomainRegistrar: Send + Sync {
    async fn add_domain(&self, domain: &str) -> Result<AddedDomain, RegistrarError>;

    async fn remove_domain(&self, domain: &str) -> Result<(), RegistrarError>;

    async fn get_domain_status(&self, domain: &str) -> Result<DomainStatus, RegistrarError>;

    async fn verify_domain(&self, domain: &str) -> Result<(), RegistrarError>;

    async fn add_dns_records(
        &self,
        domain: &str,
        records: &[DnsRecord],
    ) -> Result<DnsPushOutcome, RegistrarError>;
}
