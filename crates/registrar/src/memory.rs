//! Simulated registrar for local development and tests.
//!
//! Mirrors the upstream's observable behavior closely enough to drive
//! every orchestrator path, including the awkward ones: domains held by
//! a project row nobody owns, removals that fail, and DNS pushes that
//! reject individual records.

use crate::{AddedDomain, DnsPushOutcome, DomainRegistrar, DomainStatus, RegistrarError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use storefront_core::types::{DnsRecord, DomainVerification};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct SimDomain {
    verified: bool,
    verification: Option<DomainVerification>,
    records: Vec<DnsRecord>,
}

/// In-memory registrar simulation.
#[derive(Default)]
pub struct InMemoryRegistrar {
    /// Domains attached to our project.
    domains: DashMap<String, SimDomain>,
    /// Domains held elsewhere in the registrar. Adding one fails with
    /// the already-in-use error until it is removed.
    foreign: DashSet<String>,
    /// Foreign domains that survive removal attempts (the
    /// cannot-reclaim case).
    sticky: DashSet<String>,
    /// Domains whose pending verification challenge will pass on the
    /// next verify call.
    verification_passing: DashSet<String>,
    /// Record names the DNS batch endpoint rejects.
    rejected_record_names: DashSet<String>,
    /// When set, every removal fails.
    fail_removals: AtomicBool,
    /// When set, added domains come back verified immediately.
    auto_verify: AtomicBool,
}

impl InMemoryRegistrar {
    pub fn new() -> Self {
        info!("In-memory registrar initialized");
        Self::default()
    }

    // -----------------------------------------------------------------
    // Simulation knobs
    // -----------------------------------------------------------------

    /// Mark a domain as held by another project row. Removable, so the
    /// reclaim path succeeds against it.
    pub fn occupy(&self, domain: &str) {
        self.foreign.insert(domain.to_string());
    }

    /// Mark a domain as held by another project row *and* immune to
    /// removal.
    pub fn occupy_sticky(&self, domain: &str) {
        self.foreign.insert(domain.to_string());
        self.sticky.insert(domain.to_string());
    }

    /// The next verify call on this domain will succeed.
    pub fn pass_verification(&self, domain: &str) {
        self.verification_passing.insert(domain.to_string());
    }

    /// Reject DNS records with this name in batch pushes.
    pub fn reject_record(&self, name: &str) {
        self.rejected_record_names.insert(name.to_string());
    }

    pub fn set_fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    pub fn set_auto_verify(&self, on: bool) {
        self.auto_verify.store(on, Ordering::SeqCst);
    }

    pub fn is_attached(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    pub fn records_for(&self, domain: &str) -> Vec<DnsRecord> {
        self.domains
            .get(domain)
            .map(|d| d.records.clone())
            .unwrap_or_default()
    }

    fn challenge_for(domain: &str) -> DomainVerification {
        let token: String = {
            let mut rng = rand::thread_rng();
            (0..24)
                .map(|_| {
                    let c = rng.gen_range(0..36u32);
                    char::from_digit(c, 36).unwrap_or('0')
                })
                .collect()
        };
        DomainVerification {
            record_type: "TXT".to_string(),
            domain: format!("_storefront-challenge.{domain}"),
            value: format!("storefront-verify={token}"),
        }
    }
}

#[async_trait]
impl DomainRegistrar for InMemoryRegistrar {
    async fn add_domain(&self, domain: &str) -> Result<AddedDomain, RegistrarError> {
        if self.foreign.contains(domain) {
            return Err(RegistrarError::AlreadyInUse(format!(
                "domain '{domain}' is already in use"
            )));
        }
        let verified = self.auto_verify.load(Ordering::SeqCst);
        let verification = if verified {
            None
        } else {
            Some(Self::challenge_for(domain))
        };
        let entry = SimDomain {
            verified,
            verification: verification.clone(),
            records: Vec::new(),
        };
        // Re-adding our own domain is idempotent.
        let existing = self.domains.entry(domain.to_string()).or_insert(entry);
        debug!(domain, verified = existing.verified, "Simulated domain add");
        Ok(AddedDomain {
            verified: existing.verified,
            verification: existing.verification.clone(),
        })
    }

    async fn remove_domain(&self, domain: &str) -> Result<(), RegistrarError> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(RegistrarError::Upstream(
                "simulated removal failure".to_string(),
            ));
        }
        self.domains.remove(domain);
        if !self.sticky.contains(domain) {
            self.foreign.remove(domain);
        }
        debug!(domain, "Simulated domain remove");
        Ok(())
    }

    async fn get_domain_status(&self, domain: &str) -> Result<DomainStatus, RegistrarError> {
        match self.domains.get(domain) {
            Some(d) => Ok(DomainStatus {
                exists: true,
                verified: d.verified,
                verification: d.verification.clone(),
            }),
            None => Ok(DomainStatus {
                exists: false,
                verified: false,
                verification: None,
            }),
        }
    }

    async fn verify_domain(&self, domain: &str) -> Result<(), RegistrarError> {
        let mut entry = self.domains.get_mut(domain).ok_or_else(|| {
            RegistrarError::Upstream(format!("domain '{domain}' not found"))
        })?;
        if self.verification_passing.contains(domain) {
            entry.verified = true;
            entry.verification = None;
        }
        Ok(())
    }

    async fn add_dns_records(
        &self,
        domain: &str,
        records: &[DnsRecord],
    ) -> Result<DnsPushOutcome, RegistrarError> {
        let mut entry = self.domains.get_mut(domain).ok_or_else(|| {
            RegistrarError::Upstream(format!("domain '{domain}' not found"))
        })?;
        let mut outcome = DnsPushOutcome::default();
        for record in records {
            if self.rejected_record_names.contains(&record.name) {
                outcome.errors.push(crate::DnsRecordError {
                    record: format!("{} {}", record.record_type, record.name),
                    reason: "rejected by registrar".to_string(),
                });
            } else {
                entry.records.push(record.clone());
                outcome.added.push(record.clone());
            }
        }
        Ok(outcome)
    }
}
