//! DNS record synchronizer: pushes a required record set through the
//! registrar without ever failing the caller.
//!
//! Failures are explicit [`DnsSyncWarning`] values accumulated into the
//! report, so warning propagation stays visible and testable instead of
//! disappearing into a swallowed error.

use serde::Serialize;
use std::sync::Arc;
use storefront_core::types::DnsRecord;
use storefront_registrar::DomainRegistrar;
use tracing::{info, warn};

/// One record the registrar did not accept.
#[derive(Debug, Clone, Serialize)]
pub struct DnsSyncWarning {
    pub record: String,
    pub reason: String,
}

/// Per-record outcome of a sync attempt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DnsSyncReport {
    pub attempted: usize,
    pub added: Vec<DnsRecord>,
    pub warnings: Vec<DnsSyncWarning>,
}

impl DnsSyncReport {
    /// True when every attempted record landed.
    pub fn fully_applied(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct DnsSynchronizer {
    registrar: Arc<dyn DomainRegistrar>,
}

impl DnsSynchronizer {
    pub fn new(registrar: Arc<dyn DomainRegistrar>) -> Self {
        Self { registrar }
    }

    /// Attempt to push `records` for `domain`. Never returns an error:
    /// a registrar-level failure turns every record into a warning.
    pub async fn sync(&self, domain: &str, records: &[DnsRecord]) -> DnsSyncReport {
        let mut report = DnsSyncReport {
            attempted: records.len(),
            ..Default::default()
        };

        match self.registrar.add_dns_records(domain, records).await {
            Ok(outcome) => {
                report.added = outcome.added;
                report.warnings = outcome
                    .errors
                    .into_iter()
                    .map(|e| DnsSyncWarning {
                        record: e.record,
                        reason: e.reason,
                    })
                    .collect();
            }
            Err(e) => {
                warn!(domain, error = %e, "DNS auto-sync failed, records must be added manually");
                report.warnings = records
                    .iter()
                    .map(|r| DnsSyncWarning {
                        record: format!("{} {}", r.record_type, r.name),
                        reason: e.to_string(),
                    })
                    .collect();
            }
        }

        metrics::counter!("provisioning.dns_records_added")
            .increment(report.added.len() as u64);
        metrics::counter!("provisioning.dns_record_warnings")
            .increment(report.warnings.len() as u64);
        info!(
            domain,
            attempted = report.attempted,
            added = report.added.len(),
            warnings = report.warnings.len(),
            "DNS sync finished"
        );
        report
    }
}
