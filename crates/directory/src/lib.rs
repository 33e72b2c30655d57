//! Tenant directory: durable per-tenant domain/email configuration plus
//! the global domain lookup index.
//!
//! The lookup index is the sole arbiter of domain ownership. Claims go
//! through an insert-if-absent write so two tenants racing for the same
//! domain serialize here rather than on registrar state.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use storefront_core::types::{
    AdditionalDomain, DomainLookupEntry, TenantDomainConfig, TenantEmailConfig,
};
use storefront_core::{ProvisioningError, ProvisioningResult};
use tracing::{info, warn};
use uuid::Uuid;

/// A single tenant's record: identity plus domain/email configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: Uuid,
    pub name: String,
    pub domain_config: Option<TenantDomainConfig>,
    pub email_config: Option<TenantEmailConfig>,
    pub additional_domains: Vec<AdditionalDomain>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-process tenant directory backed by DashMap.
pub struct TenantDirectory {
    tenants: DashMap<Uuid, TenantRecord>,
    /// Global index: normalized domain string -> owning tenant.
    domain_lookup: DashMap<String, DomainLookupEntry>,
}

impl Default for TenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
            domain_lookup: DashMap::new(),
        }
    }

    pub fn create_tenant(&self, name: impl Into<String>) -> TenantRecord {
        let now = Utc::now();
        let tenant = TenantRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            domain_config: None,
            email_config: None,
            additional_domains: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        info!(tenant_id = %tenant.id, tenant_name = %tenant.name, "Tenant created");
        self.tenants.insert(tenant.id, tenant.clone());
        tenant
    }

    pub fn get_tenant(&self, tenant_id: Uuid) -> ProvisioningResult<TenantRecord> {
        self.tenants
            .get(&tenant_id)
            .map(|t| t.clone())
            .ok_or_else(|| {
                ProvisioningError::NotFound(format!("tenant {tenant_id} not found"))
            })
    }

    fn with_tenant<F>(&self, tenant_id: Uuid, f: F) -> ProvisioningResult<()>
    where
        F: FnOnce(&mut TenantRecord),
    {
        let mut tenant = self.tenants.get_mut(&tenant_id).ok_or_else(|| {
            ProvisioningError::NotFound(format!("tenant {tenant_id} not found"))
        })?;
        f(&mut tenant);
        tenant.updated_at = Utc::now();
        Ok(())
    }

    // -----------------------------------------------------------------
    // Domain / email configuration
    // -----------------------------------------------------------------

    pub fn update_domain_config(
        &self,
        tenant_id: Uuid,
        config: TenantDomainConfig,
    ) -> ProvisioningResult<()> {
        self.with_tenant(tenant_id, |t| t.domain_config = Some(config))
    }

    pub fn update_email_config(
        &self,
        tenant_id: Uuid,
        config: TenantEmailConfig,
    ) -> ProvisioningResult<()> {
        self.with_tenant(tenant_id, |t| t.email_config = Some(config))
    }

    pub fn clear_email_config(&self, tenant_id: Uuid) -> ProvisioningResult<()> {
        self.with_tenant(tenant_id, |t| t.email_config = None)
    }

    /// Clears the primary domain and any email identity riding on it.
    /// Additional domains are untouched.
    pub fn clear_domain_and_email_config(&self, tenant_id: Uuid) -> ProvisioningResult<()> {
        self.with_tenant(tenant_id, |t| {
            t.domain_config = None;
            t.email_config = None;
        })
    }

    // -----------------------------------------------------------------
    // Additional domains
    // -----------------------------------------------------------------

    pub fn add_additional_domain(
        &self,
        tenant_id: Uuid,
        domain: &str,
        verified: bool,
    ) -> ProvisioningResult<()> {
        self.claim_domain(domain, tenant_id)?;
        self.with_tenant(tenant_id, |t| {
            if !t.additional_domains.iter().any(|d| d.domain == domain) {
                t.additional_domains.push(AdditionalDomain {
                    domain: domain.to_string(),
                    added_at: Utc::now(),
                    verified,
                });
            }
        })
    }

    pub fn remove_additional_domain(
        &self,
        tenant_id: Uuid,
        domain: &str,
    ) -> ProvisioningResult<()> {
        self.with_tenant(tenant_id, |t| {
            t.additional_domains.retain(|d| d.domain != domain);
        })
    }

    pub fn has_additional_domain(&self, tenant_id: Uuid, domain: &str) -> bool {
        self.tenants
            .get(&tenant_id)
            .map(|t| t.additional_domains.iter().any(|d| d.domain == domain))
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------
    // Domain lookup index
    // -----------------------------------------------------------------

    pub fn get_domain_lookup(&self, domain: &str) -> Option<DomainLookupEntry> {
        self.domain_lookup.get(domain).map(|e| *e)
    }

    /// Insert-if-absent claim on the lookup index. Idempotent for the
    /// owning tenant, a conflict for anyone else. This write, not the
    /// registrar, decides who owns a domain.
    pub fn claim_domain(&self, domain: &str, tenant_id: Uuid) -> ProvisioningResult<()> {
        let entry = self
            .domain_lookup
            .entry(domain.to_string())
            .or_insert(DomainLookupEntry {
                tenant_id,
                forward_to_cal: false,
            });
        if entry.tenant_id != tenant_id {
            return Err(ProvisioningError::Conflict(format!(
                "domain '{domain}' is already associated with another account"
            )));
        }
        Ok(())
    }

    /// Deletes the lookup row, but only if it is owned by `tenant_id`.
    /// A row owned by someone else is left alone.
    pub fn delete_domain_lookup(&self, domain: &str, tenant_id: Uuid) -> ProvisioningResult<()> {
        let removed = self
            .domain_lookup
            .remove_if(domain, |_, entry| entry.tenant_id == tenant_id);
        match removed {
            Some(_) => {
                info!(%tenant_id, domain, "Domain lookup entry deleted");
            }
            None if self.domain_lookup.contains_key(domain) => {
                warn!(
                    %tenant_id,
                    domain,
                    "Refusing to delete lookup entry owned by another tenant"
                );
            }
            None => {}
        }
        Ok(())
    }

    /// Syncs the forward-to-cal flag into the lookup row consumed by the
    /// inbound mail router.
    pub fn update_domain_lookup_forward_to_cal(
        &self,
        domain: &str,
        tenant_id: Uuid,
        enabled: bool,
    ) -> ProvisioningResult<()> {
        let mut entry = self.domain_lookup.get_mut(domain).ok_or_else(|| {
            ProvisioningError::NotFound(format!("no lookup entry for domain '{domain}'"))
        })?;
        if entry.tenant_id != tenant_id {
            return Err(ProvisioningError::Conflict(format!(
                "domain '{domain}' is owned by another tenant"
            )));
        }
        entry.forward_to_cal = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_tenant() {
        let dir = TenantDirectory::new();
        let tenant = dir.create_tenant("My Shop");
        let fetched = dir.get_tenant(tenant.id).unwrap();
        assert_eq!(fetched.name, "My Shop");
        assert!(fetched.domain_config.is_none());
    }

    #[test]
    fn test_claim_domain_is_idempotent_for_owner() {
        let dir = TenantDirectory::new();
        let tenant = dir.create_tenant("a");
        dir.claim_domain("shop.com", tenant.id).unwrap();
        dir.claim_domain("shop.com", tenant.id).unwrap();
        assert_eq!(
            dir.get_domain_lookup("shop.com").unwrap().tenant_id,
            tenant.id
        );
    }

    #[test]
    fn test_claim_domain_conflicts_for_other_tenant() {
        let dir = TenantDirectory::new();
        let a = dir.create_tenant("a");
        let b = dir.create_tenant("b");
        dir.claim_domain("shop.com", a.id).unwrap();
        let err = dir.claim_domain("shop.com", b.id).unwrap_err();
        assert!(matches!(err, ProvisioningError::Conflict(_)));
        // Loser's claim did not clobber the winner's row.
        assert_eq!(dir.get_domain_lookup("shop.com").unwrap().tenant_id, a.id);
    }

    #[test]
    fn test_delete_domain_lookup_checks_owner() {
        let dir = TenantDirectory::new();
        let a = dir.create_tenant("a");
        let b = dir.create_tenant("b");
        dir.claim_domain("shop.com", a.id).unwrap();

        // Wrong tenant: row survives.
        dir.delete_domain_lookup("shop.com", b.id).unwrap();
        assert!(dir.get_domain_lookup("shop.com").is_some());

        dir.delete_domain_lookup("shop.com", a.id).unwrap();
        assert!(dir.get_domain_lookup("shop.com").is_none());
    }

    #[test]
    fn test_clear_domain_keeps_additional_domains() {
        let dir = TenantDirectory::new();
        let tenant = dir.create_tenant("a");
        dir.update_domain_config(
            tenant.id,
            TenantDomainConfig {
                domain: "shop.com".to_string(),
                added_at: Utc::now(),
                registrar_verified: true,
                registrar_verified_at: Some(Utc::now()),
            },
        )
        .unwrap();
        dir.add_additional_domain(tenant.id, "extra.com", false).unwrap();

        dir.clear_domain_and_email_config(tenant.id).unwrap();
        let fetched = dir.get_tenant(tenant.id).unwrap();
        assert!(fetched.domain_config.is_none());
        assert_eq!(fetched.additional_domains.len(), 1);
    }

    #[test]
    fn test_forward_to_cal_sync_requires_owned_row() {
        let dir = TenantDirectory::new();
        let tenant = dir.create_tenant("a");
        assert!(dir
            .update_domain_lookup_forward_to_cal("shop.com", tenant.id, true)
            .is_err());

        dir.claim_domain("shop.com", tenant.id).unwrap();
        dir.update_domain_lookup_forward_to_cal("shop.com", tenant.id, true)
            .unwrap();
        assert!(dir.get_domain_lookup("shop.com").unwrap().forward_to_cal);
    }
}
