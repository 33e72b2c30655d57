//! Domain provisioning orchestrator: add, verify and remove a tenant's
//! custom domain while keeping the registrar and the tenant directory
//! consistent.

use crate::reclaim::{post_reclaim_action, reclaim_action, PostReclaimAction, ReclaimAction};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use storefront_core::types::{DomainVerification, TenantDomainConfig};
use storefront_core::validate::normalize_domain;
use storefront_core::{ProvisioningError, ProvisioningResult};
use storefront_directory::TenantDirectory;
use storefront_email::EmailIdentityService;
use storefront_registrar::{DomainRegistrar, DomainStatus};
use tracing::{info, warn};
use uuid::Uuid;

const INSTRUCTIONS_VERIFIED: &str =
    "Your domain is verified and will start serving your storefront shortly.";
const INSTRUCTIONS_UNVERIFIED: &str = "Point your domain at the platform nameservers (or publish \
     the verification record below), then run domain verification.";

#[derive(Debug, Clone, Serialize)]
pub struct AddDomainResponse {
    pub domain: String,
    pub verified: bool,
    pub nameservers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<DomainVerification>,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyDomainResponse {
    pub domain: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<DomainVerification>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveDomainResponse {
    pub message: String,
}

/// Sequences registrar and directory calls for the domain lifecycle.
pub struct DomainOrchestrator {
    directory: Arc<TenantDirectory>,
    registrar: Arc<dyn DomainRegistrar>,
    email_identity: Arc<dyn EmailIdentityService>,
    nameservers: Vec<String>,
}

impl DomainOrchestrator {
    pub fn new(
        directory: Arc<TenantDirectory>,
        registrar: Arc<dyn DomainRegistrar>,
        email_identity: Arc<dyn EmailIdentityService>,
        nameservers: Vec<String>,
    ) -> Self {
        Self {
            directory,
            registrar,
            email_identity,
            nameservers,
        }
    }

    fn build_add_response(&self, domain: String, status: &DomainStatus) -> AddDomainResponse {
        AddDomainResponse {
            verified: status.verified,
            verification: status.verification.clone(),
            nameservers: self.nameservers.clone(),
            instructions: if status.verified {
                INSTRUCTIONS_VERIFIED.to_string()
            } else {
                INSTRUCTIONS_UNVERIFIED.to_string()
            },
            domain,
        }
    }

    /// Attach a custom domain to the tenant's storefront.
    pub async fn add_domain(
        &self,
        tenant_id: Uuid,
        raw_domain: &str,
    ) -> ProvisioningResult<AddDomainResponse> {
        let domain = normalize_domain(raw_domain)?;
        let tenant = self.directory.get_tenant(tenant_id)?;

        if let Some(existing) = &tenant.domain_config {
            if existing.domain == domain {
                // Retry of an add that already landed: report current
                // state, mutate nothing.
                let status = self.domain_status(&domain).await?;
                return Ok(self.build_add_response(domain, &status));
            }
            return Err(ProvisioningError::Conflict(format!(
                "a primary domain ('{}') is already configured; remove it first",
                existing.domain
            )));
        }

        if let Err(e) = self.registrar.add_domain(&domain).await {
            if e.is_already_in_use() {
                self.handle_domain_in_use(tenant_id, &domain).await?;
            } else {
                return Err(ProvisioningError::Upstream(e.to_string()));
            }
        }

        let status = self.domain_status(&domain).await?;

        // Mandatory writes: the claim is the actual ownership decision,
        // the config write records it on the tenant.
        self.directory.claim_domain(&domain, tenant_id)?;
        let now = Utc::now();
        self.directory.update_domain_config(
            tenant_id,
            TenantDomainConfig {
                domain: domain.clone(),
                added_at: now,
                registrar_verified: status.verified,
                registrar_verified_at: status.verified.then_some(now),
            },
        )?;

        metrics::counter!("provisioning.domains_added").increment(1);
        info!(%tenant_id, domain, verified = status.verified, "Custom domain added");
        Ok(self.build_add_response(domain, &status))
    }

    /// Resolve the "already in use" registrar rejection against the
    /// directory, reclaiming orphans where possible.
    async fn handle_domain_in_use(&self, tenant_id: Uuid, domain: &str) -> ProvisioningResult<()> {
        let owner = self
            .directory
            .get_domain_lookup(domain)
            .map(|e| e.tenant_id);

        match reclaim_action(owner, tenant_id) {
            ReclaimAction::ProceedAsOwn => Ok(()),
            ReclaimAction::RejectConflict => Err(ProvisioningError::Conflict(format!(
                "domain '{domain}' is already associated with another account"
            ))),
            ReclaimAction::AttemptReclaim => {
                info!(%tenant_id, domain, "Orphaned domain detected, attempting reclaim");
                metrics::counter!("provisioning.orphan_reclaims").increment(1);

                // Best-effort: clear the stale registrar attachment.
                if let Err(e) = self.registrar.remove_domain(domain).await {
                    warn!(domain, error = %e, "Orphan removal failed, retrying add anyway");
                }

                match self.registrar.add_domain(domain).await {
                    Ok(_) => Ok(()),
                    Err(retry_err) => {
                        let status = self.domain_status(domain).await?;
                        match post_reclaim_action(status.exists) {
                            PostReclaimAction::ProceedAttached => Ok(()),
                            PostReclaimAction::FailManualRemoval => {
                                Err(ProvisioningError::Upstream(format!(
                                    "domain '{domain}' cannot be reclaimed automatically \
                                     ({retry_err}); remove it from its previous registrar \
                                     project manually and try again"
                                )))
                            }
                        }
                    }
                }
            }
        }
    }

    /// Poll the registrar for verification state and persist a newly
    /// verified domain. Verifying an already-verified domain is a
    /// read-only no-op.
    pub async fn verify_domain(&self, tenant_id: Uuid) -> ProvisioningResult<VerifyDomainResponse> {
        let tenant = self.directory.get_tenant(tenant_id)?;
        let config = tenant.domain_config.ok_or_else(|| {
            ProvisioningError::NotFound("no custom domain is configured".to_string())
        })?;

        self.registrar
            .verify_domain(&config.domain)
            .await
            .map_err(|e| ProvisioningError::Upstream(e.to_string()))?;
        let status = self.domain_status(&config.domain).await?;

        if status.verified && !config.registrar_verified {
            let now = Utc::now();
            self.directory.update_domain_config(
                tenant_id,
                TenantDomainConfig {
                    domain: config.domain.clone(),
                    added_at: config.added_at,
                    registrar_verified: true,
                    registrar_verified_at: Some(now),
                },
            )?;
            metrics::counter!("provisioning.domains_verified").increment(1);
            info!(%tenant_id, domain = %config.domain, "Domain verified");
        }

        let message = if status.verified {
            "Domain is verified.".to_string()
        } else {
            "Domain is not verified yet. DNS changes can take a while to propagate.".to_string()
        };
        Ok(VerifyDomainResponse {
            domain: config.domain,
            verified: status.verified,
            verification: status.verification,
            message,
        })
    }

    /// Detach a domain. Registrar-side cleanup is best-effort; deleting
    /// the lookup row is mandatory, because a stale row permanently
    /// blocks any future re-add of that domain by any tenant.
    pub async fn remove_domain(
        &self,
        tenant_id: Uuid,
        target_domain: Option<&str>,
    ) -> ProvisioningResult<RemoveDomainResponse> {
        let tenant = self.directory.get_tenant(tenant_id)?;

        if let Some(raw) = target_domain {
            let domain = normalize_domain(raw)?;
            if self.directory.has_additional_domain(tenant_id, &domain) {
                return self.remove_additional(tenant_id, &domain).await;
            }
            let is_primary = tenant
                .domain_config
                .as_ref()
                .is_some_and(|c| c.domain == domain);
            if !is_primary {
                return Err(ProvisioningError::NotFound(format!(
                    "domain '{domain}' is not attached to this account"
                )));
            }
        }

        let config = tenant.domain_config.ok_or_else(|| {
            ProvisioningError::NotFound("no custom domain is configured".to_string())
        })?;
        let domain = config.domain;

        if tenant.email_config.is_some() {
            if let Err(e) = self.email_identity.delete_domain_identity(&domain).await {
                warn!(domain, error = %e, "Email identity cleanup failed during domain removal");
            }
        }
        if let Err(e) = self.registrar.remove_domain(&domain).await {
            warn!(domain, error = %e, "Registrar removal failed, continuing");
        }

        self.directory.delete_domain_lookup(&domain, tenant_id)?;
        self.directory.clear_domain_and_email_config(tenant_id)?;

        metrics::counter!("provisioning.domains_removed").increment(1);
        info!(%tenant_id, domain, "Custom domain removed");
        Ok(RemoveDomainResponse {
            message: format!("Domain '{domain}' has been removed."),
        })
    }

    async fn remove_additional(
        &self,
        tenant_id: Uuid,
        domain: &str,
    ) -> ProvisioningResult<RemoveDomainResponse> {
        if let Err(e) = self.registrar.remove_domain(domain).await {
            warn!(domain, error = %e, "Registrar removal failed, continuing");
        }
        self.directory.delete_domain_lookup(domain, tenant_id)?;
        self.directory.remove_additional_domain(tenant_id, domain)?;

        metrics::counter!("provisioning.domains_removed").increment(1);
        info!(%tenant_id, domain, "Additional domain removed");
        Ok(RemoveDomainResponse {
            message: format!("Domain '{domain}' has been removed."),
        })
    }

    async fn domain_status(&self, domain: &str) -> ProvisioningResult<DomainStatus> {
        self.registrar
            .get_domain_status(domain)
            .await
            .map_err(|e| ProvisioningError::Upstream(e.to_string()))
    }
}
