//! Email provisioning orchestrator: enable, disable and reconfigure a
//! tenant's domain-branded email identity.

use crate::dns_sync::{DnsSyncWarning, DnsSynchronizer};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use storefront_core::config::EmailIdentityConfig;
use storefront_core::types::{DnsRecord, TenantEmailConfig};
use storefront_core::validate::{validate_email_prefix, validate_forward_email};
use storefront_core::{ProvisioningError, ProvisioningResult};
use storefront_directory::TenantDirectory;
use storefront_email::{dns_records_for_domain, EmailIdentityService, DKIM_STATUS_SUCCESS};
use tracing::{info, warn};
use uuid::Uuid;

/// Prefix used when the request does not name one.
const DEFAULT_EMAIL_PREFIX: &str = "hello";

#[derive(Debug, Clone, Serialize)]
pub struct SetupEmailResponse {
    pub domain_email: String,
    pub dkim_tokens: Vec<String>,
    /// Whether every required record was applied automatically.
    pub dns_records_added: bool,
    pub dns_records: Vec<DnsRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_add_errors: Option<Vec<DnsSyncWarning>>,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisableEmailResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForwardToCalResponse {
    pub forward_to_cal: bool,
}

/// Sequences email-identity, DNS-sync and directory calls for the
/// email lifecycle.
pub struct EmailOrchestrator {
    directory: Arc<TenantDirectory>,
    email_identity: Arc<dyn EmailIdentityService>,
    dns_sync: DnsSynchronizer,
    email_config: EmailIdentityConfig,
}

impl EmailOrchestrator {
    pub fn new(
        directory: Arc<TenantDirectory>,
        email_identity: Arc<dyn EmailIdentityService>,
        dns_sync: DnsSynchronizer,
        email_config: EmailIdentityConfig,
    ) -> Self {
        Self {
            directory,
            email_identity,
            dns_sync,
            email_config,
        }
    }

    /// Provision a domain-branded sending identity. Requires a
    /// registrar-verified primary domain; DNS auto-sync is best-effort
    /// and surfaces per-record failures as warnings.
    pub async fn setup_email(
        &self,
        tenant_id: Uuid,
        email_prefix: Option<&str>,
        forward_to_email: &str,
    ) -> ProvisioningResult<SetupEmailResponse> {
        validate_forward_email(forward_to_email)?;
        let prefix = email_prefix.unwrap_or(DEFAULT_EMAIL_PREFIX);
        validate_email_prefix(prefix)?;

        let tenant = self.directory.get_tenant(tenant_id)?;
        let domain_config = tenant.domain_config.ok_or_else(|| {
            ProvisioningError::Conflict(
                "add a custom domain before enabling domain email".to_string(),
            )
        })?;
        if !domain_config.registrar_verified {
            return Err(ProvisioningError::Conflict(
                "the domain must be verified before email can be enabled".to_string(),
            ));
        }
        let domain = domain_config.domain;

        let identity = self
            .email_identity
            .create_domain_identity(&domain)
            .await
            .map_err(|e| ProvisioningError::Upstream(e.to_string()))?;

        let records = dns_records_for_domain(&domain, &identity.dkim_tokens, &self.email_config);
        let report = self.dns_sync.sync(&domain, &records).await;

        let domain_email = format!("{prefix}@{domain}");
        self.directory.update_email_config(
            tenant_id,
            TenantEmailConfig {
                domain_email: domain_email.clone(),
                email_prefix: prefix.to_string(),
                dkim_tokens: identity.dkim_tokens.clone(),
                dkim_verified: identity.verification_status == DKIM_STATUS_SUCCESS,
                dkim_status: identity.verification_status.clone(),
                mx_verified: false,
                spf_verified: false,
                forward_to_email: forward_to_email.to_string(),
                forwarding_enabled: false,
                forward_to_cal: false,
                enabled_at: Utc::now(),
            },
        )?;

        metrics::counter!("provisioning.email_identities_created").increment(1);
        info!(
            %tenant_id,
            domain,
            domain_email,
            dns_auto_applied = report.fully_applied(),
            "Domain email configured"
        );

        let instructions = if report.fully_applied() {
            "Your email DNS records were added automatically. DKIM verification usually \
             completes within a few minutes."
                .to_string()
        } else {
            "Some DNS records could not be added automatically. Add the listed records at \
             your DNS host, then DKIM verification will complete."
                .to_string()
        };
        Ok(SetupEmailResponse {
            domain_email,
            dkim_tokens: identity.dkim_tokens,
            dns_records_added: report.fully_applied(),
            dns_records: records,
            dns_add_errors: (!report.warnings.is_empty()).then_some(report.warnings),
            instructions,
        })
    }

    /// Tear down the email identity. Upstream deletions are
    /// best-effort; clearing the tenant's email config always happens,
    /// so a tenant can never get stuck in an enabled state.
    pub async fn disable_email(&self, tenant_id: Uuid) -> ProvisioningResult<DisableEmailResponse> {
        let tenant = self.directory.get_tenant(tenant_id)?;
        if tenant.email_config.is_none() {
            return Err(ProvisioningError::NotFound(
                "domain email is not enabled".to_string(),
            ));
        }
        let domain_config = tenant.domain_config.ok_or_else(|| {
            ProvisioningError::NotFound("no custom domain is configured".to_string())
        })?;
        let domain = domain_config.domain;

        if let Err(e) = self.email_identity.delete_domain_identity(&domain).await {
            warn!(domain, error = %e, "Email identity deletion failed, continuing");
        }
        // Inbound routing linkage: stop the mail router from forwarding
        // for this domain. Best-effort, the tenant record is authoritative.
        if let Err(e) = self
            .directory
            .update_domain_lookup_forward_to_cal(&domain, tenant_id, false)
        {
            warn!(domain, error = %e, "Inbound routing cleanup failed, continuing");
        }

        self.directory.clear_email_config(tenant_id)?;

        metrics::counter!("provisioning.email_identities_disabled").increment(1);
        info!(%tenant_id, domain, "Domain email disabled");
        Ok(DisableEmailResponse {
            message: "Domain email has been disabled.".to_string(),
        })
    }

    /// Flip the forward-to-calendar flag. The tenant record write is
    /// mandatory; syncing the flag into the lookup row consumed by the
    /// inbound mail router is best-effort and may lag.
    pub async fn set_forward_to_cal(
        &self,
        tenant_id: Uuid,
        enabled: bool,
    ) -> ProvisioningResult<ForwardToCalResponse> {
        let tenant = self.directory.get_tenant(tenant_id)?;
        let mut email_config = tenant.email_config.ok_or_else(|| {
            ProvisioningError::NotFound("domain email is not enabled".to_string())
        })?;
        let domain_config = tenant.domain_config.ok_or_else(|| {
            ProvisioningError::NotFound("no custom domain is configured".to_string())
        })?;

        email_config.forward_to_cal = enabled;
        self.directory.update_email_config(tenant_id, email_config)?;

        if let Err(e) = self.directory.update_domain_lookup_forward_to_cal(
            &domain_config.domain,
            tenant_id,
            enabled,
        ) {
            warn!(
                domain = %domain_config.domain,
                error = %e,
                "Forward-to-cal lookup sync failed; router will lag until the next sync"
            );
        }

        info!(%tenant_id, domain = %domain_config.domain, enabled, "Forward-to-cal updated");
        Ok(ForwardToCalResponse {
            forward_to_cal: enabled,
        })
    }
}
