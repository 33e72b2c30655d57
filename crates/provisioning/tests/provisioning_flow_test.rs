//! End-to-end workflow tests for domain and email provisioning,
//! running against the in-memory registrar and email identity provider.

use std::sync::Arc;
use storefront_core::ProvisioningError;
use storefront_directory::TenantDirectory;
use storefront_email::InMemoryEmailIdentity;
use storefront_provisioning::{DnsSynchronizer, DomainOrchestrator, EmailOrchestrator};
use storefront_registrar::InMemoryRegistrar;
use uuid::Uuid;

struct TestStack {
    directory: Arc<TenantDirectory>,
    registrar: Arc<InMemoryRegistrar>,
    email_identity: Arc<InMemoryEmailIdentity>,
    domains: DomainOrchestrator,
    email: EmailOrchestrator,
    tenant_id: Uuid,
}

fn stack() -> TestStack {
    let directory = Arc::new(TenantDirectory::new());
    let registrar = Arc::new(InMemoryRegistrar::new());
    let email_identity = Arc::new(InMemoryEmailIdentity::new());
    let email_config = storefront_core::config::EmailIdentityConfig::default();

    let domains = DomainOrchestrator::new(
        directory.clone(),
        registrar.clone(),
        email_identity.clone(),
        vec!["ns1.storefront-dns.app".to_string()],
    );
    let email = EmailOrchestrator::new(
        directory.clone(),
        email_identity.clone(),
        DnsSynchronizer::new(registrar.clone()),
        email_config,
    );
    let tenant_id = directory.create_tenant("Test Shop").id;

    TestStack {
        directory,
        registrar,
        email_identity,
        domains,
        email,
        tenant_id,
    }
}

/// Add a domain and drive it to the verified state.
async fn add_verified_domain(s: &TestStack, domain: &str) {
    s.domains.add_domain(s.tenant_id, domain).await.unwrap();
    s.registrar.pass_verification(domain);
    let verified = s.domains.verify_domain(s.tenant_id).await.unwrap();
    assert!(verified.verified);
}

#[tokio::test]
async fn test_add_domain_normalizes_and_claims_lookup() {
    let s = stack();
    let response = s.domains.add_domain(s.tenant_id, " MyShop.Com ").await.unwrap();

    assert_eq!(response.domain, "myshop.com");
    assert!(!response.verified);
    assert!(response.verification.is_some());
    assert!(!response.nameservers.is_empty());

    let lookup = s.directory.get_domain_lookup("myshop.com").unwrap();
    assert_eq!(lookup.tenant_id, s.tenant_id);

    let tenant = s.directory.get_tenant(s.tenant_id).unwrap();
    let config = tenant.domain_config.unwrap();
    assert_eq!(config.domain, "myshop.com");
    assert!(!config.registrar_verified);
}

#[tokio::test]
async fn test_add_domain_rejects_malformed_input() {
    let s = stack();
    for bad in ["", "no-tld", "shop .com", "shop_x.com"] {
        let err = s.domains.add_domain(s.tenant_id, bad).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Validation(_)), "input: {bad:?}");
    }
}

#[tokio::test]
async fn test_readd_same_domain_is_idempotent() {
    let s = stack();
    s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();
    let again = s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();

    assert_eq!(again.domain, "shop.com");
    let lookup = s.directory.get_domain_lookup("shop.com").unwrap();
    assert_eq!(lookup.tenant_id, s.tenant_id);
}

#[tokio::test]
async fn test_second_domain_conflicts() {
    let s = stack();
    s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();
    let err = s.domains.add_domain(s.tenant_id, "other.com").await.unwrap_err();
    assert!(matches!(err, ProvisioningError::Conflict(_)));
}

#[tokio::test]
async fn test_orphan_reclaim_succeeds() {
    let s = stack();
    // Present in the registrar, absent from the lookup index.
    s.registrar.occupy("orphan.com");

    let response = s.domains.add_domain(s.tenant_id, "orphan.com").await.unwrap();
    assert_eq!(response.domain, "orphan.com");

    let lookup = s.directory.get_domain_lookup("orphan.com").unwrap();
    assert_eq!(lookup.tenant_id, s.tenant_id);
    assert!(s.registrar.is_attached("orphan.com"));
}

#[tokio::test]
async fn test_reclaim_refused_when_directory_knows_another_owner() {
    let s = stack();
    let other = s.directory.create_tenant("Other Shop");
    s.directory.claim_domain("taken.com", other.id).unwrap();
    s.registrar.occupy("taken.com");

    let err = s.domains.add_domain(s.tenant_id, "taken.com").await.unwrap_err();
    assert!(matches!(err, ProvisioningError::Conflict(_)));

    // No mutation: the other tenant still owns the row, and the
    // requester gained no config.
    assert_eq!(
        s.directory.get_domain_lookup("taken.com").unwrap().tenant_id,
        other.id
    );
    assert!(s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .domain_config
        .is_none());
}

#[tokio::test]
async fn test_unreclaimable_domain_fails_with_manual_removal_message() {
    let s = stack();
    s.registrar.occupy_sticky("stuck.com");

    let err = s.domains.add_domain(s.tenant_id, "stuck.com").await.unwrap_err();
    match err {
        ProvisioningError::Upstream(message) => assert!(message.contains("manually")),
        other => panic!("expected Upstream, got {other:?}"),
    }
    assert!(s.directory.get_domain_lookup("stuck.com").is_none());
}

#[tokio::test]
async fn test_verify_domain_persists_verified_state() {
    let s = stack();
    s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();

    // Challenge not yet published.
    let pending = s.domains.verify_domain(s.tenant_id).await.unwrap();
    assert!(!pending.verified);

    s.registrar.pass_verification("shop.com");
    let verified = s.domains.verify_domain(s.tenant_id).await.unwrap();
    assert!(verified.verified);

    let config = s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .domain_config
        .unwrap();
    assert!(config.registrar_verified);
    assert!(config.registrar_verified_at.is_some());

    // Idempotent: verifying again keeps the original timestamp.
    let first_verified_at = config.registrar_verified_at;
    s.domains.verify_domain(s.tenant_id).await.unwrap();
    let config = s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .domain_config
        .unwrap();
    assert_eq!(config.registrar_verified_at, first_verified_at);
}

#[tokio::test]
async fn test_remove_domain_deletes_lookup_even_when_registrar_fails() {
    let s = stack();
    s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();
    s.registrar.set_fail_removals(true);

    s.domains.remove_domain(s.tenant_id, None).await.unwrap();

    assert!(s.directory.get_domain_lookup("shop.com").is_none());
    assert!(s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .domain_config
        .is_none());
}

#[tokio::test]
async fn test_remove_primary_clears_email_but_keeps_additional_domains() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;
    s.email
        .setup_email(s.tenant_id, Some("hello"), "owner@example.com")
        .await
        .unwrap();
    s.directory
        .add_additional_domain(s.tenant_id, "extra.com", false)
        .unwrap();

    s.domains.remove_domain(s.tenant_id, None).await.unwrap();

    let tenant = s.directory.get_tenant(s.tenant_id).unwrap();
    assert!(tenant.domain_config.is_none());
    assert!(tenant.email_config.is_none());
    assert_eq!(tenant.additional_domains.len(), 1);
    assert!(s.directory.get_domain_lookup("extra.com").is_some());
}

#[tokio::test]
async fn test_remove_additional_domain_only_touches_that_domain() {
    let s = stack();
    s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();
    s.directory
        .add_additional_domain(s.tenant_id, "extra.com", false)
        .unwrap();

    s.domains
        .remove_domain(s.tenant_id, Some("extra.com"))
        .await
        .unwrap();

    let tenant = s.directory.get_tenant(s.tenant_id).unwrap();
    assert!(tenant.additional_domains.is_empty());
    assert!(tenant.domain_config.is_some());
    assert!(s.directory.get_domain_lookup("extra.com").is_none());
    assert!(s.directory.get_domain_lookup("shop.com").is_some());
}

#[tokio::test]
async fn test_setup_email_requires_verified_domain() {
    let s = stack();
    let err = s
        .email
        .setup_email(s.tenant_id, None, "owner@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::Conflict(_)));

    s.domains.add_domain(s.tenant_id, "shop.com").await.unwrap();
    let err = s
        .email
        .setup_email(s.tenant_id, None, "owner@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::Conflict(_)));
}

#[tokio::test]
async fn test_setup_email_happy_path() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;

    let response = s
        .email
        .setup_email(s.tenant_id, Some("hello"), "owner@example.com")
        .await
        .unwrap();

    assert_eq!(response.domain_email, "hello@shop.com");
    assert!(!response.dkim_tokens.is_empty());
    assert!(response.dns_records_added);
    assert!(response.dns_add_errors.is_none());
    // DKIM CNAMEs + MX + SPF.
    assert_eq!(response.dns_records.len(), response.dkim_tokens.len() + 2);

    let config = s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .email_config
        .unwrap();
    assert_eq!(config.email_prefix, "hello");
    assert_eq!(config.forward_to_email, "owner@example.com");
    assert!(!config.forwarding_enabled);
    assert!(!config.dkim_verified);
    assert!(!config.mx_verified);
    assert!(!config.spf_verified);
}

#[tokio::test]
async fn test_setup_email_records_provider_reported_dkim_success() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;
    // Provider observes the DKIM records immediately.
    s.email_identity.set_instant_success(true);

    s.email
        .setup_email(s.tenant_id, None, "owner@example.com")
        .await
        .unwrap();

    let config = s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .email_config
        .unwrap();
    assert!(config.dkim_verified);
    assert_eq!(config.dkim_status, "SUCCESS");
}

#[tokio::test]
async fn test_setup_email_rejects_bad_input() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;

    let err = s
        .email
        .setup_email(s.tenant_id, None, "not-an-email")
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::Validation(_)));

    let err = s
        .email
        .setup_email(s.tenant_id, Some("bad prefix"), "owner@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::Validation(_)));
}

#[tokio::test]
async fn test_setup_email_surfaces_dns_warnings_without_failing() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;
    // MX and SPF both carry the apex name.
    s.registrar.reject_record("shop.com");

    let response = s
        .email
        .setup_email(s.tenant_id, None, "owner@example.com")
        .await
        .unwrap();

    assert!(!response.dns_records_added);
    let warnings = response.dns_add_errors.unwrap();
    assert_eq!(warnings.len(), 2);
    // Each warning identifies the rejected record.
    assert!(warnings.iter().any(|w| w.record == "MX shop.com"));
    assert!(warnings.iter().any(|w| w.record == "TXT shop.com"));
    // The email config was still written.
    assert!(s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .email_config
        .is_some());
}

#[tokio::test]
async fn test_disable_email_clears_config_even_when_deletion_fails() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;
    s.email
        .setup_email(s.tenant_id, None, "owner@example.com")
        .await
        .unwrap();

    s.email_identity.set_fail_deletions(true);
    s.email.disable_email(s.tenant_id).await.unwrap();

    let tenant = s.directory.get_tenant(s.tenant_id).unwrap();
    assert!(tenant.email_config.is_none());
    // Disabling twice reports not-found.
    let err = s.email.disable_email(s.tenant_id).await.unwrap_err();
    assert!(matches!(err, ProvisioningError::NotFound(_)));
}

#[tokio::test]
async fn test_forward_to_cal_reflects_last_call_even_without_lookup_row() {
    let s = stack();
    add_verified_domain(&s, "shop.com").await;
    s.email
        .setup_email(s.tenant_id, None, "owner@example.com")
        .await
        .unwrap();

    let on = s.email.set_forward_to_cal(s.tenant_id, true).await.unwrap();
    assert!(on.forward_to_cal);
    assert!(s.directory.get_domain_lookup("shop.com").unwrap().forward_to_cal);

    // Kill the lookup row: the best-effort sync now fails, but the
    // tenant record stays authoritative.
    s.directory.delete_domain_lookup("shop.com", s.tenant_id).unwrap();
    let off = s.email.set_forward_to_cal(s.tenant_id, false).await.unwrap();
    assert!(!off.forward_to_cal);

    let config = s
        .directory
        .get_tenant(s.tenant_id)
        .unwrap()
        .email_config
        .unwrap();
    assert!(!config.forward_to_cal);
}
