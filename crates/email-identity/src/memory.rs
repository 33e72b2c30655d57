//! Simulated email identity provider for local development and tests.

use crate::{DomainIdentity, EmailIdentityError, EmailIdentityService, DKIM_STATUS_PENDING,
            DKIM_STATUS_SUCCESS};
use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[derive(Default)]
pub struct InMemoryEmailIdentity {
    identities: DashMap<String, DomainIdentity>,
    /// When set, new identities report `SUCCESS` immediately instead of
    /// the usual `PENDING`.
    instant_success: AtomicBool,
    /// When set, every deletion fails.
    fail_deletions: AtomicBool,
}

impl InMemoryEmailIdentity {
    pub fn new() -> Self {
        info!("In-memory email identity provider initialized");
        Self::default()
    }

    pub fn set_instant_success(&self, on: bool) {
        self.instant_success.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_deletions(&self, fail: bool) {
        self.fail_deletions.store(fail, Ordering::SeqCst);
    }

    pub fn has_identity(&self, domain: &str) -> bool {
        self.identities.contains_key(domain)
    }

    fn random_token() -> String {
        let mut rng = rand::thread_rng();
        (0..32)
            .map(|_| {
                let c = rng.gen_range(0..36u32);
                char::from_digit(c, 36).unwrap_or('0')
            })
            .collect()
    }
}

#[async_trait]
impl EmailIdentityService for InMemoryEmailIdentity {
    async fn create_domain_identity(
        &self,
        domain: &str,
    ) -> Result<DomainIdentity, EmailIdentityError> {
        let status = if self.instant_success.load(Ordering::SeqCst) {
            DKIM_STATUS_SUCCESS
        } else {
            DKIM_STATUS_PENDING
        };
        // Creating an identity twice hands back the existing tokens.
        let identity = self
            .identities
            .entry(domain.to_string())
            .or_insert_with(|| DomainIdentity {
                dkim_tokens: (0..3).map(|_| Self::random_token()).collect(),
                verification_status: status.to_string(),
            })
            .clone();
        debug!(domain, status = %identity.verification_status, "Simulated identity create");
        Ok(identity)
    }

    async fn delete_domain_identity(&self, domain: &str) -> Result<(), EmailIdentityError> {
        if self.fail_deletions.load(Ordering::SeqCst) {
            return Err(EmailIdentityError::Upstream(
                "simulated deletion failure".to_string(),
            ));
        }
        self.identities.remove(domain);
        debug!(domain, "Simulated identity delete");
        Ok(())
    }
}
