//! HTTP implementation of the email identity client.

use crate::{DomainIdentity, EmailIdentityError, EmailIdentityService};
use async_trait::async_trait;
use std::time::Duration;
use storefront_core::config::EmailIdentityConfig;
use tracing::debug;

pub struct HttpEmailIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpEmailIdentity {
    pub fn new(config: &EmailIdentityConfig) -> Result<Self, EmailIdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmailIdentityError::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn map_transport(e: reqwest::Error) -> EmailIdentityError {
        if e.is_timeout() {
            EmailIdentityError::Timeout
        } else {
            EmailIdentityError::Upstream(e.to_string())
        }
    }
}

#[async_trait]
impl EmailIdentityService for HttpEmailIdentity {
    async fn create_domain_identity(
        &self,
        domain: &str,
    ) -> Result<DomainIdentity, EmailIdentityError> {
        debug!(domain, "Creating email domain identity");
        let response = self
            .client
            .post(format!("{}/identities", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "domain": domain }))
            .send()
            .await
            .map_err(Self::map_transport)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailIdentityError::Upstream(format!(
                "identity creation failed ({status}): {body}"
            )));
        }
        response.json().await.map_err(Self::map_transport)
    }

    async fn delete_domain_identity(&self, domain: &str) -> Result<(), EmailIdentityError> {
        debug!(domain, "Deleting email domain identity");
        let response = self
            .client
            .delete(format!("{}/identities/{}", self.base_url, domain))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        // Already gone counts as deleted.
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(EmailIdentityError::Upstream(format!(
                "identity deletion failed ({})",
                response.status()
            )))
        }
    }
}
