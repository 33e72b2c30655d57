//! HTTP implementation of the registrar client.

use crate::{AddedDomain, DnsPushOutcome, DomainRegistrar, DomainStatus, RegistrarError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use storefront_core::config::RegistrarConfig;
use storefront_core::types::DnsRecord;
use tracing::debug;

/// Error codes the upstream uses for the "somebody already holds this
/// domain" class of failure.
const ALREADY_IN_USE_CODES: &[&str] = &["domain_already_in_use", "domain_taken", "conflict"];

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddDomainBody {
    #[serde(default)]
    verified: bool,
    verification: Option<storefront_core::types::DomainVerification>,
}

#[derive(Debug, Deserialize)]
struct DomainStatusBody {
    #[serde(default)]
    verified: bool,
    verification: Option<storefront_core::types::DomainVerification>,
}

#[derive(Debug, Deserialize)]
struct DnsBatchBody {
    #[serde(default)]
    added: Vec<DnsRecord>,
    #[serde(default)]
    errors: Vec<crate::DnsRecordError>,
}

/// Registrar client speaking the upstream JSON API, with a bounded
/// per-call timeout so a wedged registrar cannot hang a workflow.
pub struct HttpRegistrar {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: String,
}

impl HttpRegistrar {
    pub fn new(config: &RegistrarConfig) -> Result<Self, RegistrarError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RegistrarError::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn domain_url(&self, domain: &str) -> String {
        format!(
            "{}/projects/{}/domains/{}",
            self.base_url, self.project_id, domain
        )
    }

    fn map_transport(e: reqwest::Error) -> RegistrarError {
        if e.is_timeout() {
            RegistrarError::Timeout
        } else {
            RegistrarError::Upstream(e.to_string())
        }
    }

    /// Decode an error response, classifying the already-in-use family.
    async fn decode_error(response: reqwest::Response) -> RegistrarError {
        let status = response.status();
        let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody { error: None });
        let (code, message) = match body.error {
            Some(e) => (
                e.code.unwrap_or_default(),
                e.message.unwrap_or_else(|| status.to_string()),
            ),
            None => (String::new(), status.to_string()),
        };
        if ALREADY_IN_USE_CODES.contains(&code.as_str())
            || message.to_lowercase().contains("already in use")
        {
            RegistrarError::AlreadyInUse(message)
        } else {
            RegistrarError::Upstream(message)
        }
    }
}

#[async_trait]
impl DomainRegistrar for HttpRegistrar {
    async fn add_domain(&self, domain: &str) -> Result<AddedDomain, RegistrarError> {
        debug!(domain, "Registrar add-domain");
        let url = format!("{}/projects/{}/domains", self.base_url, self.project_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "name": domain }))
            .send()
            .await
            .map_err(Self::map_transport)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        let body: AddDomainBody = response.json().await.map_err(Self::map_transport)?;
        Ok(AddedDomain {
            verified: body.verified,
            verification: body.verification,
        })
    }

    async fn remove_domain(&self, domain: &str) -> Result<(), RegistrarError> {
        debug!(domain, "Registrar remove-domain");
        let response = self
            .client
            .delete(self.domain_url(domain))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        // A domain that is already gone is a success for our purposes.
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Self::decode_error(response).await)
        }
    }

    async fn get_domain_status(&self, domain: &str) -> Result<DomainStatus, RegistrarError> {
        let response = self
            .client
            .get(self.domain_url(domain))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(DomainStatus {
                exists: false,
                verified: false,
                verification: None,
            });
        }
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        let body: DomainStatusBody = response.json().await.map_err(Self::map_transport)?;
        Ok(DomainStatus {
            exists: true,
            verified: body.verified,
            verification: body.verification,
        })
    }

    async fn verify_domain(&self, domain: &str) -> Result<(), RegistrarError> {
        debug!(domain, "Registrar verify-domain");
        let response = self
            .client
            .post(format!("{}/verify", self.domain_url(domain)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::map_transport)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::decode_error(response).await)
        }
    }

    async fn add_dns_records(
        &self,
        domain: &str,
        records: &[DnsRecord],
    ) -> Result<DnsPushOutcome, RegistrarError> {
        debug!(domain, count = records.len(), "Registrar DNS batch push");
        let response = self
            .client
            .post(format!("{}/records", self.domain_url(domain)))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "records": records }))
            .send()
            .await
            .map_err(Self::map_transport)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        let body: DnsBatchBody = response.json().await.map_err(Self::map_transport)?;
        Ok(DnsPushOutcome {
            added: body.added,
            errors: body.errors,
        })
    }
}
