//! REST API handlers for domain and email provisioning.
//!
//! Authentication happens upstream: by the time a request reaches
//! these handlers, the gateway has resolved the session and stamped
//! the owning tenant id into the `x-tenant-id` header.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storefront_core::ProvisioningError;
use storefront_provisioning::{
    AddDomainResponse, DisableEmailResponse, DomainOrchestrator, EmailOrchestrator,
    ForwardToCalResponse, RemoveDomainResponse, SetupEmailResponse, VerifyDomainResponse,
};
use tracing::warn;
use uuid::Uuid;

const TENANT_HEADER: &str = "x-tenant-id";

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub domains: Arc<DomainOrchestrator>,
    pub email: Arc<EmailOrchestrator>,
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn map_error(e: ProvisioningError) -> ApiError {
    let status = match &e {
        ProvisioningError::Validation(_) => StatusCode::BAD_REQUEST,
        ProvisioningError::NotFound(_) => StatusCode::NOT_FOUND,
        ProvisioningError::Conflict(_) => StatusCode::CONFLICT,
        ProvisioningError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    metrics::counter!("api.errors", "code" => e.code()).increment(1);
    (
        status,
        Json(ErrorResponse {
            error: e.code().to_string(),
            message: e.to_string(),
        }),
    )
}

/// Pull the authenticated tenant id the gateway stamped on the request.
fn tenant_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| {
            warn!("Request without a valid {TENANT_HEADER} header");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "unauthenticated".to_string(),
                    message: "missing or invalid tenant identity".to_string(),
                }),
            )
        })
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddDomainRequest {
    pub domain: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveDomainRequest {
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetupEmailRequest {
    pub email_prefix: Option<String>,
    pub forward_to_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ForwardToCalRequest {
    pub forward_to_cal: bool,
}

// ---------------------------------------------------------------------------
// Domain endpoints
// ---------------------------------------------------------------------------

/// POST /v1/domain — attach a custom domain.
pub async fn add_domain(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddDomainRequest>,
) -> Result<Json<AddDomainResponse>, ApiError> {
    let tenant = tenant_id(&headers)?;
    state
        .domains
        .add_domain(tenant, &request.domain)
        .await
        .map(Json)
        .map_err(map_error)
}

/// POST /v1/domain/verify — poll and persist verification state.
pub async fn verify_domain(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyDomainResponse>, ApiError> {
    let tenant = tenant_id(&headers)?;
    state
        .domains
        .verify_domain(tenant)
        .await
        .map(Json)
        .map_err(map_error)
}

/// DELETE /v1/domain — detach the primary domain, or a named
/// additional domain.
pub async fn remove_domain(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RemoveDomainRequest>>,
) -> Result<Json<RemoveDomainResponse>, ApiError> {
    let tenant = tenant_id(&headers)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();
    state
        .domains
        .remove_domain(tenant, request.domain.as_deref())
        .await
        .map(Json)
        .map_err(map_error)
}

// ---------------------------------------------------------------------------
// Email endpoints
// ---------------------------------------------------------------------------

/// POST /v1/email — provision the domain-branded email identity.
pub async fn setup_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SetupEmailRequest>,
) -> Result<Json<SetupEmailResponse>, ApiError> {
    let tenant = tenant_id(&headers)?;
    state
        .email
        .setup_email(
            tenant,
            request.email_prefix.as_deref(),
            &request.forward_to_email,
        )
        .await
        .map(Json)
        .map_err(map_error)
}

/// DELETE /v1/email — tear down the email identity.
pub async fn disable_email(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DisableEmailResponse>, ApiError> {
    let tenant = tenant_id(&headers)?;
    state
        .email
        .disable_email(tenant)
        .await
        .map(Json)
        .map_err(map_error)
}

/// PATCH /v1/email/forward-to-cal — toggle calendar forwarding.
pub async fn forward_to_cal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ForwardToCalRequest>,
) -> Result<Json<ForwardToCalResponse>, ApiError> {
    let tenant = tenant_id(&headers)?;
    state
        .email
        .set_forward_to_cal(tenant, request.forward_to_cal)
        .await
        .map(Json)
        .map_err(map_error)
}

// ---------------------------------------------------------------------------
// Operational endpoints
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe for Kubernetes.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
