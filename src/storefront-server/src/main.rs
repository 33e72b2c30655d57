//! Storefront provisioning server — custom domain and domain-branded
//! email workflows for tenant storefronts.
//!
//! Main entry point that wires the directory, the external service
//! clients and the orchestrators, then starts the API server.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use storefront_api::ApiServer;
use storefront_core::config::AppConfig;
use storefront_directory::TenantDirectory;
use storefront_email::{EmailIdentityService, HttpEmailIdentity, InMemoryEmailIdentity};
use storefront_provisioning::{DnsSynchronizer, DomainOrchestrator, EmailOrchestrator};
use storefront_registrar::{DomainRegistrar, HttpRegistrar, InMemoryRegistrar};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "storefront-server")]
#[command(about = "Custom domain and email provisioning for tenant storefronts")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "STOREFRONT__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "STOREFRONT__API__HTTP_PORT")]
    http_port: Option<u16>,
}

fn build_registrar(config: &AppConfig) -> anyhow::Result<Arc<dyn DomainRegistrar>> {
    match config.registrar.provider.as_str() {
        "http" => Ok(Arc::new(
            HttpRegistrar::new(&config.registrar).context("registrar client init failed")?,
        )),
        _ => Ok(Arc::new(InMemoryRegistrar::new())),
    }
}

fn build_email_identity(config: &AppConfig) -> anyhow::Result<Arc<dyn EmailIdentityService>> {
    match config.email_identity.provider.as_str() {
        "http" => Ok(Arc::new(
            HttpEmailIdentity::new(&config.email_identity)
                .context("email identity client init failed")?,
        )),
        _ => Ok(Arc::new(InMemoryEmailIdentity::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Storefront provisioning server starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        registrar = %config.registrar.provider,
        email_identity = %config.email_identity.provider,
        "Configuration loaded"
    );

    let directory = Arc::new(TenantDirectory::new());
    let registrar = build_registrar(&config)?;
    let email_identity = build_email_identity(&config)?;

    let domains = Arc::new(DomainOrchestrator::new(
        directory.clone(),
        registrar.clone(),
        email_identity.clone(),
        config.registrar.nameservers.clone(),
    ));
    let email = Arc::new(EmailOrchestrator::new(
        directory,
        email_identity,
        DnsSynchronizer::new(registrar),
        config.email_identity.clone(),
    ));

    let server = ApiServer::new(config, domains, email);
    server.start_metrics().await?;
    server.start_http().await
}
