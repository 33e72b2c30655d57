use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `STOREFRONT__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub registrar: RegistrarConfig,
    #[serde(default)]
    pub email_identity: EmailIdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Domain registrar (external domain-hosting API) settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarConfig {
    /// `http` for the real upstream, `memory` for the simulated
    /// registrar (local development and tests).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_registrar_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Registrar project the platform's domains live under.
    #[serde(default = "default_project_id")]
    pub project_id: String,
    /// Hard per-call deadline for every registrar request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Nameservers tenants must point their domain at.
    #[serde(default = "default_nameservers")]
    pub nameservers: Vec<String>,
}

/// Transactional-email identity provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailIdentityConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_email_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Host the DKIM CNAME targets point into, e.g.
    /// `{token}.dkim.mail.storefront.app`.
    #[serde(default = "default_dkim_host")]
    pub dkim_host: String,
    /// Inbound MX target for domain-branded addresses.
    #[serde(default = "default_inbound_mx")]
    pub inbound_mx: String,
    #[serde(default = "default_spf_include")]
    pub spf_include: String,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9100
}
fn default_provider() -> String {
    "memory".to_string()
}
fn default_registrar_url() -> String {
    "https://registrar.internal.storefront.app/v1".to_string()
}
fn default_project_id() -> String {
    "storefront-prod".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_nameservers() -> Vec<String> {
    vec![
        "ns1.storefront-dns.app".to_string(),
        "ns2.storefront-dns.app".to_string(),
    ]
}
fn default_email_url() -> String {
    "https://mail.internal.storefront.app/v1".to_string()
}
fn default_dkim_host() -> String {
    "dkim.mail.storefront.app".to_string()
}
fn default_inbound_mx() -> String {
    "inbound.mail.storefront.app".to_string()
}
fn default_spf_include() -> String {
    "spf.mail.storefront.app".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_registrar_url(),
            api_key: String::new(),
            project_id: default_project_id(),
            timeout_secs: default_timeout_secs(),
            nameservers: default_nameservers(),
        }
    }
}

impl Default for EmailIdentityConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_email_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            dkim_host: default_dkim_host(),
            inbound_mx: default_inbound_mx(),
            spf_include: default_spf_include(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            registrar: RegistrarConfig::default(),
            email_identity: EmailIdentityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("STOREFRONT")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
