pub mod config;
pub mod error;
pub mod types;
pub mod validate;

pub use config::AppConfig;
pub use error::{ProvisioningError, ProvisioningResult};
