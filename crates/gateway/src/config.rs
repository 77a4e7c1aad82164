//! Gateway configuration
//!
//! Read once from the environment at startup and injected into components;
//! business logic never does ambient env lookups. Missing required variables
//! are fatal before the listener binds.

use shopbridge_crm::VtigerConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret Shopify signs webhook bodies with
    pub shopify_api_secret: String,
    pub vtiger: VtigerConfig,
    pub bind_address: String,
    pub audit_log_path: String,
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut vtiger = VtigerConfig::new(
            require("VTIGER_URL")?,
            require("VTIGER_USERNAME")?,
            require("VTIGER_ACCESS_KEY")?,
        );
        vtiger.assigned_user_id =
            optional("VTIGER_ASSIGNED_USER_ID", &vtiger.assigned_user_id);
        vtiger.currency_id = optional("VTIGER_CURRENCY_ID", &vtiger.currency_id);
        vtiger.product_id = optional("VTIGER_PRODUCT_ID", &vtiger.product_id);

        Ok(Self {
            shopify_api_secret: require("SHOPIFY_API_SECRET")?,
            vtiger,
            bind_address: optional("BIND_ADDRESS", "0.0.0.0:3000"),
            audit_log_path: optional("AUDIT_LOG_PATH", "logs/webhook.log"),
        })
    }
}
