//! Configuration for the marketplace API.

use anyhow::{Context, Result};
use marketplace_core::PricingConfig;
use payment_gateway::GatewayConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration, read from `SECTION__FIELD` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Snapshot storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Payment gateway credentials
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Package, internship and currency settings
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Certificate delivery configuration
    #[serde(default)]
    pub certificates: CertificateConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Browser origin allowed by CORS. Unset disables CORS headers.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the encrypted snapshot file
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, state is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Secret the snapshot key is derived from. Without it nothing is
    /// written to disk.
    #[serde(default)]
    pub encryption_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateConfig {
    /// Prefix of the URLs rendered certificates are served from
    #[serde(default = "default_certificate_url_prefix")]
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            cors_origin: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            persist: true,
            encryption_secret: None,
        }
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_certificate_url_prefix(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("/data/marketplace.enc")
}

fn default_true() -> bool {
    true
}

fn default_certificate_url_prefix() -> String {
    "/certificates".into()
}

fn default_global_rpm() -> u32 {
    120
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
