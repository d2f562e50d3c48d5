use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ExporterError;

fn invalid(message: String) -> anyhow::Error {
    ExporterError::Config(message).into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub redfish: RedfishConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Credentials shared by every target this exporter scrapes.
///
/// `host` is the single-target default; per-request targets replace it.
#[derive(Debug, Deserialize, Clone)]
pub struct RedfishConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: SecretString,
    #[serde(default = "default_true")]
    pub insecure: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

/// Accepted for compatibility; the collection path does not consult these.
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_seconds: u64,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "http://localhost:5000".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> SecretString {
    SecretString::new("password".into())
}

fn default_listen_address() -> String {
    "localhost:9290".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_scrape_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for RedfishConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: default_username(),
            password: default_password(),
            insecure: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            scrape_interval_seconds: default_scrape_interval(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("REDFISH_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        if self.redfish.host.trim().is_empty() {
            return Err(invalid("redfish.host must be set".to_string()));
        }
        if self.redfish.username.trim().is_empty() {
            return Err(invalid("redfish.username must be set".to_string()));
        }
        if self.redfish.password.expose_secret().is_empty() {
            return Err(invalid("redfish.password must be set".to_string()));
        }
        if !self.server.metrics_path.starts_with('/') {
            return Err(invalid(format!(
                "server.metrics_path must start with '/', got {:?}",
                self.server.metrics_path
            )));
        }
        if matches!(self.server.metrics_path.as_str(), "/" | "/health") {
            return Err(invalid(format!(
                "server.metrics_path {:?} collides with a built-in route",
                self.server.metrics_path
            )));
        }
        Ok(())
    }
}
