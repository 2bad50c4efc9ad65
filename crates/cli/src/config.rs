//! Client configuration
//!
//! Loaded from `config/client` (optional) and `GSR__`-prefixed
//! environment variables, e.g. `GSR__GATEWAY_URL=http://localhost:8080`
//! or `GSR__STORAGE__BACKEND=s3`.

use config::{Config, ConfigError, Environment, File};
use gsr_common::config::StorageConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Gateway base URL, without the `/v2` prefix
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Bearer token issued by the identity service
    #[serde(default)]
    pub token: Option<String>,

    /// Where the pending submission slot lives
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Shown to submitters without a valid session
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// HTTP timeout for gateway calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Object storage the PDF is uploaded to
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_gateway_url() -> String { "http://localhost:8080".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from(".gsr") }
fn default_login_url() -> String { "http://localhost:8080/login".to_string() }
fn default_request_timeout() -> u64 { 30 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            token: None,
            data_dir: default_data_dir(),
            login_url: default_login_url(),
            request_timeout_secs: default_request_timeout(),
            storage: StorageConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/client").required(false))
            .add_source(
                Environment::with_prefix("GSR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Command-line flags win over file and environment
    pub fn with_overrides(mut self, gateway: Option<String>, token: Option<String>) -> Self {
        if let Some(gateway) = gateway {
            self.gateway_url = gateway;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsr_common::config::StorageBackend;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.gateway_url, "http://localhost:8080");
        assert_eq!(config.data_dir, PathBuf::from(".gsr"));
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default()
            .with_overrides(Some("https://papers.example.org".into()), None);
        assert_eq!(config.gateway_url, "https://papers.example.org");
        assert!(config.token.is_none());

        let config = config.with_overrides(None, Some("abc".into()));
        assert_eq!(config.gateway_url, "https://papers.example.org");
        assert_eq!(config.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_partial_source_uses_defaults() {
        let config: ClientConfig = Config::builder()
            .set_override("gateway_url", "http://gateway:8080")
            .unwrap()
            .set_override("storage.backend", "memory")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.gateway_url, "http://gateway:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
