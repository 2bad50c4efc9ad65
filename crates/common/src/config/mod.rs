//! Gateway configuration

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gateway configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending schema migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
}

/// Object storage backend selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// memory, local, or s3
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,

    /// Root directory for the local backend
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Bucket for the s3 backend (credentials come from the AWS_* environment)
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing and verification
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// External login entry point that unauthenticated submitters are sent to
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per minute, per origin
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Burst capacity per origin
    #[serde(default = "default_burst")]
    pub burst: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Key buckets on the first `X-Forwarded-For` entry instead of the
    /// peer address. Only safe behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL for memoized listings, in seconds
    #[serde(default = "default_listing_ttl")]
    pub listing_ttl_secs: u64,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_body_bytes() -> usize { 1024 * 1024 }
fn default_database_url() -> String { DEFAULT_DATABASE_URL.to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_storage_backend() -> StorageBackend { StorageBackend::Local }
fn default_storage_root() -> String { "./data/storage".to_string() }
fn default_bucket() -> String { "papers".to_string() }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_login_url() -> String { "/login".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "gsr-gateway".to_string() }
fn default_requests_per_minute() -> u32 { 10 }
fn default_burst() -> u32 { 10 }
fn default_enabled() -> bool { true }
fn default_listing_ttl() -> u64 { 300 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            root: default_storage_root(),
            bucket: default_bucket(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
            login_url: default_login_url(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
            enabled: default_enabled(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_ttl_secs: default_listing_ttl(),
        }
    }
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/research_repository";

impl AppConfig {
    /// Layered load: `config/default`, `config/{APP_ENV}`, `config/local`,
    /// then `APP__` environment variables (e.g. `APP__SERVER__PORT=8081`).
    /// Later sources win; all files are optional.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder();
        for layer in ["default", env.as_str(), "local"] {
            builder = builder.add_source(File::with_name(&format!("config/{layer}")).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// How long a memoized browse listing stays fresh
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.listing_ttl_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.rate_limit.requests_per_minute, 10);
        assert!(!config.rate_limit.trust_forwarded_for);
        assert_eq!(config.listing_ttl(), Duration::from_secs(300));
        assert_eq!(config.storage.backend, StorageBackend::Local);
    }

    #[test]
    fn test_sections_fill_in_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("rate_limit.burst", 3)
            .unwrap()
            .set_override("database.run_migrations", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.rate_limit.burst, 3);
        assert_eq!(config.rate_limit.requests_per_minute, 10);
        assert!(!config.rate_limit.trust_forwarded_for);
        assert!(config.database.run_migrations);
        assert_eq!(config.database.max_connections, 20);
    }

    #[test]
    fn test_storage_backend_names() {
        let backend: StorageBackend = serde_json::from_str("\"s3\"").unwrap();
        assert_eq!(backend, StorageBackend::S3);
        let backend: StorageBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(backend, StorageBackend::Memory);
    }
}
