use common::config::MqAppConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Object-storage backend settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend provider: "s3" or "memory" (tests/local only).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Path-style addressing; required by MinIO.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    /// Maximum accepted file size in bytes. Default: 128 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// TTL for single-PUT presigned URLs and their upload sessions.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u32,
    /// TTL for multipart upload sessions.
    #[serde(default = "default_multipart_ttl")]
    pub multipart_ttl_secs: u32,
    /// TTL for presigned download URLs.
    #[serde(default = "default_download_ttl")]
    pub download_ttl_secs: u32,
}

fn default_provider() -> String {
    "s3".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}
fn default_max_blob_size() -> u64 {
    128 * 1024 * 1024
}
fn default_signed_url_ttl() -> u32 {
    3600
}
fn default_multipart_ttl() -> u32 {
    24 * 3600
}
fn default_download_ttl() -> u32 {
    600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: default_path_style(),
            max_blob_size: default_max_blob_size(),
            signed_url_ttl_secs: default_signed_url_ttl(),
            multipart_ttl_secs: default_multipart_ttl(),
            download_ttl_secs: default_download_ttl(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuotaConfig {
    /// Quota assigned to lazily created storage accounts. Default: 10 GiB.
    #[serde(default = "default_quota_bytes")]
    pub default_quota_bytes: i64,
}

fn default_quota_bytes() -> i64 {
    10 * 1024 * 1024 * 1024
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_quota_bytes: default_quota_bytes(),
        }
    }
}

/// KV session store (Redis) settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_url")]
    pub url: String,
}

fn default_session_url() -> String {
    "redis://localhost:6379".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: default_session_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., KOHLRABI__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("KOHLRABI").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
