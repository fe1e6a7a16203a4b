use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::db::Role;

/// Secrets shorter than this are accepted but logged as weak
const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served as the static front-end
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Directory where profile photos are written
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// Upper bound for request bodies, including photo uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            uploads_dir: default_uploads_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Size of the connection pool; requests beyond it wait for a free connection
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a request waits for a pooled connection before failing
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:./data/classbook.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for identity tokens. Required; startup fails without it.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_token_ttl_secs() -> i64 {
    3600
}

/// Role allow-lists that differ between deployments
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Roles allowed to browse the class catalogue
    #[serde(default = "default_list_classes_roles")]
    pub list_classes: Vec<Role>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            list_classes: default_list_classes_roles(),
        }
    }
}

fn default_list_classes_roles() -> Vec<Role> {
    vec![Role::Student, Role::Instructor]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Check settings that would make the server unsafe or unusable.
    pub fn validate(&self) -> Result<()> {
        let secret = match self.auth.jwt_secret.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => bail!(
                "auth.jwt_secret is not set; refusing to start without a token signing secret"
            ),
        };

        if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            warn!(
                length = secret.len(),
                "auth.jwt_secret is shorter than {} bytes", MIN_RECOMMENDED_SECRET_LEN
            );
        }

        if self.auth.token_ttl_secs <= 0 {
            bail!("auth.token_ttl_secs must be positive");
        }

        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }

        if self.policy.list_classes.is_empty() {
            warn!("policy.list_classes is empty; nobody will be able to browse classes");
        }

        Ok(())
    }

    /// The signing secret as bytes. Call after `validate`.
    pub fn jwt_secret(&self) -> &[u8] {
        self.auth
            .jwt_secret
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .as_bytes()
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            policy: PolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
