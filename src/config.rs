//! Configuration System
//!
//! Loads configuration from a TOML file with `RENSHUU_*` environment
//! variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::refresh::HubConfig;
use crate::storage::StorageConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("renshuu").join("renshuu.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./renshuu_data/renshuu.db".to_string())
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Users whose profile is created with the admin role
    #[serde(default)]
    pub admin_user_ids: Vec<String>,

    #[serde(default = "default_max_ws_connections")]
    pub max_ws_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_ws_connections() -> usize {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            admin_user_ids: Vec::new(),
            max_ws_connections: default_max_ws_connections(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == user_id)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("renshuu").join("config.toml")),
            Some(PathBuf::from("/etc/renshuu/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("RENSHUU_DATABASE_PATH") {
            self.database.path = path;
        }

        if let Some(host) = var("RENSHUU_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("RENSHUU_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid RENSHUU_API_PORT"),
            }
        }
        if let Some(ids) = var("RENSHUU_ADMIN_IDS") {
            self.api.admin_user_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(level) = var("RENSHUU_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("RENSHUU_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            database_path: PathBuf::from(&self.database.path),
            busy_timeout_ms: self.database.busy_timeout_ms,
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_connections: self.api.max_ws_connections,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Renshuu Configuration
#
# Environment variables override these settings:
# - RENSHUU_DATABASE_PATH
# - RENSHUU_API_HOST
# - RENSHUU_API_PORT
# - RENSHUU_ADMIN_IDS (comma separated)
# - RENSHUU_LOG_LEVEL
# - RENSHUU_LOG_FORMAT

[database]
# SQLite database file
path = "./renshuu_data/renshuu.db"

# How long a write waits for a locked database (ms)
busy_timeout_ms = 5000

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8080

# Allowed CORS origins (empty allows any)
cors_origins = []

# Users whose profile is created with the admin role
admin_user_ids = []

# Concurrent /ws connections
max_ws_connections = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
