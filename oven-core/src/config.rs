//! Configuration management for the oven server
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/oven/
//! - macOS: ~/Library/Application Support/oven/
//! - Windows: %APPDATA%\oven\
//!
//! A few settings can be overridden from the environment (`OVEN_*`), which
//! is how deployments inject the signing secret without writing it to disk.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,

    #[error("Secret key is not valid base64")]
    InvalidSecret,

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON file holding the program catalog
    #[serde(default = "default_programs_path")]
    pub programs_path: PathBuf,

    /// Seconds of inactivity after which a session's oven is forgotten
    #[serde(default = "default_session_ttl")]
    pub session_idle_ttl: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret (base64 encoded)
    /// If not set, a random secret is generated on every start
    pub secret_key: Option<String>,

    /// Token TTL in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl: u64,

    /// Accounts allowed to log in
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// A configured account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,

    /// Argon2 PHC string
    pub password_hash: String,

    #[serde(default = "default_role")]
    pub role: String,
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    crate::DEFAULT_PORT
}
fn default_programs_path() -> PathBuf {
    PathBuf::from("programs.json")
}
fn default_session_ttl() -> u64 {
    3600 // 1 hour
}
fn default_token_ttl() -> u64 {
    3600 // 1 hour
}
fn default_role() -> String {
    "user".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            programs_path: default_programs_path(),
            session_idle_ttl: default_session_ttl(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            token_ttl: default_token_ttl(),
            users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Decoded signing secret, if one is configured
    pub fn secret_bytes(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        use base64::Engine;

        self.secret_key
            .as_deref()
            .map(|s| {
                base64::engine::general_purpose::STANDARD
                    .decode(s.trim())
                    .map_err(|_| ConfigError::InvalidSecret)
            })
            .transpose()
    }

    /// Get user config by name
    pub fn get_user(&self, username: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Add or update user
    pub fn upsert_user(&mut self, user: UserConfig) {
        if let Some(existing) = self.users.iter_mut().find(|u| u.username == user.username) {
            *existing = user;
        } else {
            self.users.push(user);
        }
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("oven"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `OVEN_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(secret) = lookup("OVEN_SECRET_KEY") {
            self.auth.secret_key = Some(secret);
        }
        if let Some(value) = lookup("OVEN_TOKEN_TTL") {
            self.auth.token_ttl = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "OVEN_TOKEN_TTL",
                value,
            })?;
        }
        if let Some(value) = lookup("OVEN_PORT") {
            self.server.port = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "OVEN_PORT",
                value,
            })?;
        }
        if let Some(path) = lookup("OVEN_PROGRAMS_PATH") {
            self.server.programs_path = PathBuf::from(path);
        }
        Ok(())
    }
}
