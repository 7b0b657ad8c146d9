use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::gateway::Upstream;

pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No base URL configured for the {0} upstream.\nHint: set {env}.", env = .0.env_var())]
    MissingBaseUrl(Upstream),

    #[error("Invalid base URL for the {upstream} upstream '{url}': {reason}")]
    InvalidBaseUrl {
        upstream: Upstream,
        url: String,
        reason: String,
    },

    #[error("Client timeout must be at least one second")]
    ZeroTimeout,

    #[error("Connection cap per host must be at least one")]
    ZeroConnectionCap,

    #[error("Connection cap per host must not exceed {max}")]
    ConnectionCapTooLarge { max: usize },
}

/// Settings for the outbound HTTP client shared by one upstream family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub max_connections_per_host: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_connections_per_host: 50,
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Process-wide configuration, read once at startup.
///
/// Example TOML:
/// ```toml
/// temperature_base_url = "http://localhost:8000/"
/// windspeed_base_url = "http://localhost:8080/"
/// port = 3000
///
/// [client]
/// timeout_secs = 10
/// max_connections_per_host = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub temperature_base_url: Option<String>,
    pub windspeed_base_url: Option<String>,
    pub port: u16,
    pub client: ClientSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temperature_base_url: None,
            windspeed_base_url: None,
            port: 8080,
            client: ClientSettings::default(),
        }
    }
}

impl Config {
    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self)
            .context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-gateway", "weather-gateway")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override values from `lookup`; empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for upstream in Upstream::all() {
            if let Some(url) = get(upstream.env_var()) {
                self.set_base_url(*upstream, url);
            }
        }

        if let Some(port) = get(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{PORT_ENV} is not a valid port: {port}"))?;
        }

        Ok(())
    }

    pub fn set_base_url(&mut self, upstream: Upstream, url: String) {
        match upstream {
            Upstream::Temperature => self.temperature_base_url = Some(url),
            Upstream::WindSpeed => self.windspeed_base_url = Some(url),
        }
    }

    /// Returns the base URL for an upstream, if present and non-empty.
    pub fn base_url(&self, upstream: Upstream) -> Option<&str> {
        let url = match upstream {
            Upstream::Temperature => self.temperature_base_url.as_deref(),
            Upstream::WindSpeed => self.windspeed_base_url.as_deref(),
        };
        url.filter(|u| !u.trim().is_empty())
    }

    pub fn require_base_url(&self, upstream: Upstream) -> Result<&str, ConfigError> {
        let url = self
            .base_url(upstream)
            .ok_or(ConfigError::MissingBaseUrl(upstream))?;

        reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidBaseUrl {
            upstream,
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for upstream in Upstream::all() {
            self.require_base_url(*upstream)?;
        }
        if self.client.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.client.max_connections_per_host == 0 {
            return Err(ConfigError::ZeroConnectionCap);
        }
        if self.client.max_connections_per_host > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ConnectionCapTooLarge {
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(())
    }
}
