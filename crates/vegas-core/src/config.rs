//! Configuration management for Vegas.
//!
//! Loads configuration from ${VEGAS_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for Vegas configuration and data files.
    //!
    //! VEGAS_HOME resolution order:
    //! 1. VEGAS_HOME environment variable (if set)
    //! 2. ~/.config/vegas (default)

    use std::path::PathBuf;

    /// Returns the Vegas home directory.
    ///
    /// Checks VEGAS_HOME env var first, falls back to ~/.config/vegas
    pub fn vegas_home() -> PathBuf {
        if let Ok(home) = std::env::var("VEGAS_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("vegas"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        vegas_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        vegas_home().join("session.json")
    }
}

/// Games platform backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend base URL.
    pub base_url: String,
}

impl BackendConfig {
    /// Returns the effective base URL, without a trailing slash.
    ///
    /// The VEGAS_BACKEND_URL environment variable overrides the config value.
    pub fn effective_base_url(&self) -> String {
        let url = std::env::var("VEGAS_BACKEND_URL").unwrap_or_else(|_| self.base_url.clone());
        url.trim().trim_end_matches('/').to_string()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.games-platform.example".to_string(),
        }
    }
}

/// Secondary identity service, used only when the backend exchange is
/// unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Identity service base URL.
    pub url: String,
    /// Public API key sent with identity-service requests.
    pub api_key: String,
}

impl FallbackConfig {
    /// Returns the effective identity service URL, without a trailing slash.
    ///
    /// The VEGAS_FALLBACK_URL environment variable overrides the config value.
    pub fn effective_url(&self) -> String {
        let url = std::env::var("VEGAS_FALLBACK_URL").unwrap_or_else(|_| self.url.clone());
        url.trim().trim_end_matches('/').to_string()
    }

    /// Returns the effective API key.
    ///
    /// The VEGAS_FALLBACK_API_KEY environment variable overrides the config value.
    pub fn effective_api_key(&self) -> String {
        std::env::var("VEGAS_FALLBACK_API_KEY").unwrap_or_else(|_| self.api_key.clone())
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            url: "https://identity.games-platform.example".to_string(),
            api_key: String::new(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds for all backend calls.
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default bet per slot round (credits).
    pub default_bet: i64,

    /// Games platform backend.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Secondary identity service.
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    const DEFAULT_BET: i64 = 100;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_bet: Self::DEFAULT_BET,
            backend: BackendConfig::default(),
            fallback: FallbackConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
