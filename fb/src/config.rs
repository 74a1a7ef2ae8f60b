//! Finboard configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Finboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection
    pub api: ApiConfig,

    /// Dashboard data ranges
    pub dashboard: DashboardConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .finboard.yml
        let local_config = PathBuf::from(".finboard.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/finboard/finboard.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("finboard").join("finboard.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Never fails: any problem loading the file just means no configured level.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Environment variable containing a bearer token
    #[serde(rename = "token-env")]
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
            token_env: "FINBOARD_TOKEN".to_string(),
        }
    }
}

impl ApiConfig {
    /// Bearer token from the configured environment variable, if set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Dashboard data ranges
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Number of transactions in the "recent" list
    #[serde(rename = "recent-limit")]
    pub recent_limit: u32,

    /// Number of months in the monthly series
    pub months: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_limit: 5,
            months: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.dashboard.recent_limit, 5);
        assert_eq!(config.dashboard.months, 6);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finboard.yml");
        fs::write(
            &path,
            "api:\n  base-url: https://finance.example.com\ndashboard:\n  months: 12\nlog-level: debug\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://finance.example.com");
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.dashboard.months, 12);
        assert_eq!(config.dashboard.recent_limit, 5);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
        assert_eq!(Config::load_log_level(Some(&missing)), None);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yml");
        fs::write(&path, "api: [unclosed").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_token_from_environment() {
        let config = ApiConfig {
            token_env: "FINBOARD_TEST_TOKEN_ENV".to_string(),
            ..ApiConfig::default()
        };
        // SAFETY: serialized test; no other thread reads this variable
        unsafe { std::env::set_var("FINBOARD_TEST_TOKEN_ENV", "  abc123 ") };
        assert_eq!(config.token().as_deref(), Some("abc123"));

        unsafe { std::env::set_var("FINBOARD_TEST_TOKEN_ENV", "") };
        assert_eq!(config.token(), None);

        unsafe { std::env::remove_var("FINBOARD_TEST_TOKEN_ENV") };
        assert_eq!(config.token(), None);
    }
}
