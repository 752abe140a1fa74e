//! Configuration management for the MAL client.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,

    /// HTTP transport settings
    pub client: ClientConfig,

    /// User list cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// MAL base URL
    pub base_url: String,

    /// User agent header; MAL also reads its API key from this header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// User list cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    pub enabled: bool,

    /// Cache expiration in seconds (None = cached for the life of the client)
    pub expiration_seconds: Option<u64>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,

    /// Minimum idle time between the end of one request and the start of the next
    pub min_interval_ms: u64,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Enable retrying of transient request failures
    pub enabled: bool,

    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiration_seconds: Some(5 * 60 * 60),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_ms: 2000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            delay_ms: 5000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: false,
                json_format: false,
            },
            client: ClientConfig {
                base_url: "https://myanimelist.net".to_string(),
                user_agent: None,
                timeout_ms: 15_000,
            },
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load configuration from a TOML file or create default if not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.logging.log_dir)
    }

    /// Request timeout for the HTTP transport
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.client.timeout_ms)
    }

    /// Cache expiration; `None` keeps entries for the life of the cache
    pub fn cache_expiration(&self) -> Option<Duration> {
        self.cache.expiration_seconds.map(Duration::from_secs)
    }

    /// Minimum idle interval between requests
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit.min_interval_ms)
    }

    /// Delay between retry attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry.delay_ms)
    }
}
