//! Configuration schema types
//!
//! This module defines the configuration structure mapped from the TOML file.

use crate::config::SecretString;
use crate::domain::ExportFormat;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Root configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Confluence connection settings
    pub confluence: ConfluenceConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Completed-export cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.confluence.validate(&self.environment)?;
        self.export.validate()?;
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Resolve and report the export plan without submitting anything
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Confluence server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    /// Base URL of the Confluence site, e.g. `https://acme.atlassian.net/wiki`
    pub base_url: String,

    /// Account used for basic authentication
    #[serde(default)]
    pub username: String,

    /// API token paired with `username`
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub api_token: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// Must stay `true` in production (enforced by validation).
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl ConfluenceConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.base_url.is_empty() {
            return Err("confluence.base_url cannot be empty".to_string());
        }

        let url = url::Url::parse(&self.base_url)
            .map_err(|e| format!("confluence.base_url is not a valid URL: {e}"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err("confluence.base_url must start with http:// or https://".to_string());
        }

        if self.username.trim().is_empty() {
            return Err("confluence.username cannot be empty".to_string());
        }

        if self
            .api_token
            .as_ref()
            .map(|t| t.expose_secret().is_empty())
            .unwrap_or(true)
        {
            return Err("confluence.api_token cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("confluence.timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments"
                    .to_string(),
            );
        }

        Ok(())
    }
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://your-domain.atlassian.net/wiki".to_string(),
            username: String::new(),
            api_token: None,
            timeout_seconds: default_timeout_seconds(),
            tls_verify: true,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving archives, partial files and the cache index
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Archive format requested from the service
    #[serde(default)]
    pub format: ExportFormat,

    /// Maximum jobs with an active network operation
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Idle HTTP connections kept per host (>= max_concurrent)
    #[serde(default = "default_connection_pool_limit")]
    pub connection_pool_limit: usize,

    /// Download buffer size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Spaces per batch (0 = a single batch)
    #[serde(default)]
    pub batch_size: usize,

    /// Minimum seconds between consecutive job submissions
    #[serde(default)]
    pub export_interval_seconds: u64,

    /// Seconds to wait before each job status query
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Include personal spaces when exporting everything
    #[serde(default)]
    pub include_personal: bool,

    /// Include archived spaces when exporting everything
    #[serde(default)]
    pub include_archived: bool,

    /// Explicit space keys (empty = all)
    #[serde(default)]
    pub spaces: Vec<String>,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.output_dir.trim().is_empty() {
            return Err("export.output_dir cannot be empty".to_string());
        }

        if self.max_concurrent == 0 {
            return Err("export.max_concurrent must be >= 1".to_string());
        }

        if self.connection_pool_limit < self.max_concurrent {
            return Err(format!(
                "export.connection_pool_limit ({}) must be >= export.max_concurrent ({})",
                self.connection_pool_limit, self.max_concurrent
            ));
        }

        if self.chunk_size == 0 {
            return Err("export.chunk_size must be > 0".to_string());
        }

        for key in &self.spaces {
            crate::domain::SpaceKey::new(key.as_str())
                .map_err(|e| format!("export.spaces: {e}"))?;
        }

        self.retry.validate()
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: ExportFormat::default(),
            max_concurrent: default_max_concurrent(),
            connection_pool_limit: default_connection_pool_limit(),
            chunk_size: default_chunk_size(),
            batch_size: 0,
            export_interval_seconds: 0,
            poll_interval_seconds: default_poll_interval_seconds(),
            include_personal: false,
            include_archived: false,
            spaces: Vec::new(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the first failure of a phase
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Extra factor applied to the base delay after a 429
    #[serde(default = "default_rate_limit_multiplier")]
    pub rate_limit_multiplier: f64,

    /// Randomize delays to spread retries out
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_delay_ms > self.max_delay_ms {
            return Err(format!(
                "export.retry.base_delay_ms ({}) must be <= max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            ));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err("export.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.rate_limit_multiplier.is_nan() || self.rate_limit_multiplier < 1.0 {
            return Err("export.retry.rate_limit_multiplier must be >= 1.0".to_string());
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            rate_limit_multiplier: default_rate_limit_multiplier(),
            jitter: true,
        }
    }
}

/// Completed-export cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Skip spaces already exported
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Index file name, relative to the output directory
    #[serde(default = "default_cache_file_name")]
    pub file_name: String,

    /// Entries older than this are ignored (0 = never expire)
    #[serde(default)]
    pub max_age_hours: u64,
}

impl CacheConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.file_name.trim().is_empty() {
            return Err("cache.file_name cannot be empty when the cache is enabled".to_string());
        }
        if self.file_name.contains('/') || self.file_name.contains('\\') {
            return Err("cache.file_name must be a plain file name".to_string());
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: default_cache_file_name(),
            max_age_hours: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_output_dir() -> String {
    "confluence_export".to_string()
}

fn default_max_concurrent() -> usize {
    5
}

fn default_connection_pool_limit() -> usize {
    10
}

fn default_chunk_size() -> usize {
    8192
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    60000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_rate_limit_multiplier() -> f64 {
    4.0
}

fn default_cache_file_name() -> String {
    "export_cache.json".to_string()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
