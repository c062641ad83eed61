//! Configuration management.
//!
//! TOML-based configuration loading, parsing and validation.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for optional settings
//! - `CONFLUENCE_EXPORT_<SECTION>_<KEY>` environment overrides
//! - Validation before anything touches the network
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use confluence_export::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("confluence-export.toml")?;
//!
//! println!("Confluence: {}", config.confluence.base_url);
//! println!("Output: {}", config.export.output_dir);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [confluence]
//! base_url = "https://acme.atlassian.net/wiki"
//! username = "ops@acme.example"
//! api_token = "${CONFLUENCE_API_TOKEN}"
//!
//! [export]
//! output_dir = "confluence_export"
//! max_concurrent = 5
//! spaces = ["ENG", "OPS"]
//!
//! [export.retry]
//! max_attempts = 3
//! ```
//!
//! The sections are [`ApplicationConfig`], [`ConfluenceConfig`],
//! [`ExportConfig`] (with [`RetryConfig`]), [`CacheConfig`] and
//! [`LoggingConfig`].

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    AppConfig, ApplicationConfig, CacheConfig, ConfluenceConfig, Environment, ExportConfig,
    LoggingConfig, RetryConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
