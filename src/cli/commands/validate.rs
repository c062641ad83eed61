//! Validate config command implementation
//!
//! This module implements the `validate-config` command.

use crate::config::parse_config;
use crate::core::export::summary::{EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let contents = match std::fs::read_to_string(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to read configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let config = match parse_config(&contents) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Environment: {:?}", config.environment);
                println!("  Log Level: {}", config.application.log_level);
                println!("  Confluence: {}", config.confluence.base_url);
                println!("  Username: {}", config.confluence.username);
                println!("  Output Directory: {}", config.export.output_dir);
                println!("  Format: {}", config.export.format);
                println!("  Max Concurrent: {}", config.export.max_concurrent);
                println!("  Connection Pool: {}", config.export.connection_pool_limit);
                println!(
                    "  Batch Size: {}",
                    match config.export.batch_size {
                        0 => "unbounded".to_string(),
                        n => n.to_string(),
                    }
                );
                println!(
                    "  Spaces: {}",
                    if config.export.spaces.is_empty() {
                        "All".to_string()
                    } else {
                        config.export.spaces.join(", ")
                    }
                );
                println!("  Retry Attempts: {}", config.export.retry.max_attempts);
                println!("  Cache Enabled: {}", config.cache.enabled);
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(EXIT_CONFIG_ERROR)
            }
        }
    }
}
