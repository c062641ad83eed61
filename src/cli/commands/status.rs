//! Status command implementation
//!
//! This module implements the `status` command, which lists the spaces
//! recorded in the export cache.

use crate::config::load_config;
use crate::core::export::open_cache;
use crate::core::export::summary::{EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Filter by space key
    #[arg(long)]
    pub space: Option<String>,

    /// Override output directory holding the cache
    #[arg(short, long)]
    pub output: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        if !config.cache.enabled {
            println!("Export cache is disabled in the configuration.");
            return Ok(EXIT_SUCCESS);
        }

        let output_dir = PathBuf::from(self.output.as_deref().unwrap_or(&config.export.output_dir));
        let cache = open_cache(&config.cache, &output_dir);

        let entries: Vec<_> = cache
            .entries()
            .into_iter()
            .filter(|e| self.space.as_deref().map_or(true, |k| e.space_key.as_str() == k))
            .collect();

        if entries.is_empty() {
            println!("No export history found in {}.", output_dir.display());
            println!("Run 'confluence-export export' to start exporting spaces.");
            return Ok(EXIT_SUCCESS);
        }

        println!("Found {} cached export(s):", entries.len());
        println!();
        println!(
            "{:<20} {:<10} {:>12} {:<20} {}",
            "Space", "Status", "Size", "Completed", "File"
        );
        println!("{}", "-".repeat(100));

        for entry in entries {
            let status = if cache.is_valid(&entry) {
                "✅ Valid"
            } else {
                "⚠️  Stale"
            };
            println!(
                "{:<20} {:<10} {:>12} {:<20} {}",
                entry.space_key.as_str(),
                status,
                entry.size_bytes,
                entry.completed_at.format("%Y-%m-%d %H:%M:%S"),
                entry.file_path.display()
            );
        }

        println!();
        Ok(EXIT_SUCCESS)
    }
}
