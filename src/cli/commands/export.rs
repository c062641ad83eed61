//! Export command implementation
//!
//! This module implements the `export` command, which exports Confluence
//! spaces to local archives.

use crate::config::loader::split_list;
use crate::config::{load_config, AppConfig};
use crate::core::export::summary::{
    ExportSummary, EXIT_AUTH_ERROR, EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_INTERRUPTED,
    EXIT_SUCCESS,
};
use crate::core::export::ExportCoordinator;
use crate::domain::{AppError, ExportError};
use clap::Args;
use std::io::IsTerminal;
use tokio_util::sync::CancellationToken;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - list what would be exported without submitting jobs
    #[arg(long)]
    pub dry_run: bool,

    /// Override space key(s) to export (comma-separated)
    #[arg(long)]
    pub spaces: Option<String>,

    /// Override output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override maximum concurrent exports
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Override per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Include personal spaces
    #[arg(long)]
    pub personal: bool,

    /// Include archived spaces
    #[arg(long)]
    pub archived: bool,

    /// Override number of spaces per batch (0 = single batch)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ExportArgs {
    /// Applies command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(spaces) = &self.spaces {
            let keys = split_list(spaces);
            tracing::info!(spaces = ?keys, "Overriding spaces from CLI");
            config.export.spaces = keys;
        }

        if let Some(output) = &self.output {
            tracing::info!(output_dir = %output, "Overriding output directory from CLI");
            config.export.output_dir = output.clone();
        }

        if let Some(concurrent) = self.concurrent {
            tracing::info!(max_concurrent = concurrent, "Overriding concurrency from CLI");
            config.export.max_concurrent = concurrent;
            if config.export.connection_pool_limit < concurrent {
                config.export.connection_pool_limit = concurrent;
            }
        }

        if let Some(timeout) = self.timeout {
            config.confluence.timeout_seconds = timeout;
        }

        if self.personal {
            config.export.include_personal = true;
        }

        if self.archived {
            config.export.include_archived = true;
        }

        if let Some(batch_size) = self.batch_size {
            config.export.batch_size = batch_size;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: CancellationToken,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG_ERROR);
        }

        let dry_run = config.application.dry_run;
        if dry_run {
            tracing::info!("Dry run mode enabled - no export jobs will be submitted");
            println!("🔍 DRY RUN MODE - No export jobs will be submitted");
            println!();
        }

        if !self.yes && !dry_run && !confirm(&config)? {
            println!("Export cancelled.");
            return Ok(EXIT_SUCCESS);
        }

        let show_progress = !self.no_progress && !dry_run && std::io::stderr().is_terminal();
        let coordinator = match ExportCoordinator::new(config, shutdown) {
            Ok(c) => c.with_progress_bar(show_progress),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(EXIT_AUTH_ERROR);
            }
        };

        println!("🚀 Starting export...");
        println!();

        let summary = match coordinator.execute_export().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(exit_code_for_error(&e));
            }
        };

        print_summary(&summary);
        Ok(summary.exit_code())
    }
}

/// Exit status for an error that stopped the run before any space finished
pub fn exit_code_for_error(error: &AppError) -> i32 {
    match error {
        AppError::Configuration(_) => EXIT_CONFIG_ERROR,
        AppError::Authentication(_) | AppError::Connection(_) => EXIT_AUTH_ERROR,
        AppError::Export(ExportError::Cancelled) => EXIT_INTERRUPTED,
        AppError::Export(
            ExportError::Auth(_) | ExportError::Transient(_) | ExportError::RateLimited { .. },
        ) => EXIT_AUTH_ERROR,
        _ => EXIT_FATAL,
    }
}

fn confirm(config: &AppConfig) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    println!("Export Configuration:");
    println!("  Confluence: {}", config.confluence.base_url);
    println!("  Output: {}", config.export.output_dir);
    println!("  Format: {}", config.export.format);
    println!(
        "  Spaces: {}",
        if config.export.spaces.is_empty() {
            "All".to_string()
        } else {
            config.export.spaces.join(", ")
        }
    );
    println!("  Concurrency: {}", config.export.max_concurrent);
    println!();
    print!("Proceed with export? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("📊 Export Summary:");
    println!("  Total Spaces: {}", summary.total_spaces);
    if summary.dry_run {
        println!("  Already Cached: {}", summary.cached);
    } else {
        println!("  Completed: {}", summary.completed);
        println!("  Cached: {}", summary.cached);
        println!("  Failed: {}", summary.failed);
        if summary.aborted > 0 || summary.not_attempted > 0 {
            println!("  Aborted: {}", summary.aborted);
            println!("  Not Attempted: {}", summary.not_attempted);
        }
        println!(
            "  Downloaded: {:.2} MiB",
            summary.bytes_downloaded as f64 / (1024.0 * 1024.0)
        );
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.missing.is_empty() {
        println!("⚠️  Spaces not found:");
        for key in &summary.missing {
            println!("  - {key}");
        }
        println!();
    }

    if !summary.failures.is_empty() {
        println!("⚠️  Spaces not exported:");
        for failure in &summary.failures {
            match &failure.error {
                Some(error) => println!("  - {} ({}): {}", failure.space_key, failure.status, error),
                None => println!("  - {} ({})", failure.space_key, failure.status),
            }
        }
        println!();
    }

    if summary.interrupted {
        println!("⚠️  Export interrupted. Partial downloads are kept;");
        println!("   run the same command to resume.");
    } else if let Some(error) = &summary.fatal_error {
        println!("❌ Export aborted: {error}");
    } else if summary.is_successful() {
        println!("✅ Export completed successfully!");
    } else {
        println!("⚠️  Export completed with failures");
    }
}
