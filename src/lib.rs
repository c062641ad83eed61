// confluence-export - Concurrent Confluence space exporter
// Copyright (c) 2025 confluence-export Contributors
// Licensed under the MIT License

//! # confluence-export
//!
//! Bulk-exports Confluence spaces to local archive files.
//!
//! ## Overview
//!
//! Each space export is a long-running remote job. This library:
//! - **Submits** export jobs, spacing submissions when configured
//! - **Polls** them until the archive is ready
//! - **Downloads** archives in chunks, resuming interrupted transfers with
//!   range requests and verifying size and checksum
//! - **Retries** transient and rate-limited failures with exponential backoff
//! - **Skips** spaces already exported, using a persistent cache
//!
//! All network operations share one concurrency limit.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export engine (tasks, scheduling, retry, cache, download)
//! - [`adapters`] - Confluence REST client behind the `ExportService` trait
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use confluence_export::config::load_config;
//! use confluence_export::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("confluence-export.toml")?;
//!     let shutdown = tokio_util::sync::CancellationToken::new();
//!
//!     let coordinator = ExportCoordinator::new(config, shutdown)?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     println!("Exported {} spaces", summary.completed);
//!     std::process::exit(summary.exit_code());
//! }
//! ```
//!
//! ## Error Handling
//!
//! Per-operation failures use [`domain::ExportError`], whose class decides
//! retry behaviour. Everything else surfaces as [`domain::AppError`]:
//!
//! ```rust,no_run
//! use confluence_export::domain::AppError;
//!
//! fn example() -> Result<(), AppError> {
//!     let config = confluence_export::config::load_config("confluence-export.toml")?;
//!     println!("{}", config.confluence.base_url);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
