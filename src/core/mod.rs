//! Core export engine.
//!
//! # Modules
//!
//! - [`export`] - Submission, polling, download, tasks and batch scheduling
//! - [`retry`] - Backoff policy shared by every network phase
//! - [`pool`] - Concurrency limiter for network operations
//! - [`cache`] - Persistent record of completed spaces
//! - [`spaces`] - Space listing and selection
//! - [`verification`] - Archive checksums
//! - [`cancel`] - Run-wide cancellation
//!
//! # Export Workflow
//!
//! 1. **List**: Fetch every space and apply the selection rules
//! 2. **Skip**: Report spaces with a valid cache entry as cached
//! 3. **Batch**: Partition the remaining spaces
//! 4. **Export**: Per space, submit, poll, download and verify, retrying
//!    transient failures
//! 5. **Record**: Write a cache entry for each verified archive
//! 6. **Report**: Summarize outcomes and choose the exit status
//!
//! # Example
//!
//! ```rust,no_run
//! use confluence_export::config::load_config;
//! use confluence_export::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("confluence-export.toml")?;
//! let shutdown = tokio_util::sync::CancellationToken::new();
//!
//! let coordinator = ExportCoordinator::new(config, shutdown)?;
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Completed: {}", summary.completed);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod export;
pub mod pool;
pub mod retry;
pub mod spaces;
pub mod verification;
