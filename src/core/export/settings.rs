//! Engine settings
//!
//! The subset of [`AppConfig`] the export engine reads, with durations
//! already converted.

use crate::config::AppConfig;
use crate::domain::ExportFormat;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    /// Upper bound on simultaneous network operations
    pub max_concurrent: usize,
    /// Write buffer size for archive downloads
    pub chunk_size: usize,
    /// Spaces per batch, 0 for a single batch
    pub batch_size: usize,
    /// Minimum spacing between export submissions
    pub export_interval: Duration,
    /// Delay before every status query
    pub poll_interval: Duration,
    /// Per-call network timeout, also the stall limit between download chunks
    pub request_timeout: Duration,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("confluence_export"),
            format: ExportFormat::Html,
            max_concurrent: 5,
            chunk_size: 8192,
            batch_size: 0,
            export_interval: Duration::ZERO,
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl ExportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let export = &config.export;
        Self {
            output_dir: PathBuf::from(&export.output_dir),
            format: export.format,
            max_concurrent: export.max_concurrent.max(1),
            chunk_size: export.chunk_size.max(1),
            batch_size: export.batch_size,
            export_interval: Duration::from_secs(export.export_interval_seconds),
            poll_interval: Duration::from_secs(export.poll_interval_seconds),
            request_timeout: Duration::from_secs(config.confluence.timeout_seconds),
        }
    }
}
