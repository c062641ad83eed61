//! Logging and observability
//!
//! Structured logging through `tracing`, with:
//! - Console output on stderr
//! - Configurable log levels
//! - JSON log files with rotation
//!
//! # Example
//!
//! ```no_run
//! use confluence_export::logging::init_logging;
//! use confluence_export::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a space export
///
/// # Example
///
/// ```no_run
/// use confluence_export::log_export_start;
/// use confluence_export::domain::{ExportFormat, SpaceKey};
///
/// let key = SpaceKey::new("ENG").unwrap();
/// log_export_start!(&key, ExportFormat::Html);
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($space_key:expr, $format:expr) => {
        tracing::info!(
            space_key = %$space_key,
            format = %$format,
            "Starting space export"
        );
    };
}

/// Log the completion of a space export
///
/// # Example
///
/// ```no_run
/// use confluence_export::log_export_complete;
/// use std::time::Duration;
///
/// log_export_complete!("ENG", 1_048_576u64, Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! log_export_complete {
    ($space_key:expr, $bytes:expr, $duration:expr) => {
        tracing::info!(
            space_key = %$space_key,
            bytes = $bytes,
            duration_ms = $duration.as_millis() as u64,
            "Space export completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use confluence_export::log_error_with_context;
/// use confluence_export::domain::AppError;
///
/// let error = AppError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log the start of a batch
///
/// # Example
///
/// ```no_run
/// use confluence_export::log_batch_processing;
///
/// log_batch_processing!(2, 5, 10);
/// ```
#[macro_export]
macro_rules! log_batch_processing {
    ($current:expr, $total:expr, $size:expr) => {
        tracing::info!(
            batch = $current,
            batches = $total,
            spaces = $size,
            "Processing batch"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use confluence_export::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
