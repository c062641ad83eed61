//! Domain error types
//!
//! This module defines the error hierarchy for the exporter. [`ExportError`]
//! is the per-operation taxonomy used by the export engine and consulted by the
//! retry policy; [`AppError`] is the crate-wide error that wraps it alongside
//! configuration, cache and I/O failures. Neither exposes third-party types.

use std::time::Duration;
use thiserror::Error;

/// Main application error type
///
/// This is the primary error type used outside the per-space export engine.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the export engine
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Authentication errors (run-fatal)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network/connection errors outside a single export
    #[error("Connection error: {0}")]
    Connection(String),

    /// Cache index errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error means the remote service rejected our credentials
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AppError::Authentication(_) | AppError::Export(ExportError::Auth(_))
        )
    }
}

/// Failure of a single remote or local export operation
///
/// The variants mirror how the engine reacts to them: transient and
/// rate-limit failures are retried with backoff, integrity failures are
/// retried after discarding the partial file, everything else ends the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// Network failure, timeout or 5xx response
    #[error("Transient failure: {0}")]
    Transient(String),

    /// 429 response from the service
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// 401/403 response; aborts the whole run
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The remote export job itself failed or was refused
    #[error("Export job failed: {0}")]
    JobFailed(String),

    /// Downloaded archive does not match the expected size or checksum
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Local filesystem failure while writing the archive
    #[error("Storage error: {0}")]
    Storage(String),

    /// The run was cancelled while this operation was in flight
    #[error("Operation cancelled")]
    Cancelled,
}

impl ExportError {
    /// Maps an HTTP status returned by the service to an error class
    ///
    /// `retry_after` is only meaningful for 429 responses.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ExportError::Auth(format!("HTTP {status}: {message}")),
            429 => ExportError::RateLimited {
                message: format!("HTTP 429: {message}"),
                retry_after,
            },
            408 | 500..=599 => ExportError::Transient(format!("HTTP {status}: {message}")),
            _ => ExportError::JobFailed(format!("HTTP {status}: {message}")),
        }
    }

    /// Returns true if the retry policy may schedule another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExportError::Transient(_) | ExportError::RateLimited { .. } | ExportError::Integrity(_)
        )
    }

    /// Returns true if this error must abort the entire run
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, ExportError::Auth(_))
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Storage(err.to_string())
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Configuration(format!("TOML parse error: {err}"))
    }
}
