//! Result type alias for the exporter
//!
//! This module provides a convenient Result type alias that uses [`AppError`]
//! as the error type.

use super::errors::AppError;

/// Result type alias for application-level operations
///
/// # Examples
///
/// ```
/// use confluence_export::domain::result::Result;
/// use confluence_export::domain::errors::AppError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(AppError::Configuration("missing base_url".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, AppError>;
