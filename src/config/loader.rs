//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::AppConfig;
use super::secret::secret_string;
use crate::domain::errors::AppError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "CONFLUENCE_EXPORT";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into AppConfig
/// 4. Applies environment variable overrides (CONFLUENCE_EXPORT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns `AppError::Configuration` if the file is missing or unreadable, a
/// referenced variable is unset, the TOML is malformed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use confluence_export::config::loader::load_config;
///
/// let config = load_config("confluence-export.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AppError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AppError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config = parse_config(&contents)?;

    config.validate().map_err(|e| {
        AppError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Parses TOML text with substitution and overrides, without validating
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: AppConfig = toml::from_str(&contents)
        .map_err(|e| AppError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| AppError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            AppError::Configuration(format!(
                "Invalid value '{raw}' for environment variable {ENV_PREFIX}_{name}"
            ))
        }),
    }
}

/// Applies environment variable overrides using the CONFLUENCE_EXPORT_* prefix
///
/// Variables follow the pattern `CONFLUENCE_EXPORT_<SECTION>_<KEY>`, for
/// example `CONFLUENCE_EXPORT_CONFLUENCE_BASE_URL` or
/// `CONFLUENCE_EXPORT_EXPORT_MAX_CONCURRENT`. Unparseable values are errors.
fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_parsed("APPLICATION_DRY_RUN")? {
        config.application.dry_run = val;
    }

    // Confluence overrides
    if let Some(val) = env("CONFLUENCE_BASE_URL") {
        config.confluence.base_url = val;
    }
    if let Some(val) = env("CONFLUENCE_USERNAME") {
        config.confluence.username = val;
    }
    if let Some(val) = env("CONFLUENCE_API_TOKEN") {
        config.confluence.api_token = Some(secret_string(val));
    }
    if let Some(val) = env_parsed("CONFLUENCE_TIMEOUT_SECONDS")? {
        config.confluence.timeout_seconds = val;
    }
    if let Some(val) = env_parsed("CONFLUENCE_TLS_VERIFY")? {
        config.confluence.tls_verify = val;
    }

    // Export overrides
    if let Some(val) = env("EXPORT_OUTPUT_DIR") {
        config.export.output_dir = val;
    }
    if let Some(val) = env("EXPORT_FORMAT") {
        config.export.format = val.parse().map_err(AppError::Configuration)?;
    }
    if let Some(val) = env_parsed("EXPORT_MAX_CONCURRENT")? {
        config.export.max_concurrent = val;
    }
    if let Some(val) = env_parsed("EXPORT_CONNECTION_POOL_LIMIT")? {
        config.export.connection_pool_limit = val;
    }
    if let Some(val) = env_parsed("EXPORT_CHUNK_SIZE")? {
        config.export.chunk_size = val;
    }
    if let Some(val) = env_parsed("EXPORT_BATCH_SIZE")? {
        config.export.batch_size = val;
    }
    if let Some(val) = env_parsed("EXPORT_EXPORT_INTERVAL_SECONDS")? {
        config.export.export_interval_seconds = val;
    }
    if let Some(val) = env_parsed("EXPORT_POLL_INTERVAL_SECONDS")? {
        config.export.poll_interval_seconds = val;
    }
    if let Some(val) = env_parsed("EXPORT_INCLUDE_PERSONAL")? {
        config.export.include_personal = val;
    }
    if let Some(val) = env_parsed("EXPORT_INCLUDE_ARCHIVED")? {
        config.export.include_archived = val;
    }
    if let Some(val) = env("EXPORT_SPACES") {
        config.export.spaces = split_list(&val);
    }
    if let Some(val) = env_parsed("EXPORT_RETRY_MAX_ATTEMPTS")? {
        config.export.retry.max_attempts = val;
    }
    if let Some(val) = env_parsed("EXPORT_RETRY_BASE_DELAY_MS")? {
        config.export.retry.base_delay_ms = val;
    }
    if let Some(val) = env_parsed("EXPORT_RETRY_MAX_DELAY_MS")? {
        config.export.retry.max_delay_ms = val;
    }

    // Cache overrides
    if let Some(val) = env_parsed("CACHE_ENABLED")? {
        config.cache.enabled = val;
    }
    if let Some(val) = env_parsed("CACHE_MAX_AGE_HOURS")? {
        config.cache.max_age_hours = val;
    }

    // Logging overrides
    if let Some(val) = env_parsed("LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

/// Splits a comma-separated list, dropping empty items
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
