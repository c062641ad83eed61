//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::core::export::summary::{EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "confluence-export.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing confluence-export configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG_ERROR);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your Confluence URL and username", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set CONFLUENCE_API_TOKEN");
                println!("  3. Validate configuration: confluence-export validate-config");
                println!("  4. Preview the run: confluence-export export --dry-run");
                println!("  5. Run export: confluence-export export");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# confluence-export configuration

environment = "development"

[application]
log_level = "info"
dry_run = false

[confluence]
base_url = "https://your-site.atlassian.net/wiki"
username = "you@example.com"
api_token = "${CONFLUENCE_API_TOKEN}"
timeout_seconds = 300

[export]
output_dir = "confluence_export"
format = "html"
max_concurrent = 5
connection_pool_limit = 10
spaces = []

[export.retry]
max_attempts = 3
base_delay_ms = 5000
max_delay_ms = 60000

[cache]
enabled = true

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# confluence-export configuration
#
# Values of the form ${NAME} are read from the environment (or .env).
# Any setting can also be overridden with CONFLUENCE_EXPORT_<SECTION>_<KEY>,
# e.g. CONFLUENCE_EXPORT_EXPORT_MAX_CONCURRENT=8.

# Runtime environment: development | staging | production
# Production requires TLS verification to stay enabled.
environment = "development"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (list spaces that would be exported, submit nothing)
dry_run = false

# ============================================================================
# Confluence Connection
# ============================================================================
[confluence]
# Base URL of the Confluence instance, including the /wiki context path
base_url = "https://your-site.atlassian.net/wiki"

# Account used for Basic Authentication
username = "you@example.com"

# API token (use an environment variable)
api_token = "${CONFLUENCE_API_TOKEN}"

# Per-request timeout in seconds; also the longest a download may stall
timeout_seconds = 300

# TLS certificate verification
tls_verify = true

# ============================================================================
# Export Configuration
# ============================================================================
[export]
# Directory for archives, partial downloads and the cache index
output_dir = "confluence_export"

# Archive format: html | xml | pdf
format = "html"

# Maximum simultaneous network operations
max_concurrent = 5

# Idle HTTP connections kept open (must be >= max_concurrent)
connection_pool_limit = 10

# Download write buffer in bytes
chunk_size = 8192

# Spaces per batch; batches run one after another (0 = one batch)
batch_size = 0

# Minimum seconds between two export submissions
export_interval_seconds = 0

# Seconds to wait before each job status check
poll_interval_seconds = 5

# Include personal (~user) spaces when exporting everything
include_personal = false

# Include archived spaces when exporting everything
include_archived = false

# Explicit space keys to export (empty = all visible spaces)
spaces = [
    # "ENG",
    # "OPS",
]

# Retry behaviour for transient failures
[export.retry]
# Retries after the first failure, per phase
max_attempts = 3

# Delay before the first retry, doubled each time up to max_delay_ms
base_delay_ms = 5000
max_delay_ms = 60000
backoff_multiplier = 2.0

# Rate-limited (HTTP 429) retries start from base_delay_ms * this factor
rate_limit_multiplier = 4.0

# Randomize delays to avoid synchronized retries
jitter = true

# ============================================================================
# Export Cache
# ============================================================================
[cache]
# Skip spaces whose archive from an earlier run is still on disk
enabled = true

# Index file inside output_dir
file_name = "export_cache.json"

# Re-export spaces older than this many hours (0 = never expire)
max_age_hours = 0

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Write JSON logs to files in addition to the console
local_enabled = false

# Directory for log files
local_path = "logs"

# Log rotation: daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}
