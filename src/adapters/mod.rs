//! External system integrations.
//!
//! - [`confluence`] - Confluence REST API integration
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the export engine
//! can be tested with in-memory implementations. The engine depends only on
//! [`confluence::ExportService`]:
//!
//! ```rust,no_run
//! use confluence_export::adapters::confluence::{ConfluenceClient, ExportService};
//! use confluence_export::config::{secret_string, ConfluenceConfig};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfluenceConfig {
//!     base_url: "https://acme.atlassian.net/wiki".to_string(),
//!     username: "ops@acme.example".to_string(),
//!     api_token: Some(secret_string("token".to_string())),
//!     ..Default::default()
//! };
//!
//! let service: Arc<dyn ExportService> = Arc::new(ConfluenceClient::new(&config, 10)?);
//! # Ok(())
//! # }
//! ```

pub mod confluence;
