//! Confluence integration
//!
//! - [`service`] - the [`ExportService`] trait the export engine depends on
//! - [`client`] - REST implementation over `reqwest`
//! - [`models`] - request and response payloads

pub mod client;
pub mod models;
pub mod service;

pub use client::ConfluenceClient;
pub use service::{ArchiveStream, ExportService, PollStatus, ReadyExport, SpacePage};
