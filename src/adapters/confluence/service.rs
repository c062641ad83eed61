//! Remote export service interface
//!
//! The export engine only talks to the remote service through
//! [`ExportService`], so tests can substitute an in-memory implementation
//! for the Confluence REST client.

use crate::domain::{Checksum, ExportError, ExportFormat, JobId, Space, SpaceKey};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// Location and metadata of a finished export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyExport {
    pub download_url: String,
    pub expected_size: Option<u64>,
    pub checksum: Option<Checksum>,
}

/// Server-side status of an export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Still running; `percent` if the service reports it
    Pending { percent: Option<u8> },
    Ready(ReadyExport),
    /// The job ended without producing an archive
    Failed(String),
}

/// Streamed archive body
pub struct ArchiveStream {
    /// True when the body starts at the requested offset
    pub range_honored: bool,
    /// Full archive size, when the server reports it
    pub total_size: Option<u64>,
    pub body: BoxStream<'static, Result<Vec<u8>, ExportError>>,
}

impl fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("range_honored", &self.range_honored)
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

/// One page of the space listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpacePage {
    pub spaces: Vec<Space>,
    /// Offset of the next page, `None` on the last page
    pub next_start: Option<u32>,
}

/// Operations the export engine needs from the remote service
///
/// Every method performs exactly one network request and classifies its
/// failure as an [`ExportError`]; retries are the caller's concern.
#[async_trait]
pub trait ExportService: Send + Sync {
    /// Starts an export job for a space
    async fn submit_export(&self, space_key: &SpaceKey, format: ExportFormat)
        -> Result<JobId, ExportError>;

    /// Queries the status of a previously submitted job
    async fn poll_export(&self, job_id: &JobId) -> Result<PollStatus, ExportError>;

    /// Opens the archive body starting at byte `offset`
    ///
    /// Servers that ignore the range return the full body with
    /// `range_honored = false` (unless `offset` is zero).
    async fn download_archive(&self, url: &str, offset: u64) -> Result<ArchiveStream, ExportError>;

    /// Lists spaces visible to the credentials, one page at a time
    async fn list_spaces(&self, start: u32, limit: u32) -> Result<SpacePage, ExportError>;
}
