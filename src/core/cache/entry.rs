//! Cache entry model
//!
//! One entry per completed space, recorded after the archive has been
//! verified and moved to its final name.

use crate::domain::SpaceKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Record of a space whose archive is already on disk
///
/// # Examples
///
/// ```
/// use confluence_export::core::cache::CacheEntry;
/// use confluence_export::domain::SpaceKey;
/// use std::path::PathBuf;
///
/// let entry = CacheEntry::new(SpaceKey::new("ENG").unwrap(), PathBuf::from("out/ENG.html.zip"), 1024)
///     .with_checksum("9e107d9d372bb6826bd81d3542a419d6");
///
/// assert_eq!(entry.size_bytes, 1024);
/// assert!(entry.checksum.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub space_key: SpaceKey,

    /// When the archive was verified
    pub completed_at: DateTime<Utc>,

    /// Checksum or etag reported by the service, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    pub file_path: PathBuf,

    #[serde(default)]
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(space_key: SpaceKey, file_path: PathBuf, size_bytes: u64) -> Self {
        Self {
            space_key,
            completed_at: Utc::now(),
            checksum: None,
            file_path,
            size_bytes,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = completed_at;
        self
    }
}
