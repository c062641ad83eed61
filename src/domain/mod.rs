//! Domain models and types for the exporter.
//!
//! This module contains the core domain types shared by every layer.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SpaceKey`], [`JobId`])
//! - **Domain models** ([`Space`], [`ExportJob`], [`Checksum`])
//! - **Error types** ([`AppError`], [`ExportError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a job handle can never be passed
//! where a space key is expected:
//!
//! ```rust
//! use confluence_export::domain::{JobId, SpaceKey};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let space = SpaceKey::new("ENG")?;
//! let job = JobId::new("5f3a9c")?;
//!
//! // let wrong: SpaceKey = job;  // Compile error!
//! # Ok(())
//! # }
//! ```
//!
//! # Job Lifecycle
//!
//! ```rust
//! use confluence_export::domain::{ExportJob, JobState, SpaceKey};
//! use std::path::PathBuf;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut job = ExportJob::new(SpaceKey::new("ENG")?, PathBuf::from("out/ENG.html.zip"));
//! job.transition(JobState::Submitting)?;
//! assert!(job.transition(JobState::Completed).is_err());
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;
pub mod space;

// Re-export commonly used types for convenience
pub use checksum::{Checksum, ChecksumAlgorithm};
pub use errors::{AppError, ExportError};
pub use ids::{JobId, SpaceKey};
pub use job::{ExportJob, InvalidTransition, JobState};
pub use result::Result;
pub use space::{archive_file_name, ExportFormat, Space};
