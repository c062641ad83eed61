//! Completed-export cache
//!
//! Tracks which spaces already have a verified archive on disk so repeated
//! runs skip them without any network calls.

pub mod entry;
pub mod store;

pub use entry::CacheEntry;
pub use store::CacheStore;
