//! Archive integrity verification

pub mod checksum;

pub use checksum::{calculate_checksum_bytes, calculate_file_checksum, verify_file};
