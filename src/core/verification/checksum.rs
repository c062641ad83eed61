//! Checksum calculation for archive verification
//!
//! Archives can be large, so digests are computed by streaming the file in
//! fixed-size blocks rather than reading it into memory.

use crate::domain::{Checksum, ChecksumAlgorithm};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_BLOCK: usize = 64 * 1024;

/// Incremental hasher for either supported algorithm
enum Hasher {
    Md5(md5::Context),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(ctx) => ctx.consume(data),
            Hasher::Sha256(hasher) => hasher.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Md5(ctx) => format!("{:x}", ctx.compute()),
            Hasher::Sha256(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

/// Calculate the hex digest of raw bytes
///
/// # Examples
///
/// ```
/// use confluence_export::core::verification::checksum::calculate_checksum_bytes;
/// use confluence_export::domain::ChecksumAlgorithm;
///
/// let digest = calculate_checksum_bytes(ChecksumAlgorithm::Md5, b"");
/// assert_eq!(digest, "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn calculate_checksum_bytes(algorithm: ChecksumAlgorithm, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Calculate the hex digest of a file by streaming it
pub async fn calculate_file_checksum(
    algorithm: ChecksumAlgorithm,
    path: &Path,
) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; READ_BLOCK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize_hex())
}

/// Compares a file against an expected checksum
///
/// Returns the computed digest on mismatch so callers can report it.
pub async fn verify_file(expected: &Checksum, path: &Path) -> std::io::Result<Result<(), String>> {
    let actual = calculate_file_checksum(expected.algorithm(), path).await?;
    if expected.matches(&actual) {
        Ok(Ok(()))
    } else {
        Ok(Err(actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            calculate_checksum_bytes(ChecksumAlgorithm::Md5, b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
        assert_eq!(
            calculate_checksum_bytes(ChecksumAlgorithm::Sha256, b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_file_checksum_matches_in_memory_digest() {
        // Larger than one read block
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        for algorithm in [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha256] {
            let streamed = calculate_file_checksum(algorithm, file.path()).await.unwrap();
            assert_eq!(streamed, calculate_checksum_bytes(algorithm, &data));
        }
    }

    #[tokio::test]
    async fn test_verify_file_reports_mismatch() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"archive").unwrap();
        file.flush().unwrap();

        let good = Checksum::from_str(&calculate_checksum_bytes(ChecksumAlgorithm::Md5, b"archive")).unwrap();
        assert_eq!(verify_file(&good, file.path()).await.unwrap(), Ok(()));

        let bad = Checksum::from_str(&"0".repeat(64)).unwrap();
        let actual = verify_file(&bad, file.path()).await.unwrap().unwrap_err();
        assert_eq!(actual.len(), 64);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let checksum = Checksum::from_str(&"0".repeat(32)).unwrap();
        assert!(verify_file(&checksum, Path::new("/nonexistent/archive.zip")).await.is_err());
    }
}
