//! Archive checksum value type
//!
//! The export service reports an optional checksum next to each ready
//! archive. Bare hex digests are classified by length (32 = MD5, 64 =
//! SHA-256); an explicit `algo:hex` prefix is also accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hash algorithm of an archive checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Length of the lowercase hex digest
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "md5"),
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Expected digest of a downloaded archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl Checksum {
    /// Creates a checksum, validating the digest length for the algorithm
    pub fn new(algorithm: ChecksumAlgorithm, hex: impl Into<String>) -> Result<Self, String> {
        let hex = hex.into().trim().to_ascii_lowercase();
        if hex.len() != algorithm.hex_len() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "Invalid {algorithm} digest '{hex}': expected {} hex characters",
                algorithm.hex_len()
            ));
        }
        Ok(Self { algorithm, hex })
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Lowercase hex digest
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Compares against a computed hex digest, ignoring case
    pub fn matches(&self, computed_hex: &str) -> bool {
        self.hex.eq_ignore_ascii_case(computed_hex.trim())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Checksum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((algo, hex)) = s.split_once(':') {
            let algorithm = match algo.to_ascii_lowercase().replace('-', "").as_str() {
                "md5" => ChecksumAlgorithm::Md5,
                "sha256" => ChecksumAlgorithm::Sha256,
                other => return Err(format!("Unsupported checksum algorithm '{other}'")),
            };
            return Self::new(algorithm, hex);
        }

        match s.len() {
            32 => Self::new(ChecksumAlgorithm::Md5, s),
            64 => Self::new(ChecksumAlgorithm::Sha256, s),
            _ => Err(format!("Unrecognized checksum '{s}'")),
        }
    }
}
