//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers the exporter passes around. A
//! [`SpaceKey`] also names files on disk, so it is validated against path
//! separators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Space key newtype wrapper
///
/// Identifies a Confluence space, unique within a run.
///
/// # Examples
///
/// ```
/// use confluence_export::domain::ids::SpaceKey;
/// use std::str::FromStr;
///
/// let key = SpaceKey::from_str("ENG").unwrap();
/// assert_eq!(key.as_str(), "ENG");
/// assert!(SpaceKey::from_str("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpaceKey(String);

impl SpaceKey {
    /// Creates a new SpaceKey from a string
    ///
    /// # Returns
    ///
    /// Returns `Err` if the key is empty, contains whitespace or could escape
    /// the output directory when used as a file name.
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("Space key cannot be empty".to_string());
        }
        if key.chars().any(char::is_whitespace) {
            return Err(format!("Space key '{key}' cannot contain whitespace"));
        }
        if key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(format!("Space key '{key}' cannot contain path separators"));
        }
        Ok(Self(key))
    }

    /// Returns the space key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SpaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpaceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SpaceKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SpaceKey> for String {
    fn from(key: SpaceKey) -> Self {
        key.0
    }
}

impl AsRef<str> for SpaceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque handle of a server-side export job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a new JobId, rejecting empty handles
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Job ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the job ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
