//! Space descriptors and export formats
//!
//! A [`Space`] is what the service lists; the exporter only needs its key,
//! display name and the two flags used for filtering.

use super::ids::SpaceKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Archive format requested from the export service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Html,
    Xml,
    Pdf,
}

impl ExportFormat {
    /// Value sent as `exportType` in the export request
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Xml => "xml",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "xml" => Ok(ExportFormat::Xml),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!(
                "Invalid export format '{other}': must be one of html, xml, pdf"
            )),
        }
    }
}

/// A space as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub key: SpaceKey,
    pub name: String,
    /// `global` or `personal`
    pub space_type: String,
    /// `current` or `archived`
    pub status: String,
}

impl Space {
    pub fn new(key: SpaceKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            space_type: "global".to_string(),
            status: "current".to_string(),
        }
    }

    pub fn is_personal(&self) -> bool {
        self.space_type.eq_ignore_ascii_case("personal")
    }

    pub fn is_archived(&self) -> bool {
        self.status.eq_ignore_ascii_case("archived")
    }

    /// File name of the finished archive, e.g. `ENG_Engineering.html.zip`
    pub fn archive_file_name(&self, format: ExportFormat) -> String {
        archive_file_name(&self.key, &self.name, format)
    }
}

/// Longest file name common filesystems accept, in bytes
const MAX_FILE_NAME_BYTES: usize = 255;

/// Room kept for the `.part` suffix of an in-progress download
const PARTIAL_SUFFIX_BYTES: usize = ".part".len();

/// Builds the archive file name for a space
///
/// Characters of the display name other than alphanumerics and `._- ` become
/// `_`. The name is cut on a character boundary so the partial file name
/// stays within 255 bytes. An empty name falls back to `<KEY>.<format>.zip`.
pub fn archive_file_name(key: &SpaceKey, name: &str, format: ExportFormat) -> String {
    let suffix = format!(".{format}.zip");
    let budget = MAX_FILE_NAME_BYTES
        .saturating_sub(PARTIAL_SUFFIX_BYTES + key.as_str().len() + 1 + suffix.len());

    let mut safe_name: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    truncate_on_char_boundary(&mut safe_name, budget);

    if safe_name.is_empty() {
        format!("{key}{suffix}")
    } else {
        format!("{key}_{safe_name}{suffix}")
    }
}

fn truncate_on_char_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
