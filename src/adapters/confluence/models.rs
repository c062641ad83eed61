//! Confluence REST payloads
//!
//! Only the fields the exporter reads are modelled; everything else in the
//! responses is ignored.

use super::service::{PollStatus, ReadyExport, SpacePage};
use crate::domain::{Checksum, ExportError, JobId, Space, SpaceKey};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `GET /rest/api/space` response
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceListResponse {
    #[serde(default)]
    pub results: Vec<SpaceDto>,
}

impl SpaceListResponse {
    /// Converts to a page, skipping spaces with unusable keys
    ///
    /// A page shorter than `limit` is the last one.
    pub fn into_page(self, start: u32, limit: u32) -> SpacePage {
        let returned = self.results.len() as u32;
        let spaces = self
            .results
            .into_iter()
            .filter_map(|dto| match dto.into_space() {
                Ok(space) => Some(space),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping space with invalid key");
                    None
                }
            })
            .collect();

        SpacePage {
            spaces,
            next_start: (returned > 0 && returned >= limit).then(|| start + returned),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpaceDto {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub space_type: String,
    #[serde(default)]
    pub status: String,
}

impl SpaceDto {
    pub fn into_space(self) -> Result<Space, String> {
        let key = SpaceKey::new(self.key)?;
        let mut space = Space::new(key, self.name);
        if !self.space_type.is_empty() {
            space.space_type = self.space_type;
        }
        if !self.status.is_empty() {
            space.status = self.status;
        }
        Ok(space)
    }
}

/// `POST /rest/api/space/{key}/export` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest<'a> {
    pub export_type: &'a str,
}

/// `POST /rest/api/space/{key}/export` response
#[derive(Debug, Clone, Deserialize)]
pub struct ExportResponse {
    pub id: serde_json::Value,
}

impl ExportResponse {
    /// Task ids arrive as strings or numbers depending on the deployment
    pub fn job_id(&self) -> Result<JobId, ExportError> {
        let raw = match &self.id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(ExportError::JobFailed(format!(
                    "Export response carried an unusable task id: {other}"
                )))
            }
        };
        JobId::new(raw).map_err(ExportError::JobFailed)
    }
}

/// `GET /rest/api/longtask/{id}` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTaskResponse {
    #[serde(default)]
    pub percentage_complete: Option<u8>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub messages: Vec<TaskMessage>,
    #[serde(default)]
    pub result: Option<LongTaskResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskMessage {
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTaskResult {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl LongTaskResponse {
    pub fn into_status(self) -> PollStatus {
        if !self.finished {
            return PollStatus::Pending {
                percent: self.percentage_complete,
            };
        }

        if !self.successful {
            return PollStatus::Failed(self.failure_message());
        }

        let Some(result) = self.result else {
            return PollStatus::Failed("Export finished without a result".to_string());
        };
        let Some(download_url) = result.download_url.filter(|u| !u.trim().is_empty()) else {
            return PollStatus::Failed("Export finished without a download URL".to_string());
        };

        let checksum = result.checksum.and_then(|raw| match Checksum::from_str(&raw) {
            Ok(checksum) => Some(checksum),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unrecognized archive checksum");
                None
            }
        });

        PollStatus::Ready(ReadyExport {
            download_url,
            expected_size: result.size.filter(|&s| s > 0),
            checksum,
        })
    }

    fn failure_message(&self) -> String {
        let messages: Vec<&str> = self
            .messages
            .iter()
            .filter_map(|m| m.translation.as_deref().or(m.key.as_deref()))
            .collect();
        if messages.is_empty() {
            "Export job reported failure".to_string()
        } else {
            messages.join("; ")
        }
    }
}
