//! Confluence REST client
//!
//! Implements [`ExportService`] over the Confluence REST API with HTTP basic
//! authentication (username plus API token).
//!
//! Every response status is classified into the [`ExportError`] taxonomy
//! here, so the engine never sees `reqwest` types.

use super::models::{ExportRequest, ExportResponse, LongTaskResponse, SpaceListResponse};
use super::service::{ArchiveStream, ExportService, PollStatus, SpacePage};
use crate::config::{ConfluenceConfig, SecretString};
use crate::domain::{AppError, ExportError, ExportFormat, JobId, SpaceKey};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures::StreamExt;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, RANGE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

const MAX_ERROR_BODY: usize = 200;

/// HTTP client for a single Confluence site
///
/// # Example
///
/// ```no_run
/// use confluence_export::adapters::confluence::{ConfluenceClient, ExportService};
/// use confluence_export::config::ConfluenceConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfluenceConfig::default();
/// let client = ConfluenceClient::new(&config, 10)?;
///
/// let page = client.list_spaces(0, 50).await?;
/// println!("{} spaces on the first page", page.spaces.len());
/// # Ok(())
/// # }
/// ```
pub struct ConfluenceClient {
    /// Site root, always ending in `/`
    base_url: Url,
    http: Client,
    username: String,
    api_token: Option<SecretString>,
    timeout: Duration,
}

impl ConfluenceClient {
    /// Builds a client whose idle connection pool holds up to
    /// `connection_pool_limit` connections per host
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` for a malformed base URL and
    /// `AppError::Connection` if the TLS backend cannot be initialized.
    pub fn new(config: &ConfluenceConfig, connection_pool_limit: usize) -> Result<Self, AppError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            AppError::Configuration(format!("Invalid Confluence base URL '{base}': {e}"))
        })?;

        let timeout = Duration::from_secs(config.timeout_seconds.max(1));

        // No client-wide timeout: archive downloads can legitimately outlast
        // it. Each request applies its own.
        let mut builder = ClientBuilder::new()
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .pool_max_idle_per_host(connection_pool_limit);

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification is disabled for Confluence");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| AppError::Connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            timeout,
        })
    }

    /// Per-request timeout applied to every call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url, ExportError> {
        self.base_url
            .join(path)
            .map_err(|e| ExportError::JobFailed(format!("Invalid request URL '{path}': {e}")))
    }

    fn auth_header_value(&self) -> Option<String> {
        let token = self.api_token.as_ref()?;
        let token: &str = token.expose_secret().as_ref();
        let credentials = format!("{}:{}", self.username, token);
        let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
        Some(format!("Basic {encoded}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth_header_value() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ExportError> {
        let response = self
            .authorized(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(what, e))?;

        let response = check_status(response, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ExportError::Transient(format!("{what}: unreadable response body: {e}")))
    }
}

#[async_trait]
impl ExportService for ConfluenceClient {
    async fn submit_export(
        &self,
        space_key: &SpaceKey,
        format: ExportFormat,
    ) -> Result<JobId, ExportError> {
        let url = self.endpoint(&format!("rest/api/space/{space_key}/export"))?;
        let request = self.http.post(url).json(&ExportRequest {
            export_type: format.as_str(),
        });

        let response: ExportResponse = self.send_json(request, "submit export").await?;
        let job_id = response.job_id()?;

        tracing::debug!(space_key = %space_key, job_id = %job_id, "Export job accepted");
        Ok(job_id)
    }

    async fn poll_export(&self, job_id: &JobId) -> Result<PollStatus, ExportError> {
        let url = self.endpoint(&format!("rest/api/longtask/{job_id}"))?;
        let task: LongTaskResponse = self.send_json(self.http.get(url), "poll export").await?;
        Ok(task.into_status())
    }

    async fn download_archive(&self, url: &str, offset: u64) -> Result<ArchiveStream, ExportError> {
        let url = self.endpoint(url)?;
        let mut request = self.authorized(self.http.get(url));
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ExportError::Transient("download: request timed out".to_string()))?
            .map_err(|e| transport_error("download", e))?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(ExportError::Integrity(format!(
                "Server rejected resume at byte {offset}"
            )));
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(ExportError::Transient(format!(
                "download: HTTP {}: archive link not available",
                status.as_u16()
            )));
        }
        let response = check_status(response, "download").await?;

        let headers = response.headers();
        let (range_honored, total_size) = if response.status() == StatusCode::PARTIAL_CONTENT {
            match parse_content_range(headers) {
                Some((start, total)) if start == offset => (true, total),
                Some((start, _)) => {
                    return Err(ExportError::Integrity(format!(
                        "Server resumed at byte {start}, expected {offset}"
                    )))
                }
                None => (true, None),
            }
        } else {
            (offset == 0, content_length(headers))
        };

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ExportError::Transient(format!("download interrupted: {e}")))
            })
            .boxed();

        Ok(ArchiveStream {
            range_honored,
            total_size,
            body,
        })
    }

    async fn list_spaces(&self, start: u32, limit: u32) -> Result<SpacePage, ExportError> {
        let mut url = self.endpoint("rest/api/space")?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("expand", "description.plain");

        let response: SpaceListResponse = self.send_json(self.http.get(url), "list spaces").await?;
        Ok(response.into_page(start, limit))
    }
}

fn transport_error(what: &str, err: reqwest::Error) -> ExportError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ExportError::Transient(format!("{what}: {kind}: {err}"))
}

/// Passes 2xx responses through and classifies everything else
async fn check_status(response: Response, what: &str) -> Result<Response, ExportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(ExportError::from_status(
        status.as_u16(),
        format!("{what}: {}", body.trim()),
        retry_after,
    ))
}

/// Reads `Retry-After` as delta-seconds or an HTTP date
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let when = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = when.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Parses `Content-Range: bytes START-END/TOTAL` into `(START, TOTAL)`
fn parse_content_range(headers: &HeaderMap) -> Option<(u64, Option<u64>)> {
    let value = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, _end) = range.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let total = total.trim().parse().ok();
    Some((start, total))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
