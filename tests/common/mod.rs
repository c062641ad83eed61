//! Shared fixtures for the integration tests
//!
//! [`FakeService`] is an in-memory [`ExportService`] with per-space scripts
//! for submit, poll and download failures. It records every call with its
//! start and end time, and the highest number of calls that were in progress
//! at the same time.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confluence_export::adapters::confluence::{
    ArchiveStream, ExportService, PollStatus, ReadyExport, SpacePage,
};
use confluence_export::config::{parse_config, AppConfig};
use confluence_export::core::export::{ExportCoordinator, ExportSettings};
use confluence_export::core::retry::RetryPolicy;
use confluence_export::domain::{
    Checksum, ChecksumAlgorithm, ExportError, ExportFormat, JobId, Space, SpaceKey,
};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Deterministic archive body of `len` bytes
pub fn archive_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

pub fn key(k: &str) -> SpaceKey {
    SpaceKey::new(k).unwrap()
}

#[derive(Default)]
struct Calls {
    submits: HashMap<String, usize>,
    polls: HashMap<String, usize>,
    downloads: HashMap<String, usize>,
    list_pages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Submit,
    Poll,
    Download,
}

/// One service call, from entry until the call returned
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub kind: CallKind,
    pub key: String,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
}

#[derive(Default)]
pub struct FakeService {
    spaces: Vec<Space>,
    archives: HashMap<String, Vec<u8>>,
    submit_errors: Mutex<HashMap<String, VecDeque<ExportError>>>,
    poll_script: Mutex<HashMap<String, VecDeque<PollStatus>>>,
    download_errors: Mutex<HashMap<String, VecDeque<ExportError>>>,
    stalls: Mutex<HashMap<String, usize>>,
    offsets: Mutex<HashMap<String, Vec<u64>>>,
    calls: Mutex<Calls>,
    timeline: Mutex<Vec<CallRecord>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    latency: Duration,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global space whose archive is `size` bytes
    pub fn with_space(mut self, k: &str, name: &str, size: usize) -> Self {
        let seed = self.spaces.len() as u8;
        self.spaces.push(Space::new(key(k), name));
        self.archives.insert(k.to_string(), archive_bytes(seed, size));
        self
    }

    pub fn with_personal_space(mut self, k: &str, name: &str) -> Self {
        let mut space = Space::new(key(k), name);
        space.space_type = "personal".to_string();
        self.spaces.push(space);
        self.archives.insert(k.to_string(), archive_bytes(7, 64));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Errors returned by the next submissions of `k`, in order
    pub fn fail_submit(self, k: &str, errors: Vec<ExportError>) -> Self {
        self.submit_errors
            .lock()
            .unwrap()
            .insert(k.to_string(), errors.into());
        self
    }

    /// Statuses returned before the job of `k` reports ready
    pub fn poll_sequence(self, k: &str, statuses: Vec<PollStatus>) -> Self {
        self.poll_script
            .lock()
            .unwrap()
            .insert(k.to_string(), statuses.into());
        self
    }

    /// Errors returned by the next downloads of `k`, in order
    pub fn fail_download(self, k: &str, errors: Vec<ExportError>) -> Self {
        self.download_errors
            .lock()
            .unwrap()
            .insert(k.to_string(), errors.into());
        self
    }

    /// The next download of `k` sends `after` bytes and then hangs
    pub fn stall_download(self, k: &str, after: usize) -> Self {
        self.stalls.lock().unwrap().insert(k.to_string(), after);
        self
    }

    /// Offsets requested by each download of `k`
    pub fn download_offsets(&self, k: &str) -> Vec<u64> {
        self.offsets.lock().unwrap().get(k).cloned().unwrap_or_default()
    }

    pub fn archive(&self, k: &str) -> &[u8] {
        &self.archives[k]
    }

    pub fn submits(&self, k: &str) -> usize {
        self.calls.lock().unwrap().submits.get(k).copied().unwrap_or(0)
    }

    pub fn polls(&self, k: &str) -> usize {
        self.calls.lock().unwrap().polls.get(k).copied().unwrap_or(0)
    }

    pub fn downloads(&self, k: &str) -> usize {
        self.calls.lock().unwrap().downloads.get(k).copied().unwrap_or(0)
    }

    /// Calls that concern a single space (listing excluded)
    pub fn space_calls(&self, k: &str) -> usize {
        self.submits(k) + self.polls(k) + self.downloads(k)
    }

    pub fn total_submits(&self) -> usize {
        self.calls.lock().unwrap().submits.values().sum()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Finished calls of `kind`, ordered by start time
    pub fn calls_of(&self, kind: CallKind) -> Vec<CallRecord> {
        let mut calls: Vec<CallRecord> = self
            .timeline
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect();
        calls.sort_by_key(|c| c.started);
        calls
    }

    /// Finished calls concerning any of `keys`
    pub fn calls_for(&self, keys: &[&str]) -> Vec<CallRecord> {
        self.timeline
            .lock()
            .unwrap()
            .iter()
            .filter(|c| keys.contains(&c.key.as_str()))
            .cloned()
            .collect()
    }

    async fn enter(&self, kind: CallKind, key: &str) -> CallGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = CallGuard {
            service: self,
            kind,
            key: key.to_string(),
            started: Utc::now(),
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        guard
    }

    fn ready(&self, k: &str) -> ReadyExport {
        let data = &self.archives[k];
        let digest = format!("{:x}", md5::compute(data));
        ReadyExport {
            download_url: format!("download/{k}"),
            expected_size: Some(data.len() as u64),
            checksum: Some(Checksum::new(ChecksumAlgorithm::Md5, digest).unwrap()),
        }
    }
}

struct CallGuard<'a> {
    service: &'a FakeService,
    kind: CallKind,
    key: String,
    started: DateTime<Utc>,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.service.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.service.timeline.lock().unwrap().push(CallRecord {
            kind: self.kind,
            key: std::mem::take(&mut self.key),
            started: self.started,
            ended: Utc::now(),
        });
    }
}

#[async_trait]
impl ExportService for FakeService {
    async fn submit_export(
        &self,
        space_key: &SpaceKey,
        _format: ExportFormat,
    ) -> Result<JobId, ExportError> {
        let k = space_key.as_str().to_string();
        let _guard = self.enter(CallKind::Submit, &k).await;
        *self.calls.lock().unwrap().submits.entry(k.clone()).or_default() += 1;

        if let Some(err) = self
            .submit_errors
            .lock()
            .unwrap()
            .get_mut(&k)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        Ok(JobId::new(format!("job-{k}")).unwrap())
    }

    async fn poll_export(&self, job_id: &JobId) -> Result<PollStatus, ExportError> {
        let k = job_id.as_str().trim_start_matches("job-").to_string();
        let _guard = self.enter(CallKind::Poll, &k).await;
        *self.calls.lock().unwrap().polls.entry(k.clone()).or_default() += 1;

        let scripted = self
            .poll_script
            .lock()
            .unwrap()
            .get_mut(&k)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(|| PollStatus::Ready(self.ready(&k))))
    }

    async fn download_archive(&self, url: &str, offset: u64) -> Result<ArchiveStream, ExportError> {
        let k = url.trim_start_matches("download/").to_string();
        let _guard = self.enter(CallKind::Download, &k).await;
        *self.calls.lock().unwrap().downloads.entry(k.clone()).or_default() += 1;

        if let Some(err) = self
            .download_errors
            .lock()
            .unwrap()
            .get_mut(&k)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        self.offsets
            .lock()
            .unwrap()
            .entry(k.clone())
            .or_default()
            .push(offset);

        let data = self.archives[&k].clone();
        let total = data.len() as u64;
        let mut rest = data[(offset as usize).min(data.len())..].to_vec();
        let stall = self.stalls.lock().unwrap().remove(&k);
        if let Some(after) = stall {
            rest.truncate(after);
        }
        let chunks: Vec<Result<Vec<u8>, ExportError>> =
            rest.chunks(1024).map(|c| Ok(c.to_vec())).collect();

        let body = match stall {
            Some(_) => stream::iter(chunks).chain(stream::pending()).boxed(),
            None => stream::iter(chunks).boxed(),
        };
        Ok(ArchiveStream {
            range_honored: true,
            total_size: Some(total),
            body,
        })
    }

    async fn list_spaces(&self, start: u32, limit: u32) -> Result<SpacePage, ExportError> {
        self.calls.lock().unwrap().list_pages += 1;
        let start_idx = start as usize;
        let end = (start_idx + limit as usize).min(self.spaces.len());
        let spaces = self.spaces.get(start_idx..end).unwrap_or_default().to_vec();
        let next_start = (end < self.spaces.len()).then_some(end as u32);
        Ok(SpacePage { spaces, next_start })
    }
}

/// Parses a minimal configuration whose output goes to `output_dir`
pub fn test_config(output_dir: &Path, extra: &str) -> AppConfig {
    let toml = format!(
        r#"
[confluence]
base_url = "https://acme.atlassian.net/wiki"
username = "ops@acme.example"
api_token = "token"

[export]
output_dir = "{}"
{extra}
"#,
        output_dir.display().to_string().replace('\\', "/")
    );
    parse_config(&toml).unwrap()
}

/// Settings with millisecond intervals so scenarios finish quickly
pub fn fast_settings(output_dir: &Path) -> ExportSettings {
    ExportSettings {
        output_dir: output_dir.to_path_buf(),
        max_concurrent: 4,
        chunk_size: 512,
        poll_interval: Duration::from_millis(2),
        request_timeout: Duration::from_secs(5),
        ..ExportSettings::default()
    }
}

pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
    .without_jitter()
}

/// Coordinator over `service` with fast settings and retries
pub fn coordinator(
    config: AppConfig,
    service: Arc<FakeService>,
    settings: ExportSettings,
    shutdown: CancellationToken,
) -> ExportCoordinator {
    ExportCoordinator::with_service(config, service, shutdown)
        .with_settings(settings)
        .with_retry_policy(fast_policy(3))
}
