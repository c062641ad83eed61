//! Export coordinator - main orchestrator for the export process
//!
//! Builds the engine components from configuration, resolves which spaces
//! to export and hands them to the [`BatchScheduler`].

use super::downloader::ChunkedDownloader;
use super::poller::JobPoller;
use super::progress::ProgressTracker;
use super::scheduler::{BatchScheduler, RunReport};
use super::settings::ExportSettings;
use super::submitter::{JobSubmitter, SubmissionThrottle};
use super::summary::ExportSummary;
use super::task::TaskContext;
use crate::adapters::confluence::{ConfluenceClient, ExportService};
use crate::config::{AppConfig, CacheConfig};
use crate::core::cache::CacheStore;
use crate::core::cancel::CancelSignal;
use crate::core::pool::ConnectionPool;
use crate::core::retry::RetryPolicy;
use crate::core::spaces::{list_all_spaces, SpaceFilter, SpaceSelection};
use crate::domain::{AppError, ExportError, Result, Space, SpaceKey};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Export coordinator
pub struct ExportCoordinator {
    config: AppConfig,
    settings: ExportSettings,
    service: Arc<dyn ExportService>,
    policy: RetryPolicy,
    pool: ConnectionPool,
    cache: Arc<CacheStore>,
    tracker: Arc<ProgressTracker>,
    shutdown: CancelSignal,
}

impl ExportCoordinator {
    /// Creates a coordinator talking to the configured Confluence instance
    pub fn new(config: AppConfig, shutdown: CancellationToken) -> Result<Self> {
        let client = ConfluenceClient::new(&config.confluence, config.export.connection_pool_limit)?;
        Ok(Self::with_service(config, Arc::new(client), shutdown))
    }

    /// Creates a coordinator over any [`ExportService`]
    pub fn with_service(
        config: AppConfig,
        service: Arc<dyn ExportService>,
        shutdown: CancellationToken,
    ) -> Self {
        let settings = ExportSettings::from_config(&config);
        let policy = RetryPolicy::from_config(&config.export.retry);
        let cache = Arc::new(open_cache(&config.cache, &settings.output_dir));

        Self {
            pool: ConnectionPool::new(settings.max_concurrent),
            config,
            settings,
            service,
            policy,
            cache,
            tracker: Arc::new(ProgressTracker::default()),
            shutdown: CancelSignal::new(shutdown),
        }
    }

    /// Replaces the engine settings, reopening the cache in the new output directory
    pub fn with_settings(mut self, settings: ExportSettings) -> Self {
        self.cache = Arc::new(open_cache(&self.config.cache, &settings.output_dir));
        self.pool = ConnectionPool::new(settings.max_concurrent);
        self.settings = settings;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shows a terminal progress bar while exporting
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.tracker = Arc::new(ProgressTracker::new(enabled));
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Lists spaces and applies the configured selection rules
    pub async fn resolve_spaces(&self) -> Result<SpaceSelection> {
        let keys = self
            .config
            .export
            .spaces
            .iter()
            .map(|k| SpaceKey::new(k.as_str()).map_err(AppError::Configuration))
            .collect::<Result<Vec<_>>>()?;
        let filter = SpaceFilter::new(
            keys,
            self.config.export.include_personal,
            self.config.export.include_archived,
        );

        let spaces = list_all_spaces(self.service.as_ref(), &self.policy, &self.shutdown).await?;
        let selection = filter.apply(spaces);

        tracing::info!(
            selected = selection.selected.len(),
            skipped = selection.skipped,
            missing = selection.missing.len(),
            "Resolved spaces to export"
        );
        Ok(selection)
    }

    /// Execute the export
    ///
    /// Resolves the spaces, then either logs the plan (dry run) or runs every
    /// batch. Per-space failures are reported in the summary; only problems
    /// that prevent the run from starting are returned as errors.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let started = Instant::now();

        tracing::info!(
            output_dir = %self.settings.output_dir.display(),
            format = %self.settings.format,
            max_concurrent = self.settings.max_concurrent,
            batch_size = self.settings.batch_size,
            "Starting export process"
        );

        tokio::fs::create_dir_all(&self.settings.output_dir)
            .await
            .map_err(|e| {
                AppError::Io(format!(
                    "Failed to create output directory {}: {e}",
                    self.settings.output_dir.display()
                ))
            })?;

        let selection = match self.resolve_spaces().await {
            Ok(selection) => selection,
            Err(AppError::Export(ExportError::Cancelled)) => {
                let summary = ExportSummary {
                    interrupted: true,
                    ..ExportSummary::new()
                }
                .with_duration(started.elapsed());
                summary.log_summary();
                return Ok(summary);
            }
            Err(e) => return Err(e),
        };

        if self.config.application.dry_run {
            return Ok(self.plan(selection, started.elapsed()));
        }

        let report = self.run_spaces(selection.selected).await;
        self.tracker.finish();

        tracing::debug!(
            peak_in_flight = self.pool.peak_in_flight(),
            capacity = self.pool.capacity(),
            "Connection pool usage"
        );

        let summary = ExportSummary::from_report(&report)
            .with_missing(selection.missing)
            .with_duration(started.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Runs `spaces` through the batch scheduler, skipping cached ones
    ///
    /// Outcomes come back in the order of `spaces`.
    pub async fn run_spaces(&self, spaces: Vec<Space>) -> RunReport {
        let scheduler = BatchScheduler::new(
            Arc::new(self.task_context()),
            self.settings.max_concurrent,
            self.settings.batch_size,
        );
        scheduler.run(spaces, &self.shutdown).await
    }

    fn task_context(&self) -> TaskContext {
        let settings = &self.settings;
        let throttle = Arc::new(SubmissionThrottle::new(settings.export_interval));

        TaskContext {
            submitter: JobSubmitter::new(
                Arc::clone(&self.service),
                self.pool.clone(),
                throttle,
                settings.format,
                settings.request_timeout,
            ),
            poller: JobPoller::new(
                Arc::clone(&self.service),
                self.pool.clone(),
                self.policy.clone(),
                settings.poll_interval,
                settings.request_timeout,
            ),
            downloader: ChunkedDownloader::new(
                Arc::clone(&self.service),
                self.pool.clone(),
                Arc::clone(&self.tracker),
                settings.chunk_size,
                settings.request_timeout,
            ),
            policy: self.policy.clone(),
            cache: Arc::clone(&self.cache),
            tracker: Arc::clone(&self.tracker),
            output_dir: settings.output_dir.clone(),
            format: settings.format,
        }
    }

    /// Logs what a real run would do, without submitting anything
    fn plan(&self, selection: SpaceSelection, elapsed: Duration) -> ExportSummary {
        let mut cached = 0;
        for space in &selection.selected {
            let is_cached = self.cache.valid_entry(&space.key).is_some();
            if is_cached {
                cached += 1;
            }
            tracing::info!(
                space_key = %space.key,
                name = %space.name,
                file = %space.archive_file_name(self.settings.format),
                cached = is_cached,
                "Dry run: would export space"
            );
        }

        let summary = ExportSummary {
            total_spaces: selection.selected.len(),
            cached,
            dry_run: true,
            ..ExportSummary::new()
        }
        .with_missing(selection.missing)
        .with_duration(elapsed);
        summary.log_summary();
        summary
    }
}

/// Opens the cache index in `output_dir`, or a disabled cache
pub fn open_cache(config: &CacheConfig, output_dir: &Path) -> CacheStore {
    if !config.enabled {
        return CacheStore::disabled();
    }
    let max_age = (config.max_age_hours > 0)
        .then(|| Duration::from_secs(config.max_age_hours.saturating_mul(3600)));
    CacheStore::load(output_dir.join(&config.file_name), max_age)
}
