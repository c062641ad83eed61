//! End-to-end export runs against an in-memory service
//!
//! These tests drive the full engine (listing, cache, submit, poll,
//! download, verify) through `ExportCoordinator::execute_export`.

mod common;

use common::{coordinator, fast_settings, key, test_config, CallKind, FakeService};
use confluence_export::adapters::confluence::PollStatus;
use confluence_export::core::cache::{CacheEntry, CacheStore};
use confluence_export::core::export::summary::{
    ExportSummary, EXIT_AUTH_ERROR, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS,
};
use confluence_export::core::export::TaskStatus;
use confluence_export::domain::{ExportError, ExportFormat, Space};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn status_of(summary: &ExportSummary, k: &str) -> Option<TaskStatus> {
    summary
        .failures
        .iter()
        .find(|f| f.space_key.as_str() == k)
        .map(|f| f.status)
}

fn error_of(summary: &ExportSummary, k: &str) -> String {
    summary
        .failures
        .iter()
        .find(|f| f.space_key.as_str() == k)
        .and_then(|f| f.error.clone())
        .unwrap_or_default()
}

fn archive_path(dir: &Path, k: &str, name: &str) -> PathBuf {
    dir.join(Space::new(key(k), name).archive_file_name(ExportFormat::Html))
}

#[tokio::test]
async fn test_all_spaces_exported_and_verified() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("ENG", "Engineering", 10_000)
            .with_space("OPS", "Operations", 3_000),
    );
    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );

    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.total_spaces, 2);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.bytes_downloaded, 13_000);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);

    let eng = std::fs::read(archive_path(dir.path(), "ENG", "Engineering")).unwrap();
    assert_eq!(eng, service.archive("ENG"));
    assert!(!dir.path().join("ENG_Engineering.html.zip.part").exists());

    assert_eq!(engine.cache().len(), 2);
    let snapshot = engine.tracker().snapshot();
    assert_eq!(snapshot.completed, 2);
    assert_eq!(snapshot.bytes_downloaded, 13_000);
}

#[tokio::test]
async fn test_cached_space_makes_no_network_calls() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 2_000)
            .with_space("B", "Beta", 2_000)
            .with_space("C", "Gamma", 2_000),
    );

    let b_path = archive_path(dir.path(), "B", "Beta");
    std::fs::write(&b_path, service.archive("B")).unwrap();
    let index = CacheStore::load(dir.path().join("export_cache.json"), None);
    index
        .write(CacheEntry::new(key("B"), b_path, 2_000))
        .await
        .unwrap();

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );
    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    assert_eq!(service.space_calls("B"), 0);
    assert_eq!(service.submits("A"), 1);
    assert_eq!(service.submits("C"), 1);
    assert_eq!(engine.cache().len(), 3);
}

#[tokio::test]
async fn test_stale_cache_entry_is_reexported() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(FakeService::new().with_space("A", "Alpha", 1_500));

    // Recorded, but the archive is gone
    let index = CacheStore::load(dir.path().join("export_cache.json"), None);
    index
        .write(CacheEntry::new(
            key("A"),
            archive_path(dir.path(), "A", "Alpha"),
            1_500,
        ))
        .await
        .unwrap();

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );
    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.cached, 0);
    assert_eq!(service.submits("A"), 1);
}

#[tokio::test]
async fn test_failed_job_is_not_polled_again() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_space("B", "Beta", 1_000)
            .poll_sequence(
                "B",
                vec![
                    PollStatus::Pending { percent: Some(50) },
                    PollStatus::Failed("out of disk space".to_string()),
                ],
            ),
    );
    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );

    let summary = engine.execute_export().await.unwrap();

    assert_eq!(status_of(&summary, "B"), Some(TaskStatus::Failed));
    assert!(error_of(&summary, "B").contains("out of disk space"));
    assert_eq!(service.polls("B"), 2);
    assert_eq!(service.downloads("B"), 0);
    assert_eq!(service.submits("B"), 1);

    assert_eq!(status_of(&summary, "A"), None);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.exit_code(), EXIT_PARTIAL_FAILURE);
}

#[tokio::test]
async fn test_auth_failure_aborts_remaining_batches() {
    let dir = TempDir::new().unwrap();
    let mut fake = FakeService::new();
    for k in ["A", "B", "C", "D", "E", "F"] {
        fake = fake.with_space(k, k, 500);
    }
    let service = Arc::new(fake.fail_submit("A", vec![ExportError::from_status(403, "forbidden", None)]));

    let mut settings = fast_settings(dir.path());
    settings.max_concurrent = 2;
    settings.batch_size = 2;

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        settings,
        shutdown.clone(),
    );
    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.exit_code(), EXIT_AUTH_ERROR);
    assert!(matches!(summary.fatal_error, Some(ExportError::Auth(_))));
    assert_eq!(status_of(&summary, "A"), Some(TaskStatus::Failed));
    assert_eq!(service.submits("A"), 1);

    // B shared the first batch with A; it either finished or was stopped
    assert_ne!(status_of(&summary, "B"), Some(TaskStatus::Failed));
    assert_ne!(status_of(&summary, "B"), Some(TaskStatus::NotAttempted));

    for k in ["C", "D", "E", "F"] {
        assert_eq!(status_of(&summary, k), Some(TaskStatus::NotAttempted), "{k}");
        assert_eq!(service.space_calls(k), 0, "{k}");
    }
    assert_eq!(summary.not_attempted, 4);
    assert_eq!(summary.total_spaces, 6);

    // The abort stays inside the run
    assert!(!summary.interrupted);
    assert!(!shutdown.is_cancelled());
}

#[tokio::test]
async fn test_transient_errors_within_budget_complete() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 4_000)
            .fail_submit(
                "A",
                vec![
                    ExportError::Transient("gateway timeout".to_string()),
                    ExportError::Transient("gateway timeout".to_string()),
                    ExportError::Transient("gateway timeout".to_string()),
                ],
            )
            .fail_download(
                "A",
                vec![ExportError::Transient("connection reset".to_string())],
            ),
    );
    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );

    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    assert_eq!(service.submits("A"), 4);
    assert_eq!(service.downloads("A"), 2);
}

#[tokio::test]
async fn test_transient_errors_beyond_budget_fail_space() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_space("B", "Beta", 1_000)
            .fail_submit(
                "A",
                (0..4)
                    .map(|_| ExportError::Transient("gateway timeout".to_string()))
                    .collect(),
            ),
    );
    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );

    let summary = engine.execute_export().await.unwrap();

    assert_eq!(status_of(&summary, "A"), Some(TaskStatus::Failed));
    assert!(error_of(&summary, "A").contains("gateway timeout"));
    assert_eq!(service.submits("A"), 4);
    assert_eq!(service.polls("A"), 0);
    assert!(summary.fatal_error.is_none());
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.exit_code(), EXIT_PARTIAL_FAILURE);
}

#[tokio::test]
async fn test_integrity_failure_restarts_download() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 5_000)
            .fail_download("A", vec![ExportError::Integrity("truncated body".to_string())]),
    );
    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );

    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(service.downloads("A"), 2);
    let data = std::fs::read(archive_path(dir.path(), "A", "Alpha")).unwrap();
    assert_eq!(data, service.archive("A"));
}

#[tokio::test]
async fn test_rate_limited_submission_waits_for_retry_after() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .fail_submit(
                "A",
                vec![ExportError::from_status(
                    429,
                    "slow down",
                    Some(Duration::from_millis(80)),
                )],
            ),
    );
    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );

    let started = Instant::now();
    let summary = engine.execute_export().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(summary.completed, 1);
    assert_eq!(service.submits("A"), 2);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let dir = TempDir::new().unwrap();
    let mut fake = FakeService::new().with_latency(Duration::from_millis(5));
    for i in 0..12 {
        let k = format!("S{i}");
        fake = fake.with_space(&k, &k, 2_000);
    }
    let service = Arc::new(fake);

    let mut settings = fast_settings(dir.path());
    settings.max_concurrent = 3;

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        settings,
        shutdown.clone(),
    );
    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.completed, 12);
    assert!(service.peak_concurrency() <= 3, "peak {}", service.peak_concurrency());
    assert!(engine.pool().peak_in_flight() <= 3);
    assert_eq!(engine.pool().in_flight(), 0);
}

#[tokio::test]
async fn test_dry_run_submits_nothing() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_space("B", "Beta", 1_000),
    );
    let mut config = test_config(dir.path(), "");
    config.application.dry_run = true;

    let shutdown = CancellationToken::new();
    let engine = coordinator(config, Arc::clone(&service), fast_settings(dir.path()), shutdown.clone());
    let summary = engine.execute_export().await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.total_spaces, 2);
    assert_eq!(summary.completed, 0);
    assert_eq!(service.total_submits(), 0);
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
}

#[tokio::test]
async fn test_explicit_keys_report_missing_spaces() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_space("B", "Beta", 1_000),
    );
    let config = test_config(dir.path(), r#"spaces = ["A", "ZZZ"]"#);

    let shutdown = CancellationToken::new();
    let engine = coordinator(config, Arc::clone(&service), fast_settings(dir.path()), shutdown.clone());
    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.total_spaces, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.missing, vec![key("ZZZ")]);
    assert_eq!(service.submits("B"), 0);
}

#[tokio::test]
async fn test_personal_spaces_skipped_by_default() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_personal_space("~jdoe", "Jane Doe"),
    );

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );
    let summary = engine.execute_export().await.unwrap();

    assert_eq!(summary.total_spaces, 1);
    assert_eq!(service.submits("~jdoe"), 0);

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), "include_personal = true"),
        Arc::clone(&service),
        fast_settings(dir.path()),
        shutdown.clone(),
    );
    let summary = engine.execute_export().await.unwrap();

    // A is served from the cache written by the first run
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(service.submits("~jdoe"), 1);
}

#[tokio::test]
async fn test_batch_finishes_before_next_batch_submits() {
    let dir = TempDir::new().unwrap();
    let mut fake = FakeService::new().with_latency(Duration::from_millis(3));
    for k in ["A", "B", "C", "D", "E", "F"] {
        fake = fake.with_space(k, k, 3_000);
    }
    let service = Arc::new(fake.poll_sequence("B", vec![PollStatus::Pending { percent: None }; 5]));

    let mut settings = fast_settings(dir.path());
    settings.max_concurrent = 2;
    settings.batch_size = 2;

    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        settings,
        CancellationToken::new(),
    );
    let summary = engine.execute_export().await.unwrap();
    assert_eq!(summary.completed, 6);

    let batches: [&[&str]; 3] = [&["A", "B"], &["C", "D"], &["E", "F"]];
    for pair in batches.windows(2) {
        let (current, next) = (pair[0], pair[1]);

        let calls_done = service.calls_for(current).iter().map(|c| c.ended).max().unwrap();
        let cached_done = current
            .iter()
            .map(|k| engine.cache().lookup(&key(k)).unwrap().completed_at)
            .max()
            .unwrap();
        let batch_end = calls_done.max(cached_done);

        let next_start = service.calls_for(next).iter().map(|c| c.started).min().unwrap();
        assert!(
            batch_end < next_start,
            "{current:?} ended at {batch_end}, {next:?} started at {next_start}"
        );
    }
}

#[tokio::test]
async fn test_export_interval_spaces_submissions_not_polls() {
    let dir = TempDir::new().unwrap();
    let pending = vec![PollStatus::Pending { percent: None }; 4];
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_space("B", "Beta", 1_000)
            .with_space("C", "Gamma", 1_000)
            .poll_sequence("A", pending.clone())
            .poll_sequence("B", pending.clone())
            .poll_sequence("C", pending),
    );

    let interval = Duration::from_millis(40);
    let mut settings = fast_settings(dir.path());
    settings.max_concurrent = 3;
    settings.export_interval = interval;

    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        settings,
        CancellationToken::new(),
    );
    let summary = engine.execute_export().await.unwrap();
    assert_eq!(summary.completed, 3);

    let submits = service.calls_of(CallKind::Submit);
    assert_eq!(submits.len(), 3);
    for pair in submits.windows(2) {
        let gap = (pair[1].started - pair[0].started).num_milliseconds();
        assert!(gap >= 35, "submissions {gap}ms apart");
    }

    for k in ["A", "B", "C"] {
        let polls: Vec<_> = service
            .calls_of(CallKind::Poll)
            .into_iter()
            .filter(|c| c.key == k)
            .collect();
        assert_eq!(polls.len(), 5, "{k}");
        let shortest = polls
            .windows(2)
            .map(|pair| (pair[1].started - pair[0].started).num_milliseconds())
            .min()
            .unwrap();
        assert!(shortest < 20, "{k}: polls at least {shortest}ms apart");
    }
}

#[tokio::test]
async fn test_only_uncached_space_is_submitted_and_order_is_kept() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_500)
            .with_space("B", "Beta", 1_500)
            .with_space("C", "Gamma", 1_500),
    );

    let index = CacheStore::load(dir.path().join("export_cache.json"), None);
    for (k, name) in [("A", "Alpha"), ("C", "Gamma")] {
        let path = archive_path(dir.path(), k, name);
        std::fs::write(&path, service.archive(k)).unwrap();
        index.write(CacheEntry::new(key(k), path, 1_500)).await.unwrap();
    }

    let mut settings = fast_settings(dir.path());
    settings.max_concurrent = 2;
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        settings,
        CancellationToken::new(),
    );

    let spaces = vec![
        Space::new(key("A"), "Alpha"),
        Space::new(key("B"), "Beta"),
        Space::new(key("C"), "Gamma"),
    ];
    let report = engine.run_spaces(spaces).await;

    let order: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.space_key.as_str().to_string(), o.status))
        .collect();
    assert_eq!(
        order,
        vec![
            ("A".to_string(), TaskStatus::Cached),
            ("B".to_string(), TaskStatus::Completed),
            ("C".to_string(), TaskStatus::Cached),
        ]
    );
    assert_eq!(service.total_submits(), 1);
    assert_eq!(service.submits("B"), 1);
    assert_eq!(service.space_calls("A") + service.space_calls("C"), 0);
}

#[tokio::test]
async fn test_cancel_while_waiting_on_throttle_is_not_attempted() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(
        FakeService::new()
            .with_space("A", "Alpha", 1_000)
            .with_space("B", "Beta", 1_000)
            .poll_sequence("A", vec![PollStatus::Pending { percent: None }; 10_000]),
    );

    let mut settings = fast_settings(dir.path());
    settings.max_concurrent = 2;
    settings.export_interval = Duration::from_secs(30);

    let shutdown = CancellationToken::new();
    let engine = coordinator(
        test_config(dir.path(), ""),
        Arc::clone(&service),
        settings,
        shutdown.clone(),
    );

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
    });
    let summary = tokio::time::timeout(Duration::from_secs(5), engine.execute_export())
        .await
        .expect("export should stop after shutdown")
        .unwrap();
    trigger.await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(status_of(&summary, "A"), Some(TaskStatus::Aborted));
    assert_eq!(status_of(&summary, "B"), Some(TaskStatus::NotAttempted));
    assert_eq!(service.submits("B"), 0);
}
