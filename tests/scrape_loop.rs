//! Scrape-loop behavior: per-tick failure tolerance, report shape, and
//! finalizer guarantees, exercised through injected fetcher and repository
//! stubs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use framegrab::fetch::{validity::BlankFilter, FetchError, ImageFetcher};
use framegrab::scrape::report::TickOutcome;
use framegrab::scrape::window::ScheduleWindow;
use framegrab::scrape::{engine, JobState, ScrapeContext};
use framegrab::storage::path::RunScope;
use framegrab::storage::{RegisterError, ScrapedDataRepository, ScratchDir, SourceData};
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn lit_image() -> DynamicImage {
    let mut img = RgbImage::new(4, 4);
    for pixel in img.pixels_mut() {
        pixel.0 = [120, 130, 140];
    }
    DynamicImage::ImageRgb8(img)
}

fn black_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(4, 4))
}

/// Fetcher stub scripted by 1-based tick index.
#[derive(Default)]
struct StubFetcher {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
    blank_on: Vec<usize>,
}

impl StubFetcher {
    fn ok() -> Self {
        Self::default()
    }

    fn failing_on(ticks: &[usize]) -> Self {
        Self {
            fail_on: ticks.to_vec(),
            ..Self::default()
        }
    }

    fn blank_on(ticks: &[usize]) -> Self {
        Self {
            blank_on: ticks.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, _instant: DateTime<Utc>) -> Result<DynamicImage, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(FetchError::Status {
                status: 404,
                url: "stub://camera".into(),
            });
        }
        if self.blank_on.contains(&call) {
            return Ok(black_image());
        }
        Ok(lit_image())
    }
}

/// Repository stub: counts calls, optionally refuses photo registration on
/// scripted ticks, and keeps the uploaded report body for inspection.
#[derive(Default)]
struct StubRepository {
    photo_calls: AtomicUsize,
    json_calls: AtomicUsize,
    fail_photo_on: Vec<usize>,
    report_body: Mutex<Option<serde_json::Value>>,
}

impl StubRepository {
    fn refusing_photos_on(ticks: &[usize]) -> Self {
        Self {
            fail_photo_on: ticks.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ScrapedDataRepository for StubRepository {
    async fn register_photo(
        &self,
        _job_id: i64,
        _data: &SourceData,
        local_path: &Path,
    ) -> Result<(), RegisterError> {
        let call = self.photo_calls.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(local_path.exists(), "photo must be saved before registration");
        if self.fail_photo_on.contains(&call) {
            return Err(RegisterError::Refused {
                status: 503,
                message: "stub outage".into(),
            });
        }
        Ok(())
    }

    async fn register_json(
        &self,
        _job_id: i64,
        _data: &SourceData,
        local_path: &Path,
    ) -> Result<(), RegisterError> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        let body = std::fs::read_to_string(local_path).expect("report file readable");
        *self.report_body.lock().unwrap() = Some(serde_json::from_str(&body).unwrap());
        Ok(())
    }
}

fn context(job_id: i64) -> ScrapeContext {
    ScrapeContext {
        scope: RunScope {
            case_study: "webcam".into(),
            tracer_id: "tracer-1".into(),
            job_id,
        },
        latitude: "46.0".into(),
        longitude: "7.5".into(),
        filter: BlankFilter::default(),
        tick_delay: std::time::Duration::from_millis(0),
    }
}

fn window_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
}

fn range_window(ticks: i64) -> ScheduleWindow {
    ScheduleWindow::Range {
        start: window_start(),
        end: window_start() + Duration::minutes(ticks),
        interval: Duration::minutes(1),
    }
}

fn scratch_in(base: &tempfile::TempDir) -> (ScratchDir, PathBuf) {
    let root = base.path().join("run");
    (ScratchDir::create(&root).unwrap(), root)
}

fn captures(outcome: &framegrab::JobOutcome) -> usize {
    outcome
        .records
        .iter()
        .filter(|r| r.relative_path.contains("/scraped/"))
        .count()
}

#[tokio::test]
async fn test_all_ticks_captured_plus_report_record() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, root) = scratch_in(&base);
    let fetcher = StubFetcher::ok();
    let repository = StubRepository::default();

    let outcome = engine::run(range_window(5), &context(1), &fetcher, &repository, scratch).await;

    assert_eq!(outcome.state, JobState::Finished);
    assert_eq!(captures(&outcome), 5);
    // The report itself is registered and appended as the final record.
    assert_eq!(outcome.records.len(), 6);
    assert!(outcome
        .records
        .last()
        .unwrap()
        .relative_path
        .contains("/webcam_report/"));
    assert_eq!(repository.json_calls.load(Ordering::SeqCst), 1);
    assert!(!root.exists(), "scratch directory must be removed");
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_skipped() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, _) = scratch_in(&base);
    let fetcher = StubFetcher::failing_on(&[2]);
    let repository = StubRepository::default();

    let outcome = engine::run(range_window(5), &context(2), &fetcher, &repository, scratch).await;

    assert_eq!(outcome.state, JobState::Finished);
    assert_eq!(captures(&outcome), 4);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5, "no intra-tick retry");

    let report = repository.report_body.lock().unwrap().clone().unwrap();
    let entries = report.as_object().unwrap();
    assert_eq!(entries.len(), 5);
    let failed_key = (window_start() + Duration::minutes(1)).timestamp().to_string();
    assert_eq!(entries[&failed_key]["status"], "no_data");
    assert!(entries[&failed_key]["reason"]
        .as_str()
        .unwrap()
        .starts_with("fetch failed"));
}

#[tokio::test]
async fn test_blank_frame_treated_like_fetch_failure() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, _) = scratch_in(&base);
    let fetcher = StubFetcher::blank_on(&[3]);
    let repository = StubRepository::default();

    let outcome = engine::run(range_window(5), &context(3), &fetcher, &repository, scratch).await;

    assert_eq!(outcome.state, JobState::Finished);
    assert_eq!(captures(&outcome), 4);

    let report = repository.report_body.lock().unwrap().clone().unwrap();
    let blank_key = (window_start() + Duration::minutes(2)).timestamp().to_string();
    assert_eq!(report[&blank_key]["status"], "no_data");
    assert_eq!(report[&blank_key]["reason"], "blank frame");
}

#[tokio::test]
async fn test_registration_failure_does_not_abort_the_run() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, _) = scratch_in(&base);
    let fetcher = StubFetcher::ok();
    let repository = StubRepository::refusing_photos_on(&[3]);

    let outcome = engine::run(range_window(5), &context(4), &fetcher, &repository, scratch).await;

    assert_eq!(outcome.state, JobState::Finished);
    assert_eq!(captures(&outcome), 4);
    // All five ticks still attempted registration.
    assert_eq!(repository.photo_calls.load(Ordering::SeqCst), 5);

    let report = repository.report_body.lock().unwrap().clone().unwrap();
    let failed_key = (window_start() + Duration::minutes(2)).timestamp().to_string();
    assert_eq!(report[&failed_key]["status"], "no_data");
    assert!(report[&failed_key]["reason"]
        .as_str()
        .unwrap()
        .starts_with("registration failed"));
}

#[tokio::test]
async fn test_report_keys_are_increasing_and_interval_spaced() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, _) = scratch_in(&base);
    let fetcher = StubFetcher::ok();
    let repository = StubRepository::default();
    let window = ScheduleWindow::Range {
        start: window_start(),
        end: window_start() + Duration::hours(3),
        interval: Duration::minutes(60),
    };

    let outcome = engine::run(window, &context(5), &fetcher, &repository, scratch).await;
    assert_eq!(outcome.state, JobState::Finished);

    let report = repository.report_body.lock().unwrap().clone().unwrap();
    let mut keys: Vec<i64> = report
        .as_object()
        .unwrap()
        .keys()
        .map(|k| k.parse().unwrap())
        .collect();
    keys.sort();
    assert_eq!(keys.len(), 3);
    for pair in keys.windows(2) {
        assert_eq!(pair[1] - pair[0], 3600);
    }
    assert_eq!(keys[0], window_start().timestamp());
}

#[tokio::test]
async fn test_empty_window_finishes_without_report() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, root) = scratch_in(&base);
    let fetcher = StubFetcher::ok();
    let repository = StubRepository::default();
    let window = ScheduleWindow::Range {
        start: window_start() + Duration::hours(3),
        end: window_start(),
        interval: Duration::minutes(60),
    };

    let outcome = engine::run(window, &context(6), &fetcher, &repository, scratch).await;

    assert_eq!(outcome.state, JobState::Finished);
    assert!(outcome.records.is_empty());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(repository.json_calls.load(Ordering::SeqCst), 0);
    assert!(!root.exists());
}

#[tokio::test]
async fn test_invalid_window_fails_the_run_but_still_cleans_up() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, root) = scratch_in(&base);
    let fetcher = StubFetcher::ok();
    let repository = StubRepository::default();
    let window = ScheduleWindow::Range {
        start: window_start(),
        end: window_start() + Duration::hours(1),
        interval: Duration::zero(),
    };

    let outcome = engine::run(window, &context(7), &fetcher, &repository, scratch).await;

    assert_eq!(outcome.state, JobState::Failed);
    assert!(outcome.records.is_empty(), "failed runs report no records");
    assert!(!root.exists(), "cleanup still runs on failure");
}

#[tokio::test]
async fn test_scratch_removal_tolerates_missing_directory() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, root) = scratch_in(&base);
    std::fs::remove_dir_all(&root).unwrap();
    let fetcher = StubFetcher::failing_on(&[1]);
    let repository = StubRepository::default();

    // Must not panic even though the scratch dir is already gone; the
    // report save recreates what it needs under the same root.
    let outcome = engine::run(range_window(1), &context(8), &fetcher, &repository, scratch).await;
    assert_eq!(outcome.state, JobState::Finished);
    assert!(!root.exists());
}

#[tokio::test]
async fn test_logical_paths_are_reproducible_across_runs() {
    let base = tempfile::tempdir().unwrap();
    let fetcher = StubFetcher::ok();

    let (scratch_a, _) = scratch_in(&base);
    let repo_a = StubRepository::default();
    let first = engine::run(range_window(3), &context(9), &fetcher, &repo_a, scratch_a).await;

    let fetcher = StubFetcher::ok();
    let (scratch_b, _) = scratch_in(&base);
    let repo_b = StubRepository::default();
    let second = engine::run(range_window(3), &context(9), &fetcher, &repo_b, scratch_b).await;

    let paths = |o: &framegrab::JobOutcome| -> Vec<String> {
        o.records.iter().map(|r| r.relative_path.clone()).collect()
    };
    assert_eq!(paths(&first), paths(&second));
}

#[tokio::test]
async fn test_successful_tick_outcome_links_capture_path() {
    let base = tempfile::tempdir().unwrap();
    let (scratch, _) = scratch_in(&base);
    let fetcher = StubFetcher::ok();
    let repository = StubRepository::default();

    let outcome = engine::run(range_window(2), &context(10), &fetcher, &repository, scratch).await;

    let report = repository.report_body.lock().unwrap().clone().unwrap();
    let scraped = outcome
        .records
        .iter()
        .filter(|r| r.relative_path.contains("/scraped/"));
    for record in scraped {
        // The tick key is the timestamp segment of the capture path.
        let key = record.relative_path.split('/').nth(3).unwrap();
        let entry: TickOutcome = serde_json::from_value(report[key].clone()).unwrap();
        assert_eq!(
            entry,
            TickOutcome::Captured {
                relative_path: record.relative_path.clone()
            }
        );
    }
}
