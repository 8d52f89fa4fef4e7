//! The scrape loop: drives timed capture attempts and finalizes the run.

use super::report::RunReport;
use super::window::ScheduleWindow;
use super::{CaptureRecord, JobOutcome, JobState, ScrapeContext};
use crate::fetch::{FetchError, ImageFetcher};
use crate::storage::{self, path, RegisterError, ScrapedDataRepository, ScratchDir, SourceData};
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Why a single tick produced no data. Absorbed at the tick boundary and
/// recorded in the run report; never escalated to a run failure.
#[derive(Debug)]
enum TickFailure {
    Fetch(FetchError),
    BlankFrame,
    Save(anyhow::Error),
    Register(RegisterError),
}

impl std::fmt::Display for TickFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickFailure::Fetch(e) => write!(f, "fetch failed: {}", e),
            TickFailure::BlankFrame => write!(f, "blank frame"),
            TickFailure::Save(e) => write!(f, "local save failed: {:#}", e),
            TickFailure::Register(e) => write!(f, "registration failed: {}", e),
        }
    }
}

/// Walk the window tick by tick: fetch, filter, persist, record. Always
/// returns a `JobOutcome`, and always finalizes: the report accumulated so
/// far is written and uploaded even when the loop fails, and the scratch
/// directory is removed on every exit path (it drops with this function).
///
/// Ticks are strictly sequential; a failed tick is recorded and the loop
/// moves on. Only an error in the loop's own control logic (for example a
/// malformed window) fails the run, in which case the record list is
/// reported empty.
pub async fn run(
    window: ScheduleWindow,
    context: &ScrapeContext,
    fetcher: &dyn ImageFetcher,
    repository: &dyn ScrapedDataRepository,
    scratch: ScratchDir,
) -> JobOutcome {
    let job_id = context.scope.job_id;
    let mut report = RunReport::new();
    let mut records: Vec<CaptureRecord> = Vec::new();

    let state = JobState::Created;
    info!(job_id, tracer_id = %context.scope.tracer_id, state = ?state, "Starting scrape job");
    let state = JobState::Running;
    debug!(job_id, state = ?state, "Job running");

    let loop_result = run_ticks(
        &window,
        context,
        fetcher,
        repository,
        &scratch,
        &mut report,
        &mut records,
    )
    .await;

    let state = match loop_result {
        Ok(()) => JobState::Finished,
        Err(e) => {
            error!(job_id, "Scrape loop failed: {:#}", e);
            // Failed runs report an empty record list; the report-so-far
            // is still finalized below.
            records.clear();
            JobState::Failed
        }
    };

    finalize(context, repository, &scratch, &report, state, &mut records).await;

    info!(job_id, state = ?state, records = records.len(), ticks = report.len(), "Job done");
    JobOutcome {
        state,
        tracer_id: context.scope.tracer_id.clone(),
        records,
    }
}

async fn run_ticks(
    window: &ScheduleWindow,
    context: &ScrapeContext,
    fetcher: &dyn ImageFetcher,
    repository: &dyn ScrapedDataRepository,
    scratch: &ScratchDir,
    report: &mut RunReport,
    records: &mut Vec<CaptureRecord>,
) -> anyhow::Result<()> {
    let ticks = window.ticks().context("invalid schedule window")?;
    info!(job_id = context.scope.job_id, ticks = ticks.len(), "Schedule resolved");

    for instant in ticks {
        let key = instant.timestamp();
        match capture_tick(context, fetcher, repository, scratch, instant).await {
            Ok(record) => {
                debug!(job_id = context.scope.job_id, tick = key, path = %record.relative_path, "Tick captured");
                report.mark_captured(key, &record.relative_path);
                records.push(record);
            }
            Err(failure) => {
                warn!(job_id = context.scope.job_id, tick = key, "Tick failed: {}", failure);
                report.mark_no_data(key, failure.to_string());
            }
        }
        // Rate limiting between source hits, unrelated to the interval.
        tokio::time::sleep(context.tick_delay).await;
    }
    Ok(())
}

/// One capture attempt. At most one fetch per tick; no intra-tick retry.
async fn capture_tick(
    context: &ScrapeContext,
    fetcher: &dyn ImageFetcher,
    repository: &dyn ScrapedDataRepository,
    scratch: &ScratchDir,
    instant: DateTime<Utc>,
) -> Result<CaptureRecord, TickFailure> {
    let image = fetcher.fetch(instant).await.map_err(TickFailure::Fetch)?;
    if !context.filter.is_valid(&image) {
        return Err(TickFailure::BlankFrame);
    }

    let key = instant.timestamp();
    let name = format!("webcam_{}_{}_{}", context.latitude, context.longitude, key);
    let relative_path = path::capture_path(&context.scope, key, "scraped", &name, "png");
    let local_path = scratch.join(format!("images/{}.png", key));
    storage::save_image(&image, &local_path).map_err(TickFailure::Save)?;

    let data = SourceData {
        name: name.clone(),
        relative_path: relative_path.clone(),
    };
    repository
        .register_photo(context.scope.job_id, &data, &local_path)
        .await
        .map_err(TickFailure::Register)?;

    Ok(CaptureRecord {
        name,
        relative_path,
        local_path,
    })
}

/// Best-effort run finalizer. Each step is independent: a failure in one is
/// logged and the next still runs. The report is persisted whenever it is
/// non-empty, regardless of the run's state; its record joins the output
/// list only when the run finished cleanly.
async fn finalize(
    context: &ScrapeContext,
    repository: &dyn ScrapedDataRepository,
    scratch: &ScratchDir,
    report: &RunReport,
    state: JobState,
    records: &mut Vec<CaptureRecord>,
) {
    let job_id = context.scope.job_id;
    if report.is_empty() {
        debug!(job_id, "Empty report, nothing to finalize");
        return;
    }

    let name = format!("report_{}_{}", job_id, context.scope.tracer_id);
    let relative_path = path::report_path(&context.scope, &name);
    let local_path = scratch.join(format!("{}.json", name));

    if let Err(e) = storage::save_json(report, &local_path) {
        warn!(job_id, "Could not write run report locally: {:#}", e);
        return;
    }

    let data = SourceData {
        name: name.clone(),
        relative_path: relative_path.clone(),
    };
    match repository.register_json(job_id, &data, &local_path).await {
        Ok(()) => {
            if state == JobState::Finished {
                records.push(CaptureRecord {
                    name,
                    relative_path,
                    local_path,
                });
            }
        }
        Err(e) => warn!(job_id, "Could not register run report: {}", e),
    }
}
