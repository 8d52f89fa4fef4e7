//! The scrape loop and its data model.

pub mod engine;
pub mod report;
pub mod window;

use crate::fetch::validity::BlankFilter;
use crate::storage::path::RunScope;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle of a scrape run. Transitions are strictly forward:
/// `Created -> Running -> Finished | Failed`. A terminal state is reached
/// exactly once, on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Created,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }
}

/// One successfully persisted observation. Created only after fetch,
/// validity check, and remote registration all succeed; immutable after.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRecord {
    pub name: String,
    pub relative_path: String,
    /// Valid only until the scratch directory is cleaned up.
    #[serde(skip)]
    pub local_path: PathBuf,
}

/// Run-level result handed back to the caller on every exit path. A failed
/// run reports an empty record list; the run report is still finalized.
#[derive(Debug, Serialize)]
pub struct JobOutcome {
    pub state: JobState,
    pub tracer_id: String,
    pub records: Vec<CaptureRecord>,
}

/// Everything a run needs beyond the schedule: identifiers, location
/// metadata, and knobs. Passed explicitly into the loop; no ambient
/// globals.
#[derive(Debug, Clone)]
pub struct ScrapeContext {
    pub scope: RunScope,
    pub latitude: String,
    pub longitude: String,
    pub filter: BlankFilter,
    /// Fixed inter-tick delay for rate limiting. Independent of the window
    /// interval; not a scheduling mechanism.
    pub tick_delay: Duration,
}
