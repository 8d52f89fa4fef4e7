//! Run report: one outcome per scheduled tick.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-tick outcome, serialized in one canonical tagged shape:
///
/// ```json
/// { "status": "captured", "relative_path": "webcam/t1/42/.../x.png" }
/// { "status": "no_data", "reason": "fetch failed: ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickOutcome {
    Captured { relative_path: String },
    NoData { reason: String },
}

/// Mapping from tick key (the tick's Unix timestamp) to its outcome.
/// Exactly one entry per scheduled tick; keys serialize as strings, in
/// increasing order. Written at run end whenever non-empty, on both
/// finished and failed runs.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunReport {
    entries: BTreeMap<i64, TickOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_captured(&mut self, tick: i64, relative_path: &str) {
        self.entries.insert(
            tick,
            TickOutcome::Captured {
                relative_path: relative_path.to_string(),
            },
        );
    }

    pub fn mark_no_data(&mut self, tick: i64, reason: impl Into<String>) {
        self.entries.insert(
            tick,
            TickOutcome::NoData {
                reason: reason.into(),
            },
        );
    }

    pub fn get(&self, tick: i64) -> Option<&TickOutcome> {
        self.entries.get(&tick)
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
