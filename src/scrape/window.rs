//! Bounded capture schedules.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("interval must be positive, got {minutes} minutes")]
    NonPositiveInterval { minutes: i64 },
}

/// A bounded capture schedule: either a wall-clock duration anchored at
/// loop entry, or an explicit date range. Both are stepped by `interval`.
#[derive(Debug, Clone)]
pub enum ScheduleWindow {
    Duration {
        duration: Duration,
        interval: Duration,
    },
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    },
}

impl ScheduleWindow {
    /// Nominal tick instants: strictly increasing, spaced exactly
    /// `interval`.
    ///
    /// Range windows are half-open `[start, end)`: the count is
    /// `ceil((end - start) / interval)` and every tick lands before `end`,
    /// so a 3-hour window at 60 minutes yields 3 ticks. Duration windows
    /// yield `floor(duration / interval)` ticks anchored at now. An empty
    /// window (start >= end, duration < interval) is valid and yields no
    /// ticks.
    pub fn ticks(&self) -> Result<Vec<DateTime<Utc>>, WindowError> {
        let (start, step, count) = match self {
            ScheduleWindow::Duration { duration, interval } => {
                let step = positive_millis(*interval)?;
                let count = duration.num_milliseconds().max(0) / step;
                (Utc::now(), step, count)
            }
            ScheduleWindow::Range {
                start,
                end,
                interval,
            } => {
                let step = positive_millis(*interval)?;
                let span = (*end - *start).num_milliseconds();
                let count = if span <= 0 { 0 } else { (span + step - 1) / step };
                (*start, step, count)
            }
        };
        // Offsets stay in i64 milliseconds; the tick index is never
        // narrowed.
        Ok((0..count)
            .map(|k| start + Duration::milliseconds(step * k))
            .collect())
    }
}

fn positive_millis(interval: Duration) -> Result<i64, WindowError> {
    let millis = interval.num_milliseconds();
    if millis <= 0 {
        return Err(WindowError::NonPositiveInterval {
            minutes: interval.num_minutes(),
        });
    }
    Ok(millis)
}
