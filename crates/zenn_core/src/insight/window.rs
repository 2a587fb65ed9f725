//! Date-window filtering of completed tasks.
//!
//! # Invariants
//! - Only completed tasks are ever included.
//! - A completed task with a missing or unparsable `completed_at` is never
//!   treated as in range; it is counted as malformed instead.
//! - Range bounds are inclusive on both ends.

use crate::model::task::Task;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use log::{debug, trace};

const LABEL_DATE_FORMAT: &str = "%b %-d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    AllTime,
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl DateWindow {
    /// Inclusive range; bounds are swapped when given in reverse.
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self::Range { start, end }
        } else {
            Self::Range {
                start: end,
                end: start,
            }
        }
    }

    /// The `days` days ending at `now`, clamped to the earliest
    /// representable instant.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::range(start, now)
    }

    /// Whole calendar days from `first` through `last`, in UTC.
    ///
    /// The end is clamped to the latest representable instant.
    pub fn between(first: NaiveDate, last: NaiveDate) -> Self {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let end = last
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(Duration::days(1))
            .map_or(DateTime::<Utc>::MAX_UTC, |next| {
                next - Duration::milliseconds(1)
            });
        Self::Range { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match self {
            Self::AllTime => true,
            Self::Range { start, end } => *start <= at && at <= *end,
        }
    }

    /// Display string for the window header.
    pub fn label(&self) -> String {
        match self {
            Self::AllTime => "All time".to_string(),
            Self::Range { start, end } => format!(
                "{} – {}",
                start.format(LABEL_DATE_FORMAT),
                end.format(LABEL_DATE_FORMAT)
            ),
        }
    }
}

/// Result of a window filter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedTasks<'a> {
    pub tasks: Vec<&'a Task>,
    /// Completed tasks dropped because `completed_at` could not be parsed.
    pub malformed: usize,
}

pub fn filter_by_date_window<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    window: &DateWindow,
) -> WindowedTasks<'a> {
    let mut included = Vec::new();
    let mut malformed = 0;

    for task in tasks.into_iter().filter(|task| task.completed) {
        if matches!(window, DateWindow::AllTime) {
            included.push(task);
            continue;
        }
        match task.completed_at_time() {
            Some(at) if window.contains(at) => included.push(task),
            Some(_) => {}
            None => {
                malformed += 1;
                trace!(
                    "event=insight_window module=insight status=skipped reason=bad_completed_at task_id={}",
                    task.id
                );
            }
        }
    }

    if malformed > 0 {
        debug!(
            "event=insight_window module=insight status=degraded malformed_count={malformed} included_count={}",
            included.len()
        );
    }

    WindowedTasks {
        tasks: included,
        malformed,
    }
}
