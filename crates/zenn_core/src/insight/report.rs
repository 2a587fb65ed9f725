//! One-pass insight report over a date window.

use crate::insight::feedback::{compute_feedback_distribution, FeedbackDistribution};
use crate::insight::pillars::{compute_pillar_averages, PillarAverages};
use crate::insight::window::{filter_by_date_window, DateWindow};
use crate::insight::zones::{compute_score_zones, ZoneCounts};
use crate::model::task::Task;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub window_label: String,
    /// Completed tasks inside the window.
    pub task_count: usize,
    /// Completed tasks skipped for an unparsable `completed_at`.
    pub malformed: usize,
    pub pillars: PillarAverages,
    pub feedback: FeedbackDistribution,
    pub zones: ZoneCounts,
}

impl InsightReport {
    pub fn compute<'a>(tasks: impl IntoIterator<Item = &'a Task>, window: &DateWindow) -> Self {
        let windowed = filter_by_date_window(tasks, window);
        let selected = windowed.tasks.iter().copied();
        Self {
            window_label: window.label(),
            task_count: windowed.tasks.len(),
            malformed: windowed.malformed,
            pillars: compute_pillar_averages(selected.clone()),
            feedback: compute_feedback_distribution(selected.clone()),
            zones: compute_score_zones(selected),
        }
    }
}
