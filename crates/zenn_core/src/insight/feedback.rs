//! Feedback-category distribution with tie-aware narrative selection.
//!
//! # Invariants
//! - Tasks without effective feedback are excluded from the percentage base.
//! - Percentages are rounded half-up per category and never redistributed.
//! - Narrative selection is ordered: three-way tie, then pairwise ties in
//!   declaration order, then the single highest category.

use crate::insight::chart::{feedback_color, ChartDatum};
use crate::insight::narrative::feedback_narrative;
use crate::model::task::{Feedback, Task};
use serde::Serialize;

/// Two percentages within this many points are tied.
pub const TIE_MARGIN_POINTS: u32 = 5;

/// Pair checks, as `(first, second, third)` indices in declaration order.
const PAIRS: [(usize, usize, usize); 3] = [(0, 1, 2), (0, 2, 1), (1, 2, 0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackNarrative {
    NoFeedback,
    Balanced,
    Paired(Feedback, Feedback),
    Single(Feedback),
}

impl FeedbackNarrative {
    /// Stable key, e.g. `transformed_relief`.
    pub fn key(self) -> String {
        match self {
            Self::NoFeedback => "no_feedback".to_string(),
            Self::Balanced => "balanced".to_string(),
            Self::Paired(first, second) => format!("{}_{}", first.as_str(), second.as_str()),
            Self::Single(feedback) => feedback.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackShare {
    pub feedback: Feedback,
    pub count: u32,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackDistribution {
    /// Tasks that carried feedback.
    pub total: u32,
    /// In declaration order: transformed, relief, obligation.
    pub shares: [FeedbackShare; 3],
    pub narrative: FeedbackNarrative,
    pub message: &'static str,
}

impl FeedbackDistribution {
    pub fn has_feedback(&self) -> bool {
        self.total > 0
    }

    pub fn get(&self, feedback: Feedback) -> &FeedbackShare {
        &self.shares[feedback_index(feedback)]
    }

    pub fn to_chart(&self) -> Vec<ChartDatum> {
        self.shares
            .iter()
            .map(|share| ChartDatum {
                name: share.feedback.as_str().to_string(),
                value: f64::from(share.count),
                color: feedback_color(share.feedback),
                percent: Some(share.percent),
            })
            .collect()
    }
}

pub fn compute_feedback_distribution<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
) -> FeedbackDistribution {
    let mut counts = [0_u32; 3];
    for feedback in tasks.into_iter().filter_map(Task::effective_feedback) {
        counts[feedback_index(feedback)] += 1;
    }
    let total: u32 = counts.iter().sum();

    let percents = counts.map(|count| round_percent(count, total));
    let narrative = if total == 0 {
        FeedbackNarrative::NoFeedback
    } else {
        select_narrative(percents)
    };

    FeedbackDistribution {
        total,
        shares: Feedback::ALL.map(|feedback| {
            let index = feedback_index(feedback);
            FeedbackShare {
                feedback,
                count: counts[index],
                percent: percents[index],
            }
        }),
        narrative,
        message: feedback_narrative(narrative),
    }
}

/// `count / total` as a percentage, rounded half-up; `0` when `total == 0`.
pub fn round_percent(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (count * 200 + total) / (total * 2)
}

/// Picks the narrative for percentages in declaration order.
pub fn select_narrative(percents: [u32; 3]) -> FeedbackNarrative {
    let tied = |a: usize, b: usize| percents[a].abs_diff(percents[b]) <= TIE_MARGIN_POINTS;

    if tied(0, 1) && tied(0, 2) && tied(1, 2) {
        return FeedbackNarrative::Balanced;
    }

    for (first, second, third) in PAIRS {
        if tied(first, second)
            && percents[first] > percents[third]
            && percents[second] > percents[third]
        {
            return FeedbackNarrative::Paired(Feedback::ALL[first], Feedback::ALL[second]);
        }
    }

    let mut highest = 0;
    for index in 1..3 {
        if percents[index] > percents[highest] {
            highest = index;
        }
    }
    FeedbackNarrative::Single(Feedback::ALL[highest])
}

fn feedback_index(feedback: Feedback) -> usize {
    match feedback {
        Feedback::Transformed => 0,
        Feedback::Relief => 1,
        Feedback::Obligation => 2,
    }
}
