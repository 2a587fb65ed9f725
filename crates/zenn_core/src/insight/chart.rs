//! Plain series handed to the chart collaborator.

use crate::insight::zones::ScoreZone;
use crate::model::task::{Feedback, Pillar};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDatum {
    pub name: String,
    pub value: f64,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u32>,
}

pub fn pillar_color(pillar: Pillar) -> &'static str {
    match pillar {
        Pillar::Consequence => "#ef4444",
        Pillar::Pride => "#f59e0b",
        Pillar::Construction => "#10b981",
    }
}

pub fn feedback_color(feedback: Feedback) -> &'static str {
    match feedback {
        Feedback::Transformed => "#8b5cf6",
        Feedback::Relief => "#3b82f6",
        Feedback::Obligation => "#6b7280",
    }
}

pub fn zone_color(zone: ScoreZone) -> &'static str {
    match zone {
        ScoreZone::Critical => "#dc2626",
        ScoreZone::Important => "#f97316",
        ScoreZone::Moderate => "#eab308",
        ScoreZone::Low => "#9ca3af",
    }
}
