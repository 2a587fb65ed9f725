//! Score-zone histogram.
//!
//! Zones are derived from `total_score` only. The lowest zone is labelled
//! "hidden" in the product but has nothing to do with the `hidden` flag.

use crate::insight::chart::{zone_color, ChartDatum};
use crate::model::task::Task;
use serde::Serialize;

pub const CRITICAL_MIN_SCORE: u16 = 14;
pub const IMPORTANT_MIN_SCORE: u16 = 11;
pub const MODERATE_MIN_SCORE: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreZone {
    Critical,
    Important,
    Moderate,
    Low,
}

impl ScoreZone {
    pub const ALL: [ScoreZone; 4] = [
        ScoreZone::Critical,
        ScoreZone::Important,
        ScoreZone::Moderate,
        ScoreZone::Low,
    ];

    pub fn for_total(total: u16) -> Self {
        if total >= CRITICAL_MIN_SCORE {
            Self::Critical
        } else if total >= IMPORTANT_MIN_SCORE {
            Self::Important
        } else if total >= MODERATE_MIN_SCORE {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn for_task(task: &Task) -> Self {
        Self::for_total(task.total_score())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "immediate action",
            Self::Important => "mobilize",
            Self::Moderate => "moderate",
            Self::Low => "hidden",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ZoneCounts {
    pub critical: usize,
    pub important: usize,
    pub moderate: usize,
    pub low: usize,
}

impl ZoneCounts {
    pub fn get(&self, zone: ScoreZone) -> usize {
        match zone {
            ScoreZone::Critical => self.critical,
            ScoreZone::Important => self.important,
            ScoreZone::Moderate => self.moderate,
            ScoreZone::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.important + self.moderate + self.low
    }

    pub fn to_chart(&self) -> Vec<ChartDatum> {
        ScoreZone::ALL
            .iter()
            .map(|zone| ChartDatum {
                name: zone.label().to_string(),
                value: self.get(*zone) as f64,
                color: zone_color(*zone),
                percent: None,
            })
            .collect()
    }

    fn bump(&mut self, zone: ScoreZone) {
        match zone {
            ScoreZone::Critical => self.critical += 1,
            ScoreZone::Important => self.important += 1,
            ScoreZone::Moderate => self.moderate += 1,
            ScoreZone::Low => self.low += 1,
        }
    }
}

pub fn compute_score_zones<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> ZoneCounts {
    let mut counts = ZoneCounts::default();
    for task in tasks {
        counts.bump(ScoreZone::for_task(task));
    }
    counts
}
