//! Pillar averages and highest/lowest resolution.
//!
//! # Invariants
//! - Averages are plain arithmetic means over every input task.
//! - A neglected pillar is always reported as lowest, whatever the spread.
//! - With more than one neglected pillar, no highest pillar is reported.
//! - Empty input yields zero averages, `Balanced`, and the
//!   insufficient-data sentence.

use crate::insight::chart::{pillar_color, ChartDatum};
use crate::insight::narrative::{
    pillar_narrative, render_pillar_template, HIGHEST_PILLAR_TEMPLATE, INSUFFICIENT_DATA,
    LOWEST_PILLAR_TEMPLATE,
};
use crate::model::task::{Pillar, Task};
use serde::Serialize;

/// Average at or above which a pillar is high priority.
pub const HIGH_PRIORITY_THRESHOLD: f64 = 4.0;
/// Average at or below which a pillar is neglected.
pub const NEGLECTED_THRESHOLD: f64 = 2.5;
/// Minimum max-min spread for a highest/lowest distinction.
pub const SPREAD_MARGIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarClass {
    HighPriority,
    Balanced,
    Neglected,
}

impl PillarClass {
    pub fn classify(average: f64) -> Self {
        if average >= HIGH_PRIORITY_THRESHOLD {
            Self::HighPriority
        } else if average <= NEGLECTED_THRESHOLD {
            Self::Neglected
        } else {
            Self::Balanced
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarInsight {
    pub pillar: Pillar,
    pub average: f64,
    pub classification: PillarClass,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarAverages {
    pub task_count: usize,
    /// In declaration order: consequence, pride, construction.
    pub pillars: [PillarInsight; 3],
    pub highest: Option<Pillar>,
    pub lowest: Option<Pillar>,
}

impl PillarAverages {
    /// Builds the result from precomputed averages.
    pub fn from_averages(averages: [f64; 3], task_count: usize) -> Self {
        if task_count == 0 {
            return Self::insufficient();
        }
        let pillars = Pillar::ALL.map(|pillar| {
            let average = averages[pillar_index(pillar)];
            let classification = PillarClass::classify(average);
            PillarInsight {
                pillar,
                average,
                classification,
                message: pillar_narrative(pillar, classification),
            }
        });
        let (highest, lowest) = resolve_extremes(averages);
        Self {
            task_count,
            pillars,
            highest,
            lowest,
        }
    }

    fn insufficient() -> Self {
        Self {
            task_count: 0,
            pillars: Pillar::ALL.map(|pillar| PillarInsight {
                pillar,
                average: 0.0,
                classification: PillarClass::Balanced,
                message: INSUFFICIENT_DATA,
            }),
            highest: None,
            lowest: None,
        }
    }

    pub fn get(&self, pillar: Pillar) -> &PillarInsight {
        &self.pillars[pillar_index(pillar)]
    }

    pub fn has_data(&self) -> bool {
        self.task_count > 0
    }

    pub fn highest_message(&self) -> Option<String> {
        self.highest
            .map(|pillar| render_pillar_template(HIGHEST_PILLAR_TEMPLATE, pillar))
    }

    pub fn lowest_message(&self) -> Option<String> {
        self.lowest
            .map(|pillar| render_pillar_template(LOWEST_PILLAR_TEMPLATE, pillar))
    }

    pub fn to_chart(&self) -> Vec<ChartDatum> {
        self.pillars
            .iter()
            .map(|insight| ChartDatum {
                name: insight.pillar.label().to_string(),
                value: insight.average,
                color: pillar_color(insight.pillar),
                percent: None,
            })
            .collect()
    }
}

pub fn compute_pillar_averages<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> PillarAverages {
    let mut sums = [0.0_f64; 3];
    let mut count = 0_usize;
    for task in tasks {
        for pillar in Pillar::ALL {
            sums[pillar_index(pillar)] += f64::from(task.scores.get(pillar));
        }
        count += 1;
    }
    if count == 0 {
        return PillarAverages::insufficient();
    }
    let averages = sums.map(|sum| sum / count as f64);
    PillarAverages::from_averages(averages, count)
}

/// Resolves `(highest, lowest)` from averages in declaration order.
pub fn resolve_extremes(averages: [f64; 3]) -> (Option<Pillar>, Option<Pillar>) {
    let mut max = Pillar::Consequence;
    let mut min = Pillar::Consequence;
    for pillar in Pillar::ALL {
        let value = averages[pillar_index(pillar)];
        if value > averages[pillar_index(max)] {
            max = pillar;
        }
        if value < averages[pillar_index(min)] {
            min = pillar;
        }
    }

    let spread = averages[pillar_index(max)] - averages[pillar_index(min)];
    let neglected = averages
        .iter()
        .filter(|average| PillarClass::classify(**average) == PillarClass::Neglected)
        .count();
    let distinct = spread >= SPREAD_MARGIN;

    let highest = if neglected > 1 || !distinct {
        None
    } else {
        Some(max)
    };
    let lowest = if neglected > 0 || distinct {
        Some(min)
    } else {
        None
    };
    (highest, lowest)
}

fn pillar_index(pillar: Pillar) -> usize {
    match pillar {
        Pillar::Consequence => 0,
        Pillar::Pride => 1,
        Pillar::Construction => 2,
    }
}
