//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task shape shared by store, cache and insights.
//! - Provide pillar-score helpers (`total`, `dominant`) and lifecycle
//!   transitions that keep `completed` and `completed_at` paired.
//!
//! # Invariants
//! - `total_score()` is always derived from the three pillar scores.
//! - `completed_at.is_some() == completed` for valid tasks.
//! - `feedback` is only meaningful while `completed` is true.
//! - `hidden` and `completed` are independent flags.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable task identifier as issued by the task store.
pub type TaskId = String;

/// Owner identity supplied by the auth collaborator.
pub type UserId = String;

pub const MIN_PILLAR_SCORE: u8 = 1;
pub const MAX_PILLAR_SCORE: u8 = 5;

/// One of the three scored dimensions of a task.
///
/// Declaration order is significant: it is the tie-break order used by
/// dominant-pillar and highest/lowest resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    /// Consequence / risk of not doing the task.
    Consequence,
    /// Pride felt once the task is done.
    Pride,
    /// Construction: personal growth the task brings.
    Construction,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [Pillar::Consequence, Pillar::Pride, Pillar::Construction];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consequence => "consequence",
            Self::Pride => "pride",
            Self::Construction => "construction",
        }
    }

    /// Human-facing label used in narratives and chart series.
    pub fn label(self) -> &'static str {
        match self {
            Self::Consequence => "Consequence",
            Self::Pride => "Pride",
            Self::Construction => "Construction",
        }
    }
}

/// Post-completion subjective tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Transformed,
    Relief,
    Obligation,
}

impl Feedback {
    pub const ALL: [Feedback; 3] = [Feedback::Transformed, Feedback::Relief, Feedback::Obligation];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transformed => "transformed",
            Self::Relief => "relief",
            Self::Obligation => "obligation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "transformed" => Some(Self::Transformed),
            "relief" => Some(Self::Relief),
            "obligation" => Some(Self::Obligation),
            _ => None,
        }
    }
}

/// Pillar scores of one task.
///
/// Missing values deserialize as `0` so partial records coming from the
/// store degrade instead of failing; `Task::validate` rejects them on writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarScores {
    #[serde(default, rename = "consequence_score")]
    pub consequence: u8,
    #[serde(default, rename = "pride_score")]
    pub pride: u8,
    #[serde(default, rename = "construction_score")]
    pub construction: u8,
}

impl PillarScores {
    pub fn new(consequence: u8, pride: u8, construction: u8) -> Self {
        Self {
            consequence,
            pride,
            construction,
        }
    }

    pub fn get(&self, pillar: Pillar) -> u8 {
        match pillar {
            Pillar::Consequence => self.consequence,
            Pillar::Pride => self.pride,
            Pillar::Construction => self.construction,
        }
    }

    /// Sum of the three pillar scores.
    pub fn total(&self) -> u16 {
        u16::from(self.consequence) + u16::from(self.pride) + u16::from(self.construction)
    }

    /// Pillar with the highest score, first in declaration order on ties.
    pub fn dominant(&self) -> Pillar {
        let mut best = Pillar::Consequence;
        for pillar in Pillar::ALL {
            if self.get(pillar) > self.get(best) {
                best = pillar;
            }
        }
        best
    }
}

/// Validation errors for task write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankTitle,
    ScoreOutOfRange { pillar: Pillar, value: u8 },
    CompletedAtMismatch { completed: bool },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::ScoreOutOfRange { pillar, value } => write!(
                f,
                "{} score {value} must be within {MIN_PILLAR_SCORE}..={MAX_PILLAR_SCORE}",
                pillar.as_str()
            ),
            Self::CompletedAtMismatch { completed: true } => {
                write!(f, "completed task must carry completed_at")
            }
            Self::CompletedAtMismatch { completed: false } => {
                write!(f, "incomplete task must not carry completed_at")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub scores: PillarScores,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub ideal_date: Option<NaiveDate>,
    /// Raw timestamp as delivered by the store; see `completed_at_time`.
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

impl Task {
    /// Creates an incomplete, visible task with a generated id.
    pub fn new(user_id: impl Into<UserId>, title: impl Into<String>, scores: PillarScores) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            created_at: Utc::now(),
            scores,
            completed: false,
            hidden: false,
            ideal_date: None,
            completed_at: None,
            feedback: None,
        }
    }

    pub fn total_score(&self) -> u16 {
        self.scores.total()
    }

    pub fn dominant_pillar(&self) -> Pillar {
        self.scores.dominant()
    }

    /// Replaces all pillar scores at once.
    pub fn set_scores(&mut self, scores: PillarScores) {
        self.scores = scores;
    }

    /// Parsed completion time, `None` when absent or unparsable.
    pub fn completed_at_time(&self) -> Option<DateTime<Utc>> {
        self.completed_at.as_deref().and_then(parse_timestamp)
    }

    /// Feedback as the UI sees it: absent unless the task is completed.
    pub fn effective_feedback(&self) -> Option<Feedback> {
        if self.completed {
            self.feedback
        } else {
            None
        }
    }

    /// Marks the task completed at `at`.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(format_timestamp(at));
    }

    /// Returns the task to the open list, clearing `completed_at`.
    pub fn mark_open(&mut self) {
        self.completed = false;
        self.completed_at = None;
    }

    /// Validates write-path invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        validate_scores(&self.scores)?;
        if self.completed != self.completed_at.is_some() {
            return Err(TaskValidationError::CompletedAtMismatch {
                completed: self.completed,
            });
        }
        Ok(())
    }
}

pub fn validate_scores(scores: &PillarScores) -> Result<(), TaskValidationError> {
    for pillar in Pillar::ALL {
        let value = scores.get(pillar);
        if !(MIN_PILLAR_SCORE..=MAX_PILLAR_SCORE).contains(&value) {
            return Err(TaskValidationError::ScoreOutOfRange { pillar, value });
        }
    }
    Ok(())
}

/// Canonical wire form for timestamps written by this crate.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lenient timestamp parser.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (or with a space
/// separator) interpreted as UTC, and a bare `YYYY-MM-DD` as midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc())
}
