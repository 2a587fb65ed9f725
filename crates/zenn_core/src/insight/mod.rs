//! Insight engine: pure aggregation over task lists.
//!
//! # Responsibility
//! - Turn a task collection plus a date window into pillar averages, a
//!   feedback distribution and a score-zone histogram.
//! - Produce plain chart series and fixed narrative sentences.
//!
//! # Invariants
//! - Functions are deterministic and never write to the task collection.
//! - Data-shape problems (missing scores, unparsable dates) degrade to safe
//!   defaults instead of failing.

pub mod chart;
pub mod feedback;
pub mod narrative;
pub mod pillars;
pub mod report;
pub mod window;
pub mod zones;

pub use chart::ChartDatum;
pub use feedback::{compute_feedback_distribution, FeedbackDistribution, FeedbackNarrative};
pub use pillars::{compute_pillar_averages, PillarAverages, PillarClass, PillarInsight};
pub use report::InsightReport;
pub use window::{filter_by_date_window, DateWindow, WindowedTasks};
pub use zones::{compute_score_zones, ScoreZone, ZoneCounts};
