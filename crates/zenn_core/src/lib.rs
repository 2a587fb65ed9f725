//! Core domain logic for Zenn.
//! This crate owns task invariants, insight aggregation and the optimistic
//! mutation protocol; views and the hosted backend live elsewhere.

pub mod cache;
pub mod config;
pub mod db;
pub mod insight;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use cache::transition::{MutationKind, Transition, TransitionState};
pub use cache::{CacheKey, TaskCache, TaskSnapshot};
pub use config::{ConfigError, CoordinatorConfig};
pub use insight::{
    compute_feedback_distribution, compute_pillar_averages, compute_score_zones,
    filter_by_date_window, ChartDatum, DateWindow, FeedbackDistribution, FeedbackNarrative,
    InsightReport, PillarAverages, PillarClass, ScoreZone, ZoneCounts,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::comment::{Comment, CommentId};
pub use model::task::{
    Feedback, Pillar, PillarScores, Task, TaskId, TaskValidationError, UserId,
};
pub use service::auth::{AuthProvider, AuthState, StaticAuth};
pub use service::mutation::{
    MutationError, MutationOutcome, RestorePlan, Settled, TaskMutationCoordinator,
};
pub use service::notify::{LogNotifier, MemoryNotifier, Notification, NotificationLevel, Notifier};
pub use store::{
    CompletionFilter, FetchedTask, NewTask, SqliteTaskStore, StoreError, StoreResult, TaskPatch,
    TaskStore,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
