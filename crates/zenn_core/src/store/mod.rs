//! Remote task store contract.
//!
//! # Responsibility
//! - Define the request/response surface the mutation coordinator relies on.
//! - Keep wire and persistence details behind the `TaskStore` trait.
//!
//! # Invariants
//! - Every mutation returns the authoritative record (or an error).
//! - `fetch_tasks` returns tasks together with their nested comments.
//! - Stores recompute `total_score` from pillar scores on every write.

pub mod sqlite_store;

use crate::db::DbError;
use crate::model::comment::Comment;
use crate::model::task::{Feedback, PillarScores, Task, TaskValidationError};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub use sqlite_store::SqliteTaskStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by task store implementations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    Validation(TaskValidationError),
    InvalidData(String),
    /// The store did not answer within the coordinator deadline.
    Timeout(Duration),
    /// Transport-level failure reported by a remote store.
    Unavailable(String),
}

impl StoreError {
    /// Stable short code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(err) => err.code(),
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::InvalidData(_) => "invalid_data",
            Self::Timeout(_) => "timeout",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::Timeout(after) => {
                write!(f, "task store timed out after {} ms", after.as_millis())
            }
            Self::Unavailable(message) => write!(f, "task store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Completion filter used both for fetching and for cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompletionFilter {
    All,
    Open,
    Completed,
}

impl CompletionFilter {
    pub fn admits(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Open => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

/// Task as returned by `fetch_tasks`, with its comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTask {
    pub task: Task,
    pub comments: Vec<Comment>,
}

/// Input for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub scores: PillarScores,
    pub ideal_date: Option<NaiveDate>,
}

/// Partial update of task fields.
///
/// `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub scores: Option<PillarScores>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<String>>,
    pub hidden: Option<bool>,
    pub ideal_date: Option<Option<NaiveDate>>,
    pub feedback: Option<Option<Feedback>>,
}

impl TaskPatch {
    /// Applies the patch in place. Used both for the optimistic prediction
    /// and by stores, so both sides agree on the resulting record.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(scores) = self.scores {
            task.set_scores(scores);
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(completed_at) = &self.completed_at {
            task.completed_at = completed_at.clone();
        }
        if let Some(hidden) = self.hidden {
            task.hidden = hidden;
        }
        if let Some(ideal_date) = self.ideal_date {
            task.ideal_date = ideal_date;
        }
        if let Some(feedback) = self.feedback {
            task.feedback = feedback;
        }
    }
}

/// Request/response contract of the remote task store.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    async fn fetch_tasks(
        &self,
        user_id: &str,
        filter: CompletionFilter,
    ) -> StoreResult<Vec<FetchedTask>>;
    async fn create_task(&self, user_id: &str, task: &NewTask) -> StoreResult<Task>;
    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task>;
    async fn delete_task(&self, task_id: &str) -> StoreResult<()>;
    async fn add_comment(&self, task_id: &str, text: &str) -> StoreResult<Comment>;
    async fn delete_comment(&self, comment_id: &str) -> StoreResult<()>;
}

impl<S: TaskStore> TaskStore for Arc<S> {
    async fn fetch_tasks(
        &self,
        user_id: &str,
        filter: CompletionFilter,
    ) -> StoreResult<Vec<FetchedTask>> {
        (**self).fetch_tasks(user_id, filter).await
    }

    async fn create_task(&self, user_id: &str, task: &NewTask) -> StoreResult<Task> {
        (**self).create_task(user_id, task).await
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        (**self).update_task(task_id, patch).await
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        (**self).delete_task(task_id).await
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> StoreResult<Comment> {
        (**self).add_comment(task_id, text).await
    }

    async fn delete_comment(&self, comment_id: &str) -> StoreResult<()> {
        (**self).delete_comment(comment_id).await
    }
}
