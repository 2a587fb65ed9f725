//! Optimistic task mutation coordinator.
//!
//! # Responsibility
//! - Apply predicted task state to the shared cache before the remote call.
//! - Reconcile with the store's record on success, restore the snapshot on
//!   failure, and notify the user either way.
//!
//! # Invariants
//! - Precondition failures (auth, missing task, validation) return `Err` and
//!   never touch the cache.
//! - Remote failures always roll back fully and resolve to
//!   `Settled::RolledBack`; they are never returned as `Err`.
//! - Operations on the same task id are serialized; the snapshot is taken
//!   after earlier operations on that task have settled.
//! - The transition entry of a task is cleared on every exit path.
//! - Hiding a task waits `exit_animation_delay` before the reconciled record
//!   lands; showing reconciles immediately.

use crate::cache::transition::MutationKind;
use crate::cache::{CacheKey, TaskCache, TaskSnapshot};
use crate::config::CoordinatorConfig;
use crate::model::comment::{normalize_comment_text, Comment, CommentId};
use crate::model::task::{
    format_timestamp, validate_scores, Feedback, Task, TaskId, TaskValidationError, UserId,
};
use crate::service::auth::{AuthProvider, AuthState};
use crate::service::notify::{
    error_message, success_message, Notification, NotificationLevel, Notifier,
};
use crate::service::queue::TaskQueues;
use crate::store::{CompletionFilter, NewTask, StoreError, StoreResult, TaskPatch, TaskStore};
use chrono::{Local, NaiveDate, Utc};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;

/// Precondition failures, raised before any optimistic change.
#[derive(Debug)]
pub enum MutationError {
    /// No signed-in user.
    Unauthenticated,
    /// Session restoration has not finished yet.
    AuthLoading,
    /// Task id is not in the local cache.
    TaskNotFound(TaskId),
    /// Comment id is not in the task's cached comment list.
    CommentNotFound {
        task_id: TaskId,
        comment_id: CommentId,
    },
    /// Comment text is blank after trimming.
    EmptyComment,
    /// Operation requires a completed task.
    TaskNotCompleted(TaskId),
    /// New task input is invalid.
    InvalidTask(TaskValidationError),
    /// Initial fetch failed; nothing was applied.
    Load(StoreError),
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "no signed-in user"),
            Self::AuthLoading => write!(f, "session is still loading"),
            Self::TaskNotFound(id) => write!(f, "task not found in cache: {id}"),
            Self::CommentNotFound {
                task_id,
                comment_id,
            } => write!(f, "comment {comment_id} not found on task {task_id}"),
            Self::EmptyComment => write!(f, "comment must not be empty"),
            Self::TaskNotCompleted(id) => write!(f, "task is not completed: {id}"),
            Self::InvalidTask(err) => write!(f, "{err}"),
            Self::Load(err) => write!(f, "could not load tasks: {err}"),
        }
    }
}

impl Error for MutationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTask(err) => Some(err),
            Self::Load(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for MutationError {
    fn from(value: TaskValidationError) -> Self {
        Self::InvalidTask(value)
    }
}

/// How a mutation ended once the remote call settled.
#[derive(Debug)]
pub enum Settled<T> {
    Success(T),
    RolledBack(StoreError),
}

impl<T> Settled<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::RolledBack(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Success(_) => None,
            Self::RolledBack(err) => Some(err),
        }
    }
}

#[derive(Debug)]
pub struct MutationOutcome<T> {
    pub op: MutationKind,
    pub task_id: TaskId,
    pub settlement: Settled<T>,
}

impl<T> MutationOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.settlement.is_success()
    }
}

/// What `restore` will change, shown to the user before confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    pub task_id: TaskId,
    /// Set when restoring will schedule the task for this date.
    pub assigns_ideal_date: Option<NaiveDate>,
    pub notice: String,
}

/// Coordinates optimistic task mutations against a `TaskStore`.
pub struct TaskMutationCoordinator<S: TaskStore> {
    store: S,
    cache: Arc<TaskCache>,
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    config: CoordinatorConfig,
    queues: TaskQueues,
}

impl<S: TaskStore> TaskMutationCoordinator<S> {
    pub fn new(
        store: S,
        cache: Arc<TaskCache>,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            cache,
            auth,
            notifier,
            config,
            queues: TaskQueues::default(),
        }
    }

    pub fn cache(&self) -> &Arc<TaskCache> {
        &self.cache
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Drops cached data for the signed-out user.
    pub fn end_session(&self) {
        self.cache.clear();
    }

    /// Fetches one completion-filtered collection into the cache.
    pub async fn load_tasks(&self, filter: CompletionFilter) -> Result<usize, MutationError> {
        let user_id = self.require_user()?;
        let fetched = self
            .with_deadline(self.store.fetch_tasks(&user_id, filter))
            .await
            .map_err(|err| {
                error!(
                    "event=task_load module=service status=error filter={filter:?} error_code={} error={err}",
                    err.code()
                );
                MutationError::Load(err)
            })?;
        let count = fetched.len();
        self.cache
            .replace_collection(CacheKey::new(user_id, filter), fetched);
        info!("event=task_load module=service status=ok filter={filter:?} count={count}");
        Ok(count)
    }

    /// Flips `completed`, setting or clearing `completed_at` with it.
    pub async fn toggle_complete(
        &self,
        task_id: &str,
    ) -> Result<MutationOutcome<Task>, MutationError> {
        self.mutate_task(MutationKind::ToggleComplete, task_id, |task| {
            Ok(if task.completed {
                reopen_patch()
            } else {
                TaskPatch {
                    completed: Some(true),
                    completed_at: Some(Some(format_timestamp(Utc::now()))),
                    ..TaskPatch::default()
                }
            })
        })
        .await
    }

    /// Flips `hidden`.
    pub async fn toggle_hidden(
        &self,
        task_id: &str,
    ) -> Result<MutationOutcome<Task>, MutationError> {
        self.mutate_task(MutationKind::ToggleHidden, task_id, |task| {
            Ok(TaskPatch {
                hidden: Some(!task.hidden),
                ..TaskPatch::default()
            })
        })
        .await
    }

    /// Sets or clears feedback on a completed task.
    pub async fn set_feedback(
        &self,
        task_id: &str,
        feedback: Option<Feedback>,
    ) -> Result<MutationOutcome<Task>, MutationError> {
        self.mutate_task(MutationKind::SetFeedback, task_id, |task| {
            if !task.completed {
                return Err(MutationError::TaskNotCompleted(task.id.clone()));
            }
            Ok(TaskPatch {
                feedback: Some(feedback),
                ..TaskPatch::default()
            })
        })
        .await
    }

    /// Describes the side effects of `restore` without applying anything.
    pub fn plan_restore(&self, task_id: &str) -> Result<RestorePlan, MutationError> {
        let user_id = self.require_user()?;
        let task = self
            .cache
            .find_task(&user_id, task_id)
            .ok_or_else(|| MutationError::TaskNotFound(task_id.to_string()))?;
        if !task.completed {
            return Err(MutationError::TaskNotCompleted(task.id));
        }
        let assigns_ideal_date = match task.ideal_date {
            Some(_) => None,
            None => Some(today()),
        };
        let notice = match assigns_ideal_date {
            Some(date) => format!(
                "The task goes back to your list and will be planned for today ({}).",
                date.format("%Y-%m-%d")
            ),
            None => "The task goes back to your list.".to_string(),
        };
        Ok(RestorePlan {
            task_id: task.id,
            assigns_ideal_date,
            notice,
        })
    }

    /// Moves a completed task back to the open list.
    ///
    /// Defaults `ideal_date` to today when the task had none.
    pub async fn restore(&self, task_id: &str) -> Result<MutationOutcome<Task>, MutationError> {
        self.mutate_task(MutationKind::Restore, task_id, |task| {
            if !task.completed {
                return Err(MutationError::TaskNotCompleted(task.id.clone()));
            }
            let mut patch = reopen_patch();
            if task.ideal_date.is_none() {
                patch.ideal_date = Some(Some(today()));
            }
            Ok(patch)
        })
        .await
    }

    /// Creates a task; it enters the cache once the store confirms it.
    pub async fn create_task(&self, input: NewTask) -> Result<Settled<Task>, MutationError> {
        let user_id = self.require_user()?;
        if input.title.trim().is_empty() {
            return Err(MutationError::InvalidTask(TaskValidationError::BlankTitle));
        }
        validate_scores(&input.scores)?;

        let op = MutationKind::CreateTask;
        match self
            .with_deadline(self.store.create_task(&user_id, &input))
            .await
        {
            Ok(task) => {
                self.cache.insert_task(&task);
                self.report_success(op, &task.id, Some(&task));
                Ok(Settled::Success(task))
            }
            Err(err) => {
                self.report_failure(op, None, &err);
                Ok(Settled::RolledBack(err))
            }
        }
    }

    /// Removes a task and its comments, restoring both if the store refuses.
    pub async fn delete_task(&self, task_id: &str) -> Result<MutationOutcome<()>, MutationError> {
        let op = MutationKind::DeleteTask;
        let user_id = self.require_user()?;
        let _permit = self.queues.acquire(task_id).await;
        let snapshot = self.snapshot(&user_id, task_id)?;

        let _transition = self.cache.begin_transition(task_id, op);
        self.cache.remove_task(&user_id, task_id);
        debug!("event=mutation module=service status=pending op={op} task_id={task_id}");

        let settlement = match self.with_deadline(self.store.delete_task(task_id)).await {
            Ok(()) => {
                self.report_success(op, task_id, None);
                Settled::Success(())
            }
            Err(err) => {
                self.cache.restore_task(&snapshot);
                self.report_failure(op, Some(task_id), &err);
                Settled::RolledBack(err)
            }
        };
        Ok(outcome(op, task_id, settlement))
    }

    /// Adds a comment, showing it immediately under a temporary id.
    pub async fn add_comment(
        &self,
        task_id: &str,
        text: &str,
    ) -> Result<MutationOutcome<Comment>, MutationError> {
        let op = MutationKind::AddComment;
        let user_id = self.require_user()?;
        let text = normalize_comment_text(text).ok_or(MutationError::EmptyComment)?;
        let _permit = self.queues.acquire(task_id).await;
        self.require_task(&user_id, task_id)?;

        let previous = self.cache.comments(task_id);
        let placeholder = Comment::placeholder(task_id, text.as_str());
        let temporary_id = placeholder.id.clone();

        let _transition = self.cache.begin_transition(task_id, op);
        self.cache.push_comment(placeholder);
        debug!("event=mutation module=service status=pending op={op} task_id={task_id}");

        let settlement = match self
            .with_deadline(self.store.add_comment(task_id, &text))
            .await
        {
            Ok(comment) => {
                self.cache.replace_comment(&temporary_id, comment.clone());
                self.report_success(op, task_id, None);
                Settled::Success(comment)
            }
            Err(err) => {
                self.cache.restore_comments(task_id, previous);
                self.report_failure(op, Some(task_id), &err);
                Settled::RolledBack(err)
            }
        };
        Ok(outcome(op, task_id, settlement))
    }

    /// Deletes a comment; on failure it returns to its original position.
    pub async fn delete_comment(
        &self,
        task_id: &str,
        comment_id: &str,
    ) -> Result<MutationOutcome<()>, MutationError> {
        let op = MutationKind::DeleteComment;
        let user_id = self.require_user()?;
        let _permit = self.queues.acquire(task_id).await;
        self.require_task(&user_id, task_id)?;

        let previous = self.cache.comments(task_id);
        if !previous.iter().any(|comment| comment.id == comment_id) {
            return Err(MutationError::CommentNotFound {
                task_id: task_id.to_string(),
                comment_id: comment_id.to_string(),
            });
        }

        let _transition = self.cache.begin_transition(task_id, op);
        self.cache.remove_comment(task_id, comment_id);
        debug!("event=mutation module=service status=pending op={op} task_id={task_id}");

        let settlement = match self
            .with_deadline(self.store.delete_comment(comment_id))
            .await
        {
            Ok(()) => {
                self.report_success(op, task_id, None);
                Settled::Success(())
            }
            Err(err) => {
                self.cache.restore_comments(task_id, previous);
                self.report_failure(op, Some(task_id), &err);
                Settled::RolledBack(err)
            }
        };
        Ok(outcome(op, task_id, settlement))
    }

    /// Shared lifecycle for task field updates.
    ///
    /// `build` sees the task as it is after earlier queued operations and
    /// returns the patch to predict and send, or a precondition error.
    async fn mutate_task(
        &self,
        op: MutationKind,
        task_id: &str,
        build: impl FnOnce(&Task) -> Result<TaskPatch, MutationError>,
    ) -> Result<MutationOutcome<Task>, MutationError> {
        let user_id = self.require_user()?;
        let _permit = self.queues.acquire(task_id).await;
        let snapshot = self.snapshot(&user_id, task_id)?;
        let Some(before) = snapshot.task() else {
            return Err(MutationError::TaskNotFound(task_id.to_string()));
        };
        let patch = build(before)?;
        let was_hidden = before.hidden;

        let transition = self.cache.begin_transition(task_id, op);
        self.cache.apply_patch(&user_id, task_id, &patch);
        debug!("event=mutation module=service status=pending op={op} task_id={task_id}");

        let settlement = match self
            .with_deadline(self.store.update_task(task_id, &patch))
            .await
        {
            Ok(task) => {
                if task.hidden && !was_hidden {
                    transition.mark_exit_animating();
                    tokio::time::sleep(self.config.exit_animation_delay).await;
                }
                self.cache.reconcile_task(&task);
                self.report_success(op, task_id, Some(&task));
                Settled::Success(task)
            }
            Err(err) => {
                self.cache.restore_task(&snapshot);
                self.report_failure(op, Some(task_id), &err);
                Settled::RolledBack(err)
            }
        };
        drop(transition);
        Ok(outcome(op, task_id, settlement))
    }

    fn require_user(&self) -> Result<UserId, MutationError> {
        match self.auth.auth_state() {
            AuthState::Authenticated(user_id) => {
                if self.cache.session_user().as_deref() != Some(user_id.as_str()) {
                    self.cache.start_session(user_id.clone());
                }
                Ok(user_id)
            }
            AuthState::Loading => Err(MutationError::AuthLoading),
            AuthState::Anonymous => Err(MutationError::Unauthenticated),
        }
    }

    fn require_task(&self, user_id: &str, task_id: &str) -> Result<Task, MutationError> {
        self.cache
            .find_task(user_id, task_id)
            .ok_or_else(|| MutationError::TaskNotFound(task_id.to_string()))
    }

    fn snapshot(&self, user_id: &str, task_id: &str) -> Result<TaskSnapshot, MutationError> {
        self.cache
            .snapshot_task(user_id, task_id)
            .ok_or_else(|| MutationError::TaskNotFound(task_id.to_string()))
    }

    async fn with_deadline<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        let limit = self.config.remote_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(limit)),
        }
    }

    fn report_success(&self, op: MutationKind, task_id: &str, task: Option<&Task>) {
        info!("event=mutation module=service status=ok op={op} task_id={task_id}");
        self.notifier.notify(&Notification {
            level: NotificationLevel::Success,
            op,
            task_id: Some(task_id.to_string()),
            message: success_message(op, task).to_string(),
        });
    }

    fn report_failure(&self, op: MutationKind, task_id: Option<&str>, err: &StoreError) {
        error!(
            "event=mutation module=service status=rolled_back op={op} task_id={} error_code={} error={err}",
            task_id.unwrap_or("-"),
            err.code()
        );
        self.notifier.notify(&Notification {
            level: NotificationLevel::Error,
            op,
            task_id: task_id.map(str::to_string),
            message: error_message(op).to_string(),
        });
    }
}

fn reopen_patch() -> TaskPatch {
    TaskPatch {
        completed: Some(false),
        completed_at: Some(None),
        ..TaskPatch::default()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn outcome<T>(op: MutationKind, task_id: &str, settlement: Settled<T>) -> MutationOutcome<T> {
    MutationOutcome {
        op,
        task_id: task_id.to_string(),
        settlement,
    }
}
