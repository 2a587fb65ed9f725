//! User-facing notifications for settled mutations.
//!
//! # Invariants
//! - Every settled error yields a short message distinct per operation kind.
//! - Messages are plain language and carry no internal error detail.

use crate::cache::transition::MutationKind;
use crate::model::task::{Task, TaskId};
use log::{info, warn};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub op: MutationKind,
    pub task_id: Option<TaskId>,
    pub message: String,
}

/// Toast-equivalent sink owned by the presentation layer.
pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log; used when no UI sink is attached.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Success => info!(
                "event=notify module=service status=success op={} message={}",
                notification.op, notification.message
            ),
            NotificationLevel::Error => warn!(
                "event=notify module=service status=error op={} message={}",
                notification.op, notification.message
            ),
        }
    }
}

/// Keeps notifications in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.received.lock())
    }

    pub fn messages(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .map(|notification| notification.message.clone())
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) {
        self.received.lock().push(notification.clone());
    }
}

/// Error text per operation kind.
pub fn error_message(op: MutationKind) -> &'static str {
    match op {
        MutationKind::ToggleComplete => "Could not update the task status.",
        MutationKind::ToggleHidden => "Could not update visibility.",
        MutationKind::SetFeedback => "Could not save your feedback.",
        MutationKind::Restore => "Could not restore the task.",
        MutationKind::AddComment => "Could not add the comment.",
        MutationKind::DeleteComment => "Could not delete the comment.",
        MutationKind::CreateTask => "Could not create the task.",
        MutationKind::DeleteTask => "Could not delete the task.",
    }
}

/// Confirmation text describing the new state.
///
/// `task` is the reconciled record for task-level operations.
pub fn success_message(op: MutationKind, task: Option<&Task>) -> &'static str {
    match (op, task) {
        (MutationKind::ToggleComplete, Some(task)) if task.completed => "Task completed.",
        (MutationKind::ToggleComplete, _) => "Task moved back to your list.",
        (MutationKind::ToggleHidden, Some(task)) if task.hidden => "Task hidden.",
        (MutationKind::ToggleHidden, _) => "Task is visible again.",
        (MutationKind::SetFeedback, Some(task)) if task.feedback.is_none() => {
            "Feedback cleared."
        }
        (MutationKind::SetFeedback, _) => "Feedback saved.",
        (MutationKind::Restore, _) => "Task restored to your list.",
        (MutationKind::AddComment, _) => "Comment added.",
        (MutationKind::DeleteComment, _) => "Comment deleted.",
        (MutationKind::CreateTask, _) => "Task created.",
        (MutationKind::DeleteTask, _) => "Task deleted.",
    }
}
