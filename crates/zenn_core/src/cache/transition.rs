//! Ephemeral per-task transition side table.
//!
//! # Responsibility
//! - Track which tasks have a mutation in flight or an exit animation
//!   running, without touching the persisted `Task` shape.
//!
//! # Invariants
//! - Entries are process-memory only and never serialized.
//! - At most one entry per task id (same-id mutations are serialized).

use crate::model::task::TaskId;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use tokio::time::Instant;

/// Kind of state-changing operation on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ToggleComplete,
    ToggleHidden,
    SetFeedback,
    Restore,
    AddComment,
    DeleteComment,
    CreateTask,
    DeleteTask,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToggleComplete => "toggle_complete",
            Self::ToggleHidden => "toggle_hidden",
            Self::SetFeedback => "set_feedback",
            Self::Restore => "restore",
            Self::AddComment => "add_comment",
            Self::DeleteComment => "delete_comment",
            Self::CreateTask => "create_task",
            Self::DeleteTask => "delete_task",
        }
    }
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    /// Optimistic state applied, remote call in flight.
    Pending,
    /// Remote call settled; the row is playing its exit animation.
    ExitAnimating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub op: MutationKind,
    pub state: TransitionState,
    /// When the optimistic state was applied.
    pub since: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct TransitionTable {
    entries: HashMap<TaskId, Transition>,
}

impl TransitionTable {
    pub(crate) fn begin(&mut self, task_id: &str, op: MutationKind) {
        self.entries.insert(
            task_id.to_string(),
            Transition {
                op,
                state: TransitionState::Pending,
                since: Instant::now(),
            },
        );
    }

    pub(crate) fn set_state(&mut self, task_id: &str, state: TransitionState) {
        if let Some(entry) = self.entries.get_mut(task_id) {
            entry.state = state;
        }
    }

    pub(crate) fn finish(&mut self, task_id: &str) -> bool {
        self.entries.remove(task_id).is_some()
    }

    pub(crate) fn get(&self, task_id: &str) -> Option<Transition> {
        self.entries.get(task_id).copied()
    }

    /// True while a hide toggle on the task is pending or animating out.
    pub(crate) fn is_hiding(&self, task_id: &str) -> bool {
        self.entries
            .get(task_id)
            .is_some_and(|entry| entry.op == MutationKind::ToggleHidden)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
