//! Comment domain model.
//!
//! # Invariants
//! - A comment belongs to exactly one task through `task_id`.
//! - Ids with the `tmp-` prefix are client-generated placeholders and are
//!   never issued by the task store.

use crate::model::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CommentId = String;

const TEMPORARY_ID_PREFIX: &str = "tmp-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Builds an optimistic placeholder with a temporary id.
    pub fn placeholder(task_id: impl Into<TaskId>, text: impl Into<String>) -> Self {
        Self {
            id: format!("{TEMPORARY_ID_PREFIX}{}", Uuid::new_v4()),
            task_id: task_id.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        is_temporary_id(&self.id)
    }
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMPORARY_ID_PREFIX)
}

/// Trims comment input; `None` when nothing remains.
pub fn normalize_comment_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
