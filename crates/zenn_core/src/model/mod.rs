//! Domain model for tasks and their comments.
//!
//! # Responsibility
//! - Define canonical data structures shared by store, cache and insights.
//! - Keep UI-only transition state out of persisted shapes (see `cache`).
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId` owned by one user.
//! - Comments are owned 1:N by a task.

pub mod comment;
pub mod task;
