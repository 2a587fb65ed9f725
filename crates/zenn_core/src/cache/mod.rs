//! Session-scoped client cache of tasks and comments.
//!
//! # Responsibility
//! - Hold the task collections shared by the mutation coordinator (writer)
//!   and insight callers (readers).
//! - Provide snapshot / restore primitives for optimistic rollback.
//! - Keep UI transition state in a side table, apart from task records.
//!
//! # Invariants
//! - Collections are keyed by `(user_id, completion filter)`; comment lists
//!   by task id.
//! - Every write bumps `revision()`, so readers can tell when to recompute.
//! - The internal lock is never held across an `.await`.
//! - `clear()` drops everything, including the session user.

pub mod transition;

use crate::model::comment::Comment;
use crate::model::task::{Task, TaskId, UserId};
use crate::store::{CompletionFilter, FetchedTask, TaskPatch};
use log::info;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use transition::{MutationKind, Transition, TransitionState, TransitionTable};

/// Identifies one cached task collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub user_id: UserId,
    pub filter: CompletionFilter,
}

impl CacheKey {
    pub fn new(user_id: impl Into<UserId>, filter: CompletionFilter) -> Self {
        Self {
            user_id: user_id.into(),
            filter,
        }
    }
}

/// Pre-operation copy of one task in every collection that held it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub user_id: UserId,
    /// `(collection, index, record)` for each collection containing the task.
    pub entries: Vec<(CacheKey, usize, Task)>,
    /// Comment list of the task, when one is cached.
    pub comments: Option<Vec<Comment>>,
}

impl TaskSnapshot {
    /// Any copy of the record; all copies are identical.
    pub fn task(&self) -> Option<&Task> {
        self.entries.first().map(|(_, _, task)| task)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    session_user: Option<UserId>,
    collections: BTreeMap<CacheKey, Vec<Task>>,
    comments: HashMap<TaskId, Vec<Comment>>,
    transitions: TransitionTable,
    revision: u64,
}

impl CacheState {
    fn touch(&mut self) {
        self.revision += 1;
    }

    fn user_collections_mut<'a>(
        &'a mut self,
        user_id: &'a str,
    ) -> impl Iterator<Item = (&'a CacheKey, &'a mut Vec<Task>)> + 'a {
        self.collections
            .iter_mut()
            .filter(move |(key, _)| key.user_id == user_id)
    }
}

/// Shared task cache; wrap in `Arc` to share between coordinator and views.
#[derive(Debug, Default)]
pub struct TaskCache {
    state: Mutex<CacheState>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the cache to a signed-in user, dropping another user's data.
    pub fn start_session(&self, user_id: impl Into<UserId>) {
        let user_id = user_id.into();
        let mut state = self.state.lock();
        if state.session_user.as_deref() == Some(user_id.as_str()) {
            return;
        }
        let revision = state.revision;
        *state = CacheState {
            session_user: Some(user_id),
            revision: revision + 1,
            ..CacheState::default()
        };
        info!("event=cache_session module=cache status=start");
    }

    /// Drops all cached data; called on logout.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let revision = state.revision;
        *state = CacheState {
            revision: revision + 1,
            ..CacheState::default()
        };
        info!("event=cache_session module=cache status=cleared");
    }

    pub fn session_user(&self) -> Option<UserId> {
        self.state.lock().session_user.clone()
    }

    /// Monotonic write counter.
    pub fn revision(&self) -> u64 {
        self.state.lock().revision
    }

    /// Replaces one collection (and its tasks' comment lists) with fetched data.
    pub fn replace_collection(&self, key: CacheKey, fetched: Vec<FetchedTask>) {
        let mut state = self.state.lock();
        let mut tasks = Vec::with_capacity(fetched.len());
        for FetchedTask { task, comments } in fetched {
            state.comments.insert(task.id.clone(), comments);
            tasks.push(task);
        }
        state.collections.insert(key, tasks);
        state.touch();
    }

    pub fn has_collection(&self, key: &CacheKey) -> bool {
        self.state.lock().collections.contains_key(key)
    }

    /// Tasks of one collection, `None` when it was never loaded.
    pub fn tasks(&self, key: &CacheKey) -> Option<Vec<Task>> {
        self.state.lock().collections.get(key).cloned()
    }

    /// Tasks of one collection as a list view renders them: hidden tasks are
    /// dropped unless they are still in their hide transition.
    pub fn visible_tasks(&self, key: &CacheKey) -> Vec<Task> {
        let state = self.state.lock();
        state
            .collections
            .get(key)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|task| !task.hidden || state.transitions.is_hiding(&task.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All distinct tasks cached for a user, in first-seen order.
    pub fn user_tasks(&self, user_id: &str) -> Vec<Task> {
        let state = self.state.lock();
        let mut seen = HashSet::new();
        state
            .collections
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .flat_map(|(_, tasks)| tasks.iter())
            .filter(|task| seen.insert(task.id.clone()))
            .cloned()
            .collect()
    }

    pub fn find_task(&self, user_id: &str, task_id: &str) -> Option<Task> {
        let state = self.state.lock();
        state
            .collections
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .find_map(|(_, tasks)| tasks.iter().find(|task| task.id == task_id))
            .cloned()
    }

    pub fn comments(&self, task_id: &str) -> Vec<Comment> {
        self.state
            .lock()
            .comments
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn transition(&self, task_id: &str) -> Option<Transition> {
        self.state.lock().transitions.get(task_id)
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().transitions.len()
    }

    /// Copies every cached occurrence of a task; `None` if it is not cached.
    pub fn snapshot_task(&self, user_id: &str, task_id: &str) -> Option<TaskSnapshot> {
        let state = self.state.lock();
        let entries: Vec<_> = state
            .collections
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .filter_map(|(key, tasks)| {
                tasks
                    .iter()
                    .position(|task| task.id == task_id)
                    .map(|index| (key.clone(), index, tasks[index].clone()))
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        Some(TaskSnapshot {
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            entries,
            comments: state.comments.get(task_id).cloned(),
        })
    }

    /// Applies a patch to every cached copy of a task, in place.
    ///
    /// Rows stay in their collections even if they no longer match the
    /// filter; `reconcile_task` re-files them once the store confirms.
    pub fn apply_patch(&self, user_id: &str, task_id: &str, patch: &TaskPatch) -> bool {
        let mut state = self.state.lock();
        let mut applied = false;
        for (_, tasks) in state.user_collections_mut(user_id) {
            if let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) {
                patch.apply_to(task);
                applied = true;
            }
        }
        if applied {
            state.touch();
        }
        applied
    }

    /// Replaces cached copies with the authoritative record and re-files it
    /// between filtered collections.
    pub fn reconcile_task(&self, task: &Task) {
        let mut state = self.state.lock();
        for (key, tasks) in state.user_collections_mut(&task.user_id) {
            let admitted = key.filter.admits(task);
            match tasks.iter().position(|existing| existing.id == task.id) {
                Some(index) if admitted => tasks[index] = task.clone(),
                Some(index) => {
                    tasks.remove(index);
                }
                None if admitted => insert_newest_first(tasks, task.clone()),
                None => {}
            }
        }
        state.touch();
    }

    /// Inserts a newly created task into every loaded collection admitting it.
    pub fn insert_task(&self, task: &Task) {
        self.reconcile_task(task);
        self.state
            .lock()
            .comments
            .entry(task.id.clone())
            .or_default();
    }

    /// Removes a task and its comment list from the cache.
    pub fn remove_task(&self, user_id: &str, task_id: &str) {
        let mut state = self.state.lock();
        for (_, tasks) in state.user_collections_mut(user_id) {
            tasks.retain(|task| task.id != task_id);
        }
        state.comments.remove(task_id);
        state.touch();
    }

    /// Restores a snapshot exactly: every captured copy returns to its
    /// original index and any copy outside the snapshot is removed.
    pub fn restore_task(&self, snapshot: &TaskSnapshot) {
        let mut state = self.state.lock();
        for (key, tasks) in state.user_collections_mut(&snapshot.user_id) {
            tasks.retain(|task| task.id != snapshot.task_id);
            if let Some((_, index, task)) = snapshot.entries.iter().find(|(k, _, _)| k == key) {
                let index = (*index).min(tasks.len());
                tasks.insert(index, task.clone());
            }
        }
        match &snapshot.comments {
            Some(comments) => {
                state
                    .comments
                    .insert(snapshot.task_id.clone(), comments.clone());
            }
            None => {
                state.comments.remove(&snapshot.task_id);
            }
        }
        state.touch();
    }

    pub fn push_comment(&self, comment: Comment) {
        let mut state = self.state.lock();
        state
            .comments
            .entry(comment.task_id.clone())
            .or_default()
            .push(comment);
        state.touch();
    }

    /// Swaps a temporary comment for the server copy; appends if it vanished.
    pub fn replace_comment(&self, temporary_id: &str, comment: Comment) {
        let mut state = self.state.lock();
        let list = state.comments.entry(comment.task_id.clone()).or_default();
        match list.iter().position(|existing| existing.id == temporary_id) {
            Some(index) => list[index] = comment,
            None => list.push(comment),
        }
        state.touch();
    }

    /// Removes one comment, returning its index and value.
    pub fn remove_comment(&self, task_id: &str, comment_id: &str) -> Option<(usize, Comment)> {
        let mut state = self.state.lock();
        let list = state.comments.get_mut(task_id)?;
        let index = list.iter().position(|comment| comment.id == comment_id)?;
        let removed = list.remove(index);
        state.touch();
        Some((index, removed))
    }

    /// Restores a task's whole comment list.
    pub fn restore_comments(&self, task_id: &str, comments: Vec<Comment>) {
        let mut state = self.state.lock();
        state.comments.insert(task_id.to_string(), comments);
        state.touch();
    }

    /// Marks a task as having an operation in flight.
    ///
    /// The entry is cleared when the returned guard drops, on every path.
    pub fn begin_transition(&self, task_id: &str, op: MutationKind) -> TransitionGuard<'_> {
        let mut state = self.state.lock();
        state.transitions.begin(task_id, op);
        state.touch();
        TransitionGuard {
            cache: self,
            task_id: task_id.to_string(),
        }
    }

    fn set_transition_state(&self, task_id: &str, next: TransitionState) {
        let mut state = self.state.lock();
        state.transitions.set_state(task_id, next);
        state.touch();
    }

    fn finish_transition(&self, task_id: &str) {
        let mut state = self.state.lock();
        if state.transitions.finish(task_id) {
            state.touch();
        }
    }
}

/// Clears a task's transition entry when dropped.
#[must_use = "dropping the guard ends the transition immediately"]
pub struct TransitionGuard<'a> {
    cache: &'a TaskCache,
    task_id: TaskId,
}

impl TransitionGuard<'_> {
    pub fn mark_exit_animating(&self) {
        self.cache
            .set_transition_state(&self.task_id, TransitionState::ExitAnimating);
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.cache.finish_transition(&self.task_id);
    }
}

fn insert_newest_first(tasks: &mut Vec<Task>, task: Task) {
    let index = tasks
        .iter()
        .position(|existing| existing.created_at < task.created_at)
        .unwrap_or(tasks.len());
    tasks.insert(index, task);
}
