//! Per-task mutation queue.
//!
//! # Invariants
//! - Operations holding the same task's permit run strictly one at a time,
//!   in acquisition order (tokio mutexes are FIFO).
//! - Different task ids never wait on each other.
//! - Idle entries are dropped once the last holder releases.

use crate::model::task::TaskId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct TaskQueues {
    slots: Mutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>,
}

impl TaskQueues {
    /// Waits for the task's turn.
    pub(crate) async fn acquire(&self, task_id: &str) -> TaskPermit<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = slot.lock_owned().await;
        TaskPermit {
            queues: self,
            task_id: task_id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

pub(crate) struct TaskPermit<'a> {
    queues: &'a TaskQueues,
    task_id: TaskId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TaskPermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.queues.slots.lock();
        let idle = slots
            .get(&self.task_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            slots.remove(&self.task_id);
        }
    }
}
