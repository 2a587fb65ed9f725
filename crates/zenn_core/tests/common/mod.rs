#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use zenn_core::{
    Comment, CompletionFilter, CoordinatorConfig, FetchedTask, MemoryNotifier, NewTask,
    PillarScores, SqliteTaskStore, StaticAuth, StoreError, StoreResult, Task, TaskCache,
    TaskMutationCoordinator, TaskPatch, TaskStore,
};

pub const USER: &str = "user-1";

/// SQLite store with injectable latency and failures.
pub struct FlakyStore {
    inner: SqliteTaskStore,
    calls: AtomicUsize,
    fail_next: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteTaskStore::open_in_memory().unwrap(),
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            failing_ids: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &SqliteTaskStore {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fails the next call, whatever it is.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Fails every call addressed to `id` until cleared.
    pub fn fail_on(&self, id: &str) {
        self.failing_ids.lock().insert(id.to_string());
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    async fn enter(&self, id: Option<&str>) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let targeted = id.is_some_and(|id| self.failing_ids.lock().contains(id));
        if self.fail_next.swap(false, Ordering::SeqCst) || targeted {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl TaskStore for FlakyStore {
    async fn fetch_tasks(
        &self,
        user_id: &str,
        filter: CompletionFilter,
    ) -> StoreResult<Vec<FetchedTask>> {
        self.enter(None).await?;
        self.inner.fetch_tasks(user_id, filter).await
    }

    async fn create_task(&self, user_id: &str, task: &NewTask) -> StoreResult<Task> {
        self.enter(None).await?;
        self.inner.create_task(user_id, task).await
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        self.enter(Some(task_id)).await?;
        self.inner.update_task(task_id, patch).await
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        self.enter(Some(task_id)).await?;
        self.inner.delete_task(task_id).await
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> StoreResult<Comment> {
        self.enter(Some(task_id)).await?;
        self.inner.add_comment(task_id, text).await
    }

    async fn delete_comment(&self, comment_id: &str) -> StoreResult<()> {
        self.enter(Some(comment_id)).await?;
        self.inner.delete_comment(comment_id).await
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub auth: Arc<StaticAuth>,
    pub notifier: Arc<MemoryNotifier>,
    pub coordinator: TaskMutationCoordinator<Arc<FlakyStore>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        let store = Arc::new(FlakyStore::new());
        let auth = Arc::new(StaticAuth::signed_in(USER));
        let notifier = Arc::new(MemoryNotifier::new());
        let coordinator = TaskMutationCoordinator::new(
            Arc::clone(&store),
            Arc::new(TaskCache::new()),
            auth.clone(),
            notifier.clone(),
            config,
        );
        Self {
            store,
            auth,
            notifier,
            coordinator,
        }
    }

    /// Inserts a task straight into the backing database.
    pub fn seed(&self, title: &str, scores: (u8, u8, u8)) -> Task {
        let task = Task::new(
            USER,
            title,
            PillarScores::new(scores.0, scores.1, scores.2),
        );
        self.store.inner().insert_task(&task).unwrap();
        task
    }

    pub fn seed_completed(&self, title: &str) -> Task {
        let mut task = Task::new(USER, title, PillarScores::new(3, 3, 3));
        task.mark_completed(chrono::Utc::now());
        self.store.inner().insert_task(&task).unwrap();
        task
    }

    pub async fn load(&self, filter: CompletionFilter) {
        self.coordinator.load_tasks(filter).await.unwrap();
    }

    /// Current persisted copy of a task.
    pub async fn stored(&self, task_id: &str) -> Task {
        self.store
            .inner()
            .fetch_tasks(USER, CompletionFilter::All)
            .await
            .unwrap()
            .into_iter()
            .find(|fetched| fetched.task.id == task_id)
            .unwrap()
            .task
    }
}
