use crate::error::ServiceError;
use crate::filtering::{self, FilterCriterion};
use crate::service::{AuthContext, TaskService};
use crate::sorting::{self, SortSpec};
use crate::task::{Priority, Task, TaskDraft, TaskId, TaskPatch};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct BoardState {
    tasks: Vec<Task>,
    sort: SortSpec,
    filter: FilterCriterion,
    pending_loads: usize,
}

impl BoardState {
    fn resort(&mut self) {
        sorting::sort_tasks(&mut self.tasks, self.sort);
    }

    fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == task_id)
    }
}

/// Counts one in-flight load for as long as it lives, so a load future
/// dropped mid-request still leaves the loading state.
struct LoadingGuard(Arc<RwLock<BoardState>>);

impl LoadingGuard {
    fn enter(state: &Arc<RwLock<BoardState>>) -> Self {
        state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pending_loads += 1;
        Self(Arc::clone(state))
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        state.pending_loads = state.pending_loads.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub uncompleted: usize,
    pub high: usize,
    pub low: usize,
}

/// Owns the authoritative task list and keeps it in step with the remote
/// Task Service.
///
/// Clones share the same list. Every mutation is applied under the lock to
/// whatever the list holds at that moment, never to a copy taken before a
/// request was sent, and the lock is never held across an `.await`.
#[derive(Clone)]
pub struct TaskStore {
    service: Arc<dyn TaskService>,
    auth: Arc<dyn AuthContext>,
    state: Arc<RwLock<BoardState>>,
}

impl TaskStore {
    pub fn new(service: Arc<dyn TaskService>, auth: Arc<dyn AuthContext>) -> Self {
        Self::with_views(service, auth, SortSpec::default(), FilterCriterion::default())
    }

    pub fn with_views(
        service: Arc<dyn TaskService>,
        auth: Arc<dyn AuthContext>,
        sort: SortSpec,
        filter: FilterCriterion,
    ) -> Self {
        let state = BoardState {
            sort,
            filter,
            ..BoardState::default()
        };
        Self {
            service,
            auth,
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Fetches a token and runs `request` with it. A credentials failure is
    /// reported exactly like a failed request.
    async fn authenticated<T, F, Fut>(&self, request: F) -> Result<T, ServiceError>
    where
        F: FnOnce(Arc<dyn TaskService>, String) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let token = self.auth.access_token().await?;
        request(Arc::clone(&self.service), token).await
    }

    fn skip_unauthenticated(&self, operation: &str) -> bool {
        if self.auth.is_authenticated() {
            return false;
        }
        tracing::debug!(target: "tarefas.store", operation, "skipped: not authenticated");
        true
    }

    /// Replaces the list with the server's. On failure the previous list
    /// stays in place.
    pub async fn load(&self) -> Result<(), ServiceError> {
        if self.skip_unauthenticated("load") {
            return Ok(());
        }

        let loading = LoadingGuard::enter(&self.state);
        let result = self
            .authenticated(|service, token| async move { service.list(&token).await })
            .await;
        drop(loading);

        let mut state = self.write();
        match result {
            Ok(tasks) => {
                tracing::info!(target: "tarefas.store", count = tasks.len(), "tasks loaded");
                state.tasks = tasks;
                state.resort();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(target: "tarefas.store", error = %err, "load failed");
                Err(err)
            }
        }
    }

    /// Creates the task remotely, then inserts the server's copy and
    /// re-sorts the whole list with `sort`.
    pub async fn create(&self, draft: TaskDraft, sort: SortSpec) -> Result<(), ServiceError> {
        if self.skip_unauthenticated("create") {
            return Ok(());
        }

        let created = self
            .authenticated(|service, token| async move { service.create(&token, &draft).await })
            .await
            .inspect_err(|err| {
                tracing::warn!(target: "tarefas.store", error = %err, "create failed");
            })?;

        tracing::info!(target: "tarefas.store", task_id = %created.id, "task created");
        let mut state = self.write();
        state.tasks.push(created);
        state.sort = sort;
        state.resort();
        Ok(())
    }

    /// Merges `patch` into the local task and re-sorts before the remote
    /// update resolves. The local change is kept even if the remote call
    /// fails; the error is still returned. Unknown ids are ignored and
    /// produce no request.
    pub async fn edit(
        &self,
        task_id: TaskId,
        patch: TaskPatch,
        sort: SortSpec,
    ) -> Result<(), ServiceError> {
        if self.skip_unauthenticated("edit") {
            return Ok(());
        }

        {
            let mut state = self.write();
            let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) else {
                tracing::debug!(target: "tarefas.store", task_id = %task_id, "edit skipped: unknown task");
                return Ok(());
            };
            task.apply(&patch);
            state.sort = sort;
            state.resort();
        }

        let result = self
            .authenticated(|service, token| async move {
                service.edit(&token, task_id, &patch).await
            })
            .await;

        match result {
            Ok(_) => {
                tracing::info!(target: "tarefas.store", task_id = %task_id, "task edited");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(target: "tarefas.store", task_id = %task_id, error = %err, "remote edit failed");
                Err(err)
            }
        }
    }

    /// Drops the task locally, then asks the service to delete it.
    pub async fn remove(&self, task_id: TaskId) -> Result<(), ServiceError> {
        if self.skip_unauthenticated("remove") {
            return Ok(());
        }

        {
            let mut state = self.write();
            if !state.contains(task_id) {
                tracing::debug!(target: "tarefas.store", task_id = %task_id, "remove skipped: unknown task");
                return Ok(());
            }
            state.tasks.retain(|t| t.id != task_id);
        }

        let result = self
            .authenticated(|service, token| async move { service.remove(&token, task_id).await })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(target: "tarefas.store", task_id = %task_id, "task removed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(target: "tarefas.store", task_id = %task_id, error = %err, "remote remove failed");
                Err(err)
            }
        }
    }

    pub fn sort_tasks(&self, sort: SortSpec) {
        let mut state = self.write();
        state.sort = sort;
        state.resort();
    }

    pub fn filter_tasks(&self, criterion: FilterCriterion) {
        self.write().filter = criterion;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }

    /// The sorted list narrowed by the current filter, derived on each call.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        let state = self.read();
        filtering::filter_tasks(&state.tasks, state.filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find(&self, task_id: TaskId) -> Option<Task> {
        self.read().tasks.iter().find(|t| t.id == task_id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.read().pending_loads > 0
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.read().sort
    }

    pub fn filter_criterion(&self) -> FilterCriterion {
        self.read().filter
    }

    pub fn stats(&self) -> TaskStats {
        let state = self.read();
        state.tasks.iter().fold(TaskStats::default(), |mut stats, task| {
            stats.total += 1;
            if task.is_completed {
                stats.completed += 1;
            } else {
                stats.uncompleted += 1;
            }
            match task.priority {
                Priority::High => stats.high += 1,
                Priority::Low => stats.low += 1,
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::StaticTokenAuth;
    use crate::sorting::{SortCriteria, SortOrder};
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn task(id: u64, name: &str, priority: Priority) -> Task {
        Task {
            id: TaskId(id),
            name: name.to_string(),
            priority,
            is_completed: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[derive(Default)]
    struct FakeService {
        tasks: Mutex<Vec<Task>>,
        next_id: AtomicU64,
        fail: AtomicBool,
        calls: AtomicUsize,
        list_gate: Option<Arc<Notify>>,
    }

    impl FakeService {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                tasks: Mutex::new(tasks),
                next_id: AtomicU64::new(100),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ServiceError::Network {
                    url: "fake://tasks".to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskService for FakeService {
        async fn list(&self, _token: &str) -> Result<Vec<Task>, ServiceError> {
            if let Some(gate) = &self.list_gate {
                gate.notified().await;
            }
            self.check()?;
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn create(&self, _token: &str, draft: &TaskDraft) -> Result<Task, ServiceError> {
            self.check()?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let created = task(id, &draft.name, draft.priority);
            self.tasks.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn edit(
            &self,
            _token: &str,
            task_id: TaskId,
            patch: &TaskPatch,
        ) -> Result<Option<Task>, ServiceError> {
            self.check()?;
            let mut tasks = self.tasks.lock().unwrap();
            let updated = tasks.iter_mut().find(|t| t.id == task_id).map(|t| {
                t.apply(patch);
                t.clone()
            });
            Ok(updated)
        }

        async fn remove(&self, _token: &str, task_id: TaskId) -> Result<(), ServiceError> {
            self.check()?;
            self.tasks.lock().unwrap().retain(|t| t.id != task_id);
            Ok(())
        }
    }

    fn store_with(service: Arc<FakeService>) -> TaskStore {
        let auth = Arc::new(StaticTokenAuth::new(Some("token".to_string())));
        TaskStore::new(service, auth)
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    fn priority_desc() -> SortSpec {
        SortSpec::new(SortCriteria::Priority, SortOrder::Desc)
    }

    #[tokio::test]
    async fn test_load_replaces_list_and_sorts() {
        let service = Arc::new(FakeService::with_tasks(vec![
            task(1, "B", Priority::Low),
            task(2, "A", Priority::High),
        ]));
        let store = store_with(service);
        assert!(!store.is_loading());

        store.load().await.unwrap();
        assert_eq!(ids(&store.tasks()), vec![2, 1]);
        assert!(!store.is_loading());

        store.sort_tasks(SortSpec::new(SortCriteria::Name, SortOrder::Asc));
        assert_eq!(ids(&store.tasks()), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_is_loading_while_fetch_in_flight() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeService {
            list_gate: Some(Arc::clone(&gate)),
            ..FakeService::with_tasks(vec![task(1, "A", Priority::Low)])
        });
        let store = store_with(service);

        let loader = {
            let store = store.clone();
            tokio::spawn(async move { store.load().await })
        };
        while !store.is_loading() {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        loader.await.unwrap().unwrap();

        assert!(!store.is_loading());
        assert_eq!(store.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_returns_to_idle() {
        // The gate is never opened, so `list` never resolves.
        let service = Arc::new(FakeService {
            list_gate: Some(Arc::new(Notify::new())),
            ..FakeService::with_tasks(vec![task(1, "A", Priority::Low)])
        });
        let store = store_with(service);

        let outcome = tokio::time::timeout(Duration::from_millis(20), store.load()).await;
        assert!(outcome.is_err());
        assert!(!store.is_loading());
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_list() {
        let service = Arc::new(FakeService::with_tasks(vec![task(1, "A", Priority::Low)]));
        let store = store_with(Arc::clone(&service));
        store.load().await.unwrap();

        service.fail.store(true, Ordering::SeqCst);
        service.tasks.lock().unwrap().clear();
        assert!(store.load().await.is_err());
        assert_eq!(ids(&store.tasks()), vec![1]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_create_inserts_in_sorted_position() {
        let service = Arc::new(FakeService::with_tasks(vec![
            task(1, "a", Priority::Low),
            task(2, "b", Priority::Low),
            task(3, "c", Priority::Low),
        ]));
        let store = store_with(service);
        store.load().await.unwrap();

        let draft = TaskDraft {
            name: "X".to_string(),
            priority: Priority::High,
        };
        store.create(draft, priority_desc()).await.unwrap();

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].name, "X");
        assert_eq!(ids(&tasks[1..]), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_list_untouched() {
        let service = Arc::new(FakeService::with_tasks(vec![task(1, "a", Priority::Low)]));
        let store = store_with(Arc::clone(&service));
        store.load().await.unwrap();
        service.fail.store(true, Ordering::SeqCst);

        let draft = TaskDraft {
            name: "X".to_string(),
            priority: Priority::High,
        };
        let err = store.create(draft, priority_desc()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Network { .. }));
        assert_eq!(ids(&store.tasks()), vec![1]);
    }

    #[tokio::test]
    async fn test_edit_completion_moves_between_views() {
        let service = Arc::new(FakeService::with_tasks(vec![
            task(1, "B", Priority::Low),
            task(2, "A", Priority::High),
        ]));
        let store = store_with(service);
        store.load().await.unwrap();

        store
            .edit(TaskId(1), TaskPatch::completed(true), priority_desc())
            .await
            .unwrap();

        store.filter_tasks(FilterCriterion::Uncompleted);
        assert_eq!(ids(&store.filtered_tasks()), vec![2]);

        store.filter_tasks(FilterCriterion::Completed);
        assert_eq!(ids(&store.filtered_tasks()), vec![1]);

        store.filter_tasks(FilterCriterion::All);
        assert_eq!(ids(&store.filtered_tasks()), ids(&store.tasks()));
    }

    #[tokio::test]
    async fn test_edit_resorts_with_given_spec() {
        let service = Arc::new(FakeService::with_tasks(vec![
            task(1, "B", Priority::High),
            task(2, "C", Priority::Low),
        ]));
        let store = store_with(service);
        store.load().await.unwrap();
        assert_eq!(ids(&store.tasks()), vec![1, 2]);

        let patch = TaskPatch {
            name: Some("Z".to_string()),
            ..TaskPatch::default()
        };
        let by_name = SortSpec::new(SortCriteria::Name, SortOrder::Asc);
        store.edit(TaskId(1), patch, by_name).await.unwrap();

        assert_eq!(ids(&store.tasks()), vec![2, 1]);
        assert_eq!(store.find(TaskId(1)).unwrap().name, "Z");
        assert_eq!(store.sort_spec(), by_name);
    }

    #[tokio::test]
    async fn test_edit_unknown_id_makes_no_request() {
        let service = Arc::new(FakeService::with_tasks(vec![task(1, "a", Priority::Low)]));
        let store = store_with(Arc::clone(&service));
        store.load().await.unwrap();
        let calls = service.calls();

        store
            .edit(TaskId(42), TaskPatch::completed(true), priority_desc())
            .await
            .unwrap();
        assert_eq!(service.calls(), calls);
        assert!(!store.tasks()[0].is_completed);
    }

    #[tokio::test]
    async fn test_failed_edit_keeps_optimistic_change() {
        let service = Arc::new(FakeService::with_tasks(vec![task(1, "a", Priority::Low)]));
        let store = store_with(Arc::clone(&service));
        store.load().await.unwrap();
        service.fail.store(true, Ordering::SeqCst);

        let result = store
            .edit(TaskId(1), TaskPatch::completed(true), priority_desc())
            .await;
        assert!(result.is_err());
        assert!(store.find(TaskId(1)).unwrap().is_completed);
    }

    #[tokio::test]
    async fn test_remove() {
        let service = Arc::new(FakeService::with_tasks(vec![
            task(1, "a", Priority::Low),
            task(2, "b", Priority::Low),
        ]));
        let store = store_with(Arc::clone(&service));
        store.load().await.unwrap();

        store.remove(TaskId(2)).await.unwrap();
        assert_eq!(ids(&store.tasks()), vec![1]);
        assert_eq!(ids(&service.tasks.lock().unwrap()), vec![1]);

        let calls = service.calls();
        store.remove(TaskId(2)).await.unwrap();
        assert_eq!(ids(&store.tasks()), vec![1]);
        assert_eq!(service.calls(), calls);
    }

    #[tokio::test]
    async fn test_removed_task_leaves_filtered_view() {
        let mut done = task(1, "a", Priority::Low);
        done.is_completed = true;
        let service = Arc::new(FakeService::with_tasks(vec![done, task(2, "b", Priority::Low)]));
        let store = store_with(service);
        store.load().await.unwrap();
        store.filter_tasks(FilterCriterion::Completed);
        assert_eq!(ids(&store.filtered_tasks()), vec![1]);

        store.remove(TaskId(1)).await.unwrap();
        assert!(store.filtered_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_operations_are_noops() {
        let service = Arc::new(FakeService::with_tasks(vec![task(1, "a", Priority::Low)]));
        let store = TaskStore::new(
            Arc::clone(&service) as Arc<dyn TaskService>,
            Arc::new(StaticTokenAuth::default()),
        );

        store.load().await.unwrap();
        let draft = TaskDraft {
            name: "X".to_string(),
            priority: Priority::High,
        };
        store.create(draft, priority_desc()).await.unwrap();
        store
            .edit(TaskId(1), TaskPatch::completed(true), priority_desc())
            .await
            .unwrap();
        store.remove(TaskId(1)).await.unwrap();

        assert!(store.tasks().is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_edits_apply_to_latest_list() {
        let service = Arc::new(FakeService::with_tasks(vec![
            task(1, "a", Priority::Low),
            task(2, "b", Priority::Low),
        ]));
        let store = store_with(service);
        store.load().await.unwrap();

        let (first, second) = tokio::join!(
            store.edit(TaskId(1), TaskPatch::completed(true), priority_desc()),
            store.edit(
                TaskId(2),
                TaskPatch {
                    priority: Some(Priority::High),
                    ..TaskPatch::default()
                },
                priority_desc()
            ),
        );
        first.unwrap();
        second.unwrap();

        let tasks = store.tasks();
        assert_eq!(ids(&tasks), vec![2, 1]);
        assert!(tasks[1].is_completed);
        assert_eq!(tasks[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_stats() {
        let mut done = task(1, "a", Priority::High);
        done.is_completed = true;
        let service = Arc::new(FakeService::with_tasks(vec![
            done,
            task(2, "b", Priority::Low),
            task(3, "c", Priority::Low),
        ]));
        let store = store_with(service);
        store.load().await.unwrap();

        assert_eq!(
            store.stats(),
            TaskStats {
                total: 3,
                completed: 1,
                uncompleted: 2,
                high: 1,
                low: 2,
            }
        );
    }
}
