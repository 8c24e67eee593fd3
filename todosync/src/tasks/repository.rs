//! Write-through / read-through task repository.
//!
//! Mutations go to the remote service first and are mirrored into the
//! local store only once the remote accepted them. Reads are served from
//! the local store; a point lookup that misses locally falls back to the
//! remote and caches the result.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use todosync_proto::time::now_millis;

use super::reconcile::{CategoryPolicy, SyncReport, reconcile};
use super::stats::TaskStats;
use super::{Priority, Task, TaskError, TaskId, query};
use crate::remote::convert::{create_request, update_request};
use crate::remote::{RemoteError, RemoteService};
use crate::store::{LiveQuery, LocalStore, StoreError};

/// Errors returned by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The remote call failed; the local store was not touched.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The remote call succeeded but mirroring it locally failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The task was rejected before any call was made.
    #[error(transparent)]
    Invalid(#[from] TaskError),
}

/// Progress of [`TaskRepository::refresh_all`], for a loading indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshState {
    /// A refresh is in flight.
    pub loading: bool,
    /// Message of the last failed refresh, cleared by the next success.
    pub last_error: Option<String>,
}

/// Combines a [`LocalStore`] and a [`RemoteService`].
pub struct TaskRepository<S, R> {
    store: Arc<S>,
    remote: Arc<R>,
    policy: CategoryPolicy,
    refresh: watch::Sender<RefreshState>,
    in_flight: AtomicUsize,
}

impl<S: LocalStore, R: RemoteService> TaskRepository<S, R> {
    /// Creates a repository over `store` and `remote`.
    pub fn new(store: Arc<S>, remote: Arc<R>) -> Self {
        let (refresh, _rx) = watch::channel(RefreshState::default());
        Self {
            store,
            remote,
            policy: CategoryPolicy::default(),
            refresh,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets how local categories survive remote overwrites.
    #[must_use]
    pub const fn with_category_policy(mut self, policy: CategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying local store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The underlying remote service.
    #[must_use]
    pub const fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    // ── Writes ────────────────────────────────────────────────────

    /// Creates `task` remotely, then stores the server's record locally.
    ///
    /// The caller's `id` is ignored. Returns the stored record, carrying
    /// the server-assigned id.
    ///
    /// # Errors
    ///
    /// [`RepoError::Invalid`] for a bad title, [`RepoError::Remote`] if the
    /// server refused (nothing is stored locally), [`RepoError::Store`] if
    /// the local write failed afterwards.
    pub async fn create(&self, task: Task) -> Result<Task, RepoError> {
        task.validate()?;
        let mut created = self.remote.create(create_request(&task)).await?;
        if self.policy == CategoryPolicy::Preserve {
            created.category.clone_from(&task.category);
        }
        match self.store.insert(created.clone()).await {
            Err(StoreError::AlreadyExists(_)) => self.store.update(created.clone()).await?,
            other => {
                other?;
            }
        }
        tracing::info!(id = created.id, "created task");
        Ok(created)
    }

    /// Updates `task` remotely, then writes it into the local store.
    ///
    /// # Errors
    ///
    /// As for [`create`](Self::create); additionally [`TaskError::Unassigned`]
    /// if the task has no server id.
    pub async fn update(&self, task: Task) -> Result<(), RepoError> {
        task.validate()?;
        if task.id == 0 {
            return Err(TaskError::Unassigned.into());
        }
        self.remote.update(task.id, update_request(&task)).await?;
        let id = task.id;
        self.put_local(task).await?;
        tracing::info!(id, "updated task");
        Ok(())
    }

    /// Deletes a task remotely, then locally.
    ///
    /// A task already absent locally is not an error.
    ///
    /// # Errors
    ///
    /// [`RepoError::Remote`] if the server refused, [`RepoError::Store`] if
    /// the local delete failed.
    pub async fn delete(&self, id: TaskId) -> Result<(), RepoError> {
        self.remote.delete(id).await?;
        match self.store.delete(id).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(id, "deleted task");
        Ok(())
    }

    /// Marks a task done or open, remotely then locally.
    ///
    /// Completing stamps `completed_at` with the current time; reopening
    /// clears it. If the task is missing locally, the server's record is
    /// cached instead.
    ///
    /// # Errors
    ///
    /// [`RepoError::Remote`] if the server refused, [`RepoError::Store`] if
    /// the local write failed.
    pub async fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), RepoError> {
        let remote_task = if completed {
            self.remote.mark_complete(id).await?
        } else {
            self.remote.mark_pending(id).await?
        };
        let completed_at = completed.then(now_millis);
        match self.store.set_completion(id, completed, completed_at).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(id, "completed task missing locally, caching server record");
                let mut task = remote_task;
                task.set_completed(completed, completed_at.unwrap_or_else(now_millis));
                self.put_local(task).await?;
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(id, completed, "changed task status");
        Ok(())
    }

    /// Flips a task between done and open.
    ///
    /// # Errors
    ///
    /// As for [`set_completed`](Self::set_completed).
    pub async fn toggle(&self, task: &Task) -> Result<(), RepoError> {
        self.set_completed(task.id, !task.is_completed).await
    }

    /// Sets or clears the reminder of a task through the write-through path.
    ///
    /// Returns the updated task.
    ///
    /// # Errors
    ///
    /// As for [`get_by_id`](Self::get_by_id) and [`update`](Self::update).
    pub async fn set_reminder(&self, id: TaskId, when: Option<i64>) -> Result<Task, RepoError> {
        let task = self.get_by_id(id).await?.with_reminder(when);
        self.update(task.clone()).await?;
        Ok(task)
    }

    /// Inserts or overwrites a task in the local store.
    async fn put_local(&self, task: Task) -> Result<(), StoreError> {
        match self.store.update(task.clone()).await {
            Err(StoreError::NotFound(_)) => self.store.insert(task).await.map(|_| ()),
            other => other,
        }
    }

    // ── Reads ─────────────────────────────────────────────────────

    /// Looks a task up locally, falling back to the remote on a miss.
    ///
    /// A task fetched from the remote is cached locally before returning.
    ///
    /// # Errors
    ///
    /// [`RepoError::Remote`] if the task is not local and the remote lookup
    /// failed, [`RepoError::Store`] if reading or caching failed.
    pub async fn get_by_id(&self, id: TaskId) -> Result<Task, RepoError> {
        if let Some(task) = self.store.get(id).await? {
            return Ok(task);
        }
        tracing::debug!(id, "local miss, fetching task from remote");
        let task = self.remote.get_by_id(id).await?;
        self.put_local(task.clone()).await?;
        Ok(task)
    }

    /// Live list of every task, high priority and newest first.
    #[must_use]
    pub fn all(&self) -> LiveQuery<Vec<Task>> {
        LiveQuery::new(self.store.subscribe(), |t| query::all(t.values()))
    }

    /// Live list of open tasks.
    #[must_use]
    pub fn active(&self) -> LiveQuery<Vec<Task>> {
        LiveQuery::new(self.store.subscribe(), |t| query::active(t.values()))
    }

    /// Live list of completed tasks, most recently completed first.
    #[must_use]
    pub fn completed(&self) -> LiveQuery<Vec<Task>> {
        LiveQuery::new(self.store.subscribe(), |t| query::completed(t.values()))
    }

    /// Live count of open tasks.
    #[must_use]
    pub fn active_count(&self) -> LiveQuery<usize> {
        LiveQuery::new(self.store.subscribe(), |t| query::active_count(t.values()))
    }

    /// Live count of completed tasks.
    #[must_use]
    pub fn completed_count(&self) -> LiveQuery<usize> {
        LiveQuery::new(self.store.subscribe(), |t| query::completed_count(t.values()))
    }

    /// Tasks in `category`.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<Task> {
        query::by_category(self.store.snapshot().values(), category)
    }

    /// Tasks with `priority`.
    #[must_use]
    pub fn by_priority(&self, priority: Priority) -> Vec<Task> {
        query::by_priority(self.store.snapshot().values(), priority)
    }

    /// Open tasks with a reminder in `(from, until]`, soonest first.
    #[must_use]
    pub fn reminders_between(&self, from: i64, until: i64) -> Vec<Task> {
        query::reminders_between(self.store.snapshot().values(), from, until)
    }

    /// Statistics over the local table.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        TaskStats::compute(self.store.snapshot().values())
    }

    // ── Refresh ───────────────────────────────────────────────────

    /// Replaces the local table with the remote task set.
    ///
    /// [`RefreshState::loading`] is true while any refresh is in flight.
    /// On success the last error is cleared; on failure it is set to the
    /// error's message and the local store is left as it was.
    ///
    /// # Errors
    ///
    /// [`RepoError::Remote`] if fetching the remote list failed.
    pub async fn refresh_all(&self) -> Result<SyncReport, RepoError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.refresh.send_modify(|s| s.loading = true);

        let result = match self.remote.list_all().await {
            Ok(tasks) => Ok(reconcile(self.store.as_ref(), tasks, self.policy).await),
            Err(e) => Err(RepoError::from(e)),
        };

        let still_running = self.in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        self.refresh.send_modify(|s| {
            s.loading = still_running;
            match &result {
                Ok(_) => s.last_error = None,
                Err(e) => s.last_error = Some(e.to_string()),
            }
        });
        if let Err(e) = &result {
            tracing::warn!(error = %e, "refresh failed");
        }
        result
    }

    /// Current refresh state.
    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.refresh.borrow().clone()
    }

    /// Subscribes to refresh state changes.
    #[must_use]
    pub fn subscribe_refresh(&self) -> watch::Receiver<RefreshState> {
        self.refresh.subscribe()
    }
}
