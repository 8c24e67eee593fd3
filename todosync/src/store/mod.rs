//! Local task storage.
//!
//! Defines the [`LocalStore`] trait the repository reads from and writes
//! to, plus [`LiveQuery`] for observing query results as the table changes.
//! Implementations include:
//! - [`memory::InMemoryStore`]: in-memory table with optional JSON snapshot
//!   persistence

pub mod live;
pub mod memory;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::tasks::{Task, TaskId};

pub use live::LiveQuery;
pub use memory::InMemoryStore;

/// The task table, keyed by id.
pub type TaskTable = BTreeMap<TaskId, Task>;

/// An immutable view of the task table at one point in time.
pub type Snapshot = Arc<TaskTable>;

/// Errors that can occur during local storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with the given id exists.
    #[error("task {0} not found in local store")]
    NotFound(TaskId),

    /// A task with the given id already exists.
    #[error("task {0} already exists in local store")]
    AlreadyExists(TaskId),

    /// Loading the persisted table failed.
    #[error("failed to load local store: {0}")]
    Load(String),

    /// Writing the persisted table failed.
    #[error("failed to persist local store: {0}")]
    Persist(String),

    /// The store was dropped while a subscriber was waiting.
    #[error("local store closed")]
    Closed,
}

/// Record store of tasks with live change notification.
///
/// Every successful mutation publishes a new [`Snapshot`] to all
/// subscribers. Failed mutations leave the table and subscribers untouched.
pub trait LocalStore: Send + Sync {
    /// Looks a task up by id.
    fn get(
        &self,
        id: TaskId,
    ) -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Inserts a new task, returning its id.
    ///
    /// A task with `id == 0` is given the next free local id. Inserting an
    /// id that already exists fails with [`StoreError::AlreadyExists`].
    fn insert(&self, task: Task) -> impl Future<Output = Result<TaskId, StoreError>> + Send;

    /// Replaces an existing task.
    fn update(&self, task: Task) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes a task.
    fn delete(&self, id: TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets the completion flag and timestamp of an existing task.
    fn set_completion(
        &self,
        id: TaskId,
        completed: bool,
        completed_at: Option<i64>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the current table.
    fn snapshot(&self) -> Snapshot;

    /// Subscribes to table changes.
    fn subscribe(&self) -> watch::Receiver<Snapshot>;
}
