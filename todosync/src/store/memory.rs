//! In-memory task table with optional JSON snapshot persistence.
//!
//! The table lives inside a [`watch`] channel, so every committed mutation
//! is published to subscribers atomically with the change itself. When a
//! persistence path is configured, the whole table is rewritten to disk
//! (write to a temp file, then rename) before the new table is published;
//! a failed write leaves both the table and subscribers as they were.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use todosync_proto::codec;

use super::{LocalStore, Snapshot, StoreError, TaskTable};
use crate::tasks::{Task, TaskId};

/// Task store backed by an in-memory `BTreeMap`.
pub struct InMemoryStore {
    tx: watch::Sender<Snapshot>,
    /// Serializes mutate-then-persist so the file never lags a newer table.
    write_lock: Mutex<()>,
    path: Option<PathBuf>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty, non-persistent store.
    #[must_use]
    pub fn new() -> Self {
        Self::from_table(TaskTable::new(), None)
    }

    /// Creates a non-persistent store pre-filled with `tasks`.
    ///
    /// Tasks with duplicate ids overwrite earlier ones.
    #[must_use]
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let table = tasks.into_iter().map(|t| (t.id, t)).collect();
        Self::from_table(table, None)
    }

    /// Opens a store persisted at `path`, loading it if the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Load`] if the file exists but cannot be read,
    /// is not a JSON task list, or contains duplicate ids.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match tokio::fs::read_to_string(&path).await {
            Ok(text) => parse_table(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => TaskTable::new(),
            Err(e) => return Err(StoreError::Load(format!("{}: {e}", path.display()))),
        };
        tracing::debug!(path = %path.display(), rows = table.len(), "opened local store");
        Ok(Self::from_table(table, Some(path)))
    }

    fn from_table(table: TaskTable, path: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(table));
        Self {
            tx,
            write_lock: Mutex::new(()),
            path,
        }
    }

    /// Path of the persisted snapshot, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Applies `f` to a copy of the table, persists the copy if a path is
    /// configured, and only then publishes it to subscribers.
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut TaskTable) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut working = (**self.tx.borrow()).clone();
        let value = f(&mut working)?;

        if let Some(path) = &self.path {
            persist(path, &working).await.inspect_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "mutation not applied");
            })?;
        }
        self.tx.send_replace(Arc::new(working));
        Ok(value)
    }
}

impl LocalStore for InMemoryStore {
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tx.borrow().get(&id).cloned())
    }

    async fn insert(&self, mut task: Task) -> Result<TaskId, StoreError> {
        self.mutate(move |table| {
            if task.id == 0 {
                task.id = table.keys().next_back().map_or(1, |max| max + 1).max(1);
            }
            if table.contains_key(&task.id) {
                return Err(StoreError::AlreadyExists(task.id));
            }
            let id = task.id;
            table.insert(id, task);
            Ok(id)
        })
        .await
    }

    async fn update(&self, task: Task) -> Result<(), StoreError> {
        self.mutate(move |table| match table.get_mut(&task.id) {
            Some(slot) => {
                *slot = task;
                Ok(())
            }
            None => Err(StoreError::NotFound(task.id)),
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        self.mutate(move |table| {
            table
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn set_completion(
        &self,
        id: TaskId,
        completed: bool,
        completed_at: Option<i64>,
    ) -> Result<(), StoreError> {
        self.mutate(move |table| {
            let task = table.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            task.is_completed = completed;
            task.completed_at = if completed { completed_at } else { None };
            Ok(())
        })
        .await
    }

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.tx.borrow())
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

/// Decodes a persisted task list into a table, rejecting duplicate ids.
fn parse_table(text: &str) -> Result<TaskTable, StoreError> {
    if text.trim().is_empty() {
        return Ok(TaskTable::new());
    }
    let tasks: Vec<Task> = codec::decode(text).map_err(|e| StoreError::Load(e.to_string()))?;
    let mut table = TaskTable::new();
    for task in tasks {
        let id = task.id;
        if table.insert(id, task).is_some() {
            return Err(StoreError::Load(format!("duplicate task id {id}")));
        }
    }
    Ok(table)
}

/// Writes the table as a JSON list, via a temp file and rename.
async fn persist(path: &Path, table: &TaskTable) -> Result<(), StoreError> {
    let tasks: Vec<&Task> = table.values().collect();
    let text = codec::encode_pretty(&tasks).map_err(|e| StoreError::Persist(e.to_string()))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::Persist(format!("{}: {e}", dir.display())))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .map_err(|e| StoreError::Persist(format!("{}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Persist(format!("{}: {e}", path.display())))?;
    Ok(())
}
