//! In-process [`RemoteService`] backed by a map.
//!
//! Behaves like the REST server (server-assigned ids, 404 for unknown ids,
//! records come back without a category) and can be switched into a
//! failing mode to exercise error paths.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use todosync_proto::task::{CreateTaskRequest, UpdateTaskRequest};
use todosync_proto::time::{self, now_millis};

use super::{RemoteError, RemoteService};
use crate::tasks::{DEFAULT_CATEGORY, Priority, Task, TaskId};

#[derive(Debug, Default)]
struct Inner {
    tasks: BTreeMap<TaskId, Task>,
    next_id: TaskId,
    failure: Option<RemoteError>,
    calls: Vec<&'static str>,
}

/// A remote task service that lives in memory.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    inner: Mutex<Inner>,
}

impl InMemoryRemote {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service holding `tasks`, keyed by their ids.
    #[must_use]
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let remote = Self::new();
        for task in tasks {
            remote.seed(task);
        }
        remote
    }

    /// Stores `task` directly, as if another client had created it.
    ///
    /// A zero id is replaced with the next server id. Returns the id used.
    pub fn seed(&self, mut task: Task) -> TaskId {
        let mut inner = self.inner.lock();
        if task.id == 0 {
            inner.next_id += 1;
            task.id = inner.next_id;
        } else {
            inner.next_id = inner.next_id.max(task.id);
        }
        task.category = DEFAULT_CATEGORY.to_string();
        let id = task.id;
        inner.tasks.insert(id, task);
        id
    }

    /// Removes a task directly, as if another client had deleted it.
    pub fn forget(&self, id: TaskId) -> Option<Task> {
        self.inner.lock().tasks.remove(&id)
    }

    /// Makes every subsequent call fail with `error` until [`recover`](Self::recover).
    pub fn fail_with(&self, error: RemoteError) {
        self.inner.lock().failure = Some(error);
    }

    /// Clears a failure set by [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        self.inner.lock().failure = None;
    }

    /// Current server-side tasks, ordered by id.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().tasks.values().cloned().collect()
    }

    /// Names of the calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().calls.clone()
    }

    /// Records the call and runs `f` unless a failure is armed.
    fn with_inner<R>(
        &self,
        call: &'static str,
        f: impl FnOnce(&mut Inner) -> Result<R, RemoteError>,
    ) -> Result<R, RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        if let Some(err) = &inner.failure {
            return Err(err.clone());
        }
        f(&mut *inner)
    }
}

fn not_found(id: TaskId) -> RemoteError {
    RemoteError::Http {
        status: 404,
        message: format!("task {id} not found"),
    }
}

fn invalid(message: &str) -> RemoteError {
    RemoteError::Http {
        status: 400,
        message: message.to_string(),
    }
}

fn set_status(inner: &mut Inner, id: TaskId, completed: bool) -> Result<Task, RemoteError> {
    let task = inner.tasks.get_mut(&id).ok_or_else(|| not_found(id))?;
    task.set_completed(completed, now_millis());
    Ok(task.clone())
}

impl RemoteService for InMemoryRemote {
    async fn list_all(&self) -> Result<Vec<Task>, RemoteError> {
        self.with_inner("list_all", |inner| Ok(inner.tasks.values().cloned().collect()))
    }

    async fn get_by_id(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.with_inner("get_by_id", |inner| {
            inner.tasks.get(&id).cloned().ok_or_else(|| not_found(id))
        })
    }

    async fn create(&self, request: CreateTaskRequest) -> Result<Task, RemoteError> {
        self.with_inner("create", |inner| {
            if request.title.trim().is_empty() {
                return Err(invalid("title must not be empty"));
            }
            inner.next_id += 1;
            let mut task = Task::new(request.title, now_millis())
                .with_description(request.description.unwrap_or_default())
                .with_priority(request.priority.map_or(Priority::Medium, Priority::from))
                .with_reminder(time::parse_optional(request.deadline.as_deref()));
            task.id = inner.next_id;
            inner.tasks.insert(task.id, task.clone());
            Ok(task)
        })
    }

    async fn update(&self, id: TaskId, request: UpdateTaskRequest) -> Result<Task, RemoteError> {
        self.with_inner("update", |inner| {
            let task = inner.tasks.get_mut(&id).ok_or_else(|| not_found(id))?;
            if let Some(title) = request.title {
                if title.trim().is_empty() {
                    return Err(invalid("title must not be empty"));
                }
                task.title = title;
            }
            if let Some(description) = request.description {
                task.description = description;
            }
            if let Some(priority) = request.priority {
                task.priority = priority.into();
            }
            if let Some(deadline) = request.deadline {
                task.reminder_time = time::parse_timestamp(&deadline);
            } else if request.clear_deadline {
                task.reminder_time = None;
            }
            Ok(task.clone())
        })
    }

    async fn delete(&self, id: TaskId) -> Result<(), RemoteError> {
        self.with_inner("delete", |inner| {
            inner.tasks.remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
        })
    }

    async fn mark_complete(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.with_inner("mark_complete", |inner| set_status(inner, id, true))
    }

    async fn mark_pending(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.with_inner("mark_pending", |inner| set_status(inner, id, false))
    }
}
