//! In-memory task table.
//!
//! The [`TaskStore`] owns the authoritative copy of every task and assigns
//! ids on creation. Records are kept in typed form and rendered into
//! [`TaskResponse`] (with the derived display fields) on the way out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use todosync_proto::task::{CreateTaskRequest, TaskResponse, UpdateTaskRequest, WirePriority, WireStatus};
use todosync_proto::time::{WIRE_FORMAT, parse_timestamp};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LENGTH: usize = 256;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No task with this id.
    #[error("task {0} not found")]
    NotFound(i64),

    /// Title missing or blank.
    #[error("title must not be empty")]
    EmptyTitle,

    /// Title longer than [`MAX_TITLE_LENGTH`].
    #[error("title must be at most {MAX_TITLE_LENGTH} characters")]
    TitleTooLong,

    /// Deadline could not be parsed.
    #[error("invalid deadline: {0}")]
    InvalidDeadline(String),
}

/// A task as the server keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    /// Server-assigned id.
    pub id: i64,
    /// Title, trimmed.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Completion status.
    pub status: WireStatus,
    /// Priority.
    pub priority: WirePriority,
    /// Optional deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Set while the task is completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl StoredTask {
    /// Renders the record for the wire, computing the derived fields
    /// relative to `now`.
    #[must_use]
    pub fn to_response(&self, now: DateTime<Utc>) -> TaskResponse {
        let completed = self.status == WireStatus::Completed;
        let remaining = self.deadline.map(|d| (d - now).num_minutes());
        TaskResponse {
            id: Some(self.id),
            title: self.title.clone(),
            description: self.description.clone(),
            status: Some(self.status.to_string()),
            status_description: Some(self.status.description().to_string()),
            priority: Some(self.priority.to_string()),
            priority_description: Some(self.priority.description().to_string()),
            priority_color: Some(self.priority.color().to_string()),
            deadline: self.deadline.map(|d| d.format(WIRE_FORMAT).to_string()),
            created_at: Some(self.created_at.format(WIRE_FORMAT).to_string()),
            updated_at: Some(self.updated_at.format(WIRE_FORMAT).to_string()),
            completed_at: self.completed_at.map(|d| d.format(WIRE_FORMAT).to_string()),
            overdue: Some(!completed && self.deadline.is_some_and(|d| d < now)),
            remaining_minutes: remaining,
            deadline_formatted: self.deadline.map(|d| d.format(DISPLAY_FORMAT).to_string()),
            completed_at_formatted: self
                .completed_at
                .map(|d| d.format(DISPLAY_FORMAT).to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    tasks: BTreeMap<i64, StoredTask>,
    last_id: i64,
}

/// Thread-safe task table with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct TaskStore {
    table: RwLock<Table>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task, ordered by id. `status` narrows the result.
    pub async fn list(&self, status: Option<WireStatus>) -> Vec<StoredTask> {
        let table = self.table.read().await;
        table
            .tasks
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect()
    }

    /// Looks up one task.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no task has this id.
    pub async fn get(&self, id: i64) -> Result<StoredTask, StoreError> {
        let table = self.table.read().await;
        table.tasks.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    /// Creates a pending task and assigns it the next id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank or oversized title or an
    /// unparseable deadline.
    pub async fn create(
        &self,
        request: CreateTaskRequest,
        now: DateTime<Utc>,
    ) -> Result<StoredTask, StoreError> {
        let title = validate_title(&request.title)?;
        let deadline = parse_deadline(request.deadline.as_deref())?;

        let mut table = self.table.write().await;
        table.last_id += 1;
        let task = StoredTask {
            id: table.last_id,
            title,
            description: request.description,
            status: WireStatus::Pending,
            priority: request.priority.unwrap_or_default(),
            deadline,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        table.tasks.insert(task.id, task.clone());
        drop(table);

        tracing::debug!(id = task.id, "task created");
        Ok(task)
    }

    /// Applies the fields present in `request`; absent fields are kept.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id, or a validation error
    /// for the supplied fields.
    pub async fn update(
        &self,
        id: i64,
        request: UpdateTaskRequest,
        now: DateTime<Utc>,
    ) -> Result<StoredTask, StoreError> {
        let title = request.title.as_deref().map(validate_title).transpose()?;
        let deadline = match request.deadline.as_deref() {
            Some(raw) => Some(parse_deadline(Some(raw))?),
            None => None,
        };

        let mut table = self.table.write().await;
        let task = table.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = Some(description);
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        match deadline {
            Some(deadline) => task.deadline = deadline,
            None if request.clear_deadline => task.deadline = None,
            None => {}
        }
        task.updated_at = now;
        Ok(task.clone())
    }

    /// Removes a task.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no task has this id.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        table
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    /// Moves a task to `status`, stamping or clearing its completion time.
    ///
    /// Setting the status a task already has still refreshes `updated_at`
    /// but keeps the original completion time.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no task has this id.
    pub async fn set_status(
        &self,
        id: i64,
        status: WireStatus,
        now: DateTime<Utc>,
    ) -> Result<StoredTask, StoreError> {
        let mut table = self.table.write().await;
        let task = table.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        match status {
            WireStatus::Completed => {
                task.completed_at.get_or_insert(now);
            }
            WireStatus::Pending => task.completed_at = None,
        }
        task.status = status;
        task.updated_at = now;
        Ok(task.clone())
    }
}

fn validate_title(raw: &str) -> Result<String, StoreError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StoreError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(StoreError::TitleTooLong);
    }
    Ok(title.to_string())
}

fn parse_deadline(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_timestamp(raw)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(Some)
        .ok_or_else(|| StoreError::InvalidDeadline(raw.to_string()))
}
