//! Conversion between wire records and domain tasks.

use todosync_proto::task::{CreateTaskRequest, TaskResponse, UpdateTaskRequest, WirePriority, WireStatus};
use todosync_proto::time;

use crate::tasks::{Priority, Task};

impl From<WirePriority> for Priority {
    fn from(p: WirePriority) -> Self {
        match p {
            WirePriority::Low => Self::Low,
            WirePriority::Medium => Self::Medium,
            WirePriority::High => Self::High,
        }
    }
}

impl From<Priority> for WirePriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Low => Self::Low,
            Priority::Medium => Self::Medium,
            Priority::High => Self::High,
        }
    }
}

/// Converts a server record into a domain task.
///
/// Missing id becomes `0`, missing description becomes empty, and a
/// missing or unparsable `createdAt` becomes `now`. The deadline is the
/// reminder time. The wire format has no category, so the result carries
/// the default one.
///
/// A completed record without a usable `completedAt` falls back to
/// `updatedAt`, then `now`, so `completed_at` is set exactly when the task
/// is completed.
#[must_use]
pub fn task_from_wire(record: TaskResponse, now: i64) -> Task {
    let is_completed = record.wire_status() == WireStatus::Completed;
    let priority = Priority::from(record.wire_priority());
    let completed_at = is_completed.then(|| {
        time::parse_optional(record.completed_at.as_deref())
            .or_else(|| time::parse_optional(record.updated_at.as_deref()))
            .unwrap_or(now)
    });

    let mut task = Task::new(
        record.title,
        time::parse_optional(record.created_at.as_deref()).unwrap_or(now),
    )
    .with_description(record.description.unwrap_or_default())
    .with_priority(priority)
    .with_reminder(time::parse_optional(record.deadline.as_deref()));
    task.id = record.id.unwrap_or(0);
    task.is_completed = is_completed;
    task.completed_at = completed_at;
    task
}

/// Builds the create request for a locally composed task.
#[must_use]
pub fn create_request(task: &Task) -> CreateTaskRequest {
    CreateTaskRequest {
        title: task.title.clone(),
        description: Some(task.description.clone()),
        priority: Some(task.priority.into()),
        deadline: task.reminder_time.and_then(time::format_timestamp),
    }
}

/// Builds a full-replacement update request for `task`.
///
/// The wire treats an absent deadline as "unchanged", so a task without a
/// reminder sends `clearDeadline` instead.
#[must_use]
pub fn update_request(task: &Task) -> UpdateTaskRequest {
    let deadline = task.reminder_time.and_then(time::format_timestamp);
    UpdateTaskRequest {
        title: Some(task.title.clone()),
        description: Some(task.description.clone()),
        priority: Some(task.priority.into()),
        clear_deadline: deadline.is_none(),
        deadline,
    }
}
