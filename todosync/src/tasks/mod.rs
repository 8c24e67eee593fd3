//! Task model and the logic that keeps the local cache in step with the
//! remote task service.
//!
//! The [`Task`] record is shared by every layer. [`reconcile`] brings the
//! local store in line with a remote snapshot, and [`TaskRepository`]
//! combines store and remote behind write-through / read-through accessors.

pub mod query;
pub mod reconcile;
pub mod repository;
pub mod stats;

pub use reconcile::{CategoryPolicy, SyncReport, reconcile};
pub use repository::{RefreshState, RepoError, TaskRepository};
pub use stats::TaskStats;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum allowed task title length in characters.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Category given to tasks that were never assigned one.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Identifier assigned by the remote service. `0` means "not yet assigned".
pub type TaskId = i64;

/// Errors raised when a task fails validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max 256 characters)")]
    TitleTooLong,
    /// The task has no server id yet, so the remote cannot address it.
    #[error("task has not been assigned an id by the server")]
    Unassigned,
}

/// Task priority. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Ordinal 1.
    Low,
    /// Ordinal 2.
    #[default]
    Medium,
    /// Ordinal 3.
    High,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Numeric ordinal (1 = low, 2 = medium, 3 = high).
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Maps an ordinal back onto a priority; unknown values become medium.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            1 => Self::Low,
            3 => Self::High,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "1" => Ok(Self::Low),
            "medium" | "2" => Ok(Self::Medium),
            "high" | "3" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A to-do item.
///
/// `completed_at` is `Some` exactly when `is_completed` is true; use
/// [`Task::set_completed`] rather than touching either field directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Remote-assigned id, `0` until the server has seen the task.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Free-form description, may be empty.
    #[serde(default)]
    pub description: String,
    /// Whether the task is done.
    #[serde(default)]
    pub is_completed: bool,
    /// Task priority.
    #[serde(default)]
    pub priority: Priority,
    /// User-chosen category. Never sent to the remote service.
    #[serde(default = "default_category")]
    pub category: String,
    /// Creation time, epoch millis.
    pub created_at: i64,
    /// Completion time, epoch millis.
    #[serde(default)]
    pub completed_at: Option<i64>,
    /// When to fire a one-shot reminder, epoch millis.
    #[serde(default)]
    pub reminder_time: Option<i64>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Task {
    /// Creates a new, unsynchronized, open task created at `created_at`.
    #[must_use]
    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: String::new(),
            is_completed: false,
            priority: Priority::Medium,
            category: default_category(),
            created_at,
            completed_at: None,
            reminder_time: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the category; blank input falls back to [`DEFAULT_CATEGORY`].
    #[must_use]
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = normalize_category(category);
        self
    }

    /// Sets the reminder time.
    #[must_use]
    pub const fn with_reminder(mut self, reminder_time: Option<i64>) -> Self {
        self.reminder_time = reminder_time;
        self
    }

    /// Marks the task done or open, keeping `completed_at` consistent.
    pub const fn set_completed(&mut self, completed: bool, now: i64) {
        self.is_completed = completed;
        self.completed_at = if completed { Some(now) } else { None };
    }

    /// Checks the title constraints.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`] if the trimmed title is empty, or
    /// [`TaskError::TitleTooLong`] if it exceeds 256 characters.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.trim().is_empty() {
            return Err(TaskError::TitleEmpty);
        }
        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(TaskError::TitleTooLong);
        }
        Ok(())
    }
}

/// Trims a category and substitutes [`DEFAULT_CATEGORY`] for blank input.
#[must_use]
pub fn normalize_category(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        default_category()
    } else {
        trimmed.to_string()
    }
}
