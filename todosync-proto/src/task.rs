//! Task records as they travel over the REST API.
//!
//! The remote service speaks camelCase JSON with string-typed status and
//! priority fields. Decoding is deliberately lenient: every field except
//! `title` may be missing, and unknown status or priority strings are
//! mapped onto defaults instead of failing the whole payload.

use serde::{Deserialize, Serialize};

/// Wire value of a task's completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireStatus {
    /// Task still needs doing.
    Pending,
    /// Task has been completed.
    Completed,
}

impl WireStatus {
    /// Maps a raw status string onto a status.
    ///
    /// Only the exact string `COMPLETED` counts as completed; anything else,
    /// including a missing value, is pending.
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("COMPLETED") => Self::Completed,
            _ => Self::Pending,
        }
    }

    /// Human-readable description sent alongside the status code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for WireStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Wire value of a task's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WirePriority {
    /// Low priority.
    Low,
    /// Medium priority (the fallback for anything unrecognized).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl WirePriority {
    /// Maps a raw priority string onto a priority, case-insensitively.
    ///
    /// Unrecognized or missing values map to [`WirePriority::Medium`].
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_uppercase).as_deref() {
            Some("HIGH") => Self::High,
            Some("LOW") => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Human-readable description sent alongside the priority code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Display color hint the server attaches to each priority.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Low => "#52c41a",
            Self::Medium => "#faad14",
            Self::High => "#f5222d",
        }
    }
}

impl std::fmt::Display for WirePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// A task as returned by the remote service.
///
/// Timestamps are ISO-8601 strings; use [`crate::time::parse_timestamp`]
/// to turn them into epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskResponse {
    /// Server-assigned identifier.
    pub id: Option<i64>,
    /// Task title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Raw status code (`PENDING` / `COMPLETED`).
    pub status: Option<String>,
    /// Localized status label.
    pub status_description: Option<String>,
    /// Raw priority code (`LOW` / `MEDIUM` / `HIGH`).
    pub priority: Option<String>,
    /// Localized priority label.
    pub priority_description: Option<String>,
    /// Display color for the priority.
    pub priority_color: Option<String>,
    /// Deadline; doubles as the client's reminder time.
    pub deadline: Option<String>,
    /// Creation time.
    pub created_at: Option<String>,
    /// Last modification time.
    pub updated_at: Option<String>,
    /// Completion time, present only for completed tasks.
    pub completed_at: Option<String>,
    /// Whether the deadline has passed without completion.
    pub overdue: Option<bool>,
    /// Minutes until the deadline (negative once overdue).
    pub remaining_minutes: Option<i64>,
    /// Pre-formatted deadline for display.
    pub deadline_formatted: Option<String>,
    /// Pre-formatted completion time for display.
    pub completed_at_formatted: Option<String>,
}

impl TaskResponse {
    /// Returns the decoded completion status.
    #[must_use]
    pub fn wire_status(&self) -> WireStatus {
        WireStatus::from_wire(self.status.as_deref())
    }

    /// Returns the decoded priority.
    #[must_use]
    pub fn wire_priority(&self) -> WirePriority {
        WirePriority::from_wire(self.priority.as_deref())
    }
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Task title (must be non-empty).
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Priority; the server assumes medium when absent.
    #[serde(default)]
    pub priority: Option<WirePriority>,
    /// Optional deadline in `yyyy-MM-ddTHH:mm:ss` form.
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Body of `PUT /api/tasks/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTaskRequest {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New priority.
    pub priority: Option<WirePriority>,
    /// New deadline in `yyyy-MM-ddTHH:mm:ss` form.
    pub deadline: Option<String>,
    /// Removes the deadline. Ignored when `deadline` is also present.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clear_deadline: bool,
}
