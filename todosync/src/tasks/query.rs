//! Filters and orderings applied to a snapshot of the local task table.
//!
//! These are the queries the presentation layer consumes. They are plain
//! functions over borrowed tasks so that live subscriptions can re-run them
//! on every new snapshot.

use std::cmp::Reverse;

use super::{Priority, Task};

/// Orders by priority (high first), then newest first.
fn by_priority_then_newest(a: &Task, b: &Task) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Every task, high priority first, newest first within a priority.
#[must_use]
pub fn all<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
    let mut out: Vec<Task> = tasks.into_iter().cloned().collect();
    out.sort_by(by_priority_then_newest);
    out
}

/// Open tasks, ordered like [`all`].
#[must_use]
pub fn active<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .into_iter()
        .filter(|t| !t.is_completed)
        .cloned()
        .collect();
    out.sort_by(by_priority_then_newest);
    out
}

/// Completed tasks, most recently completed first.
#[must_use]
pub fn completed<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .into_iter()
        .filter(|t| t.is_completed)
        .cloned()
        .collect();
    out.sort_by_key(|t| (Reverse(t.completed_at), Reverse(t.id)));
    out
}

/// Number of open tasks.
#[must_use]
pub fn active_count<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> usize {
    tasks.into_iter().filter(|t| !t.is_completed).count()
}

/// Number of completed tasks.
#[must_use]
pub fn completed_count<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> usize {
    tasks.into_iter().filter(|t| t.is_completed).count()
}

/// Tasks in the given category, ordered like [`all`].
#[must_use]
pub fn by_category<'a>(tasks: impl IntoIterator<Item = &'a Task>, category: &str) -> Vec<Task> {
    all(tasks.into_iter().filter(|t| t.category == category))
}

/// Tasks with the given priority, newest first.
#[must_use]
pub fn by_priority<'a>(tasks: impl IntoIterator<Item = &'a Task>, priority: Priority) -> Vec<Task> {
    all(tasks.into_iter().filter(|t| t.priority == priority))
}

/// Open tasks whose reminder falls in `(from, until]`, soonest first.
#[must_use]
pub fn reminders_between<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    from: i64,
    until: i64,
) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .into_iter()
        .filter(|t| !t.is_completed)
        .filter(|t| t.reminder_time.is_some_and(|r| r > from && r <= until))
        .cloned()
        .collect();
    out.sort_by_key(|t| (t.reminder_time, t.id));
    out
}
