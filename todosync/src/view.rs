//! Presentation state for list screens.
//!
//! Pure values with pure transitions: each method returns the next state
//! and never touches the repository.

use std::fmt;

use crate::tasks::{Task, TaskId, query};

/// Which list is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    /// Every task.
    #[default]
    All,
    /// Open tasks only.
    Active,
    /// Completed tasks only.
    Completed,
}

impl Tab {
    /// Tabs in display order.
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// Applies this tab's filter and ordering to `tasks`.
    #[must_use]
    pub fn filter<'a>(self, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
        match self {
            Self::All => query::all(tasks),
            Self::Active => query::active(tasks),
            Self::Completed => query::completed(tasks),
        }
    }

    /// The tab after this one, wrapping around.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Completed,
            Self::Completed => Self::All,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Active => write!(f, "Active"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

/// The selected tab and task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    /// Current tab.
    pub tab: Tab,
    /// Task whose details are open, if any.
    pub selected: Option<TaskId>,
}

impl ViewState {
    /// Switches tab. The selection is cleared since it may not be visible.
    #[must_use]
    pub const fn select_tab(self, tab: Tab) -> Self {
        Self {
            tab,
            selected: None,
        }
    }

    /// Opens the details of `id`.
    #[must_use]
    pub const fn select(self, id: TaskId) -> Self {
        Self {
            selected: Some(id),
            ..self
        }
    }

    /// Closes the details view.
    #[must_use]
    pub const fn clear_selection(self) -> Self {
        Self {
            selected: None,
            ..self
        }
    }

    /// Drops the selection if the task is no longer in `visible`.
    #[must_use]
    pub fn retain_visible(self, visible: &[Task]) -> Self {
        match self.selected {
            Some(id) if !visible.iter().any(|t| t.id == id) => self.clear_selection(),
            _ => self,
        }
    }
}
