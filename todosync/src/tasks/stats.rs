//! Completion, priority, and category statistics over a set of tasks.

use std::collections::HashMap;

use super::{Priority, Task};

/// Count of tasks in one priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityBucket {
    /// The bucket's priority.
    pub priority: Priority,
    /// Number of tasks with this priority.
    pub count: usize,
    /// Bar length as a percentage of the largest bucket (0 when all empty).
    pub relative_percent: u8,
}

/// Count of tasks in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    /// Category name.
    pub category: String,
    /// Number of tasks in it.
    pub count: usize,
}

/// Summary statistics for the chart screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Number of completed tasks.
    pub completed: usize,
    /// `completed * 100 / total`, truncated; 0 for an empty set.
    pub completion_rate: u8,
    /// One bucket per priority, high first.
    pub priorities: [PriorityBucket; 3],
    /// Categories by count, largest first, ties broken by name.
    pub categories: Vec<CategoryCount>,
}

impl TaskStats {
    /// Computes statistics over `tasks`.
    #[must_use]
    pub fn compute<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut total = 0usize;
        let mut completed = 0usize;
        let mut per_priority: HashMap<Priority, usize> = HashMap::new();
        let mut per_category: HashMap<&'a str, usize> = HashMap::new();

        for task in tasks {
            total += 1;
            if task.is_completed {
                completed += 1;
            }
            *per_priority.entry(task.priority).or_default() += 1;
            *per_category.entry(task.category.as_str()).or_default() += 1;
        }

        let max_bucket = per_priority.values().copied().max().unwrap_or(0);
        let priorities = Priority::ALL.map(|priority| {
            let count = per_priority.get(&priority).copied().unwrap_or(0);
            PriorityBucket {
                priority,
                count,
                relative_percent: percent(count, max_bucket),
            }
        });

        let mut categories: Vec<CategoryCount> = per_category
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

        Self {
            total,
            completed,
            completion_rate: percent(completed, total),
            priorities,
            categories,
        }
    }

    /// Returns the bucket for `priority`.
    #[must_use]
    pub fn bucket(&self, priority: Priority) -> PriorityBucket {
        self.priorities
            .iter()
            .copied()
            .find(|b| b.priority == priority)
            .unwrap_or(PriorityBucket {
                priority,
                count: 0,
                relative_percent: 0,
            })
    }
}

/// Integer percentage `part * 100 / whole`, 0 when `whole` is 0.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    u8::try_from(part.saturating_mul(100) / whole).unwrap_or(100)
}
