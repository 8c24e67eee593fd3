//! Reconciliation of the local task table against a remote snapshot.
//!
//! The remote set is authoritative. [`plan`] is a pure diff over the two
//! sets; [`reconcile`] applies it to a [`LocalStore`] record by record.
//!
//! Applying is best effort: a record that fails to apply is logged and
//! counted, and the rest of the plan still runs. Running the same remote
//! set twice leaves the store unchanged the second time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DEFAULT_CATEGORY, Task, TaskId};
use crate::store::{LocalStore, StoreError, TaskTable};

/// What happens to the local-only `category` field when remote content
/// overwrites a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryPolicy {
    /// Keep the category already stored locally; new records get the default.
    #[default]
    Preserve,
    /// Reset every reconciled record to the default category.
    Discard,
}

impl CategoryPolicy {
    /// Maps the `preserve_category` config flag onto a policy.
    #[must_use]
    pub const fn from_preserve(preserve: bool) -> Self {
        if preserve { Self::Preserve } else { Self::Discard }
    }
}

/// Outcome counts of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Remote records added locally.
    pub inserted: usize,
    /// Local records overwritten with different remote content.
    pub updated: usize,
    /// Local records already identical to the remote ones.
    pub unchanged: usize,
    /// Local records removed because the remote no longer has them.
    pub deleted: usize,
    /// Records whose local write failed.
    pub failed: usize,
}

impl SyncReport {
    /// Whether reconciliation changed the local table.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} deleted",
            self.inserted, self.updated, self.deleted
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

/// The local writes needed to mirror a remote set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Records to insert.
    pub insert: Vec<Task>,
    /// Records to overwrite.
    pub update: Vec<Task>,
    /// Number of records that already match.
    pub unchanged: usize,
    /// Ids to delete.
    pub delete: Vec<TaskId>,
}

/// Diffs `local` against `remote`.
///
/// Remote records without an id are skipped; among duplicate remote ids
/// the last one wins.
///
/// A record that already exists locally keeps its local `created_at`, and
/// keeps its local `completed_at` while it stays completed. The server may
/// omit either timestamp, in which case conversion substitutes the fetch
/// time; keeping the local values makes a repeated refresh a no-op.
#[must_use]
pub fn plan(local: &TaskTable, remote: Vec<Task>, policy: CategoryPolicy) -> SyncPlan {
    let mut incoming: BTreeMap<TaskId, Task> = BTreeMap::new();
    for task in remote {
        if task.id == 0 {
            tracing::warn!(title = %task.title, "skipping remote task without id");
            continue;
        }
        incoming.insert(task.id, task);
    }

    let mut out = SyncPlan {
        delete: local
            .keys()
            .filter(|id| !incoming.contains_key(id))
            .copied()
            .collect(),
        ..SyncPlan::default()
    };
    for (id, mut task) in incoming {
        match local.get(&id) {
            Some(existing) => {
                task.category = match policy {
                    CategoryPolicy::Preserve => existing.category.clone(),
                    CategoryPolicy::Discard => DEFAULT_CATEGORY.to_string(),
                };
                task.created_at = existing.created_at;
                if task.is_completed && existing.is_completed {
                    task.completed_at = existing.completed_at;
                }
                if *existing == task {
                    out.unchanged += 1;
                } else {
                    out.update.push(task);
                }
            }
            None => {
                task.category = DEFAULT_CATEGORY.to_string();
                out.insert.push(task);
            }
        }
    }
    out
}

/// Brings `store` in line with `remote`, returning what changed.
pub async fn reconcile<S: LocalStore>(
    store: &S,
    remote: Vec<Task>,
    policy: CategoryPolicy,
) -> SyncReport {
    let plan = plan(&store.snapshot(), remote, policy);
    let mut report = SyncReport {
        unchanged: plan.unchanged,
        ..SyncReport::default()
    };

    for task in plan.insert {
        let id = task.id;
        let result = match store.insert(task.clone()).await {
            Err(StoreError::AlreadyExists(_)) => store.update(task).await,
            other => other.map(|_| ()),
        };
        match result {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to insert remote task locally");
                report.failed += 1;
            }
        }
    }

    for task in plan.update {
        let id = task.id;
        let result = match store.update(task.clone()).await {
            Err(StoreError::NotFound(_)) => store.insert(task).await.map(|_| ()),
            other => other,
        };
        match result {
            Ok(()) => report.updated += 1,
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to update local task");
                report.failed += 1;
            }
        }
    }

    for id in plan.delete {
        match store.delete(id).await {
            Ok(()) | Err(StoreError::NotFound(_)) => report.deleted += 1,
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to delete stale local task");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        inserted = report.inserted,
        updated = report.updated,
        deleted = report.deleted,
        failed = report.failed,
        "reconciled local store"
    );
    report
}
