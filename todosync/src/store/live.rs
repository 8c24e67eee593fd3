//! Live query subscriptions over the local task table.
//!
//! A [`LiveQuery`] pairs a table subscription with a projection (for
//! example "active tasks, ordered"). Each new snapshot pushed by the store
//! re-runs the projection, whichever operation caused the change.

use std::sync::Arc;

use tokio::sync::watch;

use super::{Snapshot, StoreError, TaskTable};

type Projection<T> = Arc<dyn Fn(&TaskTable) -> T + Send + Sync>;

/// A subscription that yields a fresh query result on every table change.
pub struct LiveQuery<T> {
    rx: watch::Receiver<Snapshot>,
    project: Projection<T>,
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            project: Arc::clone(&self.project),
        }
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("rows", &self.rx.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<T> LiveQuery<T> {
    /// Creates a live query from a table subscription and a projection.
    pub fn new(
        rx: watch::Receiver<Snapshot>,
        project: impl Fn(&TaskTable) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            rx,
            project: Arc::new(project),
        }
    }

    /// Evaluates the query against the latest snapshot.
    #[must_use]
    pub fn get(&self) -> T {
        let snapshot = Arc::clone(&self.rx.borrow());
        (self.project)(&snapshot)
    }

    /// Waits for the table to change, then returns the new query result.
    ///
    /// Changes published between calls are coalesced: only the latest
    /// snapshot is observed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] if the store has been dropped.
    pub async fn changed(&mut self) -> Result<T, StoreError> {
        self.rx.changed().await.map_err(|_| StoreError::Closed)?;
        let snapshot = Arc::clone(&self.rx.borrow_and_update());
        Ok((self.project)(&snapshot))
    }

    /// Whether a change has been published since the last [`changed`](Self::changed).
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
