//! Integration tests for reconciling the local cache with the remote set.
//!
//! Covers the replace-with-remote semantics, idempotency, category
//! handling, per-record failures, persistence of the reconciled table, and
//! live queries observing the result.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use todosync::remote::InMemoryRemote;
use todosync::remote::convert::task_from_wire;
use todosync::store::{InMemoryStore, LocalStore, Snapshot, StoreError};
use todosync::tasks::{
    CategoryPolicy, DEFAULT_CATEGORY, Priority, Task, TaskId, TaskRepository, reconcile,
};
use todosync_proto::task::TaskResponse;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn task(id: TaskId, title: &str) -> Task {
    let mut t = Task::new(title, 1_000);
    t.id = id;
    t
}

fn ids(store: &InMemoryStore) -> Vec<TaskId> {
    store.snapshot().keys().copied().collect()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "todosync-it-{}-{name}.json",
        std::process::id()
    ))
}

/// Store whose writes to one id always fail.
struct FlakyStore {
    inner: InMemoryStore,
    broken: TaskId,
}

impl FlakyStore {
    fn check(&self, id: TaskId) -> Result<(), StoreError> {
        if id == self.broken {
            Err(StoreError::Persist(format!("disk full writing task {id}")))
        } else {
            Ok(())
        }
    }
}

impl LocalStore for FlakyStore {
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.get(id).await
    }

    async fn insert(&self, task: Task) -> Result<TaskId, StoreError> {
        self.check(task.id)?;
        self.inner.insert(task).await
    }

    async fn update(&self, task: Task) -> Result<(), StoreError> {
        self.check(task.id)?;
        self.inner.update(task).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.delete(id).await
    }

    async fn set_completion(
        &self,
        id: TaskId,
        completed: bool,
        completed_at: Option<i64>,
    ) -> Result<(), StoreError> {
        self.check(id)?;
        self.inner.set_completion(id, completed, completed_at).await
    }

    fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_becomes_exactly_the_remote_set() {
    let store = InMemoryStore::with_tasks([
        task(1, "local one"),
        task(2, "local two"),
        task(3, "local three"),
    ]);
    let remote = vec![
        task(2, "remote two"),
        task(3, "remote three"),
        task(4, "remote four"),
    ];

    let report = reconcile(&store, remote, CategoryPolicy::Preserve).await;

    assert_eq!(ids(&store), vec![2, 3, 4]);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.updated, 2);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 0);

    let snapshot = store.snapshot();
    assert_eq!(snapshot[&2].title, "remote two");
    assert_eq!(snapshot[&3].title, "remote three");
    assert_eq!(snapshot[&4].title, "remote four");
    assert!(store.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn second_reconcile_changes_nothing() {
    let store = InMemoryStore::with_tasks([task(1, "a")]);
    let remote = vec![task(1, "a2"), task(2, "b").with_priority(Priority::High)];

    let first = reconcile(&store, remote.clone(), CategoryPolicy::Preserve).await;
    assert!(first.changed());
    let after_first = store.snapshot();

    let mut rx = store.subscribe();
    rx.borrow_and_update();
    let second = reconcile(&store, remote, CategoryPolicy::Preserve).await;

    assert!(!second.changed());
    assert_eq!(second.unchanged, 2);
    assert_eq!(store.snapshot(), after_first);
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn empty_remote_clears_local() {
    let store = InMemoryStore::with_tasks([task(1, "a"), task(2, "b")]);
    let report = reconcile(&store, Vec::new(), CategoryPolicy::Preserve).await;
    assert_eq!(report.deleted, 2);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn category_survives_refresh_under_preserve() {
    let store = Arc::new(InMemoryStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    let repo = TaskRepository::new(Arc::clone(&store), Arc::clone(&remote));

    let created = repo
        .create(Task::new("Plan trip", 0).with_category("travel"))
        .await
        .unwrap();
    remote.seed(Task::new("From another device", 0));

    repo.refresh_all().await.unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot[&created.id].category, "travel");
    let other = snapshot.values().find(|t| t.title == "From another device").unwrap();
    assert_eq!(other.category, DEFAULT_CATEGORY);
}

#[tokio::test]
async fn category_is_reset_under_discard() {
    let store = Arc::new(InMemoryStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    let preserving = TaskRepository::new(Arc::clone(&store), Arc::clone(&remote));
    let created = preserving
        .create(Task::new("Plan trip", 0).with_category("travel"))
        .await
        .unwrap();
    remote.seed({
        let mut t = Task::new("Plan trip, renamed", 0);
        t.id = created.id;
        t
    });

    let discarding = TaskRepository::new(Arc::clone(&store), remote)
        .with_category_policy(CategoryPolicy::Discard);
    discarding.refresh_all().await.unwrap();

    let stored = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Plan trip, renamed");
    assert_eq!(stored.category, DEFAULT_CATEGORY);
}

#[tokio::test]
async fn live_list_observes_reconcile() {
    let store = Arc::new(InMemoryStore::with_tasks([task(1, "old")]));
    let remote = Arc::new(InMemoryRemote::with_tasks([task(5, "new")]));
    let repo = TaskRepository::new(Arc::clone(&store), remote);

    let mut all = repo.all();
    assert_eq!(all.get().len(), 1);

    repo.refresh_all().await.unwrap();
    let latest = all.changed().await.unwrap();
    let titles: Vec<&str> = latest.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["new"]);
}

#[tokio::test]
async fn reconciled_table_is_persisted() {
    let path = temp_path("reconcile-persist");
    let _ = std::fs::remove_file(&path);

    {
        let store = InMemoryStore::open(&path).await.unwrap();
        store.insert(task(1, "stale")).await.unwrap();
        reconcile(
            &store,
            vec![task(7, "fresh"), task(8, "also fresh")],
            CategoryPolicy::Preserve,
        )
        .await;
    }

    let reopened = InMemoryStore::open(&path).await.unwrap();
    assert_eq!(ids(&reopened), vec![7, 8]);
    assert_eq!(reopened.get(7).await.unwrap().unwrap().title, "fresh");

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn one_failing_record_does_not_stop_the_rest() {
    // Local {1, 2, 3} against remote {2', 3, 4}: 1 is deleted, 2 updated,
    // 3 unchanged, 4 inserted. Break each write in turn.
    for broken in [1, 2, 4] {
        let store = FlakyStore {
            inner: InMemoryStore::with_tasks([
                task(1, "local one"),
                task(2, "local two"),
                task(3, "local three"),
            ]),
            broken,
        };
        let remote = vec![
            task(2, "remote two"),
            task(3, "local three"),
            task(4, "remote four"),
        ];

        let report = reconcile(&store, remote, CategoryPolicy::Preserve).await;

        assert_eq!(report.failed, 1, "broken id {broken}");
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.deleted, usize::from(broken != 1));
        assert_eq!(report.updated, usize::from(broken != 2));
        assert_eq!(report.inserted, usize::from(broken != 4));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.contains_key(&1), broken == 1);
        assert_eq!(snapshot.contains_key(&4), broken != 4);
        let expected_two = if broken == 2 { "local two" } else { "remote two" };
        assert_eq!(snapshot[&2].title, expected_two);
        assert_eq!(snapshot[&3].title, "local three");
    }
}

#[tokio::test]
async fn records_without_timestamps_settle_after_one_refresh() {
    let record = |id: i64, status: &str| TaskResponse {
        id: Some(id),
        title: format!("task {id}"),
        status: Some(status.to_string()),
        ..TaskResponse::default()
    };
    let fetch = |now: i64| {
        vec![
            task_from_wire(record(1, "PENDING"), now),
            task_from_wire(record(2, "COMPLETED"), now),
        ]
    };

    let store = InMemoryStore::new();
    let first = reconcile(&store, fetch(1_000), CategoryPolicy::Preserve).await;
    assert_eq!(first.inserted, 2);

    let rx = store.subscribe();
    let second = reconcile(&store, fetch(2_000), CategoryPolicy::Preserve).await;
    assert!(!second.changed());
    assert_eq!(second.unchanged, 2);
    assert!(!rx.has_changed().unwrap());
    assert_eq!(store.get(2).await.unwrap().unwrap().completed_at, Some(1_000));
}
