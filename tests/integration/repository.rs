//! Integration tests for the write-through / read-through repository.
//!
//! Runs the repository over the in-memory store and remote, checking the
//! ordering of remote and local writes, the lookup fallback, the refresh
//! state, and the live views a list screen would bind to.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use todosync::remote::{InMemoryRemote, RemoteError};
use todosync::store::{InMemoryStore, LocalStore};
use todosync::tasks::{Priority, RefreshState, RepoError, Task, TaskRepository};
use todosync::view::{Tab, ViewState};

type Repo = TaskRepository<InMemoryStore, InMemoryRemote>;

fn repo() -> Repo {
    TaskRepository::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryRemote::new()))
}

fn offline() -> RemoteError {
    RemoteError::Transport("could not connect to server".to_string())
}

// ---------------------------------------------------------------------------
// Write-through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_create_stores_nothing() {
    let repo = repo();
    let all = repo.all();
    repo.remote().fail_with(offline());

    let err = repo.create(Task::new("Call mom", 0)).await.unwrap_err();

    assert!(matches!(err, RepoError::Remote(RemoteError::Transport(_))));
    assert_eq!(err.to_string(), "could not connect to server");
    assert!(repo.store().snapshot().is_empty());
    assert!(!all.has_changed());
    assert!(all.get().is_empty());
}

#[tokio::test]
async fn failed_update_keeps_local_copy() {
    let repo = repo();
    let task = repo.create(Task::new("draft", 0)).await.unwrap();
    repo.remote().fail_with(offline());

    let mut edited = task.clone();
    edited.title = "final".to_string();
    assert!(repo.update(edited).await.is_err());

    assert_eq!(repo.store().get(task.id).await.unwrap(), Some(task));
}

#[tokio::test]
async fn failed_delete_keeps_local_copy() {
    let repo = repo();
    let task = repo.create(Task::new("keep me", 0)).await.unwrap();
    repo.remote().fail_with(RemoteError::Http {
        status: 500,
        message: "failed to delete task".to_string(),
    });

    let err = repo.delete(task.id).await.unwrap_err();
    assert_eq!(err.to_string(), "failed to delete task");
    assert!(repo.store().get(task.id).await.unwrap().is_some());
}

#[tokio::test]
async fn update_writes_through_to_both_sides() {
    let repo = repo();
    let task = repo
        .create(Task::new("draft", 0).with_category("work"))
        .await
        .unwrap();

    let mut edited = task.clone().with_priority(Priority::High);
    edited.title = "final".to_string();
    repo.update(edited.clone()).await.unwrap();

    let local = repo.store().get(task.id).await.unwrap().unwrap();
    assert_eq!(local, edited);
    let remote = &repo.remote().tasks()[0];
    assert_eq!(remote.title, "final");
    assert_eq!(remote.priority, Priority::High);
}

#[tokio::test]
async fn toggle_sets_and_clears_completion_time() {
    let repo = repo();
    let task = repo.create(Task::new("Water plants", 0)).await.unwrap();
    assert_eq!(task.completed_at, None);

    repo.toggle(&task).await.unwrap();
    let done = repo.store().get(task.id).await.unwrap().unwrap();
    assert!(done.is_completed);
    assert!(done.completed_at.is_some());
    assert!(repo.remote().tasks()[0].is_completed);

    repo.toggle(&done).await.unwrap();
    let open = repo.store().get(task.id).await.unwrap().unwrap();
    assert!(!open.is_completed);
    assert_eq!(open.completed_at, None);
    assert!(!repo.remote().tasks()[0].is_completed);
}

#[tokio::test]
async fn cleared_reminder_stays_cleared_after_refresh() {
    let repo = repo();
    let task = repo
        .create(Task::new("Dentist", 0).with_reminder(Some(1_900_000_000_000)))
        .await
        .unwrap();
    assert!(repo.remote().tasks()[0].reminder_time.is_some());

    let cleared = repo.set_reminder(task.id, None).await.unwrap();
    assert_eq!(cleared.reminder_time, None);
    assert_eq!(repo.remote().tasks()[0].reminder_time, None);

    repo.refresh_all().await.unwrap();
    let local = repo.store().get(task.id).await.unwrap().unwrap();
    assert_eq!(local.reminder_time, None);
}

#[tokio::test]
async fn completing_a_task_unknown_locally_caches_it() {
    let repo = repo();
    let id = repo.remote().seed(Task::new("from the web", 0));

    repo.set_completed(id, true).await.unwrap();

    let cached = repo.store().get(id).await.unwrap().unwrap();
    assert!(cached.is_completed);
    assert!(cached.completed_at.is_some());
}

// ---------------------------------------------------------------------------
// Read-through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_falls_back_to_remote_and_persists() {
    let repo = repo();
    let id = repo
        .remote()
        .seed(Task::new("remote only", 0).with_priority(Priority::Low));
    assert!(repo.store().get(id).await.unwrap().is_none());

    let fetched = repo.get_by_id(id).await.unwrap();

    assert_eq!(fetched.title, "remote only");
    assert_eq!(repo.store().get(id).await.unwrap(), Some(fetched));
}

#[tokio::test]
async fn lookup_of_unknown_task_is_remote_not_found() {
    let repo = repo();
    let err = repo.get_by_id(99).await.unwrap_err();
    match err {
        RepoError::Remote(e) => assert!(e.is_not_found()),
        other => panic!("expected remote error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_state_tracks_failure_then_recovery() {
    let repo = repo();
    let mut states = repo.subscribe_refresh();
    assert_eq!(*states.borrow_and_update(), RefreshState::default());

    repo.remote().fail_with(offline());
    assert!(repo.refresh_all().await.is_err());
    assert!(states.has_changed().unwrap());
    let failed = states.borrow_and_update().clone();
    assert!(!failed.loading);
    assert_eq!(failed.last_error.as_deref(), Some("could not connect to server"));

    repo.remote().recover();
    repo.remote().seed(Task::new("a", 0));
    let report = repo.refresh_all().await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(repo.refresh_state(), RefreshState::default());
}

#[tokio::test]
async fn failed_refresh_keeps_cached_tasks() {
    let repo = repo();
    repo.create(Task::new("cached", 0)).await.unwrap();
    repo.remote().fail_with(offline());

    assert!(repo.refresh_all().await.is_err());
    assert_eq!(repo.all().get().len(), 1);
}

#[tokio::test]
async fn concurrent_refreshes_finish_not_loading() {
    let repo = Arc::new(repo());
    repo.remote().seed(Task::new("a", 0));

    let (a, b) = tokio::join!(repo.refresh_all(), repo.refresh_all());
    a.unwrap();
    b.unwrap();

    assert!(!repo.refresh_state().loading);
    assert_eq!(repo.store().snapshot().len(), 1);
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tabs_and_counts_follow_the_store() {
    let repo = repo();
    let low = repo
        .create(Task::new("low", 0).with_priority(Priority::Low))
        .await
        .unwrap();
    let high = repo
        .create(Task::new("high", 0).with_priority(Priority::High))
        .await
        .unwrap();

    let mut completed_count = repo.completed_count();
    repo.set_completed(high.id, true).await.unwrap();
    assert_eq!(completed_count.changed().await.unwrap(), 1);
    assert_eq!(repo.active_count().get(), 1);

    let snapshot = repo.store().snapshot();
    let active = Tab::Active.filter(snapshot.values());
    assert_eq!(active.iter().map(|t| t.id).collect::<Vec<_>>(), vec![low.id]);

    let view = ViewState::default().select_tab(Tab::Active).select(high.id);
    assert_eq!(view.retain_visible(&active).selected, None);

    let all: Vec<_> = repo.all().get().iter().map(|t| t.id).collect();
    assert_eq!(all, vec![high.id, low.id]);
    assert_eq!(repo.by_priority(Priority::Low).len(), 1);
    assert_eq!(repo.stats().completed, 1);
}
