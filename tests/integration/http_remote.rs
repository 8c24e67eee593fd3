//! End-to-end tests of the HTTP client against the reference server.
//!
//! Each test starts `todosync-server` in-process on an OS-assigned port and
//! drives it through [`HttpRemote`], either directly or behind a
//! [`TaskRepository`].

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use todosync::remote::http::DEFAULT_TIMEOUT;
use todosync::remote::{HttpRemote, RemoteError, RemoteService};
use todosync::store::{InMemoryStore, LocalStore};
use todosync::tasks::{Priority, Task, TaskRepository};
use todosync_proto::task::{CreateTaskRequest, UpdateTaskRequest, WirePriority};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Starts a server and returns a client pointed at it.
async fn start() -> (HttpRemote, tokio::task::JoinHandle<()>) {
    let (addr, handle) = todosync_server::api::start_server("127.0.0.1:0")
        .await
        .expect("failed to start task server");
    let remote = HttpRemote::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
    (remote, handle)
}

fn request(title: &str) -> CreateTaskRequest {
    CreateTaskRequest {
        title: title.to_string(),
        description: None,
        priority: None,
        deadline: None,
    }
}

// ---------------------------------------------------------------------------
// Remote calls
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_list_get() {
    let (remote, handle) = start().await;

    let created = remote
        .create(CreateTaskRequest {
            priority: Some(WirePriority::High),
            description: Some("2 litres".to_string()),
            ..request("Buy milk")
        })
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.priority, Priority::High);
    assert_eq!(created.description, "2 litres");
    assert!(!created.is_completed);

    let all = remote.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, created.id);

    let fetched = remote.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.title, "Buy milk");
    handle.abort();
}

#[tokio::test]
async fn complete_and_reopen() {
    let (remote, handle) = start().await;
    let task = remote.create(request("stretch")).await.unwrap();

    let done = remote.mark_complete(task.id).await.unwrap();
    assert!(done.is_completed);
    assert!(done.completed_at.is_some());

    let open = remote.mark_pending(task.id).await.unwrap();
    assert!(!open.is_completed);
    assert_eq!(open.completed_at, None);
    handle.abort();
}

#[tokio::test]
async fn update_keeps_unsent_fields() {
    let (remote, handle) = start().await;
    let task = remote
        .create(CreateTaskRequest {
            description: Some("keep".to_string()),
            ..request("draft")
        })
        .await
        .unwrap();

    let updated = remote
        .update(
            task.id,
            UpdateTaskRequest {
                title: Some("final".to_string()),
                ..UpdateTaskRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "final");
    assert_eq!(updated.description, "keep");
    handle.abort();
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let (remote, handle) = start().await;

    let err = remote.get_by_id(404).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "task 404 not found");

    let err = remote.delete(404).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    handle.abort();
}

#[tokio::test]
async fn empty_title_is_rejected_by_server() {
    let (remote, handle) = start().await;
    let err = remote.create(request("")).await.unwrap_err();
    assert!(matches!(err, RemoteError::Http { status: 400, .. }));
    assert_eq!(err.to_string(), "title must not be empty");
    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop a listener to find a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
    let err = remote.list_all().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

// ---------------------------------------------------------------------------
// Repository over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repository_round_trip_over_http() {
    let (remote, handle) = start().await;
    let remote = Arc::new(remote);
    let store = Arc::new(InMemoryStore::new());
    let repo = TaskRepository::new(Arc::clone(&store), Arc::clone(&remote));

    // Whole seconds survive the wire's second-precision deadline format.
    let reminder = 1_900_000_000_000;
    let created = repo
        .create(
            Task::new("Dentist", 0)
                .with_category("health")
                .with_reminder(Some(reminder)),
        )
        .await
        .unwrap();
    assert_eq!(created.category, "health");
    assert_eq!(created.reminder_time, Some(reminder));

    repo.toggle(&created).await.unwrap();
    assert!(remote.get_by_id(created.id).await.unwrap().is_completed);

    let other = remote.create(request("added elsewhere")).await.unwrap();
    let report = repo.refresh_all().await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.failed, 0);

    let local = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(local.category, "health");
    assert!(local.is_completed);
    assert!(store.get(other.id).await.unwrap().is_some());

    repo.delete(other.id).await.unwrap();
    assert!(store.get(other.id).await.unwrap().is_none());
    assert_eq!(remote.list_all().await.unwrap().len(), 1);
    handle.abort();
}

#[tokio::test]
async fn cleared_reminder_is_cleared_on_the_server() {
    let (remote, handle) = start().await;
    let remote = Arc::new(remote);
    let store = Arc::new(InMemoryStore::new());
    let repo = TaskRepository::new(Arc::clone(&store), Arc::clone(&remote));

    let created = repo
        .create(Task::new("Dentist", 0).with_reminder(Some(1_900_000_000_000)))
        .await
        .unwrap();
    repo.set_reminder(created.id, None).await.unwrap();
    assert_eq!(remote.get_by_id(created.id).await.unwrap().reminder_time, None);

    let report = repo.refresh_all().await.unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(store.get(created.id).await.unwrap().unwrap().reminder_time, None);
    handle.abort();
}

#[tokio::test]
async fn refresh_against_unreachable_server_keeps_cache() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut cached = Task::new("cached", 0);
    cached.id = 3;
    let store = Arc::new(InMemoryStore::with_tasks([cached]));
    let remote = HttpRemote::new(&format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
    let repo = TaskRepository::new(store, Arc::new(remote));

    assert!(repo.refresh_all().await.is_err());
    let state = repo.refresh_state();
    assert!(!state.loading);
    assert!(state.last_error.is_some());
    assert_eq!(repo.all().get().len(), 1);
}
