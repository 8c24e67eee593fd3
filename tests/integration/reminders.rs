//! Integration tests for the reminder window and scheduler.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use todosync::reminders::{ChannelSink, DEFAULT_WINDOW, Reminder, ReminderScheduler, ReminderSink};
use todosync::remote::InMemoryRemote;
use todosync::store::{InMemoryStore, LocalStore};
use todosync::tasks::{Task, TaskId, TaskRepository};
use todosync_proto::time::now_millis;

const MINUTE: i64 = 60_000;
const HOUR: i64 = 60 * MINUTE;

type Repo = TaskRepository<InMemoryStore, InMemoryRemote>;

fn repo() -> Repo {
    TaskRepository::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryRemote::new()))
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Reminder>>);

impl ReminderSink for Recorder {
    fn schedule(&self, reminder: Reminder) {
        self.0.lock().push(reminder);
    }

    fn cancel(&self, task_id: TaskId) {
        self.0.lock().retain(|r| r.task_id != task_id);
    }
}

fn task_with_reminder(id: TaskId, at: i64) -> Task {
    let mut task = Task::new(format!("task-{id}"), 0).with_reminder(Some(at));
    task.id = id;
    task
}

#[tokio::test]
async fn reminder_in_window_until_completed() {
    let repo = repo();
    let now = now_millis();
    let task = repo
        .create(Task::new("Take pills", now).with_reminder(Some(now + 30 * MINUTE)))
        .await
        .unwrap();

    let due = repo.reminders_between(now, now + HOUR);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, task.id);

    repo.set_completed(task.id, true).await.unwrap();
    assert!(repo.reminders_between(now, now + HOUR).is_empty());
}

#[tokio::test]
async fn window_bounds_are_exclusive_then_inclusive() {
    let repo = repo();
    let now = 1_000 * HOUR;
    for (title, at) in [("at now", now), ("at edge", now + HOUR), ("past edge", now + HOUR + 1_000)] {
        repo.create(Task::new(title, 0).with_reminder(Some(at)))
            .await
            .unwrap();
    }

    let titles: Vec<String> = repo
        .reminders_between(now, now + HOUR)
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["at edge".to_string()]);
}

#[tokio::test]
async fn scheduler_hands_each_reminder_over_once() {
    let repo = repo();
    let now = 1_000 * HOUR;
    let soon = repo
        .create(Task::new("soon", 0).with_reminder(Some(now + 10 * MINUTE)))
        .await
        .unwrap();
    repo.create(Task::new("later", 0).with_reminder(Some(now + 3 * HOUR)))
        .await
        .unwrap();

    let sink = Arc::new(Recorder::default());
    let mut scheduler =
        ReminderScheduler::new(Arc::clone(repo.store()), Arc::clone(&sink), DEFAULT_WINDOW);

    assert_eq!(scheduler.poll_once(now), 1);
    assert_eq!(scheduler.poll_once(now + MINUTE), 0);

    let recorded = sink.0.lock().clone();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].task_id, soon.id);
    assert_eq!(recorded[0].title, "soon");
    assert_eq!(recorded[0].at, now + 10 * MINUTE);
}

#[tokio::test]
async fn spawned_scheduler_delivers_due_reminder() {
    let repo = repo();
    let (sink, mut due) = ChannelSink::new();
    let handle = ReminderScheduler::new(Arc::clone(repo.store()), Arc::new(sink), DEFAULT_WINDOW)
        .spawn(Duration::from_secs(60));

    // The wire keeps whole seconds, so aim for a whole second shortly ahead.
    let at = (now_millis() / 1_000 + 2) * 1_000;
    let task = repo
        .create(Task::new("stand up", 0).with_reminder(Some(at)))
        .await
        .unwrap();

    let reminder = tokio::time::timeout(Duration::from_secs(5), due.recv())
        .await
        .expect("reminder was not delivered")
        .unwrap();
    assert_eq!(reminder.task_id, task.id);
    assert_eq!(reminder.at, at);
    handle.abort();
}

#[tokio::test]
async fn moved_reminder_is_delivered_once_at_the_new_time() {
    let now = now_millis();
    let store = Arc::new(InMemoryStore::with_tasks([task_with_reminder(1, now + 300)]));
    let (sink, mut due) = ChannelSink::new();
    let mut scheduler = ReminderScheduler::new(Arc::clone(&store), Arc::new(sink), DEFAULT_WINDOW);
    assert_eq!(scheduler.poll_once(now), 1);

    let moved = now + 800;
    store.update(task_with_reminder(1, moved)).await.unwrap();
    assert_eq!(scheduler.poll_once(now_millis()), 1);

    let reminder = tokio::time::timeout(Duration::from_secs(3), due.recv())
        .await
        .expect("reminder was not delivered")
        .unwrap();
    assert_eq!(reminder.at, moved);
    let extra = tokio::time::timeout(Duration::from_millis(500), due.recv()).await;
    assert!(extra.is_err(), "old reminder time also fired");
}

#[tokio::test]
async fn completed_task_reminder_never_fires() {
    let now = now_millis();
    let store = Arc::new(InMemoryStore::with_tasks([
        task_with_reminder(1, now + 300),
        task_with_reminder(2, now + 300),
    ]));
    let (sink, mut due) = ChannelSink::new();
    let mut scheduler = ReminderScheduler::new(Arc::clone(&store), Arc::new(sink), DEFAULT_WINDOW);
    assert_eq!(scheduler.poll_once(now), 2);

    store.set_completion(1, true, Some(now)).await.unwrap();
    store.delete(2).await.unwrap();
    scheduler.poll_once(now_millis());

    let delivered = tokio::time::timeout(Duration::from_secs(1), due.recv()).await;
    assert!(delivered.is_err(), "withdrawn reminder fired");
}
