//! Reminder scheduling.
//!
//! The [`ReminderScheduler`] watches the reminder window of the local store
//! and hands every upcoming `(task id, reminder time)` pair to a
//! [`ReminderSink`] at most once. A reminder whose task is deleted,
//! completed, or moved to another time is withdrawn from the sink before it
//! fires. The sink is whatever actually raises the alarm (an OS
//! notification, a timer that prints, a test recorder).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

use todosync_proto::time::now_millis;

use crate::store::LocalStore;
use crate::tasks::{TaskId, query};

/// Default look-ahead window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// One reminder to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Task the reminder belongs to.
    pub task_id: TaskId,
    /// Task title at scheduling time.
    pub title: String,
    /// When the reminder should fire, epoch millis.
    pub at: i64,
}

/// Receiver of scheduled reminders.
///
/// A sink holds at most one pending reminder per task: scheduling a task
/// again replaces the earlier one.
pub trait ReminderSink: Send + Sync {
    /// Arranges for `reminder` to fire at `reminder.at`.
    fn schedule(&self, reminder: Reminder);

    /// Withdraws the pending reminder of `task_id`, if any.
    fn cancel(&self, task_id: TaskId);
}

/// A sink that waits until each reminder is due, then sends it on a channel.
///
/// Must be used from within a tokio runtime. Reminders already due are sent
/// immediately.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Reminder>,
    pending: Arc<Mutex<HashMap<TaskId, AbortHandle>>>,
}

impl ChannelSink {
    /// Creates a sink and the receiver due reminders arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Reminder>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
        };
        (sink, rx)
    }
}

impl ReminderSink for ChannelSink {
    fn schedule(&self, reminder: Reminder) {
        let tx = self.tx.clone();
        let task_id = reminder.task_id;
        let delay = u64::try_from(reminder.at.saturating_sub(now_millis())).unwrap_or(0);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let _ = tx.send(reminder);
        });

        let mut pending = self.pending.lock();
        pending.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = pending.insert(task_id, timer.abort_handle()) {
            previous.abort();
        }
    }

    fn cancel(&self, task_id: TaskId) {
        if let Some(handle) = self.pending.lock().remove(&task_id) {
            handle.abort();
        }
    }
}

/// Polls the store for reminders inside a look-ahead window.
pub struct ReminderScheduler<S, K> {
    store: Arc<S>,
    sink: Arc<K>,
    window_millis: i64,
    /// Reminder time last handed to the sink, per task.
    scheduled: HashMap<TaskId, i64>,
}

impl<S, K> ReminderScheduler<S, K>
where
    S: LocalStore + 'static,
    K: ReminderSink + 'static,
{
    /// Creates a scheduler looking `window` ahead of the current time.
    pub fn new(store: Arc<S>, sink: Arc<K>, window: Duration) -> Self {
        Self {
            store,
            sink,
            window_millis: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            scheduled: HashMap::new(),
        }
    }

    /// Schedules every reminder in `(now, now + window]` not scheduled
    /// before. Returns how many were handed to the sink.
    ///
    /// Pending reminders whose task was deleted, completed, or given another
    /// reminder time are cancelled first; a moved reminder is then
    /// scheduled again for its new time if that falls in the window.
    pub fn poll_once(&mut self, now: i64) -> usize {
        let snapshot = self.store.snapshot();
        let sink = &self.sink;

        self.scheduled.retain(|&id, &mut at| {
            if at <= now {
                return false;
            }
            let current = snapshot
                .get(&id)
                .filter(|task| !task.is_completed)
                .and_then(|task| task.reminder_time);
            if current == Some(at) {
                return true;
            }
            tracing::debug!(id, at, ?current, "withdrawing reminder");
            sink.cancel(id);
            false
        });

        let until = now.saturating_add(self.window_millis);
        let due = query::reminders_between(snapshot.values(), now, until);
        let mut count = 0;
        for task in due {
            let Some(at) = task.reminder_time else {
                continue;
            };
            if self.scheduled.insert(task.id, at).is_none() {
                tracing::debug!(id = task.id, at, "scheduling reminder");
                self.sink.schedule(Reminder {
                    task_id: task.id,
                    title: task.title,
                    at,
                });
                count += 1;
            }
        }
        count
    }

    /// Runs [`poll_once`](Self::poll_once) every `interval` and after every
    /// store change. Stop it by aborting the returned handle.
    pub fn spawn(mut self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut changes = self.store.subscribe();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = changes.changed() => {
                        if changed.is_err() {
                            tracing::debug!("store closed, stopping reminder scheduler");
                            break;
                        }
                    }
                }
                let scheduled = self.poll_once(now_millis());
                if scheduled > 0 {
                    tracing::info!(scheduled, "scheduled reminders");
                }
            }
        })
    }
}
