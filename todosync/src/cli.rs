//! Subcommands of the `todosync` binary and their execution.
//!
//! Commands run against a [`TaskRepository`] and write human-readable
//! output to any [`Write`], which keeps them testable without a terminal.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use todosync_proto::time::{self, now_millis};

use crate::config::ClientConfig;
use crate::reminders::{ChannelSink, ReminderScheduler};
use crate::remote::RemoteService;
use crate::store::LocalStore;
use crate::tasks::{Priority, RepoError, Task, TaskId, TaskRepository, TaskStats};
use crate::view::Tab;

/// Errors surfaced to the user by a subcommand.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A repository operation failed.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Writing output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// An argument could not be interpreted.
    #[error("{0}")]
    Usage(String),
}

/// A `todosync` subcommand.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List tasks.
    List {
        /// Only open tasks.
        #[arg(long, conflicts_with = "completed")]
        active: bool,
        /// Only completed tasks.
        #[arg(long)]
        completed: bool,
        /// Only tasks in this category.
        #[arg(long)]
        category: Option<String>,
        /// Only tasks with this priority.
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Show one task in detail.
    Show {
        /// Task id.
        id: TaskId,
    },
    /// Create a task.
    Add {
        /// Task title.
        title: String,
        /// Longer description.
        #[arg(short, long)]
        description: Option<String>,
        /// low, medium or high.
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Local category (never sent to the server).
        #[arg(long)]
        category: Option<String>,
        /// Reminder time: `+30m`, `+2h`, `+1d`, or `YYYY-MM-DDTHH:MM:SS` (UTC).
        #[arg(long)]
        remind_at: Option<String>,
    },
    /// Change a task's fields.
    Edit {
        /// Task id.
        id: TaskId,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(short, long)]
        description: Option<String>,
        /// New priority.
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a task.
    Rm {
        /// Task id.
        id: TaskId,
    },
    /// Mark a task completed.
    Done {
        /// Task id.
        id: TaskId,
    },
    /// Mark a task open again.
    Reopen {
        /// Task id.
        id: TaskId,
    },
    /// Set or clear a task's reminder.
    Remind {
        /// Task id.
        id: TaskId,
        /// `+30m`, `+2h`, `+1d`, `YYYY-MM-DDTHH:MM:SS` (UTC), or `none`.
        when: String,
    },
    /// Replace the local cache with the server's tasks.
    Refresh,
    /// Show completion, priority and category statistics.
    Stats,
    /// List open tasks with a reminder coming up.
    Reminders {
        /// Look-ahead in minutes (default from config).
        #[arg(long)]
        window_minutes: Option<u64>,
    },
    /// Keep running and print reminders as they come due.
    Watch,
}

impl Default for Command {
    fn default() -> Self {
        Self::List {
            active: false,
            completed: false,
            category: None,
            priority: None,
        }
    }
}

/// Parses a reminder argument relative to `now`.
///
/// Returns `Ok(None)` for `none`/`clear`.
///
/// # Errors
///
/// Returns [`CliError::Usage`] if the argument is not understood.
pub fn parse_when(raw: &str, now: i64) -> Result<Option<i64>, CliError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("clear") {
        return Ok(None);
    }
    if let Some(rel) = raw.strip_prefix('+') {
        let unit = rel.chars().next_back().unwrap_or('m');
        let amount: i64 = rel[..rel.len() - unit.len_utf8().min(rel.len())]
            .parse()
            .map_err(|_| CliError::Usage(format!("invalid relative time: {raw}")))?;
        let unit_millis = match unit {
            'm' => 60_000,
            'h' => 3_600_000,
            'd' => 86_400_000,
            _ => return Err(CliError::Usage(format!("unknown time unit in {raw} (use m, h or d)"))),
        };
        return Ok(Some(now.saturating_add(amount.saturating_mul(unit_millis))));
    }
    time::parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| CliError::Usage(format!("invalid time: {raw}")))
}

/// Runs one subcommand, writing its output to `out`.
///
/// Read commands first try to refresh the cache and fall back to cached
/// data, with a notice, when the server is unreachable.
///
/// # Errors
///
/// Returns [`CliError`] if the operation or writing its output failed.
pub async fn run<S, R>(
    repo: &TaskRepository<S, R>,
    config: &ClientConfig,
    command: Command,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    S: LocalStore + 'static,
    R: RemoteService,
{
    match command {
        Command::List {
            active,
            completed,
            category,
            priority,
        } => {
            refresh_or_notice(repo, out).await?;
            let tab = if active {
                Tab::Active
            } else if completed {
                Tab::Completed
            } else {
                Tab::All
            };
            let snapshot = repo.store().snapshot();
            let tasks: Vec<Task> = tab
                .filter(snapshot.values())
                .into_iter()
                .filter(|t| category.as_deref().is_none_or(|c| t.category == c))
                .filter(|t| priority.is_none_or(|p| t.priority == p))
                .collect();
            if tasks.is_empty() {
                writeln!(out, "no tasks")?;
            }
            for task in &tasks {
                writeln!(out, "{}", format_line(task))?;
            }
        }
        Command::Show { id } => {
            let task = repo.get_by_id(id).await?;
            write_details(&task, out)?;
        }
        Command::Add {
            title,
            description,
            priority,
            category,
            remind_at,
        } => {
            let now = now_millis();
            let reminder = remind_at.as_deref().map(|w| parse_when(w, now)).transpose()?.flatten();
            let task = Task::new(title, now)
                .with_description(description.unwrap_or_default())
                .with_priority(priority.unwrap_or_default())
                .with_category(category.as_deref().unwrap_or_default())
                .with_reminder(reminder);
            let created = repo.create(task).await?;
            writeln!(out, "created {}", format_line(&created))?;
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            category,
        } => {
            let mut task = repo.get_by_id(id).await?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            if let Some(category) = category {
                task = task.with_category(&category);
            }
            repo.update(task.clone()).await?;
            writeln!(out, "updated {}", format_line(&task))?;
        }
        Command::Rm { id } => {
            repo.delete(id).await?;
            writeln!(out, "deleted #{id}")?;
        }
        Command::Done { id } => {
            repo.set_completed(id, true).await?;
            writeln!(out, "completed #{id}")?;
        }
        Command::Reopen { id } => {
            repo.set_completed(id, false).await?;
            writeln!(out, "reopened #{id}")?;
        }
        Command::Remind { id, when } => {
            let when = parse_when(&when, now_millis())?;
            let task = repo.set_reminder(id, when).await?;
            match task.reminder_time {
                Some(at) => writeln!(out, "reminder for #{id} set to {}", format_time(at))?,
                None => writeln!(out, "reminder for #{id} cleared")?,
            }
        }
        Command::Refresh => {
            let report = repo.refresh_all().await?;
            writeln!(out, "refreshed: {report}")?;
        }
        Command::Stats => {
            refresh_or_notice(repo, out).await?;
            write_stats(&repo.stats(), out)?;
        }
        Command::Reminders { window_minutes } => {
            refresh_or_notice(repo, out).await?;
            let window = window_minutes.map_or(config.reminder_window, |m| Duration::from_secs(m * 60));
            let now = now_millis();
            let until = now.saturating_add(i64::try_from(window.as_millis()).unwrap_or(i64::MAX));
            let due = repo.reminders_between(now, until);
            if due.is_empty() {
                writeln!(out, "no reminders in the next {} minutes", window.as_secs() / 60)?;
            }
            for task in &due {
                let at = task.reminder_time.map(format_time).unwrap_or_default();
                writeln!(out, "{at}  #{} {}", task.id, task.title)?;
            }
        }
        Command::Watch => watch(repo, config, out).await?,
    }
    Ok(())
}

async fn refresh_or_notice<S, R>(
    repo: &TaskRepository<S, R>,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    S: LocalStore,
    R: RemoteService,
{
    if let Err(e) = repo.refresh_all().await {
        writeln!(out, "offline ({e}), showing cached tasks")?;
    }
    Ok(())
}

/// Prints reminders as they come due until interrupted with Ctrl-C.
async fn watch<S, R>(
    repo: &TaskRepository<S, R>,
    config: &ClientConfig,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    S: LocalStore + 'static,
    R: RemoteService,
{
    refresh_or_notice(repo, out).await?;
    let (sink, mut due) = ChannelSink::new();
    let scheduler = ReminderScheduler::new(Arc::clone(repo.store()), Arc::new(sink), config.reminder_window);
    let handle = scheduler.spawn(config.poll_interval);
    writeln!(out, "watching for reminders, press Ctrl-C to stop")?;
    out.flush()?;

    loop {
        tokio::select! {
            reminder = due.recv() => {
                let Some(reminder) = reminder else { break };
                writeln!(out, "REMINDER #{} {} ({})", reminder.task_id, reminder.title, format_time(reminder.at))?;
                out.flush()?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.abort();
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// One-line summary: `#3 [x] high   Title  (category)  @ reminder`.
#[must_use]
pub fn format_line(task: &Task) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    let mut line = format!(
        "#{} [{mark}] {:<6} {}  ({})",
        task.id,
        task.priority.to_string(),
        task.title,
        task.category
    );
    if let Some(at) = task.reminder_time {
        line.push_str("  @ ");
        line.push_str(&format_time(at));
    }
    line
}

fn write_details(task: &Task, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "#{} {}", task.id, task.title)?;
    if !task.description.is_empty() {
        writeln!(out, "  {}", task.description)?;
    }
    writeln!(out, "  priority:  {}", task.priority)?;
    writeln!(out, "  category:  {}", task.category)?;
    writeln!(out, "  created:   {}", format_time(task.created_at))?;
    match task.completed_at {
        Some(at) => writeln!(out, "  completed: {}", format_time(at))?,
        None => writeln!(out, "  status:    open")?,
    }
    if let Some(at) = task.reminder_time {
        writeln!(out, "  reminder:  {}", format_time(at))?;
    }
    Ok(())
}

fn write_stats(stats: &TaskStats, out: &mut impl Write) -> std::io::Result<()> {
    const BAR_WIDTH: usize = 30;
    writeln!(
        out,
        "{} tasks, {} completed ({}%)",
        stats.total, stats.completed, stats.completion_rate
    )?;
    for bucket in &stats.priorities {
        let filled = usize::from(bucket.relative_percent) * BAR_WIDTH / 100;
        writeln!(
            out,
            "  {:<6} {:>4} {}",
            bucket.priority.to_string(),
            bucket.count,
            "#".repeat(filled)
        )?;
    }
    for category in &stats.categories {
        writeln!(out, "  {:<16} {:>4}", category.category, category.count)?;
    }
    Ok(())
}
