//! `todosync` -- command-line task list synchronized with a REST server.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/todosync/config.toml`).
//!
//! ```bash
//! # Start the reference server
//! cargo run --bin todosync-server
//!
//! # Add and list tasks
//! cargo run --bin todosync -- add "Water plants" --priority high --remind-at +2h
//! cargo run --bin todosync -- list --active
//!
//! # Point at another server
//! TODOSYNC_URL=http://tasks.example.com cargo run --bin todosync -- refresh
//! ```

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use todosync::cli::{self, CliError};
use todosync::config::{CliArgs, ClientConfig};
use todosync::remote::HttpRemote;
use todosync::store::InMemoryStore;
use todosync::tasks::TaskRepository;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file so command output on stdout stays clean.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(base_url = %config.base_url, data_file = %config.data_file.display(), "todosync starting");

    match run(config, cli.command.unwrap_or_default()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ClientConfig, command: cli::Command) -> Result<(), CliError> {
    let store = InMemoryStore::open(&config.data_file)
        .await
        .map_err(|e| CliError::Repo(e.into()))?;
    let remote = HttpRemote::new(&config.base_url, config.timeout).map_err(|e| CliError::Repo(e.into()))?;
    let repo = TaskRepository::new(Arc::new(store), Arc::new(remote))
        .with_category_policy(config.category_policy);

    let mut stdout = io::stdout().lock();
    cli::run(&repo, &config, command, &mut stdout).await?;
    stdout.flush()?;
    Ok(())
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("todosync.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
