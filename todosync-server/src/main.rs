//! `todosync-server` -- reference implementation of the task REST API.
//!
//! An axum server keeping tasks in memory. Useful for local development of
//! the `todosync` client and for end-to-end tests.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8081
//! cargo run --bin todosync-server
//!
//! # Run on custom address
//! cargo run --bin todosync-server -- --bind 127.0.0.1:9000
//!
//! # Or via environment variable
//! TODOSYNC_SERVER_ADDR=127.0.0.1:9000 cargo run --bin todosync-server
//! ```

use std::sync::Arc;

use clap::Parser;
use todosync_server::api::{self, AppState};
use todosync_server::config::{ServerCliArgs, ServerConfig};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("todosync-server: {e}");
            std::process::exit(2);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        max_body_size = config.max_body_size,
        "starting todosync server"
    );

    let state = Arc::new(AppState::with_config(config.max_body_size));

    match api::start_server_with_state(&config.bind_addr.to_string(), state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "task server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "task server failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start task server");
            std::process::exit(1);
        }
    }
}
