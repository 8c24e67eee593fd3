//! Startup settings for the task server.
//!
//! Each setting is taken from the first source that has it: a command-line
//! flag (or its environment variable), then `config.toml` in the
//! `todosync-server` config directory, then the built-in value. The file
//! looks like:
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:8081"
//! max_body_size = 65536
//!
//! [log]
//! level = "debug"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_MAX_BODY_SIZE;

/// Address the server listens on when nothing else is configured.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";

/// Why the server settings could not be assembled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file exists (or was named explicitly) but is unreadable.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// File that was read.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for this server.
    #[error("invalid settings file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The listen address is not `host:port` with a numeric host.
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        /// Rejected value.
        value: String,
        /// Parser failure.
        source: std::net::AddrParseError,
    },

    /// A zero body limit would reject every create and update.
    #[error("max_body_size must be at least 1 byte")]
    ZeroBodyLimit,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    server: ListenSection,
    log: LogSection,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ListenSection {
    bind_addr: Option<String>,
    max_body_size: Option<usize>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

/// Command-line flags of `todosync-server`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "In-memory task server speaking the todosync REST API")]
pub struct ServerCliArgs {
    /// Listen address, e.g. `127.0.0.1:8081`.
    #[arg(short, long, env = "TODOSYNC_SERVER_ADDR")]
    pub bind: Option<String>,

    /// Settings file to use instead of the per-user one.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "TODOSYNC_SERVER_MAX_BODY")]
    pub max_body_size: Option<usize>,

    /// Tracing filter such as `info` or `todosync_server=debug`.
    #[arg(long, env = "TODOSYNC_SERVER_LOG")]
    pub log_level: Option<String>,
}

/// Settings the server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket the task API is served on.
    pub bind_addr: SocketAddr,
    /// Requests with a larger body get `413 Payload Too Large`.
    pub max_body_size: usize,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the settings file and merges it under the command-line flags.
    ///
    /// A missing per-user file is fine; a missing `--config` file is not.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]: an unreadable or malformed file, a bad listen
    /// address, or a zero body limit.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, file)
    }

    fn resolve(cli: &ServerCliArgs, file: SettingsFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match cli.bind.clone().or(file.server.bind_addr) {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::BindAddr { value, source })?,
            None => defaults.bind_addr,
        };
        let max_body_size = cli
            .max_body_size
            .or(file.server.max_body_size)
            .unwrap_or(defaults.max_body_size);
        if max_body_size == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }

        Ok(Self {
            bind_addr,
            max_body_size,
            log_level: cli
                .log_level
                .clone()
                .or(file.log.level)
                .unwrap_or(defaults.log_level),
        })
    }
}

fn load_config_file(explicit: Option<&Path>) -> Result<SettingsFile, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match dirs::config_dir() {
            Some(dir) => (dir.join("todosync-server").join("config.toml"), false),
            None => return Ok(SettingsFile::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(SettingsFile::default())
        }
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
