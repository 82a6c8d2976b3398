//! Configuration for the `taskboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::{DueWindow, SortDirection, SortKey};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A setting has an unusable value.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Setting name as written in the config file.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    session: SessionFileConfig,
    board: BoardFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    file: Option<PathBuf>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    event_buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    pub api_base_url: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Where the session (token and cached identity) is persisted.
    pub session_file: PathBuf,
    /// Capacity of the board's event channel.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            session_file: default_session_file(),
            event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path
    /// (`~/.config/taskboard/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or if a resolved setting is unusable.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, &file);
        config.validate()?;
        Ok(config)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            api_base_url: cli
                .api_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.api_base_url),
            request_timeout: file
                .api
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            session_file: cli
                .session_file
                .clone()
                .or_else(|| file.session.file.clone())
                .unwrap_or(defaults.session_file),
            event_buffer: file.board.event_buffer.unwrap_or(defaults.event_buffer),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "api.request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "board.event_buffer",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Kanban task board for the project-management API")]
pub struct CliArgs {
    /// Base URL of the REST API.
    #[arg(long, env = "TASKBOARD_API_URL")]
    pub api_url: Option<String>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the session file (default: `<data dir>/taskboard/session.json`).
    #[arg(long, env = "TASKBOARD_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Command to run (default: `board`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Client commands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and store a session.
    Login {
        /// Account email.
        #[arg(long, env = "TASKBOARD_EMAIL")]
        email: String,
        /// Account password.
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session.
    Logout,
    /// Show the signed-in identity and session state.
    Whoami,
    /// Show the three board columns with counts.
    Board {
        /// Only tasks of this project.
        #[arg(long)]
        project: Option<String>,
        /// Which task list to load.
        #[arg(long, value_enum, default_value_t = ScopeArg::All)]
        scope: ScopeArg,
    },
    /// List tasks with filters and sorting.
    Tasks(TaskFilterArgs),
    /// Move a task to another column.
    Move {
        /// Task id.
        task_id: String,
        /// Destination column (`not-started`, `in-progress`, `completed`).
        column: String,
    },
    /// Mark a task complete.
    Complete {
        /// Task id.
        task_id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        task_id: String,
    },
}

/// Task list selection on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeArg {
    /// Every visible task.
    #[default]
    All,
    /// Tasks assigned to me.
    Assigned,
    /// Tasks I created.
    Created,
}

/// Arguments of the `tasks` command.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilterArgs {
    /// Case-insensitive title search.
    #[arg(long)]
    pub search: Option<String>,
    /// Status (`not-started`, `in-progress`, `completed`, or a raw status).
    #[arg(long)]
    pub status: Option<String>,
    /// Priority (`low`, `medium`, `high`).
    #[arg(long)]
    pub priority: Option<String>,
    /// Project id.
    #[arg(long)]
    pub project: Option<String>,
    /// Deadline window.
    #[arg(long, value_enum)]
    pub due: Option<DueWindow>,
    /// Hide completed tasks.
    #[arg(long)]
    pub hide_completed: bool,
    /// Sort key.
    #[arg(long, value_enum, default_value_t = SortKey::Deadline)]
    pub sort: SortKey,
    /// Sort direction.
    #[arg(long, value_enum, default_value_t = SortDirection::Asc)]
    pub direction: SortDirection,
    /// Which task list to load.
    #[arg(long, value_enum, default_value_t = ScopeArg::All)]
    pub scope: ScopeArg,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `<data dir>/taskboard/session.json`, or the temp dir when the platform
/// has no data directory.
fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskboard")
        .join("session.json")
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskboard").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
