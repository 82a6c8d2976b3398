//! `taskboard`: kanban board for the project-management API.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! taskboard login --email me@example.com --password secret
//! taskboard board --scope assigned
//! taskboard move 64f1c0 in-progress
//! taskboard tasks --due week --sort priority
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::api::http::HttpTaskService;
use taskboard::api::{ApiError, TaskScope, TaskSource};
use taskboard::auth::{AuthError, FileTokenStore, IdentityResolver, SessionState, is_creator};
use taskboard::board::{
    BoardEvent, Column, Columns, DragDrop, DropLocation, TaskBoard, TransitionOutcome,
};
use taskboard::config::{CliArgs, ClientConfig, Command, ScopeArg, TaskFilterArgs};
use taskboard::filter::TaskQuery;
use taskboard::notify::{ChannelNotifier, Notification, NotificationKind};
use taskboard_proto::task::{Priority, Task, TaskId, TaskStatus};

type Service = HttpTaskService<FileTokenStore>;
type Board = TaskBoard<Arc<Service>, ChannelNotifier>;

/// Errors surfaced to the user by the binary.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("session expired, sign in again with `taskboard login`")]
    SessionExpired,
    #[error("{0}")]
    Usage(String),
    #[error("another operation is in flight for task {0}")]
    Busy(TaskId),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(api = %config.api_base_url, "taskboard starting");

    let command = cli.command.unwrap_or(Command::Board {
        project: None,
        scope: ScopeArg::All,
    });
    let result = run(command, &config).await;

    tracing::info!("taskboard exiting");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_env("TASKBOARD_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, config: &ClientConfig) -> Result<(), CliError> {
    let resolver = Arc::new(IdentityResolver::new(FileTokenStore::new(
        config.session_file.clone(),
    )));
    let service = Arc::new(HttpTaskService::new(
        &config.api_base_url,
        config.request_timeout,
        Arc::clone(&resolver),
    )?);

    match command {
        Command::Login { email, password } => {
            let identity = service.login(&email, &password).await?;
            println!("Signed in as {} <{}>", identity.display_name(), identity.email);
        }
        Command::Logout => {
            resolver.end_session();
            println!("Signed out");
        }
        Command::Whoami => whoami(&resolver),
        Command::Board { project, scope } => {
            require_session(&resolver)?;
            let scope = project.map_or_else(|| task_scope(scope), TaskScope::Project);
            let tasks = service.fetch_tasks(&scope).await?;
            print_columns(&Columns::partition(&tasks));
        }
        Command::Tasks(args) => {
            require_session(&resolver)?;
            let tasks = service.fetch_tasks(&task_scope(args.scope)).await?;
            let today = chrono::Local::now().date_naive();
            let listed = task_query(&args).apply(&tasks, today);
            for task in &listed {
                println!("{}", task_line(task));
            }
            println!("{} of {} tasks", listed.len(), tasks.len());
        }
        Command::Move { task_id, column } => {
            let target = Column::from_name(&column)
                .ok_or_else(|| CliError::Usage(format!("unknown column `{column}`")))?;
            let task_id = TaskId::new(task_id);
            let (board, mut events, mut notes) = open_board(&service, &resolver, config).await?;
            let (source, index) = locate(&board, &task_id)?;
            let slot = if source == target {
                index
            } else {
                board.count(target)
            };
            let outcome = board
                .drop_task(DragDrop {
                    task_id: task_id.clone(),
                    source: DropLocation::new(source, index),
                    destination: Some(DropLocation::new(target, slot)),
                })
                .await;
            finish(&service, &board, &mut events, &mut notes, &task_id, outcome).await?;
        }
        Command::Complete { task_id } => {
            let task_id = TaskId::new(task_id);
            let (board, mut events, mut notes) = open_board(&service, &resolver, config).await?;
            locate(&board, &task_id)?;
            let outcome = board.complete_task(&task_id).await;
            finish(&service, &board, &mut events, &mut notes, &task_id, outcome).await?;
        }
        Command::Delete { task_id } => {
            let task_id = TaskId::new(task_id);
            let (board, mut events, mut notes) = open_board(&service, &resolver, config).await?;
            locate(&board, &task_id)?;
            let columns = board.columns();
            if let Some(identity) = resolver.current_identity()
                && let Some(task) = columns.find(&task_id)
                && !is_creator(task, &identity)
            {
                println!("note: you did not create this task; the server may refuse the delete");
            }
            let outcome = board.delete_task(&task_id).await;
            finish(&service, &board, &mut events, &mut notes, &task_id, outcome).await?;
        }
    }
    Ok(())
}

fn whoami(resolver: &IdentityResolver<FileTokenStore>) {
    let state = resolver.check_session();
    if state == SessionState::Expired {
        println!("Session expired");
        return;
    }
    match resolver.current_identity() {
        Some(identity) => {
            println!("{} <{}>", identity.display_name(), identity.email);
            println!("id:      {}", identity.id);
            if !identity.role.is_empty() {
                println!("role:    {}", identity.role);
            }
            println!("session: {state}");
        }
        None => println!("Not signed in"),
    }
}

/// Fails unless a non-expired session is stored.
fn require_session(resolver: &IdentityResolver<FileTokenStore>) -> Result<(), CliError> {
    match resolver.check_session() {
        SessionState::Active => Ok(()),
        SessionState::Missing => Err(AuthError::NotAuthenticated.into()),
        SessionState::Expired => Err(CliError::SessionExpired),
    }
}

const fn task_scope(scope: ScopeArg) -> TaskScope {
    match scope {
        ScopeArg::All => TaskScope::All,
        ScopeArg::Assigned => TaskScope::Assigned,
        ScopeArg::Created => TaskScope::Created,
    }
}

fn task_query(args: &TaskFilterArgs) -> TaskQuery {
    TaskQuery {
        search: args.search.clone(),
        status: args.status.as_deref().map(|s| {
            Column::from_name(s).map_or_else(|| TaskStatus::parse(s), Column::status)
        }),
        priority: args.priority.as_deref().map(Priority::parse),
        project: args.project.clone(),
        due: args.due,
        show_completed: !args.hide_completed,
        sort: args.sort,
        direction: args.direction,
    }
}

/// Loads every task into a board wired to notification and event channels.
async fn open_board(
    service: &Arc<Service>,
    resolver: &IdentityResolver<FileTokenStore>,
    config: &ClientConfig,
) -> Result<(Board, mpsc::Receiver<BoardEvent>, mpsc::Receiver<Notification>), CliError> {
    require_session(resolver)?;
    let tasks = service.fetch_tasks(&TaskScope::All).await?;
    let (notifier, notes) = ChannelNotifier::new(config.event_buffer);
    let (board, events) =
        TaskBoard::with_events(Arc::clone(service), notifier, &tasks, config.event_buffer);
    Ok((board, events, notes))
}

fn locate(board: &Board, task_id: &TaskId) -> Result<(Column, usize), CliError> {
    board
        .columns()
        .position(task_id)
        .ok_or_else(|| CliError::Usage(format!("no task with id {task_id}")))
}

/// Reports an outcome, then serves refresh requests and prints the board.
async fn finish(
    service: &Service,
    board: &Board,
    events: &mut mpsc::Receiver<BoardEvent>,
    notes: &mut mpsc::Receiver<Notification>,
    task_id: &TaskId,
    outcome: TransitionOutcome,
) -> Result<(), CliError> {
    while let Ok(note) = notes.try_recv() {
        match note.kind {
            NotificationKind::Error => eprintln!("{}", note.message),
            NotificationKind::Success | NotificationKind::Info => println!("{}", note.message),
        }
    }
    match outcome {
        TransitionOutcome::NoOp => println!("Nothing to do for task {task_id}"),
        TransitionOutcome::Rejected => return Err(CliError::Busy(task_id.clone())),
        TransitionOutcome::RolledBack(e) => return Err(e.into()),
        TransitionOutcome::Reordered
        | TransitionOutcome::Committed(_)
        | TransitionOutcome::Deleted(_) => {}
    }
    while let Ok(BoardEvent::RefreshRequested { task_id }) = events.try_recv() {
        tracing::debug!(%task_id, "refreshing board");
        match service.fetch_tasks(&TaskScope::All).await {
            Ok(tasks) => board.set_tasks(&tasks),
            Err(e) => tracing::warn!(error = %e, "refresh failed, showing local state"),
        }
    }
    print_columns(&board.columns());
    Ok(())
}

fn print_columns(columns: &Columns) {
    for column in Column::ALL {
        println!("{column} ({})", columns.len(column));
        for task in columns.get(column) {
            println!("  {}", task_line(task));
        }
    }
}

fn task_line(task: &Task) -> String {
    let mut line = format!("[{}] {}", task.id, task.title);
    if task.priority != Priority::Unspecified {
        line.push_str(&format!("  {}", task.priority));
    }
    if let Some(deadline) = task.deadline_date() {
        line.push_str(&format!("  due {deadline}"));
    }
    if !task.status.is_recognised() {
        line.push_str(&format!("  ({})", task.status));
    }
    line
}
