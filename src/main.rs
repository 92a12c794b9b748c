//! Tomato Timer CLI
//!
//! A Pomodoro timer driven from the terminal:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after every 4 focus sessions
//!
//! `tomato-timer daemon` runs the timer; every other command talks to it
//! over a Unix socket.

use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use tomato_timer::cli::{
    Cli, Commands, ConfigCommand, ConfigSetArgs, Display, IpcClient, TaskCommand,
};
use tomato_timer::config::{config_path, AppConfig};
use tomato_timer::daemon::{Daemon, DaemonOptions};
use tomato_timer::types::{IpcResponse, Task, TaskUpdate};

/// Refresh interval of `watch`
const WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise `--verbose` selects `debug`, else `warn`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn client() -> Result<IpcClient> {
    let config = AppConfig::load()?;
    IpcClient::from_config(&config)
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Start) => show_timer_response(client()?.start().await?),
        Some(Commands::Pause) => show_timer_response(client()?.pause().await?),
        Some(Commands::Reset) => show_timer_response(client()?.reset().await?),
        Some(Commands::Skip) => show_timer_response(client()?.skip().await?),
        Some(Commands::Switch { mode }) => show_timer_response(client()?.switch(mode).await?),
        Some(Commands::Status) => show_status(client()?.status().await?),
        Some(Commands::Watch) => watch(&client()?).await?,
        Some(Commands::Config(command)) => execute_config(command).await?,
        Some(Commands::Task(command)) => execute_task(&client()?, command).await?,
        Some(Commands::Daemon) => run_daemon().await?,
        Some(Commands::Completions { shell }) => generate_completions(shell),
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

// ============================================================================
// Timer commands
// ============================================================================

fn show_timer_response(response: IpcResponse) {
    Display::show_message(&response.message);
    if let Some(data) = response.data {
        if let Some(snapshot) = &data.snapshot {
            println!("{}", Display::render_watch_line(snapshot));
        }
        Display::show_toasts(&data.toasts);
    }
}

fn show_status(response: IpcResponse) {
    let Some(data) = response.data else {
        Display::show_message(&response.message);
        return;
    };
    if let Some(snapshot) = &data.snapshot {
        let active = active_task(data.tasks.as_deref(), data.active_task_id.as_deref());
        Display::show_snapshot(snapshot, active);
    }
    Display::show_toasts(&data.toasts);
}

fn active_task<'a>(tasks: Option<&'a [Task]>, active_id: Option<&str>) -> Option<&'a Task> {
    let id = active_id?;
    tasks?.iter().find(|task| task.id == id)
}

/// Redraws the countdown in place until Ctrl-C.
async fn watch(client: &IpcClient) -> Result<()> {
    let mut seen_toasts = HashSet::new();
    let mut interval = tokio::time::interval(WATCH_INTERVAL);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                let response = client.status().await?;
                let Some(data) = response.data else { continue };

                for toast in &data.toasts {
                    if seen_toasts.insert((toast.message.clone(), toast.expires_at)) {
                        print!("\r\x1b[2K");
                        println!("{}", Display::render_toast(toast));
                    }
                }
                if let Some(snapshot) = &data.snapshot {
                    print!("\r\x1b[2K{}", Display::render_watch_line(snapshot));
                    stdout.flush().context("Failed to write to stdout")?;
                }
            }
        }
    }

    println!();
    Ok(())
}

// ============================================================================
// Config commands
// ============================================================================

async fn execute_config(command: ConfigCommand) -> Result<()> {
    let path = config_path()?;
    let mut config = AppConfig::load_from(&path)?;
    let client = IpcClient::from_config(&config)?.with_max_retries(1);
    let daemon_running = client.is_daemon_running().await;

    match command {
        ConfigCommand::Show => {
            let params = if daemon_running {
                client
                    .status()
                    .await?
                    .data
                    .and_then(|data| data.snapshot)
                    .map(|snapshot| snapshot.params)
                    .unwrap_or(config.params)
            } else {
                config.params
            };
            println!("Config file: {}", path.display());
            Display::show_params(&params);
        }
        ConfigCommand::Set(args) => {
            if args.is_empty() {
                anyhow::bail!("Nothing to change. See 'tomato-timer config set --help'");
            }
            if daemon_running {
                let response = update_daemon_params(&client, &args).await?;
                Display::show_message(&response.message);
            } else {
                config.params = args.apply(config.params);
                config.params.validate().context("Invalid settings")?;
                config.save_to(&path)?;
                Display::show_message("Settings saved");
            }
        }
    }

    Ok(())
}

async fn update_daemon_params(client: &IpcClient, args: &ConfigSetArgs) -> Result<IpcResponse> {
    let current = client
        .status()
        .await?
        .data
        .and_then(|data| data.snapshot)
        .map(|snapshot| snapshot.params)
        .context("Daemon did not report its settings")?;
    client.set_params(args.apply(current)).await
}

// ============================================================================
// Task commands
// ============================================================================

async fn execute_task(client: &IpcClient, command: TaskCommand) -> Result<()> {
    let response = match command {
        TaskCommand::Add { title, estimate } => client.task_add(&title, estimate).await?,
        TaskCommand::List => client.task_list().await?,
        TaskCommand::Done { id } => {
            let id = resolve_task_id(client, &id).await?;
            client.task_done(&id).await?
        }
        TaskCommand::Remove { id } => {
            let id = resolve_task_id(client, &id).await?;
            client.task_remove(&id).await?
        }
        TaskCommand::Activate { id } => {
            let id = resolve_task_id(client, &id).await?;
            client.task_activate(Some(&id)).await?
        }
        TaskCommand::Deactivate => client.task_activate(None).await?,
        TaskCommand::Edit {
            id,
            title,
            estimate,
            notes,
        } => {
            let id = resolve_task_id(client, &id).await?;
            let update = TaskUpdate {
                title,
                estimated_pomodoros: estimate,
                notes,
            };
            client.task_update(&id, update).await?
        }
        TaskCommand::Move { id, position } => {
            let tasks = list_tasks(client).await?;
            let id = match_task_id(&tasks, &id)?;
            let ids = moved_order(&tasks, &id, position as usize);
            client.task_reorder(ids).await?
        }
    };

    Display::show_message(&response.message);
    if let Some(data) = response.data {
        if let Some(tasks) = &data.tasks {
            Display::show_tasks(tasks, data.active_task_id.as_deref());
        }
    }
    Ok(())
}

async fn list_tasks(client: &IpcClient) -> Result<Vec<Task>> {
    Ok(client
        .task_list()
        .await?
        .data
        .and_then(|data| data.tasks)
        .unwrap_or_default())
}

async fn resolve_task_id(client: &IpcClient, prefix: &str) -> Result<String> {
    let tasks = list_tasks(client).await?;
    match_task_id(&tasks, prefix)
}

/// Resolves an exact id or a unique id prefix.
fn match_task_id(tasks: &[Task], prefix: &str) -> Result<String> {
    if let Some(task) = tasks.iter().find(|task| task.id == prefix) {
        return Ok(task.id.clone());
    }

    let mut matches = tasks.iter().filter(|task| task.id.starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => anyhow::bail!("'{}' matches more than one task", prefix),
        (None, _) => anyhow::bail!("No task matches '{}'", prefix),
    }
}

/// Returns the task order with `id` moved to 1-based `position`.
fn moved_order(tasks: &[Task], id: &str, position: usize) -> Vec<String> {
    let mut ids: Vec<String> = tasks
        .iter()
        .filter(|task| task.id != id)
        .map(|task| task.id.clone())
        .collect();
    let index = position.saturating_sub(1).min(ids.len());
    ids.insert(index, id.to_string());
    ids
}

// ============================================================================
// Daemon
// ============================================================================

async fn run_daemon() -> Result<()> {
    let path = config_path()?;
    let config = AppConfig::load_from(&path)?;
    let options = DaemonOptions::from_config(config, path)?;
    let daemon = Daemon::bind(options)?;
    tracing::info!("press Ctrl-C to stop");
    daemon.run().await
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
