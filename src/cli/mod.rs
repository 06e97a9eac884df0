use crate::core::{
    backend::{ErrorLogReader, IndexBackend},
    config::{ConfigService, IndexerConfig},
    events::EventReceiver,
    http::HttpBackend,
    models::{DataPath, validate_server_url},
    panels::PanelRegistry,
    state::{DisplayState, StatTotals},
    tracker::JobTracker,
};
use clap::{Parser, Subcommand};
use log::info;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "indexr")]
#[command(about = "A CLI tool for tracking server-side indexing jobs.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets a custom data path
    #[arg(long, value_name = "FILE")]
    pub data_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new indexing run on the server
    Start {
        /// Keep watching progress until the run finishes
        #[arg(long)]
        watch: bool,
    },
    /// Show the current job snapshot
    Status,
    /// Follow a running job until it reaches a terminal state
    Watch,
    /// Cancel the tracked indexing run
    Cancel,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Inspect the structured error log
    Errors {
        #[command(subcommand)]
        command: ErrorCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// The key to get
        key: String,
    },
    /// Set a configuration value
    Set {
        /// The key to set
        key: String,
        /// The value to set
        value: String,
    },
}

#[derive(Subcommand)]
pub enum ErrorCommands {
    /// List recent errors
    List {
        /// Maximum number of errors to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only show errors for this backend operation
        #[arg(long)]
        operation: Option<String>,
    },
    /// Show error counts per backend operation
    Stats,
    /// Remove the error log
    Clear,
}

/// Build the tracker with the configured HTTP backend. The panel
/// registry stays empty here; panels live outside this tool and hook in
/// through the library seam.
fn build_tracker(data_path: &DataPath) -> io::Result<(JobTracker, EventReceiver, IndexerConfig)> {
    let config = ConfigService::load_config(data_path)?;
    config.validate()?;

    let backend = Arc::new(HttpBackend::new(config.server.clone(), data_path.clone()));
    let (tracker, events) = JobTracker::new(
        backend as Arc<dyn IndexBackend>,
        PanelRegistry::new(),
        config.poll_interval(),
    );
    Ok((tracker, events, config))
}

pub async fn handle_start_command(data_path: &DataPath, watch: bool) -> io::Result<()> {
    let (tracker, mut events, config) = build_tracker(data_path)?;
    tracker.recover().await;

    tracker.start().await?;
    print_pending_events(&mut events);

    if watch && tracker.is_polling() {
        watch_progress(&tracker, &mut events, config.poll_interval()).await;
    }
    Ok(())
}

pub async fn handle_status_command(data_path: &DataPath) -> io::Result<()> {
    let config = ConfigService::load_config(data_path)?;
    config.validate()?;
    let backend = HttpBackend::new(config.server.clone(), data_path.clone());

    let snapshot = backend.job_status().await?;
    let mut state = DisplayState::default();
    let _ = state.apply(&snapshot);

    print_state(&state);
    Ok(())
}

pub async fn handle_watch_command(data_path: &DataPath) -> io::Result<()> {
    let (tracker, mut events, config) = build_tracker(data_path)?;
    tracker.recover().await;
    print_pending_events(&mut events);

    if !tracker.is_polling() {
        let state = tracker.state();
        println!(
            "No active indexing job. Last status: {}",
            state.status_line()
        );
        return Ok(());
    }

    watch_progress(&tracker, &mut events, config.poll_interval()).await;
    Ok(())
}

pub async fn handle_cancel_command(data_path: &DataPath) -> io::Result<()> {
    let (tracker, mut events, _config) = build_tracker(data_path)?;
    tracker.recover().await;

    let result = tracker.cancel().await;
    print_pending_events(&mut events);
    result
}

pub fn handle_config_command(
    data_path: &DataPath,
    command: &Option<ConfigCommands>,
) -> io::Result<()> {
    match command {
        Some(ConfigCommands::Get { key }) => {
            let config = ConfigService::load_config(data_path)?;
            match key.as_str() {
                "server_url" => println!("server_url: {}", config.server.url),
                "poll_interval_secs" => {
                    println!("poll_interval_secs: {}", config.polling.interval_secs)
                }
                "request_timeout_secs" => {
                    println!("request_timeout_secs: {}", config.server.request_timeout_secs)
                }
                _ => println!("Unknown key: {key}"),
            }
        }
        Some(ConfigCommands::Set { key, value }) => {
            let mut config = ConfigService::load_config(data_path)?;
            match key.as_str() {
                "server_url" => {
                    validate_server_url(value)?;
                    config.server.url = value.clone();
                }
                "poll_interval_secs" => {
                    config.polling.interval_secs = parse_secs(key, value)?;
                }
                "request_timeout_secs" => {
                    config.server.request_timeout_secs = parse_secs(key, value)?;
                }
                _ => {
                    println!("Unknown key: {key}");
                    return Ok(());
                }
            }
            config.validate()?;
            ConfigService::save_config(&config, data_path)?;
            info!("Updated {key} configuration");
            println!("{key} set to: {value}");
            println!("Config file: {}", data_path.config_path().display());
        }
        None => {
            let config = ConfigService::load_config(data_path)?;
            println!("Current Configuration:");
            println!("======================");
            println!("server_url: {}", config.server.url);
            println!("poll_interval_secs: {}", config.polling.interval_secs);
            println!(
                "request_timeout_secs: {}",
                config.server.request_timeout_secs
            );
            println!();
            println!("Config file: {}", data_path.config_path().display());
        }
    }
    Ok(())
}

pub fn handle_errors_command(data_path: &DataPath, command: &ErrorCommands) -> io::Result<()> {
    match command {
        ErrorCommands::List { limit, operation } => {
            let errors =
                ErrorLogReader::read_recent_errors(data_path, *limit, operation.as_deref())
                    .map_err(io::Error::other)?;

            if errors.is_empty() {
                println!("No errors found.");
                return Ok(());
            }

            println!("Recent errors ({}):", errors.len());
            println!("{}", "=".repeat(20));
            for error in &errors {
                println!(
                    "• [{}] {} / {}: {}",
                    error.timestamp, error.operation, error.error_type, error.error_message
                );
                if let Some(url) = &error.request_url {
                    println!("  URL: {url}");
                }
                if let Some(status) = error.status_code {
                    println!("  HTTP status: {status}");
                }
            }
        }
        ErrorCommands::Stats => {
            let stats = ErrorLogReader::get_error_stats(data_path).map_err(io::Error::other)?;

            if stats.is_empty() {
                println!("No error statistics available.");
                return Ok(());
            }

            for (operation, entry) in &stats {
                println!("{operation}: {} error(s)", entry.total_errors);
                for (error_type, count) in &entry.error_types {
                    println!("  {error_type}: {count}");
                }
                if let Some(last) = &entry.last_error_time {
                    println!("  last: {last}");
                }
            }
        }
        ErrorCommands::Clear => {
            ErrorLogReader::clear(data_path)?;
            println!("Error log cleared.");
        }
    }
    Ok(())
}

fn parse_secs(key: &str, value: &str) -> io::Result<u64> {
    value.parse::<u64>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{key} must be a positive integer"),
        )
    })
}

fn print_state(state: &DisplayState) {
    println!("Status: {}", state.status.display_name());
    if let Some(task_id) = &state.task_id {
        println!("Task: {task_id}");
    }
    println!("Progress: {}% ({})", state.percent, state.status_line());

    if !state.phases.is_empty() {
        println!("Phases:");
        for phase in &state.phases {
            println!("  [{}] {}", phase.status.marker(), phase.name);
        }
    }
    if state.total_batches > 0 {
        println!(
            "Batches: {}/{}",
            state.completed_batches, state.total_batches
        );
    }
    if state.stats != StatTotals::default() {
        println!("Files scanned: {}", state.stats.files_scanned);
        println!("Problems found: {}", state.stats.problems_found);
        println!("Functions found: {}", state.stats.functions_found);
        println!("Classes found: {}", state.stats.classes_found);
        println!("Items stored: {}", state.stats.items_stored);
    }
    if let Some(error) = &state.error {
        println!("Error: {error}");
    }
}

/// Print the composed status line whenever it changes and every
/// transition event once, until the run reaches a terminal state.
async fn watch_progress(tracker: &JobTracker, events: &mut EventReceiver, interval: Duration) {
    let mut last_line = String::new();
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        println!("{}", event.user_message());
                        if event.ends_watch() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(interval) => {
                let state = tracker.state();
                let line = format!("[{:>3}%] {}", state.percent, state.status_line());
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
                if !state.is_polling {
                    break;
                }
            }
        }
    }
    print_pending_events(events);
}

fn print_pending_events(events: &mut EventReceiver) {
    while let Ok(event) = events.try_recv() {
        println!("{}", event.user_message());
    }
}
