use anyhow::Context;
use clap::{Parser, Subcommand};
use deckwatch::{
    CoordinatorEvent, EventBroadcaster, FolderWatcher, RelaunchCoordinator, Settings, StateKeeper,
    SystemViewerControl, WatchError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "deckwatch")]
#[command(version)]
#[command(about = "Watches a presentation folder and relaunches the slideshow viewer when a deck changes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Watch the configured folder and relaunch the viewer on changes
    Watch {
        /// Directory to watch; persisted to settings like picking a folder
        /// in the original UI
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Skip relaunching the last file even when enabled in settings
        #[arg(long)]
        no_recover: bool,
    },

    /// Relaunch the last launched file now
    Launch,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // For non-init commands, check if settings exist
    if !matches!(cli.command, Some(Commands::Init { .. })) {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    deckwatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Some(Commands::Init { force }) => match Settings::init_config_file(force) {
            Ok(path) => {
                println!("Created configuration file at: {}", path.display());
                println!("Edit this file to customize your settings.");
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },

        Some(Commands::Config) => match toml::to_string_pretty(&settings) {
            Ok(toml_str) => print!("{toml_str}"),
            Err(e) => {
                eprintln!("Error displaying config: {e}");
                std::process::exit(1);
            }
        },

        Some(Commands::Launch) => exit_on_error(run_launch(settings).await),

        Some(Commands::Watch { dir, no_recover }) => {
            exit_on_error(run_watch(settings, dir, no_recover).await)
        }

        None => {
            // No subcommand behaves like app startup in the original:
            // watch only when the auto-watch flag is set
            if settings.watch.auto_watch {
                exit_on_error(run_watch(settings, None, false).await);
            } else {
                eprintln!("Nothing to do: no subcommand given and watch.auto_watch is off.");
                eprintln!("Run 'deckwatch watch', or enable auto_watch in settings.");
                std::process::exit(2);
            }
        }
    }
}

fn exit_on_error(result: anyhow::Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Watch the configured folder until Ctrl-C.
async fn run_watch(
    mut settings: Settings,
    dir_override: Option<PathBuf>,
    no_recover: bool,
) -> anyhow::Result<()> {
    let settings_path = Settings::settings_path();

    // A directory picked on the command line is persisted, same as the
    // original's folder browser
    if let Some(dir) = dir_override {
        settings.watch.directory = Some(dir);
        if let Err(e) = settings.save(&settings_path) {
            eprintln!("Warning: could not persist watch directory: {e}");
        }
    }

    let broadcaster = EventBroadcaster::default();
    let observer = spawn_observer(&broadcaster);

    let (state_handle, keeper) = StateKeeper::new(settings.clone(), settings_path);
    let keeper_task = tokio::spawn(keeper.run());

    let viewer = Arc::new(SystemViewerControl::new(settings.viewer.clone()));
    let coordinator = Arc::new(RelaunchCoordinator::new(
        viewer,
        state_handle,
        broadcaster.clone(),
    ));

    if settings.recovery.auto_relaunch_last_file && !no_recover {
        // Recovery trouble never aborts startup; the observer reports it
        if let Err(e) = coordinator.launch_last(&settings.launch).await {
            tracing::warn!("[main] startup recovery skipped: {e}");
        }
    }

    let watcher = FolderWatcher::builder()
        .config(&settings.watch)
        .coordinator(Arc::clone(&coordinator))
        .broadcaster(broadcaster.clone())
        .build()
        .map_err(|e| {
            if matches!(e, WatchError::NoDirectorySelected { .. }) {
                eprintln!("Select a folder first: deckwatch watch --dir <path>");
            }
            anyhow::Error::from(e)
        })?;

    let shutdown = CancellationToken::new();
    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    watcher.watch(shutdown).await.context("watch loop failed")?;

    // Release the coordinator's state handle so the keeper drains and exits
    drop(coordinator);
    let _ = keeper_task.await;
    observer.abort();

    Ok(())
}

/// Relaunch the last launched file, reporting errors explicitly.
async fn run_launch(settings: Settings) -> anyhow::Result<()> {
    let settings_path = Settings::settings_path();
    let broadcaster = EventBroadcaster::default();

    let (state_handle, keeper) = StateKeeper::new(settings.clone(), settings_path);
    let keeper_task = tokio::spawn(keeper.run());

    let viewer = Arc::new(SystemViewerControl::new(settings.viewer.clone()));
    let coordinator = RelaunchCoordinator::new(viewer, state_handle, broadcaster);

    let result = coordinator.launch_last(&settings.launch).await;
    drop(coordinator);
    let _ = keeper_task.await;

    match result? {
        Some(record) => {
            println!(
                "Relaunched {} at {}",
                record.file.display(),
                record.time_string()
            );
        }
        None => println!("No file has been launched yet."),
    }

    Ok(())
}

/// Print coordinator events for the user; the UI surface of this tool.
fn spawn_observer(broadcaster: &EventBroadcaster) -> tokio::task::JoinHandle<()> {
    let mut rx = broadcaster.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => report(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[observer] lagged by {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn report(event: CoordinatorEvent) {
    match event {
        CoordinatorEvent::WatchStateChanged { watching } => {
            if watching {
                println!("Watching started. Press Ctrl-C to stop.");
            } else {
                println!("Watching stopped.");
            }
        }
        CoordinatorEvent::RelaunchSucceeded { file, at } => {
            println!("Relaunched {} at {}", file.display(), at.format("%H:%M:%S"));
        }
        CoordinatorEvent::RelaunchFailed { file, reason } => {
            eprintln!("Relaunch of {} failed: {reason}", file.display());
        }
        CoordinatorEvent::TerminationFailed { reason } => {
            eprintln!("Warning: {reason}; launching anyway");
        }
        CoordinatorEvent::NoDirectorySelected => {
            eprintln!("Please select a directory to watch before attempting to watch it.");
        }
        CoordinatorEvent::RecoveryFileMissing { file } => {
            eprintln!(
                "Could not launch the last file because it no longer exists: {}",
                file.display()
            );
        }
    }
}
