//! Owning-context keeper for persisted launch state.
//!
//! Relaunches happen on a background task, but the settings file and the
//! launch-state fields inside it belong to one owner. The coordinator never
//! touches them directly; it posts a [`LaunchRecord`] into the keeper's
//! single-consumer queue and the keeper applies it here, on its own task.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::config::{LaunchState, Settings};

/// Timestamp format persisted to settings. Compared as a string for the
/// idempotent-write rule.
pub const LAUNCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one successful relaunch.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub file: PathBuf,
    pub launched_at: DateTime<Local>,
}

impl LaunchRecord {
    /// Record a launch of `file` happening now.
    pub fn now(file: PathBuf) -> Self {
        Self {
            file,
            launched_at: Local::now(),
        }
    }

    /// The persisted form of the launch timestamp.
    pub fn time_string(&self) -> String {
        self.launched_at.format(LAUNCH_TIME_FORMAT).to_string()
    }
}

/// Cheap handle for posting launch records to the keeper.
#[derive(Clone)]
pub struct StateHandle {
    tx: mpsc::Sender<LaunchRecord>,
}

impl StateHandle {
    /// Post a record to the owning context. Fire-and-forget: a keeper that
    /// has already shut down only costs a warning.
    pub async fn post(&self, record: LaunchRecord) {
        if self.tx.send(record).await.is_err() {
            tracing::warn!("[state] keeper gone, launch record dropped");
        }
    }
}

/// Owns the settings copy and applies launch records to it.
pub struct StateKeeper {
    settings: Settings,
    settings_path: PathBuf,
    rx: mpsc::Receiver<LaunchRecord>,
}

impl StateKeeper {
    /// Create a keeper around a settings snapshot and its file path.
    pub fn new(settings: Settings, settings_path: PathBuf) -> (StateHandle, Self) {
        let (tx, rx) = mpsc::channel(16);
        (
            StateHandle { tx },
            Self {
                settings,
                settings_path,
                rx,
            },
        )
    }

    /// Drain launch records until every [`StateHandle`] is dropped.
    pub async fn run(mut self) {
        while let Some(record) = self.rx.recv().await {
            self.apply(&record);
        }
        crate::debug_event!("state", "keeper finished");
    }

    /// Apply one record. Returns whether a persistence write happened.
    ///
    /// The write is idempotent: when the recorded file and timestamp equal
    /// the persisted ones, nothing is written. A persistence failure is
    /// logged and swallowed; it must never cross this boundary.
    pub fn apply(&mut self, record: &LaunchRecord) -> bool {
        let time = record.time_string();
        let launch = &mut self.settings.launch;

        if launch.last_launched_file.as_deref() == Some(record.file.as_path())
            && launch.last_launch_time.as_deref() == Some(time.as_str())
        {
            crate::debug_event!("state", "unchanged, skipping write");
            return false;
        }

        launch.last_launched_file = Some(record.file.clone());
        launch.last_launch_time = Some(time);

        match self.settings.save(&self.settings_path) {
            Ok(()) => {
                crate::log_event!("state", "persisted", "{}", record.file.display());
            }
            Err(e) => {
                tracing::warn!("[state] failed to persist launch state: {e}");
            }
        }

        true
    }

    /// Current launch state as the keeper sees it.
    pub fn launch_state(&self) -> &LaunchState {
        &self.settings.launch
    }
}
