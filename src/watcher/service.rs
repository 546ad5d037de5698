//! Folder watcher that drives the relaunch coordinator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecursiveMode, Watcher};
use regex::Regex;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::WatchConfig;
use crate::events::{CoordinatorEvent, EventBroadcaster};
use crate::relaunch::RelaunchCoordinator;

use super::aggregator;
use super::batcher::Batcher;
use super::error::WatchError;
use super::event::{ChangeEvent, map_event_kind};

/// Watches one directory and relaunches the viewer on relevant changes.
///
/// Raw notify events are coalesced by the [`Batcher`] and drained once per
/// poll interval; each drained batch reduces to at most one selected event,
/// which triggers the coordinator. The watcher owns the Idle/Watching
/// toggle: building it is the Idle->Watching transition, returning from
/// [`FolderWatcher::watch`] is Watching->Idle.
pub struct FolderWatcher {
    /// Directory under watch, validated to exist at build time.
    directory: PathBuf,
    /// Filename filter; events for non-matching names never enter a batch.
    pattern: Regex,
    poll_interval: Duration,
    coordinator: Arc<RelaunchCoordinator>,
    broadcaster: EventBroadcaster,
    batcher: Batcher,
    /// Channel for receiving file events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher.
    _watcher: notify::RecommendedWatcher,
}

impl FolderWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> FolderWatcherBuilder {
        FolderWatcherBuilder::new()
    }

    /// Run the watch loop until `shutdown` is cancelled.
    ///
    /// Cancellation only suppresses future notifications; a relaunch
    /// sequence already started by a previous tick runs to completion
    /// before the loop observes the token.
    pub async fn watch(mut self, shutdown: CancellationToken) -> Result<(), WatchError> {
        self.broadcaster
            .send(CoordinatorEvent::WatchStateChanged { watching: true });
        crate::log_event!("watcher", "watching", "{}", self.directory.display());

        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                // Handle incoming file events
                maybe = self.event_rx.recv() => {
                    match maybe {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => {
                            tracing::error!("[watcher] file watch error: {e}");
                        }
                        // The sender lives in self._watcher, so this only
                        // happens if the notify backend shut down
                        None => return Err(WatchError::ChannelClosed),
                    }
                }

                // Drain coalesced changes once per poll interval
                _ = tick.tick() => {
                    self.flush_batch().await;
                }
            }
        }

        self.broadcaster
            .send(CoordinatorEvent::WatchStateChanged { watching: false });
        crate::log_event!("watcher", "stopped");

        Ok(())
    }

    /// Record an incoming notify event for matching files.
    fn handle_event(&mut self, event: Event) {
        let Some(action) = map_event_kind(&event.kind) else {
            return;
        };

        for path in event.paths {
            if !self.matches(&path) {
                crate::debug_event!("watcher", "unmatched", "{:?} {}", action, path.display());
                continue;
            }

            self.batcher.record(ChangeEvent::observe(path, action));
        }
    }

    /// Filter on the file name, like the original watcher's regex filter.
    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.pattern.is_match(name))
    }

    /// Reduce the pending batch and trigger at most one relaunch.
    async fn flush_batch(&mut self) {
        if !self.batcher.has_pending() {
            return;
        }

        let batch = self.batcher.drain();
        crate::debug_event!("watcher", "tick", "{} coalesced change(s)", batch.len());

        if let Some(selected) = aggregator::select(&batch) {
            crate::log_event!("watcher", "selected", "{}", selected.path.display());

            // Process termination and start run right here on the
            // background context; the coordinator marshals state updates
            // to the owning context itself.
            if let Err(e) = self.coordinator.relaunch(&selected.path).await {
                tracing::error!("[watcher] relaunch failed: {e}");
            }
        }
    }
}

/// Builder for constructing a FolderWatcher.
pub struct FolderWatcherBuilder {
    directory: Option<PathBuf>,
    filter_pattern: String,
    poll_interval_ms: u64,
    coordinator: Option<Arc<RelaunchCoordinator>>,
    broadcaster: Option<EventBroadcaster>,
}

impl FolderWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        let defaults = WatchConfig::default();
        Self {
            directory: None,
            filter_pattern: defaults.filter_pattern,
            poll_interval_ms: defaults.poll_interval_ms,
            coordinator: None,
            broadcaster: None,
        }
    }

    /// Take directory, pattern and interval from a watch config.
    pub fn config(mut self, config: &WatchConfig) -> Self {
        self.directory = config.directory.clone();
        self.filter_pattern = config.filter_pattern.clone();
        self.poll_interval_ms = config.poll_interval_ms;
        self
    }

    /// Set the directory to watch.
    pub fn directory(mut self, dir: PathBuf) -> Self {
        self.directory = Some(dir);
        self
    }

    /// Set the filename filter pattern.
    pub fn filter_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.filter_pattern = pattern.into();
        self
    }

    /// Set the poll interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the relaunch coordinator.
    pub fn coordinator(mut self, coordinator: Arc<RelaunchCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Set the event broadcaster.
    pub fn broadcaster(mut self, broadcaster: EventBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Build the FolderWatcher.
    ///
    /// Rejects a missing or non-existent directory with
    /// [`WatchError::NoDirectorySelected`], reported to the observer; the
    /// watch state stays Idle in that case.
    pub fn build(self) -> Result<FolderWatcher, WatchError> {
        let broadcaster = self.broadcaster.ok_or_else(|| WatchError::InitFailed {
            reason: "Broadcaster is required".to_string(),
        })?;

        let coordinator = self.coordinator.ok_or_else(|| WatchError::InitFailed {
            reason: "Coordinator is required".to_string(),
        })?;

        let directory = match self.directory {
            Some(dir) if dir.as_os_str().is_empty() => {
                broadcaster.send(CoordinatorEvent::NoDirectorySelected);
                return Err(WatchError::NoDirectorySelected {
                    reason: "watch directory is empty".to_string(),
                });
            }
            Some(dir) if !dir.is_dir() => {
                broadcaster.send(CoordinatorEvent::NoDirectorySelected);
                return Err(WatchError::NoDirectorySelected {
                    reason: format!("{} is not an existing directory", dir.display()),
                });
            }
            Some(dir) => dir,
            None => {
                broadcaster.send(CoordinatorEvent::NoDirectorySelected);
                return Err(WatchError::NoDirectorySelected {
                    reason: "no watch directory configured".to_string(),
                });
            }
        };

        let pattern =
            Regex::new(&self.filter_pattern).map_err(|e| WatchError::InvalidPattern {
                pattern: self.filter_pattern.clone(),
                reason: e.to_string(),
            })?;

        // Create channel for events
        let (tx, rx) = mpsc::channel(100);

        // Create the notify watcher
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: directory.clone(),
                reason: e.to_string(),
            })?;

        Ok(FolderWatcher {
            directory,
            pattern,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            coordinator,
            broadcaster,
            batcher: Batcher::new(),
            event_rx: rx,
            _watcher: watcher,
        })
    }
}

impl Default for FolderWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
