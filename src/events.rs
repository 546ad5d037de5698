//! Observer notifications for watch and relaunch outcomes.
//!
//! This module provides a broadcast channel for coordinator events that can
//! be shared between the background watch task and any number of observers
//! (the CLI front-end, logging, tests).

use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Everything the coordinator reports to the outside world.
///
/// All errors in the core surface here; none of them terminate the hosting
/// process.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// The watch toggle moved between Idle and Watching.
    WatchStateChanged { watching: bool },

    /// A viewer instance was started for `file`.
    RelaunchSucceeded {
        file: PathBuf,
        at: DateTime<Local>,
    },

    /// Starting the viewer failed; the attempt is abandoned.
    RelaunchFailed { file: PathBuf, reason: String },

    /// One or more matched viewer processes could not be killed.
    /// Non-fatal: the launch proceeds regardless.
    TerminationFailed { reason: String },

    /// Watch start was requested without a valid directory.
    NoDirectorySelected,

    /// The persisted last-launched file no longer exists on disk.
    RecoveryFileMissing { file: PathBuf },
}

/// Manages event broadcasting to all subscribed observers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<CoordinatorEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers
    pub fn send(&self, event: CoordinatorEvent) {
        match self.sender.send(event.clone()) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{event:?} to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let broadcaster = EventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(CoordinatorEvent::WatchStateChanged { watching: true });

        match rx.recv().await.unwrap() {
            CoordinatorEvent::WatchStateChanged { watching } => assert!(watching),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_send_without_subscribers_is_silent() {
        let broadcaster = EventBroadcaster::new(8);
        // Must not panic or error
        broadcaster.send(CoordinatorEvent::NoDirectorySelected);
    }
}
