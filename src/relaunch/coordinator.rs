//! The kill-old/start-new sequence for the external viewer.

use std::path::Path;
use std::sync::Arc;

use crate::config::LaunchState;
use crate::events::{CoordinatorEvent, EventBroadcaster};
use crate::state::{LaunchRecord, StateHandle};

use super::error::RelaunchError;
use super::process::ViewerControl;

/// Enforces single-active-viewer semantics.
///
/// Each relaunch terminates every matching viewer instance before starting
/// the replacement, so termination happens-before start within one call.
/// Overlapping relaunches from separate notifications may interleave at the
/// OS layer; the most recent kill+start pair wins, which is acceptable for
/// a single-viewer setup and deliberately not serialized further.
pub struct RelaunchCoordinator {
    viewer: Arc<dyn ViewerControl>,
    state: StateHandle,
    broadcaster: EventBroadcaster,
}

impl RelaunchCoordinator {
    pub fn new(
        viewer: Arc<dyn ViewerControl>,
        state: StateHandle,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            viewer,
            state,
            broadcaster,
        }
    }

    /// Terminate any running viewer and start it again on `file`.
    ///
    /// Termination trouble is reported and ignored; only a failed start is
    /// fatal, and in that case the persisted launch state stays untouched.
    /// On success the produced [`LaunchRecord`] is posted to the owning
    /// context for idempotent persistence.
    pub async fn relaunch(&self, file: &Path) -> Result<LaunchRecord, RelaunchError> {
        match self.viewer.terminate_matching() {
            Ok(0) => {}
            Ok(killed) => {
                crate::log_event!("relaunch", "terminated", "{killed} viewer instance(s)");
            }
            Err(e) => {
                tracing::warn!("[relaunch] termination incomplete: {e}");
                self.broadcaster.send(CoordinatorEvent::TerminationFailed {
                    reason: e.to_string(),
                });
            }
        }

        if let Err(source) = self.viewer.spawn_viewer(file) {
            let err = RelaunchError::LaunchFailed {
                file: file.to_path_buf(),
                source,
            };
            self.broadcaster.send(CoordinatorEvent::RelaunchFailed {
                file: file.to_path_buf(),
                reason: err.to_string(),
            });
            return Err(err);
        }

        let record = LaunchRecord::now(file.to_path_buf());
        crate::log_event!("relaunch", "launched", "{}", file.display());

        // Hand the record to the owning context; persistence happens there
        self.state.post(record.clone()).await;
        self.broadcaster.send(CoordinatorEvent::RelaunchSucceeded {
            file: record.file.clone(),
            at: record.launched_at,
        });

        Ok(record)
    }

    /// Relaunch the persisted last file, bypassing the aggregator.
    ///
    /// Returns `Ok(None)` when no file was ever launched. A recorded file
    /// that no longer exists yields [`RelaunchError::FileNotFound`] after
    /// notifying observers; callers decide whether that is a startup
    /// warning or a user-facing error.
    pub async fn launch_last(
        &self,
        state: &LaunchState,
    ) -> Result<Option<LaunchRecord>, RelaunchError> {
        let Some(file) = state.last_launched_file.clone() else {
            return Ok(None);
        };

        if !file.exists() {
            tracing::warn!("[relaunch] last launched file missing: {}", file.display());
            self.broadcaster.send(CoordinatorEvent::RecoveryFileMissing {
                file: file.clone(),
            });
            return Err(RelaunchError::FileNotFound { file });
        }

        self.relaunch(&file).await.map(Some)
    }
}
