//! Change event types produced by the folder watch mechanism.

use std::path::PathBuf;
use std::time::SystemTime;

use notify::EventKind;
use notify::event::ModifyKind;

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeAction {
    /// Only creations and modifications trigger a relaunch.
    pub fn triggers_relaunch(self) -> bool {
        matches!(self, ChangeAction::Created | ChangeAction::Modified)
    }
}

/// A single file-change notification.
///
/// Produced by the watch mechanism, consumed once by the aggregator.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// File modification time, or the notification instant when the
    /// metadata is unavailable (e.g. the file is already gone).
    pub modified_at: SystemTime,
    pub action: ChangeAction,
}

impl ChangeEvent {
    /// Build an event for `path`, reading `modified_at` from file metadata
    /// where the action implies the file still exists.
    pub fn observe(path: PathBuf, action: ChangeAction) -> Self {
        let modified_at = match action {
            ChangeAction::Created | ChangeAction::Modified => std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or_else(|_| SystemTime::now()),
            ChangeAction::Deleted | ChangeAction::Renamed => SystemTime::now(),
        };

        Self {
            path,
            modified_at,
            action,
        }
    }
}

/// Map a notify event kind onto a change action.
///
/// Access and metadata-only events return `None` and are ignored. Renames
/// arrive from notify as `Modify(Name)` and must not be folded into
/// `Modified`, since renames do not trigger a relaunch.
pub fn map_event_kind(kind: &EventKind) -> Option<ChangeAction> {
    match kind {
        EventKind::Create(_) => Some(ChangeAction::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeAction::Renamed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeAction::Modified),
        EventKind::Remove(_) => Some(ChangeAction::Deleted),
        _ => None,
    }
}
