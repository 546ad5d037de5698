pub mod config;
pub mod events;
pub mod logging;
pub mod relaunch;
pub mod state;
pub mod watcher;

pub use config::{LaunchState, Settings, ViewerConfig, WatchConfig};
pub use events::{CoordinatorEvent, EventBroadcaster};
pub use relaunch::{RelaunchCoordinator, RelaunchError, SystemViewerControl, ViewerControl};
pub use state::{LaunchRecord, StateHandle, StateKeeper};
pub use watcher::{ChangeAction, ChangeEvent, FolderWatcher, WatchError};
