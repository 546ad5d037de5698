//! Folder watching for changed presentation decks.
//!
//! This module turns raw filesystem notifications into at most one relaunch
//! per poll tick.
//!
//! # Architecture
//!
//! ```text
//! FolderWatcher
//!   - Single notify::RecommendedWatcher (NonRecursive)
//!   - Filename regex filter
//!   - Batcher: coalesces events between poll ticks
//!         |
//!         v
//!   aggregator::select  (filter Created/Modified, newest wins)
//!         |
//!         v
//!   RelaunchCoordinator.relaunch(path)
//! ```

mod aggregator;
mod batcher;
mod error;
mod event;
mod service;

pub use aggregator::select;
pub use batcher::Batcher;
pub use error::WatchError;
pub use event::{ChangeAction, ChangeEvent, map_event_kind};
pub use service::{FolderWatcher, FolderWatcherBuilder};
