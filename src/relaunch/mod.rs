//! Single-active-viewer enforcement.
//!
//! The coordinator consumes a selected file path and applies the relaunch
//! sequence: enumerate matching viewer processes, kill them all, start a
//! fresh instance in show mode, and hand the outcome to the state keeper
//! and observers.

mod coordinator;
mod error;
mod process;

pub use coordinator::RelaunchCoordinator;
pub use error::RelaunchError;
pub use process::{SystemViewerControl, ViewerControl};
