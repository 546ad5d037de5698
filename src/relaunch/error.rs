//! Error types for the relaunch coordinator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a relaunch attempt.
#[derive(Error, Debug)]
pub enum RelaunchError {
    /// One or more matched viewer processes could not be killed. Non-fatal:
    /// the first failure is reported, remaining kills and the launch still
    /// proceed.
    #[error("could not terminate viewer process(es): {reason}")]
    TerminationFailed { reason: String },

    /// Starting the new viewer process failed. Fatal to this attempt; the
    /// persisted launch state is left untouched.
    #[error("failed to launch viewer for {file}: {source}")]
    LaunchFailed {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted last-launched file no longer exists. Recoverable; no
    /// relaunch is attempted.
    #[error("last launched file no longer exists: {file}")]
    FileNotFound { file: PathBuf },
}
