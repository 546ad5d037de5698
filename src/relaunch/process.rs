//! Viewer process control: enumeration, termination, start.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use sysinfo::{ProcessesToUpdate, System};

use crate::config::ViewerConfig;

use super::error::RelaunchError;

/// Seam between the coordinator and the operating system.
///
/// The real implementation talks to sysinfo and std::process; tests swap in
/// fakes to drive the coordinator deterministically.
pub trait ViewerControl: Send + Sync {
    /// Kill every running process matching the viewer identity.
    ///
    /// Best-effort per process: a kill that is refused does not stop the
    /// sweep, and the first failure becomes the reported error once all
    /// matches have been visited. Zero matches is a clean `Ok(0)`.
    fn terminate_matching(&self) -> Result<usize, RelaunchError>;

    /// Start the viewer against `file`, fire-and-forget.
    ///
    /// The spawned process is never awaited and its exit status is never
    /// collected; only a failure to start is an error.
    fn spawn_viewer(&self, file: &Path) -> io::Result<()>;
}

/// Real viewer control backed by sysinfo process enumeration.
pub struct SystemViewerControl {
    config: ViewerConfig,
}

impl SystemViewerControl {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    /// The launch command as one printable line, path quoted for display.
    pub fn command_line(&self, file: &Path) -> String {
        format!(
            "{} {} \"{}\"",
            self.config.command,
            self.config.show_flag,
            file.display()
        )
    }
}

/// Exact, case-insensitive name equality against the viewer identity.
///
/// The extension is stripped first: sysinfo reports `POWERPNT.EXE` on
/// Windows where the configured identity is `POWERPNT`.
fn name_matches(name: &OsStr, target: &str) -> bool {
    Path::new(name)
        .file_stem()
        .unwrap_or(name)
        .to_string_lossy()
        .eq_ignore_ascii_case(target)
}

impl ViewerControl for SystemViewerControl {
    fn terminate_matching(&self) -> Result<usize, RelaunchError> {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut killed = 0;
        let mut first_error = None;

        for (pid, process) in sys.processes() {
            if !name_matches(process.name(), &self.config.process_name) {
                continue;
            }

            crate::debug_event!("relaunch", "killing", "{} (pid {pid})", self.config.process_name);

            if process.kill() {
                killed += 1;
            } else if first_error.is_none() {
                first_error = Some(format!("kill signal rejected for pid {pid}"));
            }
        }

        match first_error {
            Some(reason) => Err(RelaunchError::TerminationFailed { reason }),
            None => Ok(killed),
        }
    }

    fn spawn_viewer(&self, file: &Path) -> io::Result<()> {
        crate::debug_event!("relaunch", "spawning", "{}", self.command_line(file));

        // Fire-and-forget: the Child handle is dropped on purpose. The
        // viewer outlives this call; its own runtime errors are invisible
        // here. Passing the path as its own argument keeps embedded spaces
        // intact without shell quoting.
        Command::new(&self.config.command)
            .arg(&self.config.show_flag)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_name_match_is_case_insensitive() {
        assert!(name_matches(&OsString::from("powerpnt"), "POWERPNT"));
        assert!(name_matches(&OsString::from("PowerPnt"), "POWERPNT"));
    }

    #[test]
    fn test_name_match_strips_extension() {
        assert!(name_matches(&OsString::from("POWERPNT.EXE"), "POWERPNT"));
        assert!(name_matches(&OsString::from("powerpnt.exe"), "POWERPNT"));
    }

    #[test]
    fn test_name_match_is_exact() {
        assert!(!name_matches(&OsString::from("POWERPNT2"), "POWERPNT"));
        assert!(!name_matches(&OsString::from("notpowerpnt"), "POWERPNT"));
    }

    #[test]
    fn test_no_matching_process_is_clean() {
        let control = SystemViewerControl::new(ViewerConfig {
            process_name: "deckwatch-no-such-viewer".to_string(),
            command: "deckwatch-no-such-viewer".to_string(),
            show_flag: "/s".to_string(),
        });

        assert_eq!(control.terminate_matching().unwrap(), 0);
    }

    #[test]
    fn test_spawn_failure_surfaces_os_error() {
        let control = SystemViewerControl::new(ViewerConfig {
            process_name: "deckwatch-no-such-viewer".to_string(),
            command: "deckwatch-no-such-viewer".to_string(),
            show_flag: "/s".to_string(),
        });

        assert!(control.spawn_viewer(Path::new("/decks/a.pptx")).is_err());
    }

    #[test]
    fn test_command_line_quotes_path() {
        let control = SystemViewerControl::new(ViewerConfig::default());
        let line = control.command_line(Path::new("/decks/all hands.pptx"));
        assert_eq!(line, "powerpnt /s \"/decks/all hands.pptx\"");
    }
}
