//! Configuration for the folder watcher and relaunch coordinator.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DW_` and use double underscores
//! to separate nested levels:
//! - `DW_WATCH__POLL_INTERVAL_MS=500` sets `watch.poll_interval_ms`
//! - `DW_VIEWER__COMMAND=powerpnt` sets `viewer.command`
//! - `DW_RECOVERY__AUTO_RELAUNCH_LAST_FILE=true` sets `recovery.auto_relaunch_last_file`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .deckwatch is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Folder watch configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// External viewer process identity
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Startup recovery behavior
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Last successful launch, written by the coordinator only
    #[serde(default)]
    pub launch: LaunchState,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Directory to watch for changed decks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Regex matched against file names; `~$` office lock files are excluded
    /// by the default pattern
    #[serde(default = "default_filter_pattern")]
    pub filter_pattern: String,

    /// How often coalesced changes are drained and acted on
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Start watching immediately when no subcommand is given
    #[serde(default = "default_false")]
    pub auto_watch: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ViewerConfig {
    /// Process name to terminate, matched case-insensitively against running
    /// processes (extension stripped, so POWERPNT matches POWERPNT.EXE)
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Command alias used to start the viewer
    #[serde(default = "default_command")]
    pub command: String,

    /// Switch that opens the deck straight into the slideshow
    #[serde(default = "default_show_flag")]
    pub show_flag: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecoveryConfig {
    /// Relaunch the last launched deck at startup when it still exists
    #[serde(default = "default_false")]
    pub auto_relaunch_last_file: bool,
}

/// Durable record of the last file successfully launched and when.
///
/// Invariant: when `last_launched_file` is set, it was the argument of the
/// most recent successful viewer start issued by this coordinator. Only the
/// state keeper writes these fields.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct LaunchState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_launched_file: Option<PathBuf>,

    /// Formatted as `%Y-%m-%d %H:%M:%S`; compared as a string for the
    /// idempotent-write rule, never parsed back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_launch_time: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level filter (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_filter_pattern() -> String {
    r"^[^~](.*?\.pptx)$".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_process_name() -> String {
    "POWERPNT".to_string()
}
fn default_command() -> String {
    "powerpnt".to_string()
}
fn default_show_flag() -> String {
    "/s".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            watch: WatchConfig::default(),
            viewer: ViewerConfig::default(),
            recovery: RecoveryConfig::default(),
            launch: LaunchState::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filter_pattern: default_filter_pattern(),
            poll_interval_ms: default_poll_interval_ms(),
            auto_watch: false,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            command: default_command(),
            show_flag: default_show_flag(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            auto_relaunch_last_file: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".deckwatch/settings.toml"));

        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with DW_ prefix
            // Use double underscore (__) to separate nested levels
            .merge(Env::prefixed("DW_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Find the settings file by looking for a .deckwatch directory,
    /// searching from the current directory up to root
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".deckwatch");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".deckwatch/settings.toml"));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'deckwatch init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Get the workspace root directory (where .deckwatch is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".deckwatch");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DW_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(".deckwatch/settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;

        Ok(config_path)
    }

    /// Path the settings were (or would be) loaded from
    pub fn settings_path() -> PathBuf {
        Self::find_workspace_config().unwrap_or_else(|| PathBuf::from(".deckwatch/settings.toml"))
    }
}
