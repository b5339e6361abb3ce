//! Tracker configuration loading and config file resolution
//!
//! Every numeric threshold the tracker uses (scan period, cool-downs, depth
//! caps) lives here rather than in code constants. All fields have built-in
//! defaults, so an empty or missing TOML file yields a working configuration.
//!
//! # Config File Priority
//!
//! 1. Explicit path (command-line argument)
//! 2. `REEL_CONFIG` environment variable
//! 3. `<config_dir>/reel/config.toml`
//! 4. Compiled defaults (no file)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "REEL_CONFIG";

/// Tracker configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackerConfig {
    /// Period of the per-element overlay scan
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Minimum spacing between two full-page enhancement passes
    #[serde(default = "default_enhancement_cooldown_ms")]
    pub enhancement_cooldown_ms: u64,

    /// Delay before a SUCCEEDED/FAILED control returns to its idle appearance
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,

    /// Activations closer together than this collapse into one
    ///
    /// Only observable when it exceeds `reset_delay_ms`. A control stays
    /// WORKING/SUCCEEDED/FAILED until the reset delay passes and reports
    /// busy meanwhile, so with the defaults (500 ms gap, 3000 ms reset)
    /// the gap never triggers on its own.
    #[serde(default = "default_min_activation_gap_ms")]
    pub min_activation_gap_ms: u64,

    /// Recursion cap for the JSON record extractor
    #[serde(default = "default_extract_max_depth")]
    pub extract_max_depth: usize,

    /// Ancestor levels visited by the framework-state probe
    #[serde(default = "default_probe_max_ancestors")]
    pub probe_max_ancestors: usize,

    /// Nesting depth searched inside a framework props object
    #[serde(default = "default_props_max_depth")]
    pub props_max_depth: usize,

    /// Broadcast channel capacity for tracker events
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_scan_interval_ms() -> u64 {
    3000
}

fn default_enhancement_cooldown_ms() -> u64 {
    10_000
}

fn default_reset_delay_ms() -> u64 {
    3000
}

fn default_min_activation_gap_ms() -> u64 {
    500
}

fn default_extract_max_depth() -> usize {
    15
}

fn default_probe_max_ancestors() -> usize {
    15
}

fn default_props_max_depth() -> usize {
    4
}

fn default_event_bus_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval_ms(),
            enhancement_cooldown_ms: default_enhancement_cooldown_ms(),
            reset_delay_ms: default_reset_delay_ms(),
            min_activation_gap_ms: default_min_activation_gap_ms(),
            extract_max_depth: default_extract_max_depth(),
            probe_max_ancestors: default_probe_max_ancestors(),
            props_max_depth: default_props_max_depth(),
            event_bus_capacity: default_event_bus_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// A missing file is not an error: a warning is logged and the compiled
    /// defaults are returned. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                info!("Loaded tracker configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Resolve the config file location and load it
    ///
    /// Falls back to defaults when no candidate file exists.
    pub fn resolve_and_load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::load(&path),
            None => {
                info!("No tracker config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values that would stall or disable the tracker
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, u64); 6] = [
            ("scan_interval_ms", self.scan_interval_ms),
            ("reset_delay_ms", self.reset_delay_ms),
            ("extract_max_depth", self.extract_max_depth as u64),
            ("probe_max_ancestors", self.probe_max_ancestors as u64),
            ("props_max_depth", self.props_max_depth as u64),
            ("event_bus_capacity", self.event_bus_capacity as u64),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn enhancement_cooldown(&self) -> Duration {
        Duration::from_millis(self.enhancement_cooldown_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn min_activation_gap(&self) -> Duration {
        Duration::from_millis(self.min_activation_gap_ms)
    }
}

/// Find the config file to use, following the documented priority order
///
/// Explicit paths and the environment variable are returned even when the
/// file does not exist, so `load` can warn about them. The per-user default
/// location is only returned when the file is present.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    default_config_path().filter(|path| path.exists())
}

/// Per-user config file location for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reel").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_interval(), Duration::from_secs(3));
        assert_eq!(config.enhancement_cooldown(), Duration::from_secs(10));
        assert_eq!(config.extract_max_depth, 15);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = TrackerConfig::from_toml_str("scan_interval_ms = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
