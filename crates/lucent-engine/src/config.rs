//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `lucent-config.yaml` next to
//! the binary's working directory. This module defines strongly-typed
//! structs that mirror the YAML structure and a loader that reads the
//! file; a missing file means defaults across the board.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `lucent-config.yaml`. All fields have
/// defaults, so any subset of the file may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LucentConfig {
    /// Ledger store settings.
    #[serde(default)]
    pub store: StoreSection,

    /// Lifecycle tracker timer settings.
    #[serde(default)]
    pub tracker: TrackerSection,

    /// Scheduled audit settings.
    #[serde(default)]
    pub audit: AuditSection,

    /// Control loop settings.
    #[serde(default)]
    pub control: ControlSection,

    /// Worlds to register at startup.
    #[serde(default)]
    pub worlds: Vec<WorldSection>,
}

impl LucentConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Ledger store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreSection {
    /// Path of the ledger database file.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Lifecycle tracker timer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackerSection {
    /// Registry poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Full-world sweep interval in milliseconds.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

/// Scheduled audit settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuditSection {
    /// Seconds between scheduled read-only audit reports; 0 disables
    /// them entirely (repairs are always operator-triggered).
    #[serde(default)]
    pub interval_secs: u64,

    /// Deadline in milliseconds for the world-inspection handoff.
    #[serde(default = "default_live_timeout_ms")]
    pub live_timeout_ms: u64,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            live_timeout_ms: default_live_timeout_ms(),
        }
    }
}

/// Control loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlSection {
    /// Milliseconds per control-loop tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// One world registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldSection {
    /// The world's name.
    pub name: String,

    /// Minimum build height; the void starts strictly below it.
    #[serde(default = "default_min_y")]
    pub min_y: i32,
}

impl WorldSection {
    /// The world registered when the config names none.
    pub fn fallback() -> Self {
        Self {
            name: "overworld".to_owned(),
            min_y: default_min_y(),
        }
    }
}

fn default_store_path() -> String {
    "data/ledger.db".to_owned()
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_sweep_interval_ms() -> u64 {
    500
}

const fn default_live_timeout_ms() -> u64 {
    5000
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_min_y() -> i32 {
    -64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = LucentConfig::parse("{}").unwrap();
        assert_eq!(config, LucentConfig::default());
        assert_eq!(config.store.path, "data/ledger.db");
        assert_eq!(config.tracker.poll_interval_ms, 1000);
        assert_eq!(config.tracker.sweep_interval_ms, 500);
        assert_eq!(config.audit.interval_secs, 0);
        assert_eq!(config.control.tick_interval_ms, 100);
        assert!(config.worlds.is_empty());
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
store:
  path: /var/lib/lucent/ledger.db
tracker:
  sweep_interval_ms: 250
audit:
  interval_secs: 900
worlds:
  - name: overworld
  - name: mirror_realm
    min_y: 0
";
        let config = LucentConfig::parse(yaml).unwrap();
        assert_eq!(config.store.path, "/var/lib/lucent/ledger.db");
        assert_eq!(config.tracker.poll_interval_ms, 1000);
        assert_eq!(config.tracker.sweep_interval_ms, 250);
        assert_eq!(config.audit.interval_secs, 900);
        assert_eq!(config.audit.live_timeout_ms, 5000);
        assert_eq!(config.worlds.len(), 2);
        assert_eq!(config.worlds.first().unwrap().min_y, -64);
        assert_eq!(config.worlds.get(1).unwrap().min_y, 0);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(LucentConfig::parse("store: [").is_err());
    }
}
