//! Configuration file for bleach.
//!
//! The file lives at `~/.bleach/config.yaml` unless `--config` points
//! elsewhere. Every field is optional; a missing default file means the
//! built-in defaults.
//!
//! ```yaml
//! log_capacity: 20
//! sample_interval_ms: 1000
//! cpu_window_ms: 200
//! tick_rate_ms: 250
//! theme: dark
//! auth:
//!   command: ["sudo", "-v"]
//!   interactive: true
//! operations:
//!   - title: System Updates
//!     program: sh
//!     args: ["-c", "sudo apt-get update"]
//!     requires_auth: true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Catalog, OperationDescriptor};
use crate::error::{BleachError, Result};
use crate::logging::bleach_home;

/// Default number of status lines kept on screen.
pub const DEFAULT_LOG_CAPACITY: usize = 20;

/// Default metrics sampling period in milliseconds.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// Default CPU measurement window in milliseconds.
pub const DEFAULT_CPU_WINDOW_MS: u64 = 200;

/// Default UI tick period in milliseconds.
pub const DEFAULT_TICK_RATE_MS: u64 = 250;

/// Credential check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Program and arguments run to validate elevated credentials
    pub command: Vec<String>,
    /// Hand the terminal to the command so it can prompt for a password
    pub interactive: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            command: vec!["sudo".into(), "-v".into()],
            interactive: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of status/log lines kept (oldest evicted first)
    pub log_capacity: usize,
    /// Period between metrics snapshots
    pub sample_interval_ms: u64,
    /// Window over which CPU utilization is measured
    pub cpu_window_ms: u64,
    /// Period of the UI timer tick
    pub tick_rate_ms: u64,
    /// Color theme name
    pub theme: String,
    /// Credential check
    pub auth: AuthConfig,
    /// Operations replacing the built-in ones
    pub operations: Option<Vec<OperationDescriptor>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            cpu_window_ms: DEFAULT_CPU_WINDOW_MS,
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            theme: "default".into(),
            auth: AuthConfig::default(),
            operations: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// With `path` set, the file must exist. Without it, the default location
    /// is tried and the built-in defaults are used when it is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    debug!(path = %path.display(), "no configuration file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Read and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BleachError::config_not_found_with_source(path, e)
            } else {
                BleachError::io("reading config", path, e)
            }
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            BleachError::ConfigInvalid { message, .. } => BleachError::config_invalid(path, message),
            other => other,
        })?;

        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to null, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| BleachError::config_invalid("<inline>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the dashboard cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(BleachError::config_validation("log_capacity must be at least 1"));
        }
        if self.tick_rate_ms == 0 {
            return Err(BleachError::config_validation("tick_rate_ms must be at least 1"));
        }
        if self.sample_interval_ms < self.cpu_window_ms {
            return Err(BleachError::config_validation(format!(
                "sample_interval_ms ({}) must not be shorter than cpu_window_ms ({})",
                self.sample_interval_ms, self.cpu_window_ms
            )));
        }
        if self.auth.command.first().is_none_or(|program| program.is_empty()) {
            return Err(BleachError::config_validation("auth.command must name a program"));
        }
        if let Some(ops) = &self.operations {
            if let Some(op) = ops.iter().find(|op| op.program.is_empty()) {
                return Err(BleachError::config_validation(format!(
                    "operation '{}' has an empty program",
                    op.title
                )));
            }
        }
        Ok(())
    }

    /// The menu described by this configuration.
    pub fn catalog(&self) -> Catalog {
        match &self.operations {
            Some(ops) => Catalog::with_operations(ops.clone()),
            None => Catalog::builtin(),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

/// Default configuration file path (`~/.bleach/config.yaml`).
pub fn default_config_path() -> Result<PathBuf> {
    Ok(bleach_home()?.join("config.yaml"))
}
