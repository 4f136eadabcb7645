//! Error types for bleach operations.
//!
//! [`BleachError`] covers every failure the dashboard knows about. Most of
//! them are recoverable: the component that hits them turns them into a
//! status line and the dashboard returns to idle. Only terminal setup
//! failures and invalid startup configuration end the process.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`BleachError`].
pub type Result<T> = std::result::Result<T, BleachError>;

/// Error type for all bleach operations.
///
/// - No automatic retry: the operator re-selects an action to try again
/// - No silent failures: every recoverable error becomes a visible status line
#[derive(Debug, Error)]
pub enum BleachError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file not found
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Operation Errors
    // =========================================================================
    /// Credential check failed
    #[error("Authentication denied: {reason}")]
    AuthDenied { reason: String },

    /// External process could not be started
    #[error("Failed to start {program}: {message}")]
    ProcessStart { program: String, message: String },

    /// External process exited unsuccessfully
    #[error("{program} {}", describe_exit(.exit_code))]
    ProcessExit {
        program: String,
        exit_code: Option<i32>,
    },

    /// A single host metric could not be read
    #[error("Metric probe {metric} failed: {message}")]
    MetricProbe { metric: String, message: String },

    // =========================================================================
    // TUI Errors
    // =========================================================================
    /// Terminal initialization failed
    #[error("Terminal initialization failed: {message}")]
    TerminalInit { message: String },

    /// Terminal restore failed
    #[error("Failed to restore terminal: {message}")]
    TerminalRestore { message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in bleach)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BleachError {
    /// Create a ConfigNotFound error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a ConfigNotFound error with source
    pub fn config_not_found_with_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigValidation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an AuthDenied error
    pub fn auth_denied(reason: impl Into<String>) -> Self {
        Self::AuthDenied {
            reason: reason.into(),
        }
    }

    /// Create a ProcessStart error
    pub fn process_start(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessStart {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a ProcessExit error
    pub fn process_exit(program: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ProcessExit {
            program: program.into(),
            exit_code,
        }
    }

    /// Create a MetricProbe error
    pub fn metric_probe(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetricProbe {
            metric: metric.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Error classification helpers
    // =========================================================================

    /// Returns true if the dashboard recovers by returning to idle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AuthDenied { .. }
                | Self::ProcessStart { .. }
                | Self::ProcessExit { .. }
                | Self::MetricProbe { .. }
        )
    }

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigInvalid { .. } | Self::ConfigValidation { .. }
        )
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Pass an existing file to --config or omit it to use the defaults")
            }
            Self::ConfigInvalid { .. } => Some("Check the YAML syntax of the configuration file"),
            Self::AuthDenied { .. } => Some("Re-select the action and enter your password again"),
            Self::ProcessStart { .. } => Some("Check that the program is installed and on PATH"),
            Self::TerminalInit { .. } => Some("Try running in a different terminal"),
            _ => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_error() {
        let err = BleachError::config_not_found("/home/user/.bleach/config.yaml");
        assert!(err.to_string().contains("Configuration not found"));
        assert!(err.is_config_error());
        assert!(err.guidance().is_some());
    }

    #[test]
    fn test_process_start_error() {
        let err = BleachError::process_start("apt-get", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to start apt-get: No such file or directory"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_classification() {
        assert!(BleachError::auth_denied("exit status 1").is_recoverable());
        assert!(
            BleachError::metric_probe("disk", "no filesystem mounted at /").is_recoverable()
        );
        assert!(!BleachError::internal("bug").is_recoverable());
        assert!(
            !BleachError::TerminalInit {
                message: "not a tty".into()
            }
            .is_recoverable()
        );
        assert!(!BleachError::config_validation("bad").is_recoverable());
    }

    #[test]
    fn test_process_exit_display() {
        assert_eq!(
            BleachError::process_exit("sh", Some(100)).to_string(),
            "sh exited with code 100"
        );
        assert_eq!(
            BleachError::process_exit("sh", None).to_string(),
            "sh was terminated by a signal"
        );
    }
}
