//! Credential gate run before any privileged operation.
//!
//! The gate runs a no-op privileged command (by default `sudo -v`, which
//! validates and caches the operator's credentials) and reports success iff
//! it exits with status 0. The result is delivered once, as an event, and is
//! never retried.

use std::process::Stdio;

use bleach_core::{AuthConfig, BleachError, OperationDescriptor};
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Terminal result of one credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted,
    Denied { reason: String },
}

impl AuthOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthOutcome::Granted)
    }

    /// The denial as an error value, for logging and guidance.
    pub fn into_error(self) -> Option<BleachError> {
        match self {
            AuthOutcome::Granted => None,
            AuthOutcome::Denied { reason } => Some(BleachError::auth_denied(reason)),
        }
    }
}

/// Runs the privilege check subprocess.
#[derive(Debug, Clone)]
pub struct AuthGate {
    program: String,
    args: Vec<String>,
    interactive: bool,
}

impl AuthGate {
    /// Build a gate from configuration.
    ///
    /// An empty command is rejected by config validation, so an empty
    /// program here only happens for hand-built configs and is reported as a
    /// denial when the check runs.
    pub fn new(config: &AuthConfig) -> Self {
        let mut command = config.command.iter().cloned();
        Self {
            program: command.next().unwrap_or_default(),
            args: command.collect(),
            interactive: config.interactive,
        }
    }

    /// Whether the check needs the terminal to prompt for a password.
    ///
    /// The caller must release the terminal before [`AuthGate::begin`] and
    /// take it back when the outcome arrives.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Start the check for `operation` without blocking the caller.
    ///
    /// Exactly one outcome is sent on `tx` when the check subprocess exits.
    pub fn begin<E>(
        &self,
        runtime: &Handle,
        operation: &OperationDescriptor,
        tx: UnboundedSender<E>,
    ) -> JoinHandle<()>
    where
        E: From<AuthOutcome> + Send + 'static,
    {
        let gate = self.clone();
        let title = operation.title.clone();
        runtime.spawn(async move {
            let outcome = gate.check(&title).await;
            if tx.send(outcome.into()).is_err() {
                warn!(operation = %title, "auth outcome dropped, event loop is gone");
            }
        })
    }

    /// Run the check subprocess and wait for it.
    #[instrument(level = "debug", skip(self), fields(program = %self.program))]
    pub async fn check(&self, operation: &str) -> AuthOutcome {
        if self.program.is_empty() {
            return AuthOutcome::Denied {
                reason: "no credential check command configured".into(),
            };
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.interactive {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        let outcome = match command.status().await {
            Ok(status) if status.success() => AuthOutcome::Granted,
            Ok(status) => AuthOutcome::Denied {
                reason: match status.code() {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".into(),
                },
            },
            Err(e) => AuthOutcome::Denied {
                reason: format!("failed to run {}: {e}", self.program),
            },
        };

        match outcome.clone().into_error() {
            None => info!(operation, "authentication granted"),
            Some(err) => warn!(operation, error = %err, "authentication denied"),
        }
        outcome
    }
}
