//! The dashboard state machine.
//!
//! [`Dashboard`] is driven by the event loop one [`Event`] at a time and is
//! the only writer of view state. It owns the single [`RunState`]: at most one
//! credential check or one streaming operation exists at any moment, and
//! selections made while one is in flight are ignored.
//!
//! Background work is started through the [`Launcher`] seam so the machine
//! can be exercised without spawning processes.

use std::path::PathBuf;

use bleach_core::{Catalog, MenuAction, OperationDescriptor, VERSION};
use bleach_ops::{AuthOutcome, MetricsSnapshot, StreamHandle, StreamStatus};
use tracing::{debug, info, warn};

use crate::event::{AppEvent, Event, InputHandler};
use crate::log_buffer::LogBuffer;
use crate::view::Viewport;

/// Control surface of a running operation.
pub trait StreamControl {
    /// Permit the producer to emit its next line.
    fn request_next(&self);

    /// Ask the producer to stop. Returns false if a cancel was already sent.
    fn cancel(&mut self) -> bool;
}

impl StreamControl for StreamHandle {
    fn request_next(&self) {
        StreamHandle::request_next(self);
    }

    fn cancel(&mut self) -> bool {
        StreamHandle::cancel(self)
    }
}

/// Starts the background work the state machine asks for.
///
/// Results come back later as [`Event::Auth`], [`Event::Line`] and
/// [`Event::Complete`].
pub trait Launcher {
    /// Start the credential check for `operation`.
    fn begin_auth(&mut self, operation: &OperationDescriptor);

    /// Start `operation` and return its control handle.
    fn start(&mut self, operation: &OperationDescriptor) -> Box<dyn StreamControl>;
}

/// What the dashboard is doing right now.
pub enum RunState {
    Idle,
    AwaitingAuth {
        pending: OperationDescriptor,
    },
    Streaming {
        operation: OperationDescriptor,
        stream: Box<dyn StreamControl>,
    },
}

impl RunState {
    pub fn tag(&self) -> RunStateTag {
        match self {
            RunState::Idle => RunStateTag::Idle,
            RunState::AwaitingAuth { .. } => RunStateTag::AwaitingAuth,
            RunState::Streaming { .. } => RunStateTag::Streaming,
        }
    }

    /// Title of the pending or running operation.
    pub fn operation_title(&self) -> Option<&str> {
        match self {
            RunState::Idle => None,
            RunState::AwaitingAuth { pending } => Some(&pending.title),
            RunState::Streaming { operation, .. } => Some(&operation.title),
        }
    }
}

impl std::fmt::Debug for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operation_title() {
            Some(title) => write!(f, "{:?}({title})", self.tag()),
            None => write!(f, "{:?}", self.tag()),
        }
    }
}

/// Data-free copy of the [`RunState`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStateTag {
    Idle,
    AwaitingAuth,
    Streaming,
}

impl RunStateTag {
    /// Short label for the header.
    pub fn label(&self) -> &'static str {
        match self {
            RunStateTag::Idle => "IDLE",
            RunStateTag::AwaitingAuth => "AUTH",
            RunStateTag::Streaming => "RUNNING",
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderSnapshot<'a> {
    pub state: RunStateTag,
    pub operation: Option<&'a str>,
    pub catalog: &'a Catalog,
    pub cursor: usize,
    pub log: &'a LogBuffer,
    pub metrics: Option<&'a MetricsSnapshot>,
    pub viewport: Viewport,
    pub show_help: bool,
}

/// Status line shown once the dashboard is ready.
pub fn ready_line() -> String {
    format!("Ready (v{VERSION}). Select an action.")
}

/// Status line for a finished operation.
pub fn completion_line(status: &StreamStatus) -> String {
    match status {
        StreamStatus::Success => "Done.".to_string(),
        StreamStatus::Failed { message, .. } => format!("Failed: {message}"),
        StreamStatus::StartFailed { message } => format!("Error: {message}"),
        StreamStatus::Cancelled => "Cancelled.".to_string(),
    }
}

/// The dashboard model and its transitions.
pub struct Dashboard<L> {
    launcher: L,
    input: InputHandler,
    catalog: Catalog,
    cursor: usize,
    state: RunState,
    log: LogBuffer,
    metrics: Option<MetricsSnapshot>,
    viewport: Viewport,
    show_help: bool,
    should_quit: bool,
    log_dir: Option<PathBuf>,
}

impl<L: Launcher> Dashboard<L> {
    pub fn new(catalog: Catalog, launcher: L, log_capacity: usize) -> Self {
        let mut log = LogBuffer::new(log_capacity);
        log.push(ready_line());
        Self {
            launcher,
            input: InputHandler::new(),
            catalog,
            cursor: 0,
            state: RunState::Idle,
            log,
            metrics: None,
            viewport: Viewport::default(),
            show_help: false,
            should_quit: false,
            log_dir: None,
        }
    }

    /// Directory reported by the "View Logs" entry.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Apply one event.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                let app_event = self.input.handle_key(key);
                self.handle_app_event(app_event);
            }
            Event::Resize(width, height) => self.viewport = Viewport::new(width, height),
            Event::Auth(outcome) => self.on_auth(outcome),
            Event::Line(line) => self.on_line(line),
            Event::Complete(status) => self.on_complete(status),
            Event::Metrics(snapshot) => self.metrics = Some(snapshot),
            Event::Tick => {}
        }
    }

    /// Apply a decoded key intent, honoring what the current state accepts.
    pub fn handle_app_event(&mut self, event: AppEvent) {
        if event == AppEvent::ForceQuit {
            info!(state = ?self.state, "force quit requested");
            self.should_quit = true;
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        match (self.state.tag(), event) {
            (RunStateTag::Idle, AppEvent::Quit) => self.should_quit = true,
            (RunStateTag::Idle, AppEvent::NavigateUp) => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            (RunStateTag::Idle, AppEvent::NavigateDown) => {
                if self.cursor + 1 < self.catalog.len() {
                    self.cursor += 1;
                }
            }
            (RunStateTag::Idle, AppEvent::GoToTop) => self.cursor = 0,
            (RunStateTag::Idle, AppEvent::GoToBottom) => {
                self.cursor = self.catalog.len().saturating_sub(1);
            }
            (RunStateTag::Idle, AppEvent::Select) => self.select(),
            (RunStateTag::Idle, AppEvent::ShowHelp) => self.show_help = true,
            (RunStateTag::Streaming, AppEvent::Cancel) => self.cancel_stream(),
            (state, AppEvent::Select) => {
                debug!(?state, "selection ignored while an operation is active");
            }
            _ => {}
        }
    }

    fn select(&mut self) {
        let Some(entry) = self.catalog.get(self.cursor) else {
            return;
        };

        match entry.action.clone() {
            MenuAction::Exit => self.should_quit = true,
            MenuAction::ShowLogs => {
                let line = match &self.log_dir {
                    Some(dir) => format!("Logs: {}", dir.display()),
                    None => "Logs: file logging is disabled".to_string(),
                };
                self.log.push(line);
            }
            MenuAction::Run(operation) if operation.requires_auth => {
                info!(operation = %operation.title, "requesting authentication");
                self.launcher.begin_auth(&operation);
                self.state = RunState::AwaitingAuth { pending: operation };
            }
            MenuAction::Run(operation) => self.start_stream(operation),
        }
    }

    fn start_stream(&mut self, operation: OperationDescriptor) {
        info!(
            operation = %operation.title,
            command = %operation.command_line(),
            "starting operation"
        );
        self.log.clear();
        let stream = self.launcher.start(&operation);
        self.state = RunState::Streaming { operation, stream };
    }

    fn on_auth(&mut self, outcome: AuthOutcome) {
        let pending = match std::mem::replace(&mut self.state, RunState::Idle) {
            RunState::AwaitingAuth { pending } => pending,
            other => {
                warn!(state = ?other, "auth outcome with no pending operation");
                self.state = other;
                return;
            }
        };

        match outcome {
            AuthOutcome::Granted => {
                info!(operation = %pending.title, "authentication successful");
                self.start_stream(pending);
            }
            AuthOutcome::Denied { reason } => {
                let line = if reason.is_empty() {
                    "Authentication failed.".to_string()
                } else {
                    format!("Authentication failed ({reason}).")
                };
                self.log.push(line);
            }
        }
    }

    fn on_line(&mut self, line: String) {
        match &self.state {
            RunState::Streaming { stream, .. } => {
                self.log.push(line);
                stream.request_next();
            }
            _ => debug!("output line with no running operation"),
        }
    }

    fn on_complete(&mut self, status: StreamStatus) {
        match std::mem::replace(&mut self.state, RunState::Idle) {
            RunState::Streaming { operation, .. } => {
                info!(operation = %operation.title, %status, "operation finished");
                self.log.push(completion_line(&status));
            }
            other => {
                debug!(state = ?other, "completion with no running operation");
                self.state = other;
            }
        }
    }

    fn cancel_stream(&mut self) {
        if let RunState::Streaming { operation, stream } = &mut self.state {
            if stream.cancel() {
                info!(operation = %operation.title, "cancel requested");
                self.log.push(format!("Cancelling {}...", operation.title));
            }
        }
    }

    pub fn snapshot(&self) -> RenderSnapshot<'_> {
        RenderSnapshot {
            state: self.state.tag(),
            operation: self.state.operation_title(),
            catalog: &self.catalog,
            cursor: self.cursor,
            log: &self.log,
            metrics: self.metrics.as_ref(),
            viewport: self.viewport,
            show_help: self.show_help,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_ref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }
}
