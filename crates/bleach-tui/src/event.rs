//! Event handling for the bleach TUI.
//!
//! [`Event`] is everything the event loop consumes. Keys are translated to
//! [`AppEvent`]s by the [`InputHandler`] before the state machine sees them.

use bleach_ops::{AuthOutcome, MetricsSnapshot, StreamEvent, StreamStatus};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Input to the event loop, from any producer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Terminal was resized to (columns, rows)
    Resize(u16, u16),
    /// A key was pressed
    Key(KeyEvent),
    /// The credential check finished
    Auth(AuthOutcome),
    /// One line of operation output
    Line(String),
    /// The operation finished; no more lines follow
    Complete(StreamStatus),
    /// A fresh metrics snapshot
    Metrics(MetricsSnapshot),
    /// Periodic UI timer
    Tick,
}

impl From<AuthOutcome> for Event {
    fn from(outcome: AuthOutcome) -> Self {
        Event::Auth(outcome)
    }
}

impl From<StreamEvent> for Event {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Line(line) => Event::Line(line),
            StreamEvent::Complete(status) => Event::Complete(status),
        }
    }
}

impl From<MetricsSnapshot> for Event {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Event::Metrics(snapshot)
    }
}

/// Application-level intents decoded from key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Request application quit
    Quit,
    /// Force quit (Ctrl+C), honored in every state
    ForceQuit,
    /// Cancel the running operation
    Cancel,
    /// Navigate up in the menu
    NavigateUp,
    /// Navigate down in the menu
    NavigateDown,
    /// Go to the first menu entry
    GoToTop,
    /// Go to the last menu entry
    GoToBottom,
    /// Activate the highlighted entry
    Select,
    /// Show help overlay
    ShowHelp,
    /// No action needed
    None,
}

/// Converts key events to app events.
#[derive(Debug, Default)]
pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Handle a key event and return the corresponding app event.
    pub fn handle_key(&self, key: KeyEvent) -> AppEvent {
        // Ctrl+C always force quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppEvent::ForceQuit;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => AppEvent::Quit,
            KeyCode::Esc => AppEvent::Cancel,

            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') => AppEvent::ShowHelp,

            KeyCode::Up | KeyCode::Char('k') => AppEvent::NavigateUp,
            KeyCode::Down | KeyCode::Char('j') => AppEvent::NavigateDown,
            KeyCode::Home | KeyCode::Char('g') => AppEvent::GoToTop,
            KeyCode::End | KeyCode::Char('G') => AppEvent::GoToBottom,

            KeyCode::Enter => AppEvent::Select,

            _ => AppEvent::None,
        }
    }
}
