//! Terminal UI for bleach.
//!
//! A ratatui dashboard that shows live host metrics and runs maintenance
//! operations behind a credential check, streaming their output into a
//! bounded log panel.
//!
//! ## Hotkeys
//!
//! - `↑`/`k`, `↓`/`j` - Move through the menu
//! - `g`/`Home`, `G`/`End` - First / last entry
//! - `Enter` - Run the selected action
//! - `Esc` - Cancel the running operation
//! - `?` or `h` - Help
//! - `q` - Quit
//! - `Ctrl+C` - Force quit from any state

pub mod app;
pub mod event;
pub mod input;
pub mod log_buffer;
pub mod state;
pub mod theme;
pub mod view;

#[cfg(test)]
mod integration_tests;

pub use app::{App, AppResult};
pub use event::{AppEvent, Event};
pub use log_buffer::LogBuffer;
pub use state::{Dashboard, Launcher, RunState, RunStateTag, StreamControl};
