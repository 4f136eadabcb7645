//! Terminal application: owns the terminal, the background runtime and the
//! event loop.
//!
//! The loop is single-threaded. It blocks on one channel fed by the input
//! thread, the credential gate, the process runner and the metrics sampler,
//! applies each event to the [`Dashboard`], then redraws.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use bleach_core::{BleachError, Config, OperationDescriptor};
use bleach_ops::{AuthGate, MetricsSampler, ProcessRunner, SystemProbe};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::event::Event;
use crate::input::InputReader;
use crate::state::{Dashboard, Launcher, StreamControl};
use crate::theme::Theme;
use crate::view;

/// Result type for app operations.
pub type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

type Backend = CrosstermBackend<io::Stdout>;

/// How long in-flight background tasks get to wind down on exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// [`Launcher`] backed by the real credential gate and process runner.
pub struct OpsLauncher {
    runtime: Handle,
    gate: AuthGate,
    runner: ProcessRunner,
    tx: UnboundedSender<Event>,
    interactive_pending: Option<OperationDescriptor>,
}

impl OpsLauncher {
    pub fn new(runtime: Handle, config: &Config, tx: UnboundedSender<Event>) -> Self {
        Self {
            runner: ProcessRunner::new(runtime.clone()),
            gate: AuthGate::new(&config.auth),
            runtime,
            tx,
            interactive_pending: None,
        }
    }

    /// An interactive check waiting for the terminal to be released.
    pub fn take_interactive(&mut self) -> Option<OperationDescriptor> {
        self.interactive_pending.take()
    }

    /// Run the check now; the terminal must already be released.
    pub fn begin_interactive(&self, operation: &OperationDescriptor) {
        self.gate.begin(&self.runtime, operation, self.tx.clone());
    }
}

impl Launcher for OpsLauncher {
    fn begin_auth(&mut self, operation: &OperationDescriptor) {
        if self.gate.is_interactive() {
            self.interactive_pending = Some(operation.clone());
        } else {
            self.gate.begin(&self.runtime, operation, self.tx.clone());
        }
    }

    fn start(&mut self, operation: &OperationDescriptor) -> Box<dyn StreamControl> {
        Box::new(self.runner.start(operation, self.tx.clone()))
    }
}

/// The bleach dashboard application.
pub struct App {
    config: Config,
    theme: Theme,
    log_dir: Option<PathBuf>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let theme = Theme::from_config(&config.theme);
        Self {
            config,
            theme,
            log_dir: None,
        }
    }

    /// Directory reported by the "View Logs" entry.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Run until the user quits.
    pub fn run(&mut self) -> AppResult<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("bleach-worker")
            .enable_all()
            .build()
            .map_err(|e| BleachError::internal(format!("failed to start runtime: {e}")))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let launcher = OpsLauncher::new(runtime.handle().clone(), &self.config, tx.clone());
        let mut dashboard = Dashboard::new(self.config.catalog(), launcher, self.config.log_capacity);
        if let Some(dir) = &self.log_dir {
            dashboard = dashboard.with_log_dir(dir.clone());
        }

        let mut terminal = setup_terminal()?;
        let result = self.run_session(&runtime, &mut terminal, &mut dashboard, &mut rx, tx);

        // Kills any running child before the runtime goes away
        drop(dashboard);
        let restored = restore_terminal(&mut terminal);
        runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        info!("dashboard stopped");

        result.and(restored)
    }

    fn run_session(
        &self,
        runtime: &Runtime,
        terminal: &mut Terminal<Backend>,
        dashboard: &mut Dashboard<OpsLauncher>,
        rx: &mut UnboundedReceiver<Event>,
        tx: UnboundedSender<Event>,
    ) -> AppResult<()> {
        let size = terminal.size()?;
        dashboard.apply(Event::Resize(size.width, size.height));

        let sampler = MetricsSampler::new(
            SystemProbe::new(),
            self.config.sample_interval(),
            self.config.cpu_window(),
        )
        .spawn(runtime.handle(), tx.clone());
        let input = InputReader::spawn(tx, self.config.tick_rate())?;

        info!(
            operations = dashboard.catalog().len(),
            interactive_auth = self.config.auth.interactive,
            theme = self.theme.name.display_name(),
            "dashboard started"
        );

        let result = self.event_loop(terminal, dashboard, rx, &input);
        sampler.abort();
        result
    }

    fn event_loop(
        &self,
        terminal: &mut Terminal<Backend>,
        dashboard: &mut Dashboard<OpsLauncher>,
        rx: &mut UnboundedReceiver<Event>,
        input: &InputReader,
    ) -> AppResult<()> {
        terminal.draw(|frame| view::draw(frame, &dashboard.snapshot(), &self.theme))?;
        let mut suspended = false;

        while !dashboard.should_quit() {
            let Some(event) = rx.blocking_recv() else {
                debug!("event channel closed");
                break;
            };

            if suspended && matches!(event, Event::Auth(_)) {
                resume_terminal(terminal, input)?;
                suspended = false;
            }

            dashboard.apply(event);

            if let Some(operation) = dashboard.launcher_mut().take_interactive() {
                suspend_terminal(terminal, input)?;
                suspended = true;
                println!("bleach: authentication required for {}", operation.title);
                dashboard.launcher().begin_interactive(&operation);
            }

            if !suspended {
                terminal.draw(|frame| view::draw(frame, &dashboard.snapshot(), &self.theme))?;
            }
        }

        Ok(())
    }
}

fn setup_terminal() -> AppResult<Terminal<Backend>> {
    crossterm::terminal::enable_raw_mode().map_err(|e| BleachError::TerminalInit {
        message: e.to_string(),
    })?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen).map_err(|e| {
        BleachError::TerminalInit {
            message: e.to_string(),
        }
    })?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> AppResult<()> {
    leave_terminal(terminal).map_err(|e| {
        BleachError::TerminalRestore {
            message: e.to_string(),
        }
        .into()
    })
}

fn leave_terminal(terminal: &mut Terminal<Backend>) -> io::Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Hand the terminal to a child process.
fn suspend_terminal(terminal: &mut Terminal<Backend>, input: &InputReader) -> AppResult<()> {
    input.pause();
    restore_terminal(terminal)
}

/// Take the terminal back after a child process is done with it.
fn resume_terminal(terminal: &mut Terminal<Backend>, input: &InputReader) -> AppResult<()> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::EnterAlternateScreen)?;
    terminal.clear()?;
    input.resume();
    if let Err(e) = terminal.hide_cursor() {
        warn!(error = %e, "failed to hide cursor");
    }
    Ok(())
}
