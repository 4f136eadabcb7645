//! bleach - terminal maintenance dashboard
//!
//! Shows live host metrics and runs privileged maintenance operations,
//! streaming their output into the dashboard.
//!
//! ## Usage
//!
//! ```bash
//! # Start the dashboard
//! bleach
//!
//! # With verbose logging
//! bleach -v
//!
//! # With a custom configuration file and log directory
//! bleach --config ./bleach.yaml --log-dir /tmp/bleach-logs
//!
//! # Show version
//! bleach --version
//! ```

use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use bleach_core::{Config, LogGuard, init_logging};
use bleach_tui::App;
use clap::Parser;
use tracing::{error, info};

/// Terminal dashboard for host maintenance
///
/// Select an operation from the menu; privileged ones ask for your
/// password first. Output streams into the log panel as it is produced.
#[derive(Parser, Debug)]
#[command(name = "bleach")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.bleach/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.bleach/config.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of status lines kept in the log panel
    #[arg(long)]
    log_capacity: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            eprintln!("Error: {}", e);
            if let Some(hint) = e.guidance() {
                eprintln!("Hint: {}", hint);
            }
            return ExitCode::from(1);
        }
    };

    // Install panic hook to ensure terminal cleanup
    install_panic_hook();

    info!(version = bleach_core::VERSION, "Starting bleach dashboard");

    let mut app = App::new(config).with_log_dir(guard.log_dir());
    match app.run() {
        Ok(()) => {
            info!("bleach dashboard exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("bleach dashboard error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Install a panic hook that restores the terminal before printing the panic message.
fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// Put the terminal back in cooked mode on the main screen.
fn restore_terminal() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();

    let _ = crossterm::terminal::disable_raw_mode();
    crossterm::execute!(
        stdout,
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    stdout.flush()
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> bleach_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

/// Load the configuration file and apply command-line overrides.
fn load_config(cli: &Cli) -> bleach_core::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(capacity) = cli.log_capacity {
        config.log_capacity = capacity;
        config.validate()?;
    }
    Ok(config)
}
