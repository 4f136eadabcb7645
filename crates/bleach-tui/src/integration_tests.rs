//! End-to-end tests for the bleach TUI.
//!
//! Rendering is checked against ratatui's `TestBackend`. The pipeline tests
//! drive a real [`Dashboard`] through the real credential gate and process
//! runner with `/bin/sh` commands, pulling events off the channel the same
//! way the event loop does.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bleach_core::{AuthConfig, Catalog, Config, OperationDescriptor};
    use bleach_ops::{MetricsSnapshot, ResourceUsage, StreamStatus};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use tokio::sync::mpsc;

    use crate::app::OpsLauncher;
    use crate::event::Event;
    use crate::state::{Dashboard, Launcher, RunStateTag, StreamControl};
    use crate::theme::Theme;
    use crate::view;

    // ============================================================
    // Test Helpers
    // ============================================================

    struct NullLauncher;

    struct NullStream;

    impl StreamControl for NullStream {
        fn request_next(&self) {}

        fn cancel(&mut self) -> bool {
            true
        }
    }

    impl Launcher for NullLauncher {
        fn begin_auth(&mut self, _operation: &OperationDescriptor) {}

        fn start(&mut self, _operation: &OperationDescriptor) -> Box<dyn StreamControl> {
            Box::new(NullStream)
        }
    }

    fn test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(width, height)).unwrap()
    }

    /// Resize the dashboard to the terminal, as the input thread would, then draw.
    fn render<L: Launcher>(dash: &mut Dashboard<L>, width: u16, height: u16) -> Buffer {
        dash.apply(Event::Resize(width, height));
        let mut terminal = test_terminal(width, height);
        let theme = Theme::default();
        terminal
            .draw(|frame| view::draw(frame, &dash.snapshot(), &theme))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn buffer_contains(buffer: &Buffer, text: &str) -> bool {
        buffer_to_string(buffer).contains(text)
    }

    fn buffer_to_string(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut result = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                result.push(buffer[(x, y)].symbol().chars().next().unwrap_or(' '));
            }
            result.push('\n');
        }
        result
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn sample_metrics() -> MetricsSnapshot {
        MetricsSnapshot {
            hostname: "testhost".into(),
            kernel: "6.1.0".into(),
            os: "Debian 12".into(),
            uptime: Duration::from_secs(3 * 3600 + 25 * 60),
            shell: "/bin/bash".into(),
            cpu_percent: 42.0,
            ram: ResourceUsage::new(2 * 1024 * 1024 * 1024, 8 * 1024 * 1024 * 1024),
            disk: ResourceUsage::default(),
            process_count: 123,
        }
    }

    fn null_dashboard() -> Dashboard<NullLauncher> {
        Dashboard::new(Catalog::builtin(), NullLauncher, 20)
    }

    // ============================================================
    // Rendering
    // ============================================================

    #[test]
    fn test_initial_render_shows_menu_and_ready_line() {
        let mut dash = null_dashboard();
        let buffer = render(&mut dash, 120, 40);

        assert!(buffer_contains(&buffer, "BLEACH"));
        assert!(buffer_contains(&buffer, "[IDLE]"));
        assert!(buffer_contains(&buffer, "System Cleanup"));
        assert!(buffer_contains(&buffer, "View Logs"));
        assert!(buffer_contains(&buffer, "Exit"));
        assert!(buffer_contains(&buffer, "Select an action."));
        // No snapshot yet
        assert!(buffer_contains(&buffer, "sampling..."));
    }

    #[test]
    fn test_render_metrics_panel() {
        let mut dash = null_dashboard();
        dash.apply(Event::Metrics(sample_metrics()));
        let buffer = render(&mut dash, 120, 40);

        assert!(buffer_contains(&buffer, "testhost"));
        assert!(buffer_contains(&buffer, "Debian 12"));
        assert!(buffer_contains(&buffer, "3h 25m"));
        assert!(buffer_contains(&buffer, "42.0%"));
        assert!(buffer_contains(&buffer, "2.0 GiB/8.0 GiB"));
        assert!(buffer_contains(&buffer, "unknown"));
        assert!(!buffer_contains(&buffer, "sampling..."));
    }

    #[test]
    fn test_render_narrow_layout_stacks_panels() {
        let mut dash = null_dashboard();
        dash.apply(Event::Metrics(sample_metrics()));
        let buffer = render(&mut dash, 80, 40);
        let text = buffer_to_string(&buffer);

        let system_row = text.lines().position(|l| l.contains("SYSTEM")).unwrap();
        let resources_row = text.lines().position(|l| l.contains("RESOURCES")).unwrap();
        assert!(resources_row > system_row);

        let wide = buffer_to_string(&render(&mut dash, 120, 40));
        let line = wide.lines().find(|l| l.contains("SYSTEM")).unwrap();
        assert!(line.contains("RESOURCES"));
    }

    #[test]
    fn test_layout_follows_last_resize_event() {
        let mut dash = null_dashboard();
        dash.apply(Event::Resize(80, 40));

        // The frame is wide but the dashboard was last told it is narrow
        let mut terminal = test_terminal(120, 40);
        let theme = Theme::default();
        terminal
            .draw(|frame| view::draw(frame, &dash.snapshot(), &theme))
            .unwrap();
        let text = buffer_to_string(terminal.backend().buffer());

        let line = text.lines().find(|l| l.contains("SYSTEM")).unwrap();
        assert!(!line.contains("RESOURCES"));
    }

    #[test]
    fn test_render_streaming_state() {
        let mut dash = null_dashboard();
        // Dev Caches runs without the credential check
        dash.apply(key(KeyCode::Char('G')));
        dash.apply(key(KeyCode::Up));
        dash.apply(key(KeyCode::Up));
        dash.apply(key(KeyCode::Enter));
        dash.apply(Event::Line("Total reclaimed space: 0B".into()));

        let buffer = render(&mut dash, 120, 40);
        assert!(buffer_contains(&buffer, "[RUNNING]"));
        assert!(buffer_contains(&buffer, "STATUS / LOGS - Dev Caches"));
        assert!(buffer_contains(&buffer, "Total reclaimed space: 0B"));
        assert!(buffer_contains(&buffer, "[Esc]Cancel"));
    }

    #[test]
    fn test_render_awaiting_auth() {
        let mut dash = null_dashboard();
        dash.apply(key(KeyCode::Enter));

        let buffer = render(&mut dash, 120, 40);
        assert!(buffer_contains(&buffer, "[AUTH]"));
        assert!(buffer_contains(&buffer, "Authenticating for System Cleanup..."));
    }

    #[test]
    fn test_render_help_overlay() {
        let mut dash = null_dashboard();
        dash.apply(key(KeyCode::Char('?')));
        let buffer = render(&mut dash, 120, 40);
        assert!(buffer_contains(&buffer, "bleach hotkeys"));

        dash.apply(key(KeyCode::Esc));
        let buffer = render(&mut dash, 120, 40);
        assert!(!buffer_contains(&buffer, "bleach hotkeys"));
    }

    #[test]
    fn test_render_tiny_terminal_does_not_panic() {
        let mut dash = null_dashboard();
        dash.apply(Event::Metrics(sample_metrics()));
        dash.apply(key(KeyCode::Char('?')));
        for (w, h) in [(1, 1), (10, 5), (40, 12), (89, 20)] {
            render(&mut dash, w, h);
        }
    }

    // ============================================================
    // Full pipeline
    // ============================================================

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn pipeline_config(auth: &[&str], operations: Vec<OperationDescriptor>) -> Config {
        Config {
            auth: AuthConfig {
                command: auth.iter().map(|s| s.to_string()).collect(),
                interactive: false,
            },
            operations: Some(operations),
            ..Config::default()
        }
    }

    /// Feed channel events to the dashboard until it is idle again.
    fn drive_until_idle(
        dash: &mut Dashboard<OpsLauncher>,
        rx: &mut mpsc::UnboundedReceiver<Event>,
    ) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while dash.state().tag() != RunStateTag::Idle {
            assert!(Instant::now() < deadline, "pipeline did not finish");
            let event = rx.blocking_recv().unwrap();
            dash.apply(event);
        }
    }

    #[test]
    fn test_pipeline_granted_operation_streams_in_order() {
        let rt = runtime();
        let config = pipeline_config(
            &["true"],
            vec![OperationDescriptor::shell(
                "System Updates",
                "echo 'Reading package lists...'; echo Done >&2",
            )],
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let launcher = OpsLauncher::new(rt.handle().clone(), &config, tx);
        let mut dash = Dashboard::new(config.catalog(), launcher, config.log_capacity);

        dash.apply(key(KeyCode::Enter));
        assert_eq!(dash.state().tag(), RunStateTag::AwaitingAuth);
        drive_until_idle(&mut dash, &mut rx);

        assert_eq!(
            dash.log().to_vec(),
            vec!["Reading package lists...", "Done", "Done."]
        );
    }

    #[test]
    fn test_pipeline_denied_operation_never_starts() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let config = pipeline_config(
            &["false"],
            vec![OperationDescriptor::shell(
                "Maintenance",
                format!("touch {}", marker.display()),
            )],
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let launcher = OpsLauncher::new(rt.handle().clone(), &config, tx);
        let mut dash = Dashboard::new(config.catalog(), launcher, config.log_capacity);

        dash.apply(key(KeyCode::Enter));
        drive_until_idle(&mut dash, &mut rx);

        assert_eq!(
            dash.log().newest(),
            Some("Authentication failed (exit status 1).")
        );
        assert!(!marker.exists());
    }

    #[test]
    fn test_pipeline_failed_and_missing_programs() {
        let rt = runtime();
        let config = pipeline_config(
            &["true"],
            vec![
                OperationDescriptor::shell("Broken", "echo partial; exit 100").with_auth(false),
                OperationDescriptor::new("Missing", "/nonexistent/bleach-op", Vec::<String>::new())
                    .with_auth(false),
            ],
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let launcher = OpsLauncher::new(rt.handle().clone(), &config, tx);
        let mut dash = Dashboard::new(config.catalog(), launcher, config.log_capacity);

        dash.apply(key(KeyCode::Enter));
        drive_until_idle(&mut dash, &mut rx);
        assert_eq!(dash.log().to_vec(), vec!["partial", "Failed: exit status 100"]);

        dash.apply(key(KeyCode::Down));
        dash.apply(key(KeyCode::Enter));
        drive_until_idle(&mut dash, &mut rx);
        let last = dash.log().newest().unwrap().to_string();
        assert!(last.starts_with("Error: "), "got {last}");
    }

    #[test]
    fn test_pipeline_cancel_kills_operation() {
        let rt = runtime();
        let config = pipeline_config(
            &["true"],
            vec![
                OperationDescriptor::shell("Forever", "while true; do echo tick; sleep 0.05; done")
                    .with_auth(false),
            ],
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let launcher = OpsLauncher::new(rt.handle().clone(), &config, tx);
        let mut dash = Dashboard::new(config.catalog(), launcher, config.log_capacity);

        dash.apply(key(KeyCode::Enter));
        let first = rx.blocking_recv().unwrap();
        assert_eq!(first, Event::Line("tick".into()));
        dash.apply(first);

        dash.apply(key(KeyCode::Esc));
        drive_until_idle(&mut dash, &mut rx);
        assert_eq!(dash.log().newest(), Some("Cancelled."));
    }

    #[test]
    fn test_stream_status_lines_match_runner_statuses() {
        // The runner's failure text is used verbatim after "Failed: "
        let status = StreamStatus::Failed {
            exit_code: Some(2),
            message: "exit status 2".into(),
        };
        assert_eq!(crate::state::completion_line(&status), "Failed: exit status 2");
    }
}
