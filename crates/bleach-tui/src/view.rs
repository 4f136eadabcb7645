//! Layout and rendering for the bleach dashboard.
//!
//! Rendering is a pure function of a [`RenderSnapshot`]; nothing here
//! mutates model state.

use bleach_core::VERSION;
use bleach_ops::{MetricsSnapshot, ResourceUsage};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};

use crate::state::{RenderSnapshot, RunStateTag};
use crate::theme::Theme;

/// Width of the menu sidebar, borders included.
pub const SIDEBAR_WIDTH: u16 = 28;

/// Layout mode based on terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// 90+ cols: system info and resource gauges side by side.
    Wide,
    /// <90 cols: the two top panels are stacked.
    #[default]
    Narrow,
}

impl LayoutMode {
    pub fn from_width(width: u16) -> Self {
        if width >= 90 {
            LayoutMode::Wide
        } else {
            LayoutMode::Narrow
        }
    }

    /// Rows taken by the system and resource panels.
    pub fn top_height(&self) -> u16 {
        match self {
            LayoutMode::Wide => 8,
            LayoutMode::Narrow => 13,
        }
    }
}

/// Terminal dimensions and the layout derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
    pub layout: LayoutMode,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            layout: LayoutMode::from_width(width),
        }
    }
}

/// Draw one frame.
pub fn draw(frame: &mut Frame, snapshot: &RenderSnapshot<'_>, theme: &Theme) {
    let area = frame.area();
    let layout = snapshot.viewport.layout;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(layout.top_height()),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(area);

    draw_header(frame, chunks[0], snapshot, theme);
    draw_top(frame, chunks[1], layout, snapshot.metrics, theme);
    draw_body(frame, chunks[2], snapshot, theme);
    draw_footer(frame, chunks[3], snapshot.state, theme);

    if snapshot.show_help {
        draw_help_overlay(frame, area, theme);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot<'_>, theme: &Theme) {
    let title = format!(" BLEACH v{VERSION} ");
    let clock = chrono::Local::now().format("%H:%M:%S").to_string();
    let tag = format!("[{}]", snapshot.state.label());
    let tag_color = match snapshot.state {
        RunStateTag::Idle => theme.colors.status_healthy,
        RunStateTag::AwaitingAuth => theme.colors.status_warning,
        RunStateTag::Streaming => theme.colors.hotkey,
    };

    let right_len = clock.len() + 2 + tag.len();
    let spacing = area
        .width
        .saturating_sub(title.len() as u16 + right_len as u16 + 2) as usize;

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            title,
            Style::default().fg(theme.colors.header).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(spacing)),
        Span::styled(clock, Style::default().fg(theme.colors.text_dim)),
        Span::raw("  "),
        Span::styled(tag, Style::default().fg(tag_color).add_modifier(Modifier::BOLD)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.colors.border)),
    );

    frame.render_widget(header, area);
}

fn draw_top(
    frame: &mut Frame,
    area: Rect,
    layout: LayoutMode,
    metrics: Option<&MetricsSnapshot>,
    theme: &Theme,
) {
    let (direction, constraints) = match layout {
        LayoutMode::Wide => (
            Direction::Horizontal,
            [Constraint::Percentage(50), Constraint::Percentage(50)],
        ),
        LayoutMode::Narrow => (Direction::Vertical, [Constraint::Length(8), Constraint::Min(5)]),
    };
    let chunks = Layout::default()
        .direction(direction)
        .constraints(constraints)
        .split(area);

    draw_system_panel(frame, chunks[0], metrics, theme);
    draw_resources_panel(frame, chunks[1], metrics, theme);
}

fn panel_block<'a>(title: impl Into<String>, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.colors.border))
        .title(Span::styled(
            format!(" {} ", title.into()),
            Style::default().fg(theme.colors.header).add_modifier(Modifier::BOLD),
        ))
}

fn draw_system_panel(frame: &mut Frame, area: Rect, metrics: Option<&MetricsSnapshot>, theme: &Theme) {
    let block = panel_block("SYSTEM", theme);
    let Some(m) = metrics else {
        let waiting = Paragraph::new("sampling...")
            .style(Style::default().fg(theme.colors.text_dim))
            .block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let label = Style::default().fg(theme.colors.text_dim);
    let value = Style::default().fg(theme.colors.text);
    let row = |name: &'static str, text: String| {
        Line::from(vec![Span::styled(format!("{name:<8}"), label), Span::styled(text, value)])
    };

    let lines = vec![
        row("Host", m.hostname.clone()),
        row("OS", m.os.clone()),
        row("Kernel", m.kernel.clone()),
        row("Uptime", m.uptime_display()),
        row("Shell", m.shell.clone()),
        row("Procs", m.process_count.to_string()),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_resources_panel(
    frame: &mut Frame,
    area: Rect,
    metrics: Option<&MetricsSnapshot>,
    theme: &Theme,
) {
    let block = panel_block("RESOURCES", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(m) = metrics else {
        frame.render_widget(
            Paragraph::new("sampling...").style(Style::default().fg(theme.colors.text_dim)),
            inner,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let gauges = [
        ("CPU ", m.cpu_percent, format!("{:.1}%", m.cpu_percent)),
        ("RAM ", m.ram.percent, usage_label(&m.ram)),
        ("DISK", m.disk.percent, usage_label(&m.disk)),
    ];

    for ((name, pct, label), row) in gauges.into_iter().zip(rows.iter()) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(5), Constraint::Min(1)])
            .split(*row);

        frame.render_widget(
            Paragraph::new(name).style(Style::default().fg(theme.colors.text_dim)),
            cols[0],
        );
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(theme.usage_color(pct)).bg(Color::Reset))
            .ratio((pct / 100.0).clamp(0.0, 1.0))
            .label(label);
        frame.render_widget(gauge, cols[1]);
    }
}

fn draw_body(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot<'_>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
        .split(area);

    draw_menu(frame, chunks[0], snapshot, theme);
    draw_log_panel(frame, chunks[1], snapshot, theme);
}

fn draw_menu(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot<'_>, theme: &Theme) {
    let enabled = snapshot.state == RunStateTag::Idle;
    let items: Vec<ListItem> = snapshot
        .catalog
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let selected = i == snapshot.cursor;
            let marker = if selected { "> " } else { "  " };
            let style = match (enabled, selected) {
                (false, _) => Style::default().fg(theme.colors.disabled),
                (true, true) => Style::default()
                    .fg(theme.colors.selection)
                    .add_modifier(Modifier::BOLD),
                (true, false) => Style::default().fg(theme.colors.text),
            };
            ListItem::new(Line::from(Span::styled(format!("{marker}{}", entry.title), style)))
        })
        .collect();

    frame.render_widget(List::new(items).block(panel_block("ACTIONS", theme)), area);
}

fn draw_log_panel(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot<'_>, theme: &Theme) {
    let title = match snapshot.operation {
        Some(op) if snapshot.state == RunStateTag::Streaming => format!("STATUS / LOGS - {op}"),
        _ => "STATUS / LOGS".to_string(),
    };

    let visible = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = snapshot
        .log
        .last_n(visible)
        .map(|l| Line::from(Span::styled(l.to_string(), line_style(l, theme))))
        .collect();

    if snapshot.state == RunStateTag::AwaitingAuth {
        if let Some(op) = snapshot.operation {
            lines.push(Line::from(Span::styled(
                format!("Authenticating for {op}..."),
                Style::default().fg(theme.colors.status_warning),
            )));
            let overflow = lines.len().saturating_sub(visible);
            lines.drain(..overflow);
        }
    }

    let panel = Paragraph::new(lines)
        .block(panel_block(title, theme))
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn line_style(line: &str, theme: &Theme) -> Style {
    if line.starts_with("Error:") || line.starts_with("Failed:") || line.starts_with("Authentication failed") {
        Style::default().fg(theme.colors.status_error)
    } else if line == "Done." {
        Style::default().fg(theme.colors.status_healthy)
    } else {
        Style::default().fg(theme.colors.text)
    }
}

fn draw_footer(frame: &mut Frame, area: Rect, state: RunStateTag, theme: &Theme) {
    let hotkey = Style::default().fg(theme.colors.hotkey);
    let hints = match state {
        RunStateTag::Idle => vec![
            Span::styled("[↑↓]", hotkey),
            Span::raw("Navigate "),
            Span::styled("[Enter]", hotkey),
            Span::raw("Select "),
            Span::styled("[?]", hotkey),
            Span::raw("Help "),
            Span::styled("[q]", hotkey),
            Span::raw("Quit"),
        ],
        RunStateTag::AwaitingAuth => vec![
            Span::raw("Waiting for authentication "),
            Span::styled("[Ctrl+C]", hotkey),
            Span::raw("Quit"),
        ],
        RunStateTag::Streaming => vec![
            Span::styled("[Esc]", hotkey),
            Span::raw("Cancel "),
            Span::styled("[Ctrl+C]", hotkey),
            Span::raw("Quit"),
        ],
    };

    let footer = Paragraph::new(Line::from(hints))
        .style(Style::default().fg(theme.colors.text_dim))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(theme.colors.border))
                .title(Span::styled(
                    format!("{}x{}", frame.area().width, frame.area().height),
                    Style::default().fg(theme.colors.text_dim),
                ))
                .title_alignment(Alignment::Right),
        );
    frame.render_widget(footer, area);
}

fn draw_help_overlay(frame: &mut Frame, area: Rect, theme: &Theme) {
    let width = 50.min(area.width.saturating_sub(4));
    let height = 17.min(area.height.saturating_sub(4));
    let overlay = Rect::new(
        (area.width.saturating_sub(width)) / 2,
        (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, overlay);

    let help_text = "\
bleach hotkeys

Menu:
  ↑ k      Move up
  ↓ j      Move down
  g Home   First entry
  G End    Last entry
  Enter    Run selected action

While an operation runs:
  Esc      Cancel it

General:
  ?  h     Show this help
  q        Quit
  Ctrl+C   Force quit

Press any key to close this help.";

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(theme.colors.text))
        .block(panel_block("Help", theme).style(Style::default().bg(Color::Black)))
        .wrap(Wrap { trim: false });
    frame.render_widget(help, overlay);
}

/// `used/total GiB (pct%)`, or `unknown` when the total could not be read.
pub fn usage_label(usage: &ResourceUsage) -> String {
    if usage.total == 0 {
        return bleach_ops::metrics::UNKNOWN.to_string();
    }
    format!(
        "{}/{} ({:.1}%)",
        format_bytes(usage.used),
        format_bytes(usage.total),
        usage.percent
    )
}

/// Human-readable binary size with one decimal.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
