//! UI rendering for the TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState},
};

use crate::core::{Emphasis, JobState, Row, Tone, fail_rate_emphasis, state_emphasis};
use crate::logs::is_error_line;

use super::app::{LogStatus, LogView, Mode, TuiApp};

const TITLE: &str = "vSphere Periodic Job Monitor";

/// Main render function - dispatches to view-specific renderers.
pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer/help
        ])
        .split(frame.area());

    match &app.mode {
        Mode::ViewingLog(view) => {
            render_log_header(frame, view, chunks[0]);
            render_log(frame, view, chunks[1]);
        }
        Mode::Idle | Mode::Reloading => {
            render_header(frame, app, chunks[0]);
            render_jobs(frame, app, chunks[1]);
        }
    }

    render_footer(frame, app, chunks[2]);
}

/// Log lines that fit in the content area for a terminal of `height` rows.
pub fn log_viewport(height: u16) -> usize {
    // header + footer + content borders
    height.saturating_sub(3 + 3 + 2) as usize
}

fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let counts = app.counts();
    let mut parts = vec![
        format!("Total: {}", counts.total),
        format!("Pass: {}", counts.passing),
        format!("Fail: {}", counts.failing),
        format!("Pending: {}", counts.pending),
    ];

    let mut filters = Vec::new();
    if let Some(v) = app.version_filter() {
        filters.push(format!("ver={v}"));
    }
    if let Some(s) = app.state_filter() {
        filters.push(format!("state={s}"));
    }
    if !filters.is_empty() {
        parts.push(format!("Filter: {}", filters.join(", ")));
    }
    parts.push(format!("Sort: {}", app.sort_key()));
    if app.is_reloading() {
        parts.push("Reloading...".to_string());
    }

    let block = Block::default()
        .title(TITLE)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(format!(" {}", parts.join("  |  "))).block(block);
    frame.render_widget(paragraph, area);
}

fn render_jobs(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let block = Block::default()
        .title(format!("Jobs ({})", app.rows.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.rows.is_empty() {
        let text = Paragraph::new("  No jobs match the current filters")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let header = TableRow::new(
        ["VER", "STATUS", "RECENT", "FAIL%", "LAST OK", "TYPE", "JOB NAME", "URL"]
            .into_iter()
            .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))),
    );

    let rows: Vec<TableRow> = app.rows.iter().map(table_row).collect();

    let widths = [
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Length(11),
        Constraint::Min(30),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_row(row: &Row) -> TableRow<'static> {
    TableRow::new(vec![
        Cell::from(row.version.clone()).style(Style::default().fg(Color::Cyan)),
        Cell::from(row.state.label()).style(emphasis_style(state_emphasis(&row.state))),
        Cell::from(sparkline_line(&row.sparkline)),
        Cell::from(row.fail_rate_percent.clone())
            .style(emphasis_style(fail_rate_emphasis(row.fail_rate))),
        Cell::from(row.last_ok_age.clone()),
        Cell::from(row.variant.clone()).style(Style::default().fg(Color::DarkGray)),
        Cell::from(row.job.clone()),
        Cell::from(row.short_url.clone()).style(Style::default().fg(Color::DarkGray)),
    ])
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Good => Color::Green,
        Tone::Warn => Color::Yellow,
        Tone::Bad => Color::Red,
        Tone::Muted => Color::DarkGray,
        Tone::Info => Color::Cyan,
        Tone::Plain => Color::White,
    }
}

fn emphasis_style(emphasis: Emphasis) -> Style {
    let style = Style::default().fg(tone_color(emphasis.tone));
    if emphasis.bold {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn sparkline_line(sparkline: &str) -> Line<'static> {
    let spans: Vec<Span> = sparkline
        .chars()
        .map(|c| {
            let state = match c {
                'S' => JobState::Success,
                'F' => JobState::Failure,
                'P' => JobState::Pending,
                'A' => JobState::Aborted,
                'E' => JobState::Error,
                'T' => JobState::Triggered,
                _ => JobState::default(),
            };
            Span::styled(c.to_string(), emphasis_style(state_emphasis(&state)))
        })
        .collect();
    Line::from(spans)
}

fn render_log_header(frame: &mut Frame, view: &LogView, area: Rect) {
    let text = match &view.status {
        LogStatus::Loading => format!(" Loading log for {}...", view.job),
        LogStatus::Loaded(tail) => {
            format!(" {}  |  {} lines  |  {}", view.job, tail.lines.len(), tail.url)
        }
        LogStatus::Failed(_) => format!(" {}", view.job),
    };

    let block = Block::default()
        .title("Build Log")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_log(frame: &mut Frame, view: &LogView, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = match &view.status {
        LogStatus::Loading => {
            Paragraph::new("  Fetching...").style(Style::default().fg(Color::DarkGray))
        }
        LogStatus::Failed(msg) => {
            Paragraph::new(format!("  {msg}")).style(Style::default().fg(Color::Red))
        }
        LogStatus::Loaded(tail) => {
            let height = area.height.saturating_sub(2) as usize;
            let lines: Vec<Line> = tail
                .lines
                .iter()
                .skip(view.scroll)
                .take(height)
                .map(|l| {
                    if is_error_line(l) {
                        Line::styled(l.as_str(), Style::default().fg(Color::Red))
                    } else {
                        Line::raw(l.as_str())
                    }
                })
                .collect();
            Paragraph::new(lines)
        }
    };

    frame.render_widget(paragraph.block(block), area);
}

fn render_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let help_text = match &app.mode {
        Mode::ViewingLog(_) => "[↑↓/PgUp/PgDn] Scroll  [g/G] Top/Bottom  [Esc/q] Back",
        Mode::Idle | Mode::Reloading => {
            "[↑↓] Navigate  [Enter] Log  [v] Version  [s] State  [o] Sort  [c] Clear  [r] Reload  [q] Quit"
        }
    };

    let mut spans = vec![Span::raw(format!("  {}", help_text))];

    if let Some(notice) = &app.notice {
        let color = if notice.is_error {
            Color::Red
        } else {
            Color::Green
        };
        spans.push(Span::styled(
            format!("  {}", notice.text),
            Style::default().fg(color),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
