//! Interactive TUI for prowmon.
//!
//! Browse jobs with live filter/sort cycling, reload in the background and
//! tail build logs without blocking input.

mod app;
mod input;
mod ui;

use std::io::{self, stdout};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::JobSummary;
use crate::logs::LogSource;
use crate::source::DataSource;

pub use app::{Action, LogStatus, LogView, Message, Mode, Notice, STATE_FILTERS, TuiApp};

/// Run the TUI over an initial snapshot until the user quits.
pub async fn run(
    summaries: Vec<JobSummary>,
    source: Arc<dyn DataSource>,
    logs: Arc<dyn LogSource>,
    job_filter: String,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let (mut app, messages) = TuiApp::new(summaries, source, logs, job_filter);
    let result = run_app(&mut terminal, &mut app, messages).await;

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    mut messages: mpsc::Receiver<Message>,
) -> Result<()> {
    let mut events = spawn_input_reader();

    while app.running {
        let height = terminal.size()?.height;
        app.set_log_viewport(ui::log_viewport(height));
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(action) = input::handle_event(event) {
                        app.handle_action(action);
                    }
                }
                None => {
                    warn!("Input reader stopped");
                    break;
                }
            },
            Some(message) = messages.recv() => app.handle_message(message),
        }
    }

    Ok(())
}

/// Read terminal events on a dedicated thread so the owner task only awaits
/// channels.
fn spawn_input_reader() -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(64);
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(event) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Terminal event read failed");
                    break;
                }
            }
        }
    });
    rx
}
