//! TUI application state and logic.
//!
//! `TuiApp` is owned by a single task. Reloads and log fetches run on
//! background tasks and report back as [`Message`]s; each carries the
//! generation of the slot it was started for, and a message whose generation
//! is no longer current is dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::digest::Counts;
use crate::core::view::distinct_versions;
use crate::core::{Filter, JobState, JobSummary, Row, SortKey, analyze, build_rows, models, select};
use crate::error::{LogFetchError, SourceError};
use crate::logs::{LogSource, LogTail};
use crate::source::DataSource;

/// State filters cycled by the `s` key. Index 0 is "no filter".
pub static STATE_FILTERS: [Option<JobState>; 6] = [
    None,
    Some(JobState::Failure),
    Some(JobState::Success),
    Some(JobState::Pending),
    Some(JobState::Aborted),
    Some(JobState::Error),
];

const CHANNEL_CAPACITY: usize = 16;

/// Results posted back by background tasks.
#[derive(Debug)]
pub enum Message {
    Reloaded {
        generation: u64,
        result: Result<Vec<JobSummary>, SourceError>,
    },
    LogFetched {
        generation: u64,
        result: Result<LogTail, LogFetchError>,
    },
}

/// Progress of the build log shown in the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    Loading,
    Loaded(LogTail),
    Failed(String),
}

/// Build log overlay on top of the job table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogView {
    pub job: String,
    pub status: LogStatus,
    /// First visible line.
    pub scroll: usize,
}

/// Current view being displayed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Job table with the current snapshot.
    #[default]
    Idle,
    /// Job table with a refresh in flight; the old snapshot stays visible.
    Reloading,
    /// Build log overlay.
    ViewingLog(LogView),
}

/// Actions that can be triggered by user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the log overlay, or quit from the job table.
    Quit,
    /// Quit from anywhere.
    Exit,
    Back,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Select,
    Reload,
    CycleVersion,
    CycleState,
    CycleSort,
    ClearFilters,
}

/// Transient status-bar message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// Main TUI application state.
pub struct TuiApp {
    source: Arc<dyn DataSource>,
    logs: Arc<dyn LogSource>,
    job_filter: String,
    tx: mpsc::Sender<Message>,

    snapshot: Arc<[JobSummary]>,
    versions: Vec<Option<String>>,
    version_idx: usize,
    state_idx: usize,
    sort_idx: usize,

    displayed: Vec<JobSummary>,
    pub rows: Vec<Row>,
    pub selected: usize,

    pub mode: Mode,
    /// Log lines that fit on screen, set by the renderer.
    log_viewport: usize,
    reload_generation: u64,
    /// A reload is running. Survives opening the log overlay.
    reload_in_flight: bool,
    log_generation: u64,

    pub notice: Option<Notice>,
    pub running: bool,
}

impl TuiApp {
    /// Create the app around an initial snapshot. The returned receiver
    /// yields background results for [`TuiApp::handle_message`].
    pub fn new(
        summaries: Vec<JobSummary>,
        source: Arc<dyn DataSource>,
        logs: Arc<dyn LogSource>,
        job_filter: impl Into<String>,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut app = Self {
            source,
            logs,
            job_filter: job_filter.into(),
            tx,
            snapshot: Arc::from(summaries),
            versions: Vec::new(),
            version_idx: 0,
            state_idx: 0,
            sort_idx: 0,
            displayed: Vec::new(),
            rows: Vec::new(),
            selected: 0,
            mode: Mode::Idle,
            log_viewport: 20,
            reload_generation: 0,
            reload_in_flight: false,
            log_generation: 0,
            notice: None,
            running: true,
        };
        app.rebuild_versions();
        app.refresh_rows();
        (app, rx)
    }

    pub fn snapshot(&self) -> &[JobSummary] {
        &self.snapshot
    }

    pub fn version_filter(&self) -> Option<&str> {
        self.versions[self.version_idx].as_deref()
    }

    pub fn state_filter(&self) -> Option<&JobState> {
        STATE_FILTERS[self.state_idx].as_ref()
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::ALL[self.sort_idx]
    }

    pub fn counts(&self) -> Counts {
        Counts::of(&self.snapshot)
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_in_flight
    }

    fn filter(&self) -> Filter {
        Filter {
            version: self.version_filter().map(str::to_string),
            state: self.state_filter().cloned(),
        }
    }

    /// Rebuild the version list. The cursor follows its version by value;
    /// if that version is gone it is clamped by index.
    fn rebuild_versions(&mut self) {
        let current = self.versions.get(self.version_idx).cloned().flatten();
        self.versions = std::iter::once(None)
            .chain(distinct_versions(&self.snapshot).into_iter().map(Some))
            .collect();
        let found = current.and_then(|v| {
            self.versions
                .iter()
                .position(|x| x.as_deref() == Some(v.as_str()))
        });
        self.version_idx = found.unwrap_or(self.version_idx.min(self.versions.len() - 1));
    }

    /// Recompute displayed rows from snapshot and cursors.
    fn refresh_rows(&mut self) {
        self.displayed = select(&self.snapshot, &self.filter(), self.sort_key());
        self.rows = build_rows(&self.displayed, Utc::now());
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    /// Handle an action and update state accordingly.
    pub fn handle_action(&mut self, action: Action) {
        if matches!(self.mode, Mode::ViewingLog(_)) {
            match action {
                Action::Quit | Action::Back => self.close_log(),
                Action::Exit => self.running = false,
                other => self.scroll_log(other),
            }
            return;
        }

        match action {
            Action::Quit | Action::Back | Action::Exit => self.running = false,
            Action::Up => self.selected = self.selected.saturating_sub(1),
            Action::Down => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                }
            }
            Action::PageUp => self.selected = self.selected.saturating_sub(20),
            Action::PageDown => {
                self.selected = (self.selected + 20).min(self.rows.len().saturating_sub(1))
            }
            Action::Top => self.selected = 0,
            Action::Bottom => self.selected = self.rows.len().saturating_sub(1),
            Action::Select => self.open_log(),
            Action::Reload => self.reload(),
            Action::CycleVersion => self.cycle_version(),
            Action::CycleState => self.cycle_state(),
            Action::CycleSort => self.cycle_sort(),
            Action::ClearFilters => self.clear_filters(),
        }
    }

    pub fn set_log_viewport(&mut self, lines: usize) {
        self.log_viewport = lines.max(1);
        let viewport = self.log_viewport;
        if let Mode::ViewingLog(view) = &mut self.mode {
            view.scroll = view.scroll.min(max_scroll(&view.status, viewport));
        }
    }

    fn scroll_log(&mut self, action: Action) {
        let viewport = self.log_viewport;
        let Mode::ViewingLog(view) = &mut self.mode else {
            return;
        };
        let max = max_scroll(&view.status, viewport);
        let scroll = match action {
            Action::Up => view.scroll.saturating_sub(1),
            Action::Down => view.scroll.saturating_add(1),
            Action::PageUp => view.scroll.saturating_sub(viewport),
            Action::PageDown => view.scroll.saturating_add(viewport),
            Action::Top => 0,
            Action::Bottom => max,
            _ => view.scroll,
        };
        view.scroll = scroll.min(max);
    }

    pub fn cycle_version(&mut self) {
        self.version_idx = (self.version_idx + 1) % self.versions.len();
        self.refresh_rows();
    }

    pub fn cycle_state(&mut self) {
        self.state_idx = (self.state_idx + 1) % STATE_FILTERS.len();
        self.refresh_rows();
    }

    pub fn cycle_sort(&mut self) {
        self.sort_idx = (self.sort_idx + 1) % SortKey::ALL.len();
        self.refresh_rows();
    }

    pub fn clear_filters(&mut self) {
        self.version_idx = 0;
        self.state_idx = 0;
        self.sort_idx = 0;
        self.refresh_rows();
    }

    /// Start a background refresh. Ignored while one is already running.
    pub fn reload(&mut self) {
        if self.reload_in_flight {
            debug!("Reload already in flight, ignoring");
            return;
        }
        if self.mode != Mode::Idle {
            return;
        }

        self.reload_generation += 1;
        self.reload_in_flight = true;
        let generation = self.reload_generation;
        self.mode = Mode::Reloading;
        self.notice = Some(Notice {
            text: "Reloading data...".to_string(),
            is_error: false,
        });
        info!(generation, "Reload started");

        let source = Arc::clone(&self.source);
        let target = self.job_filter.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source
                .fetch(false)
                .await
                .map(|raw| analyze(&raw, &target));
            let _ = tx.send(Message::Reloaded { generation, result }).await;
        });
    }

    /// Open the build log overlay for the selected row. Allowed while a
    /// reload runs; the table behind it updates when the reload lands.
    pub fn open_log(&mut self) {
        if matches!(self.mode, Mode::ViewingLog(_)) {
            return;
        }
        let Some(summary) = self.displayed.get(self.selected) else {
            return;
        };
        let url = models::latest_url(summary).to_string();
        if url.is_empty() {
            self.notice = Some(Notice {
                text: format!("No result URL for {}", summary.job),
                is_error: true,
            });
            return;
        }

        self.log_generation += 1;
        let generation = self.log_generation;
        let job = summary.job.clone();
        debug!(job = %job, generation, "Log fetch started");
        self.mode = Mode::ViewingLog(LogView {
            job,
            status: LogStatus::Loading,
            scroll: 0,
        });

        let logs = Arc::clone(&self.logs);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = logs.tail(&url).await;
            let _ = tx.send(Message::LogFetched { generation, result }).await;
        });
    }

    fn close_log(&mut self) {
        // Any fetch still running for this overlay is now stale.
        self.log_generation += 1;
        self.mode = if self.reload_in_flight {
            Mode::Reloading
        } else {
            Mode::Idle
        };
    }

    /// Apply a background result if its slot still expects it.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Reloaded { generation, result } => {
                if generation != self.reload_generation {
                    debug!(generation, "Dropping stale reload result");
                    return;
                }
                self.apply_reload(result);
            }
            Message::LogFetched { generation, result } => {
                if generation != self.log_generation {
                    debug!(generation, "Dropping stale log result");
                    return;
                }
                self.apply_log(result);
            }
        }
    }

    fn apply_reload(&mut self, result: Result<Vec<JobSummary>, SourceError>) {
        self.reload_in_flight = false;
        if self.mode == Mode::Reloading {
            self.mode = Mode::Idle;
        }
        match result {
            Ok(summaries) => {
                info!(jobs = summaries.len(), "Reload complete");
                self.notice = Some(Notice {
                    text: format!("Reloaded: {} jobs", summaries.len()),
                    is_error: false,
                });
                self.snapshot = Arc::from(summaries);
                self.rebuild_versions();
                self.refresh_rows();
            }
            Err(e) => {
                warn!(error = %e, "Reload failed");
                self.notice = Some(Notice {
                    text: format!("Reload failed: {e}"),
                    is_error: true,
                });
            }
        }
    }

    fn apply_log(&mut self, result: Result<LogTail, LogFetchError>) {
        let viewport = self.log_viewport;
        let Mode::ViewingLog(view) = &mut self.mode else {
            return;
        };
        match result {
            Ok(tail) => {
                debug!(job = %view.job, lines = tail.lines.len(), "Log fetch complete");
                view.scroll = tail.lines.len().saturating_sub(viewport);
                view.status = LogStatus::Loaded(tail);
            }
            Err(e) => {
                warn!(job = %view.job, error = %e, "Log fetch failed");
                view.status = LogStatus::Failed(format!("Error fetching log: {e}"));
            }
        }
    }
}

/// Largest first-visible-line index that still fills the viewport.
fn max_scroll(status: &LogStatus, viewport: usize) -> usize {
    match status {
        LogStatus::Loaded(tail) => tail.lines.len().saturating_sub(viewport),
        _ => 0,
    }
}
