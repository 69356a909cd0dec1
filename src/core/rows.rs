//! Display rows handed to the table and TUI renderers.

use chrono::{DateTime, Utc};

use super::models::{self, JobState, JobSummary};

/// Path marker after which result-viewer URLs are shown.
const URL_MARKER: &str = "test-platform-results/logs/";

/// One rendered line of the job table. Every field is final display text
/// except `state` and `fail_rate`, which renderers use for coloring.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub version: String,
    pub state: JobState,
    pub sparkline: String,
    pub fail_rate: f64,
    pub fail_rate_percent: String,
    pub last_ok_age: String,
    pub variant: String,
    pub job: String,
    pub short_url: String,
}

impl Row {
    pub fn from_summary(summary: &JobSummary, now: DateTime<Utc>) -> Self {
        let fail_rate = models::failure_rate(summary);
        Self {
            version: summary.ocp_version.clone(),
            state: models::latest_state(summary),
            sparkline: models::sparkline(summary),
            fail_rate,
            fail_rate_percent: format_percent(fail_rate),
            last_ok_age: models::last_success_age(summary, now),
            variant: summary.job_variant.clone(),
            job: summary.job.clone(),
            short_url: shorten_url(models::latest_url(summary)).to_string(),
        }
    }
}

pub fn build_rows(summaries: &[JobSummary], now: DateTime<Utc>) -> Vec<Row> {
    summaries
        .iter()
        .map(|s| Row::from_summary(s, now))
        .collect()
}

/// Keep only the path after the logs bucket marker, if present.
pub fn shorten_url(url: &str) -> &str {
    match url.rfind(URL_MARKER) {
        Some(idx) => &url[idx + URL_MARKER.len()..],
        None => url,
    }
}

/// Colour-neutral highlight shared by the batch table and the TUI. Each
/// renderer maps a [`Tone`] onto its own colour type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Muted,
    Info,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emphasis {
    pub tone: Tone,
    pub bold: bool,
}

impl Emphasis {
    const fn new(tone: Tone) -> Self {
        Self { tone, bold: false }
    }

    const fn bold(tone: Tone) -> Self {
        Self { tone, bold: true }
    }
}

pub fn state_emphasis(state: &JobState) -> Emphasis {
    match state {
        JobState::Success => Emphasis::new(Tone::Good),
        JobState::Failure => Emphasis::new(Tone::Bad),
        JobState::Error => Emphasis::bold(Tone::Bad),
        JobState::Pending => Emphasis::new(Tone::Warn),
        JobState::Aborted => Emphasis::new(Tone::Muted),
        JobState::Triggered => Emphasis::new(Tone::Info),
        JobState::Unknown(_) => Emphasis::new(Tone::Plain),
    }
}

pub fn fail_rate_emphasis(rate: f64) -> Emphasis {
    if rate >= 0.75 {
        Emphasis::bold(Tone::Bad)
    } else if rate >= 0.5 {
        Emphasis::new(Tone::Bad)
    } else if rate >= 0.25 {
        Emphasis::new(Tone::Warn)
    } else {
        Emphasis::new(Tone::Good)
    }
}

/// Whole-number percentage, e.g. `0.667` -> `"67%"`.
pub fn format_percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}
