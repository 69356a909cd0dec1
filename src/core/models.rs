use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Number of runs shown in the recent-state window and sparkline.
pub const RECENT_WINDOW: usize = 6;

/// Version tag used when a job name carries no version.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Outcome of a single Prow job execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobState {
    Success,
    Failure,
    Pending,
    Aborted,
    Error,
    Triggered,
    /// Any state string Prow reports that we do not model, kept verbatim.
    Unknown(String),
}

impl JobState {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "pending" => Self::Pending,
            "aborted" => Self::Aborted,
            "error" => Self::Error,
            "triggered" => Self::Triggered,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Pending => "pending",
            Self::Aborted => "aborted",
            Self::Error => "error",
            Self::Triggered => "triggered",
            Self::Unknown(s) => s,
        }
    }

    /// Single-character sparkline symbol.
    pub fn symbol(&self) -> char {
        match self {
            Self::Success => 'S',
            Self::Failure => 'F',
            Self::Pending => 'P',
            Self::Aborted => 'A',
            Self::Error => 'E',
            Self::Triggered => 'T',
            Self::Unknown(_) => '?',
        }
    }

    /// Short label used in tables.
    pub fn label(&self) -> String {
        match self {
            Self::Success => "OK".to_string(),
            Self::Failure => "FAIL".to_string(),
            Self::Pending => "PEND".to_string(),
            Self::Aborted => "ABRT".to_string(),
            Self::Error => "ERR".to_string(),
            Self::Triggered => "TRIG".to_string(),
            Self::Unknown(s) => s.to_uppercase(),
        }
    }

    /// Severity rank used by the `state` sort: lower sorts first.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Failure => 0,
            Self::Error => 1,
            Self::Pending => 2,
            Self::Aborted => 3,
            Self::Success => 4,
            Self::Triggered | Self::Unknown(_) => 5,
        }
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::Unknown("unknown".to_string())
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single execution of a Prow job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRun {
    pub job: String,
    pub state: JobState,
    pub start_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub url: String,
    pub build_id: String,
}

/// All runs of one job, most recent first.
///
/// Built only by the aggregator, which guarantees `runs` is non-empty and
/// sorted by start time descending. Every derived metric below relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job: String,
    pub ocp_version: String,
    pub job_variant: String,
    pub runs: Vec<JobRun>,
}

pub fn latest_run(summary: &JobSummary) -> Option<&JobRun> {
    summary.runs.first()
}

pub fn latest_state(summary: &JobSummary) -> JobState {
    latest_run(summary)
        .map(|r| r.state.clone())
        .unwrap_or_default()
}

pub fn latest_url(summary: &JobSummary) -> &str {
    latest_run(summary).map(|r| r.url.as_str()).unwrap_or("")
}

pub fn latest_start(summary: &JobSummary) -> Option<DateTime<Utc>> {
    latest_run(summary).map(|r| r.start_time)
}

pub fn total_runs(summary: &JobSummary) -> usize {
    summary.runs.len()
}

pub fn failure_count(summary: &JobSummary) -> usize {
    summary
        .runs
        .iter()
        .filter(|r| r.state == JobState::Failure)
        .count()
}

pub fn failure_rate(summary: &JobSummary) -> f64 {
    if summary.runs.is_empty() {
        return 0.0;
    }
    failure_count(summary) as f64 / total_runs(summary) as f64
}

pub fn last_success(summary: &JobSummary) -> Option<DateTime<Utc>> {
    summary
        .runs
        .iter()
        .find(|r| r.state == JobState::Success)
        .map(|r| r.start_time)
}

/// Human-relative age of the last successful run, e.g. `"5h ago"`.
pub fn last_success_age(summary: &JobSummary, now: DateTime<Utc>) -> String {
    match last_success(summary) {
        Some(at) => format_age(now - at),
        None => "never".to_string(),
    }
}

fn format_age(delta: chrono::TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    let hours = secs / 3600;
    if hours < 1 {
        format!("{}m ago", secs / 60)
    } else if hours < 48 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", hours / 24)
    }
}

pub fn recent_states(summary: &JobSummary) -> Vec<JobState> {
    summary
        .runs
        .iter()
        .take(RECENT_WINDOW)
        .map(|r| r.state.clone())
        .collect()
}

pub fn sparkline(summary: &JobSummary) -> String {
    summary
        .runs
        .iter()
        .take(RECENT_WINDOW)
        .map(|r| r.state.symbol())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn run(state: JobState, start: DateTime<Utc>) -> JobRun {
        JobRun {
            job: "periodic-ci-x-4.18-vsphere-ovn".to_string(),
            state,
            start_time: start,
            completion_time: None,
            url: String::new(),
            build_id: String::new(),
        }
    }

    fn summary(runs: Vec<JobRun>) -> JobSummary {
        JobSummary {
            job: "periodic-ci-x-4.18-vsphere-ovn".to_string(),
            ocp_version: "4.18".to_string(),
            job_variant: "e2e".to_string(),
            runs,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_summary_has_zero_failure_rate() {
        let s = summary(vec![]);
        assert_eq!(failure_rate(&s), 0.0);
        assert_eq!(last_success_age(&s, now()), "never");
        assert_eq!(sparkline(&s), "");
        assert!(latest_state(&s).as_str() == "unknown");
    }

    #[test]
    fn age_buckets() {
        let mk = |ago: Duration| summary(vec![run(JobState::Success, now() - ago)]);
        assert_eq!(last_success_age(&mk(Duration::minutes(42)), now()), "42m ago");
        assert_eq!(last_success_age(&mk(Duration::hours(1)), now()), "1h ago");
        assert_eq!(last_success_age(&mk(Duration::hours(47)), now()), "47h ago");
        assert_eq!(last_success_age(&mk(Duration::hours(48)), now()), "2d ago");
        assert_eq!(last_success_age(&mk(Duration::days(9)), now()), "9d ago");
    }

    #[test]
    fn last_success_is_first_success_in_order() {
        let s = summary(vec![
            run(JobState::Failure, now() - Duration::hours(1)),
            run(JobState::Success, now() - Duration::hours(3)),
            run(JobState::Success, now() - Duration::hours(5)),
        ]);
        assert_eq!(last_success(&s), Some(now() - Duration::hours(3)));
    }

    #[test]
    fn sparkline_covers_six_most_recent_runs() {
        let states = [
            JobState::Success,
            JobState::Failure,
            JobState::Pending,
            JobState::Aborted,
            JobState::Error,
            JobState::Triggered,
            JobState::Failure,
        ];
        let runs = states
            .iter()
            .enumerate()
            .map(|(i, st)| run(st.clone(), now() - Duration::hours(i as i64)))
            .collect();
        let s = summary(runs);
        assert_eq!(sparkline(&s), "SFPAET");
        assert_eq!(recent_states(&s).len(), RECENT_WINDOW);
        assert_eq!(failure_count(&s), 2);
    }

    #[test]
    fn unknown_state_keeps_raw_value() {
        let st = JobState::parse("scheduling");
        assert_eq!(st.as_str(), "scheduling");
        assert_eq!(st.symbol(), '?');
        assert_eq!(st.label(), "SCHEDULING");
        assert_eq!(st.severity(), 5);
    }
}
