//! Compact text digest and machine-readable records.
//!
//! The digest is what the `--summary` mode prints and what the question
//! answering path sends to the model, so it is kept short and deterministic.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::models::{self, JobState, JobSummary};
use super::rows::format_percent;
use super::view::compare_versions;

pub const DIGEST_TITLE: &str = "VSPHERE PERIODIC JOB STATUS REPORT";

/// Latest-state counts over a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub failing: usize,
    pub passing: usize,
    pub pending: usize,
}

impl Counts {
    pub fn of(summaries: &[JobSummary]) -> Self {
        let mut counts = Counts {
            total: summaries.len(),
            ..Default::default()
        };
        for s in summaries {
            match models::latest_state(s) {
                JobState::Failure => counts.failing += 1,
                JobState::Success => counts.passing += 1,
                JobState::Pending => counts.pending += 1,
                _ => {}
            }
        }
        counts
    }
}

pub fn build_digest(summaries: &[JobSummary], now: DateTime<Utc>) -> String {
    let counts = Counts::of(summaries);
    let mut out = String::new();

    let _ = writeln!(out, "{DIGEST_TITLE}");
    let _ = writeln!(
        out,
        "Jobs: {} | Failing: {} | Passing: {} | Pending: {}",
        counts.total, counts.failing, counts.passing, counts.pending
    );
    out.push('\n');

    let mut by_version: BTreeMap<&str, Vec<&JobSummary>> = BTreeMap::new();
    for s in summaries {
        by_version.entry(s.ocp_version.as_str()).or_default().push(s);
    }
    let mut versions: Vec<&str> = by_version.keys().copied().collect();
    versions.sort_by(|a, b| compare_versions(a, b));

    for version in versions {
        let jobs = &by_version[version];
        let failing = jobs
            .iter()
            .filter(|j| models::latest_state(j) == JobState::Failure)
            .count();
        let _ = writeln!(out, "## OCP {version}: {} jobs, {failing} failing", jobs.len());

        for j in jobs {
            let initial = models::latest_state(j)
                .as_str()
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or('?');
            let _ = writeln!(
                out,
                "  {} {:<6} fail={:<4} last_ok={:<8} {:<12} {}",
                initial,
                models::sparkline(j),
                format_percent(models::failure_rate(j)),
                models::last_success_age(j, now),
                j.job_variant,
                j.job
            );
        }
        out.push('\n');
    }

    // Sections end with a blank line; the report itself does not.
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

/// One element of the `--format json` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job: String,
    pub ocp_version: String,
    pub variant: String,
    pub latest_state: JobState,
    pub failure_rate: f64,
    pub total_runs: usize,
    pub failure_count: usize,
    pub last_success_age: String,
    pub recent_states: Vec<JobState>,
    pub latest_url: String,
}

impl JobRecord {
    pub fn from_summary(summary: &JobSummary, now: DateTime<Utc>) -> Self {
        Self {
            job: summary.job.clone(),
            ocp_version: summary.ocp_version.clone(),
            variant: summary.job_variant.clone(),
            latest_state: models::latest_state(summary),
            failure_rate: round3(models::failure_rate(summary)),
            total_runs: models::total_runs(summary),
            failure_count: models::failure_count(summary),
            last_success_age: models::last_success_age(summary, now),
            recent_states: models::recent_states(summary),
            latest_url: models::latest_url(summary).to_string(),
        }
    }
}

pub fn build_records(summaries: &[JobSummary], now: DateTime<Utc>) -> Vec<JobRecord> {
    summaries
        .iter()
        .map(|s| JobRecord::from_summary(s, now))
        .collect()
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
