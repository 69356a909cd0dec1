//! Filtering and sorting of job summaries.
//!
//! Every function here returns a new vector and leaves its input untouched.

use std::cmp::Ordering;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::models::{self, JobState, JobSummary, UNKNOWN_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortKey {
    /// Most recently started first
    #[default]
    Recent,
    /// Ascending by version, `unknown` last
    Version,
    /// Highest failure rate first
    FailureRate,
    /// Most severe latest state first
    State,
}

impl SortKey {
    /// Cycle order used by the interactive session.
    pub const ALL: [SortKey; 4] = [
        SortKey::Recent,
        SortKey::Version,
        SortKey::FailureRate,
        SortKey::State,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recent => "recent",
            SortKey::Version => "version",
            SortKey::FailureRate => "failure_rate",
            SortKey::State => "state",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version and latest-state constraints. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub version: Option<String>,
    pub state: Option<JobState>,
}

impl Filter {
    pub fn matches(&self, summary: &JobSummary) -> bool {
        let version_ok = self
            .version
            .as_deref()
            .is_none_or(|v| summary.ocp_version == v);
        let state_ok = self
            .state
            .as_ref()
            .is_none_or(|st| models::latest_state(summary) == *st);
        version_ok && state_ok
    }
}

pub fn filter_summaries(summaries: &[JobSummary], filter: &Filter) -> Vec<JobSummary> {
    summaries
        .iter()
        .filter(|s| filter.matches(s))
        .cloned()
        .collect()
}

/// Stable sort by `key`. Equal elements keep their input order.
pub fn sort_summaries(summaries: &[JobSummary], key: SortKey) -> Vec<JobSummary> {
    let mut result = summaries.to_vec();
    match key {
        SortKey::Recent => {
            result.sort_by(|a, b| models::latest_start(b).cmp(&models::latest_start(a)))
        }
        SortKey::Version => result.sort_by(|a, b| {
            compare_versions(&a.ocp_version, &b.ocp_version).then_with(|| a.job.cmp(&b.job))
        }),
        SortKey::FailureRate => result.sort_by(|a, b| {
            models::failure_rate(b)
                .partial_cmp(&models::failure_rate(a))
                .unwrap_or(Ordering::Equal)
        }),
        SortKey::State => result.sort_by(|a, b| {
            models::latest_state(a)
                .severity()
                .cmp(&models::latest_state(b).severity())
                .then_with(|| a.job.cmp(&b.job))
        }),
    }
    result
}

/// Filter then sort: the view rendered by every output mode.
pub fn select(summaries: &[JobSummary], filter: &Filter, key: SortKey) -> Vec<JobSummary> {
    sort_summaries(&filter_summaries(summaries, filter), key)
}

/// Lexical order with `unknown` always last.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    (a == UNKNOWN_VERSION, a).cmp(&(b == UNKNOWN_VERSION, b))
}

/// Sorted distinct versions present in `summaries`, `unknown` last.
pub fn distinct_versions(summaries: &[JobSummary]) -> Vec<String> {
    let mut versions: Vec<String> = summaries.iter().map(|s| s.ocp_version.clone()).collect();
    versions.sort_by(|a, b| compare_versions(a, b));
    versions.dedup();
    versions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::JobRun;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn summary(job: &str, version: &str, states: &[JobState], hours_ago: i64) -> JobSummary {
        let runs = states
            .iter()
            .enumerate()
            .map(|(i, st)| JobRun {
                job: job.to_string(),
                state: st.clone(),
                start_time: t0() - Duration::hours(hours_ago + i as i64),
                completion_time: None,
                url: String::new(),
                build_id: i.to_string(),
            })
            .collect();
        JobSummary {
            job: job.to_string(),
            ocp_version: version.to_string(),
            job_variant: "e2e".to_string(),
            runs,
        }
    }

    fn fixture() -> Vec<JobSummary> {
        use JobState::*;
        vec![
            summary("a", "4.18", &[Failure, Failure, Success], 4),
            summary("b", "unknown", &[Success], 1),
            summary("c", "4.9", &[Pending, Failure], 2),
            summary("d", "4.18", &[Success, Failure], 3),
            summary("e", "4.20", &[Error], 6),
            summary("f", "4.18", &[Failure], 5),
        ]
    }

    fn jobs(v: &[JobSummary]) -> Vec<&str> {
        v.iter().map(|s| s.job.as_str()).collect()
    }

    #[test]
    fn filter_by_version_and_state() {
        let all = fixture();
        let f = Filter {
            version: Some("4.18".to_string()),
            state: Some(JobState::Failure),
        };
        assert_eq!(jobs(&filter_summaries(&all, &f)), ["a", "f"]);
        assert_eq!(filter_summaries(&all, &Filter::default()).len(), all.len());
    }

    #[test]
    fn filters_commute() {
        let all = fixture();
        let by_state = Filter {
            state: Some(JobState::Failure),
            ..Default::default()
        };
        let by_version = Filter {
            version: Some("4.18".to_string()),
            ..Default::default()
        };
        let one = filter_summaries(&filter_summaries(&all, &by_state), &by_version);
        let two = filter_summaries(&filter_summaries(&all, &by_version), &by_state);
        assert_eq!(one, two);
    }

    #[test]
    fn sort_recent() {
        assert_eq!(
            jobs(&sort_summaries(&fixture(), SortKey::Recent)),
            ["b", "c", "d", "a", "f", "e"]
        );
    }

    #[test]
    fn sort_version_puts_unknown_last() {
        assert_eq!(
            jobs(&sort_summaries(&fixture(), SortKey::Version)),
            ["a", "d", "f", "e", "c", "b"]
        );
        assert_eq!(compare_versions("unknown", "9.9"), Ordering::Greater);
        assert_eq!(compare_versions("4.18", "unknown"), Ordering::Less);
    }

    #[test]
    fn sort_failure_rate_is_stable() {
        // f=1.0, a=0.67, c=0.5, d=0.5, b=0.0, e=0.0
        assert_eq!(
            jobs(&sort_summaries(&fixture(), SortKey::FailureRate)),
            ["f", "a", "c", "d", "b", "e"]
        );
    }

    #[test]
    fn sort_state_by_severity() {
        assert_eq!(
            jobs(&sort_summaries(&fixture(), SortKey::State)),
            ["a", "f", "e", "c", "b", "d"]
        );
    }

    #[test]
    fn sorting_does_not_mutate_input() {
        let all = fixture();
        let before = all.clone();
        let _ = select(&all, &Filter::default(), SortKey::State);
        assert_eq!(all, before);
    }

    #[test]
    fn distinct_versions_sorted() {
        assert_eq!(
            distinct_versions(&fixture()),
            ["4.18", "4.20", "4.9", "unknown"]
        );
    }
}
