use std::collections::BTreeMap;

use super::classifier::{extract_variant, extract_version};
use super::extractor::{RawDocument, extract_runs};
use super::models::{JobRun, JobSummary};

/// Group runs by job name and build one summary per job.
///
/// Runs inside a summary are ordered by start time descending, ties broken
/// by build id then url (both descending) so the result never depends on
/// input order. Summaries come out ordered by job name.
pub fn aggregate(runs: Vec<JobRun>) -> Vec<JobSummary> {
    let mut by_job: BTreeMap<String, Vec<JobRun>> = BTreeMap::new();
    for run in runs {
        by_job.entry(run.job.clone()).or_default().push(run);
    }

    by_job
        .into_iter()
        .map(|(job, mut runs)| {
            runs.sort_by(|a, b| {
                b.start_time
                    .cmp(&a.start_time)
                    .then_with(|| b.build_id.cmp(&a.build_id))
                    .then_with(|| b.url.cmp(&a.url))
            });
            JobSummary {
                ocp_version: extract_version(&job),
                job_variant: extract_variant(&job),
                job,
                runs,
            }
        })
        .collect()
}

/// Full pipeline: extract the target's periodic runs, then aggregate.
pub fn analyze(raw: &RawDocument, target: &str) -> Vec<JobSummary> {
    aggregate(extract_runs(raw, target))
}
