//! Raw Prow document types and the run extractor.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::models::{JobRun, JobState};

/// The `prowjobs.js` document as served by Prow, trimmed to the fields used here.
///
/// Decoding is per item: an item that is not an object is skipped, and a
/// field of the wrong type reads as absent, so one bad record never rejects
/// the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, deserialize_with = "lenient")]
    pub spec: RawSpec,
    #[serde(default, deserialize_with = "lenient")]
    pub status: RawStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSpec {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub completion_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(rename = "build_id", default, deserialize_with = "lenient_string")]
    pub build_id: Option<String>,
}

fn lenient_items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RawItem>, D::Error> {
    let Value::Array(values) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    let total = values.len();
    let items: Vec<RawItem> = values
        .into_iter()
        .filter_map(|v| RawItem::deserialize(v).ok())
        .collect();
    if items.len() < total {
        debug!(skipped = total - items.len(), "Skipped malformed prow job items");
    }
    Ok(items)
}

/// Wrong-shaped sections decode as their default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Strings pass through, numbers are rendered, anything else is absent.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

const PERIODIC: &str = "periodic";

/// Keep periodic runs whose job name contains `target` (case-insensitive).
///
/// Items without a parseable start time cannot be ordered or aged and are
/// dropped without error.
pub fn extract_runs(raw: &RawDocument, target: &str) -> Vec<JobRun> {
    let target = target.to_lowercase();
    let mut dropped = 0usize;

    let runs: Vec<JobRun> = raw
        .items
        .iter()
        .filter(|item| item.spec.kind.as_deref() == Some(PERIODIC))
        .filter_map(|item| {
            let job = item.spec.job.as_deref().unwrap_or("");
            if !job.to_lowercase().contains(&target) {
                return None;
            }

            let status = &item.status;
            let Some(start_time) = parse_time(status.start_time.as_deref()) else {
                dropped += 1;
                return None;
            };

            Some(JobRun {
                job: job.to_string(),
                state: status
                    .state
                    .as_deref()
                    .map(JobState::parse)
                    .unwrap_or_default(),
                start_time,
                completion_time: parse_time(status.completion_time.as_deref()),
                url: status.url.clone().unwrap_or_default(),
                build_id: status.build_id.clone().unwrap_or_default(),
            })
        })
        .collect();

    debug!(kept = runs.len(), dropped, "Extracted periodic runs");
    runs
}

fn parse_time(ts: Option<&str>) -> Option<DateTime<Utc>> {
    let ts = ts?.trim();
    if ts.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
