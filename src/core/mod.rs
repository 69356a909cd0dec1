pub mod aggregator;
pub mod classifier;
pub mod digest;
pub mod extractor;
pub mod models;
pub mod rows;
pub mod view;

pub use aggregator::{aggregate, analyze};
pub use classifier::{extract_variant, extract_version};
pub use digest::{Counts, JobRecord, build_digest, build_records};
pub use extractor::{RawDocument, extract_runs};
pub use models::{JobRun, JobState, JobSummary};
pub use rows::{
    Emphasis, Row, Tone, build_rows, fail_rate_emphasis, shorten_url, state_emphasis,
};
pub use view::{Filter, SortKey, filter_summaries, select, sort_summaries};
