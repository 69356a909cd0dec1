use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain the raw Prow document.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Prow API returned HTTP {0}")]
    Status(u16),

    #[error("Invalid prow job document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to fetch a build log tail.
///
/// `UnsupportedUrl` means no log location can be derived from the job URL;
/// retrying will not help. The other variants are transport problems.
#[derive(Error, Debug)]
pub enum LogFetchError {
    #[error("Cannot derive a build log location from {0}")]
    UnsupportedUrl(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Log server returned HTTP {0}")]
    Status(u16),
}

impl LogFetchError {
    pub fn is_unsupported_url(&self) -> bool {
        matches!(self, LogFetchError::UnsupportedUrl(_))
    }
}

/// Failure of the natural-language question path.
#[derive(Error, Debug)]
pub enum AskError {
    #[error(
        "ANTHROPIC_API_KEY environment variable is not set.\nSet it with: export ANTHROPIC_API_KEY=sk-ant-..."
    )]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Anthropic API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Anthropic API returned no text")]
    EmptyResponse,
}
