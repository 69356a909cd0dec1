//! Where the raw Prow document comes from.
//!
//! The rest of the crate only sees [`DataSource`], so tests can swap in an
//! in-memory document.

mod api;
mod cache;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::AppConfig;
use crate::core::RawDocument;
use crate::error::SourceError;

pub use api::ApiSource;
pub use cache::ResponseCache;

/// Capability to fetch the raw job document.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the document. `use_cache = false` forces a fresh read.
    async fn fetch(&self, use_cache: bool) -> Result<RawDocument, SourceError>;
}

/// A `prowjobs.json` saved on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn fetch(&self, _use_cache: bool) -> Result<RawDocument, SourceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %self.path.display(), bytes = bytes.len(), "Read prow jobs file");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// A fixed document, used by tests and for replaying a parsed snapshot.
pub struct StaticSource {
    doc: RawDocument,
}

impl StaticSource {
    pub fn new(doc: RawDocument) -> Self {
        Self { doc }
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch(&self, _use_cache: bool) -> Result<RawDocument, SourceError> {
        Ok(self.doc.clone())
    }
}

/// Pick the local file if one was given, else the cached Prow API.
pub fn from_config(
    config: &AppConfig,
    file: Option<PathBuf>,
) -> Result<Arc<dyn DataSource>, SourceError> {
    Ok(match file {
        Some(path) => Arc::new(FileSource::new(path)),
        None => Arc::new(ApiSource::new(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_source_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prowjobs.json");
        std::fs::write(
            &path,
            r#"{"items":[{"spec":{"type":"periodic","job":"x-vsphere"},"status":{}}]}"#,
        )
        .unwrap();

        let doc = FileSource::new(&path).fetch(true).await.unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].spec.job.as_deref(), Some("x-vsphere"));
    }

    #[tokio::test]
    async fn file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::new(dir.path().join("nope.json"))
            .fetch(true)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn file_source_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = FileSource::new(&path).fetch(true).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
