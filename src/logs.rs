//! Build log tailing.
//!
//! Build logs can be hundreds of megabytes. The body is streamed and only the
//! last `max_lines` lines are ever held in memory.

use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::LogFetchError;

/// Marker in a Prow result-viewer URL after which the GCS path starts.
const VIEWER_MARKER: &str = "/view/gs/";
const STORAGE_BASE: &str = "https://storage.googleapis.com/";
const LOG_FILE: &str = "build-log.txt";

/// Longest line kept, in bytes. The rest of a longer line is discarded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

static ERROR_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(error|fail|fatal|panic|timed?\s*out|deadlineexceeded|could not|cannot|exit\s+code\s+[1-9])",
    )
    .expect("valid error line regex")
});

/// Whether a log line should be highlighted as an error.
pub fn is_error_line(line: &str) -> bool {
    ERROR_LINE_RE.is_match(line)
}

/// Map a result-viewer URL to the raw build log in object storage.
///
/// `https://prow.ci.openshift.org/view/gs/<bucket>/<path>` becomes
/// `https://storage.googleapis.com/<bucket>/<path>/build-log.txt`.
pub fn derive_log_url(viewer_url: &str) -> Option<String> {
    let idx = viewer_url.find(VIEWER_MARKER)?;
    let path = viewer_url[idx + VIEWER_MARKER.len()..].trim_end_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(format!("{STORAGE_BASE}{path}/{LOG_FILE}"))
}

/// Last lines of a build log and where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTail {
    pub url: String,
    pub lines: Vec<String>,
}

/// Fixed-capacity line ring fed with raw byte chunks.
#[derive(Debug)]
pub struct TailBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    partial: Vec<u8>,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            partial: Vec::new(),
        }
    }

    /// Feed the next chunk. Lines may span chunk boundaries.
    pub fn push(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.extend_partial(&rest[..pos]);
            let line = std::mem::take(&mut self.partial);
            self.push_line(&line);
            rest = &rest[pos + 1..];
        }
        self.extend_partial(rest);
    }

    fn extend_partial(&mut self, bytes: &[u8]) {
        let room = MAX_LINE_BYTES.saturating_sub(self.partial.len());
        self.partial
            .extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn push_line(&mut self, bytes: &[u8]) {
        if self.capacity == 0 {
            return;
        }
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines
            .push_back(String::from_utf8_lossy(bytes).into_owned());
    }

    /// Complete lines currently retained.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Flush an unterminated final line and return the retained lines in order.
    pub fn finish(mut self) -> Vec<String> {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.push_line(&line);
        }
        self.lines.into()
    }
}

/// Fetch the tail of the build log behind a result-viewer URL.
pub async fn fetch_tail(
    client: &reqwest::Client,
    viewer_url: &str,
    max_lines: usize,
) -> Result<LogTail, LogFetchError> {
    let log_url = derive_log_url(viewer_url)
        .ok_or_else(|| LogFetchError::UnsupportedUrl(viewer_url.to_string()))?;
    fetch_tail_from(client, &log_url, max_lines).await
}

/// Stream `log_url` and keep its last `max_lines` lines.
pub async fn fetch_tail_from(
    client: &reqwest::Client,
    log_url: &str,
    max_lines: usize,
) -> Result<LogTail, LogFetchError> {
    debug!(url = %log_url, max_lines, "Fetching build log");
    let mut response = client.get(log_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LogFetchError::Status(status.as_u16()));
    }

    let mut buffer = TailBuffer::new(max_lines);
    let mut bytes = 0usize;
    while let Some(chunk) = response.chunk().await? {
        bytes += chunk.len();
        buffer.push(&chunk);
    }

    let lines = buffer.finish();
    debug!(url = %log_url, bytes, lines = lines.len(), "Fetched build log");
    Ok(LogTail {
        url: log_url.to_string(),
        lines,
    })
}

/// Capability to fetch a log tail for a job URL.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn tail(&self, viewer_url: &str) -> Result<LogTail, LogFetchError>;
}

/// Fetches build logs over HTTP.
pub struct HttpLogSource {
    client: reqwest::Client,
    max_lines: usize,
}

impl HttpLogSource {
    pub fn new(max_lines: usize, timeout: Duration) -> Result<Self, LogFetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_lines })
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn tail(&self, viewer_url: &str) -> Result<LogTail, LogFetchError> {
        fetch_tail(&self.client, viewer_url, self.max_lines).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_storage_url() {
        assert_eq!(
            derive_log_url(
                "https://prow.ci.openshift.org/view/gs/test-platform-results/logs/periodic-x/1234/"
            )
            .as_deref(),
            Some(
                "https://storage.googleapis.com/test-platform-results/logs/periodic-x/1234/build-log.txt"
            )
        );
        assert_eq!(derive_log_url("https://example.com/job/1"), None);
        assert_eq!(derive_log_url("https://prow/view/gs/"), None);
    }

    #[test]
    fn keeps_last_lines_across_chunks() {
        let mut buf = TailBuffer::new(3);
        buf.push(b"one\ntw");
        buf.push(b"o\nthree\r\nfour\nfi");
        buf.push(b"ve");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.finish(), ["three", "four", "five"]);
    }

    #[test]
    fn ten_thousand_lines_capped_at_five_thousand() {
        let mut buf = TailBuffer::new(5000);
        let body: String = (0..10_000).map(|i| format!("line {i}\n")).collect();
        for chunk in body.as_bytes().chunks(777) {
            buf.push(chunk);
            assert!(buf.len() <= 5000);
        }
        let lines = buf.finish();
        assert_eq!(lines.len(), 5000);
        assert_eq!(lines[0], "line 5000");
        assert_eq!(lines[4999], "line 9999");
        assert!(lines.windows(2).all(|w| {
            let a: u32 = w[0][5..].parse().unwrap();
            let b: u32 = w[1][5..].parse().unwrap();
            b == a + 1
        }));
    }

    #[test]
    fn trailing_newline_adds_no_empty_line() {
        let mut buf = TailBuffer::new(10);
        buf.push(b"a\nb\n");
        assert_eq!(buf.finish(), ["a", "b"]);
    }

    #[test]
    fn long_lines_are_truncated() {
        let mut buf = TailBuffer::new(2);
        let blob = vec![b'x'; 1024 * 1024];
        for _ in 0..8 {
            buf.push(&blob);
            assert!(buf.partial.len() <= MAX_LINE_BYTES);
        }
        buf.push(b"\nnext");
        let lines = buf.finish();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES);
        assert_eq!(lines[1], "next");
    }

    #[test]
    fn unterminated_blob_is_bounded() {
        let mut buf = TailBuffer::new(1);
        let blob = vec![b'{'; 1024 * 1024];
        for _ in 0..64 {
            buf.push(&blob);
        }
        let lines = buf.finish();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut buf = TailBuffer::new(0);
        buf.push(b"a\nb");
        assert!(buf.finish().is_empty());
    }

    #[test]
    fn error_lines() {
        assert!(is_error_line("level=ERROR msg=boom"));
        assert!(is_error_line("Test FAILED"));
        assert!(is_error_line("context DeadlineExceeded"));
        assert!(is_error_line("operation timed out"));
        assert!(is_error_line("process exited: exit code 2"));
        assert!(!is_error_line("process exited: exit code 0"));
        assert!(!is_error_line("all good"));
    }

    #[tokio::test]
    async fn unsupported_url_is_distinct() {
        let client = reqwest::Client::new();
        let err = fetch_tail(&client, "https://example.com/no-marker", 10)
            .await
            .unwrap_err();
        assert!(err.is_unsupported_url());
    }
}
