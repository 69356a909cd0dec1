//! On-disk response cache keyed by request URL.
//!
//! Each entry is a body file plus a `.meta` file holding the unix time of the
//! last successful fetch. An entry is valid for `ttl` after that time.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn body_path(&self, url: &str) -> PathBuf {
        let hash = blake3::hash(url.as_bytes()).to_hex();
        self.dir.join(format!("prowjobs_{}.json", &hash.as_str()[..16]))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        self.body_path(url).with_extension("meta")
    }

    /// Cached body for `url` if it was stored less than `ttl` ago.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let stored_at = read_timestamp(&self.meta_path(url)).await?;
        let age = now_secs().saturating_sub(stored_at);
        if age >= self.ttl.as_secs() {
            debug!(age_secs = age, "Cache entry expired");
            return None;
        }
        tokio::fs::read(self.body_path(url)).await.ok()
    }

    /// Store a body. Failures are logged; the cache is best effort.
    pub async fn put(&self, url: &str, body: &[u8]) {
        if let Err(e) = self.try_put(url, body).await {
            warn!(error = %e, dir = %self.dir.display(), "Failed to write response cache");
        }
    }

    async fn try_put(&self, url: &str, body: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.body_path(url), body).await?;
        tokio::fs::write(self.meta_path(url), now_secs().to_string()).await
    }
}

async fn read_timestamp(path: &Path) -> Option<u64> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    // Accept fractional seconds written by older tools.
    text.trim()
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://prow.example/prowjobs.js";

    #[tokio::test]
    async fn round_trip_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(1800));

        assert!(cache.get(URL).await.is_none());
        cache.put(URL, b"{\"items\":[]}").await;
        assert_eq!(cache.get(URL).await.as_deref(), Some(&b"{\"items\":[]}"[..]));
        assert!(cache.get("https://other.example/").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(1800));
        cache.put(URL, b"{}").await;

        let stale = now_secs() - 31 * 60;
        std::fs::write(cache.meta_path(URL), format!("{stale}.25")).unwrap();
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn garbage_meta_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(1800));
        cache.put(URL, b"{}").await;
        std::fs::write(cache.meta_path(URL), "yesterday").unwrap();
        assert!(cache.get(URL).await.is_none());
    }
}
