//! Latest-report cache.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::upstream::ArtifactRef;

/// Holds the most recently rendered report.
///
/// Writes replace the whole value; readers always see either the previous or
/// the new artifact. There is no expiry and nothing is persisted.
#[derive(Clone, Default)]
pub struct ReportCache {
    latest: Arc<RwLock<Option<ArtifactRef>>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached report.
    pub async fn store(&self, artifact: ArtifactRef) {
        *self.latest.write().await = Some(artifact);
    }

    /// The most recently stored report, if any.
    pub async fn latest(&self) -> Option<ArtifactRef> {
        self.latest.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_until_stored() {
        let cache = ReportCache::new();
        assert_eq!(cache.latest().await, None);

        cache.store(ArtifactRef::new("http://r/1")).await;
        assert_eq!(cache.latest().await, Some(ArtifactRef::new("http://r/1")));
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let cache = ReportCache::new();
        cache.store(ArtifactRef::new("http://r/1")).await;
        cache.store(ArtifactRef::new("http://r/2")).await;
        assert_eq!(cache.latest().await, Some(ArtifactRef::new("http://r/2")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_leave_a_whole_value() {
        let cache = ReportCache::new();
        let urls: Vec<String> = (0..32).map(|i| format!("http://r/{i}")).collect();

        let writers: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.store(ArtifactRef::new(url)).await })
            })
            .collect();

        for writer in writers {
            writer.await.unwrap();
        }

        let latest = cache.latest().await.unwrap();
        assert!(urls.iter().any(|u| u == latest.as_str()));
    }
}
