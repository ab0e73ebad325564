//! Release resolution with a time-boxed cache and stale fallback.
//!
//! Resolution order:
//! 1. Cache younger than the freshness window: classify it, no network call.
//! 2. Otherwise fetch the index once. On success, classify and overwrite the cache.
//! 3. On failure, classify the stale cache if there is one (its timestamp is left
//!    alone so the next call retries the network), else return nothing.
//!
//! Channels never come from the network; [`ReleaseResolver::available_versions`]
//! lists them first, followed by the resolved releases.

use crate::api::ReleaseSource;
use crate::cache::{self, ReleaseCache};
use crate::config::LauncherConfig;
use crate::version::{self, Version};
use std::path::PathBuf;

pub struct ReleaseResolver<S> {
    source: S,
    config: LauncherConfig,
    cache_path: PathBuf,
    cached: Option<ReleaseCache>,
    clock: fn() -> i64,
}

impl<S: ReleaseSource> ReleaseResolver<S> {
    /// Create a resolver, loading the cache document once
    pub fn new(source: S, config: LauncherConfig, cache_path: PathBuf) -> Self {
        let cached = cache::load(&cache_path);
        if let Some(c) = &cached {
            tracing::debug!(
                "Loaded {} cached releases from {}",
                c.releases.len(),
                cache_path.display()
            );
        }

        Self {
            source,
            config,
            cache_path,
            cached,
            clock: cache::now_millis,
        }
    }

    /// Replace the wall clock, for tests
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve release versions in index order
    pub async fn resolve_versions(&mut self) -> Vec<Version> {
        let now = (self.clock)();

        if let Some(cache) = &self.cached
            && cache.is_fresh(now, self.config.cache_freshness)
        {
            tracing::info!("Using cached releases ({} entries)", cache.releases.len());
            return version::classify_all(&cache.releases, &self.config);
        }

        match self.source.fetch_releases().await {
            Ok(releases) => {
                let versions = version::classify_all(&releases, &self.config);
                let fresh = ReleaseCache::new(releases, now);
                if let Err(e) = cache::store(&self.cache_path, &fresh) {
                    tracing::error!("Failed to persist release cache: {:#}", e);
                }
                self.cached = Some(fresh);
                versions
            }
            Err(e) => {
                tracing::error!("Failed to fetch versions: {:#}", e);
                match &self.cached {
                    Some(stale) => {
                        tracing::warn!("Falling back to stale release cache");
                        version::classify_all(&stale.releases, &self.config)
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    /// Channels first, then releases
    pub async fn available_versions(&mut self) -> Vec<Version> {
        let mut versions: Vec<Version> = version::channels(&self.config)
            .iter()
            .map(|c| c.to_version())
            .collect();
        versions.extend(self.resolve_versions().await);
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct FakeSource {
        calls: Arc<AtomicUsize>,
        response: Option<Vec<serde_json::Value>>,
    }

    impl FakeSource {
        fn ok(releases: Vec<serde_json::Value>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                response: Some(releases),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                response: None,
            }
        }
    }

    impl ReleaseSource for FakeSource {
        async fn fetch_releases(&self) -> anyhow::Result<Vec<serde_json::Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    const NOW: i64 = 1_700_000_000_000;

    fn fixed_now() -> i64 {
        NOW
    }

    fn sample_releases() -> Vec<serde_json::Value> {
        vec![
            json!({"tag_name": "1.2.0", "name": "Quantum 1.2", "zipball_url": "z2"}),
            json!({"tag_name": "0.0.1-indev", "name": "Indev 1", "zipball_url": "z1"}),
        ]
    }

    fn write_cache(dir: &std::path::Path, cache_time: i64) -> PathBuf {
        let path = dir.join("releases.json");
        cache::store(&path, &ReleaseCache::new(sample_releases(), cache_time)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = write_cache(temp.path(), NOW - 10_000);
        let source = FakeSource::ok(vec![]);
        let calls = source.calls.clone();

        let mut resolver =
            ReleaseResolver::new(source, LauncherConfig::default(), path).with_clock(fixed_now);
        let versions = resolver.resolve_versions().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].package_url, "z1");
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes_and_persists() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = write_cache(temp.path(), NOW - 700_000);
        let source = FakeSource::ok(vec![json!({
            "tag_name": "2.0.0", "name": "Quantum 2", "zipball_url": "z"
        })]);

        let mut resolver = ReleaseResolver::new(source, LauncherConfig::default(), path.clone())
            .with_clock(fixed_now);
        let versions = resolver.resolve_versions().await;

        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].id, "2.0.0");
        let on_disk = cache::load(&path).unwrap();
        assert_eq!(on_disk.cache_time, NOW);
        assert_eq!(on_disk.releases.len(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_without_touching_timestamp() {
        let temp = tempfile::TempDir::new().unwrap();
        let old_time = NOW - 700_000;
        let path = write_cache(temp.path(), old_time);
        let source = FakeSource::failing();
        let calls = source.calls.clone();

        let mut resolver = ReleaseResolver::new(source, LauncherConfig::default(), path.clone())
            .with_clock(fixed_now);
        let versions = resolver.resolve_versions().await;

        assert_eq!(versions.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache::load(&path).unwrap().cache_time, old_time);

        // Still stale, so the next call retries
        resolver.resolve_versions().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_network_failure_without_cache_is_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("releases.json");

        let mut resolver =
            ReleaseResolver::new(FakeSource::failing(), LauncherConfig::default(), path.clone())
                .with_clock(fixed_now);

        assert!(resolver.resolve_versions().await.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_available_versions_lists_channels_first() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = write_cache(temp.path(), NOW);

        let mut resolver =
            ReleaseResolver::new(FakeSource::failing(), LauncherConfig::default(), path)
                .with_clock(fixed_now);
        let versions = resolver.available_versions().await;

        let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "beta", "release", "1.2.0", "0.0.1-indev"]);
    }
}
