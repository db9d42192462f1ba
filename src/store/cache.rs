//! TTL cache in front of a [`ConfigurationStore`]
//!
//! Network-backed stores answer each lookup with one or more HTTP round
//! trips. The resolver stays stateless; callers that want caching wrap the
//! store instead.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::ConfigurationStore;
use crate::error::ConfigStoreError;

type CacheKey = (String, String, String);

/// Entry count at which inserts first sweep out expired values
const SWEEP_THRESHOLD: usize = 1024;

struct Entries {
    map: HashMap<CacheKey, (Instant, Option<String>)>,
    /// Next size at which an insert sweeps; doubles with the live set
    sweep_at: usize,
}

impl Entries {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: SWEEP_THRESHOLD,
        }
    }

    fn purge(&mut self, ttl: Duration) -> usize {
        let before = self.map.len();
        self.map.retain(|_, (stored, _)| stored.elapsed() < ttl);
        self.sweep_at = (self.map.len() * 2).max(SWEEP_THRESHOLD);
        before - self.map.len()
    }
}

/// Caches configuration values (including "not set") for a fixed TTL
///
/// Errors are never cached. Expired entries are swept on insert once the
/// cache has grown past the last sweep, so memory tracks the live key set.
pub struct CachedConfigurationStore<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<Entries>,
}

impl<S: ConfigurationStore> CachedConfigurationStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(Entries::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached value of `cluster`
    pub fn invalidate_cluster(&self, cluster: &str) {
        let mut entries = self.entries.write().expect("RwLock poisoned");
        entries.map.retain(|(c, _, _), _| c != cluster);
    }

    pub fn clear(&self) {
        *self.entries.write().expect("RwLock poisoned") = Entries::new();
    }

    /// Drop expired entries now, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let removed = self.entries.write().expect("RwLock poisoned").purge(self.ttl);
        if removed > 0 {
            debug!(removed, "Purged expired configuration entries");
        }
        removed
    }

    /// Number of cached entries, fresh or not yet swept
    pub fn len(&self) -> usize {
        self.entries.read().expect("RwLock poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh(&self, key: &CacheKey) -> Option<Option<String>> {
        let entries = self.entries.read().expect("RwLock poisoned");
        entries
            .map
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }
}

#[async_trait]
impl<S: ConfigurationStore> ConfigurationStore for CachedConfigurationStore<S> {
    async fn config_value(
        &self,
        cluster: &str,
        config_type: &str,
        key: &str,
    ) -> Result<Option<String>, ConfigStoreError> {
        let cache_key = (cluster.to_string(), config_type.to_string(), key.to_string());
        if let Some(value) = self.fresh(&cache_key) {
            trace!(cluster, config_type, key, "Configuration cache hit");
            return Ok(value);
        }

        let value = self.inner.config_value(cluster, config_type, key).await?;

        let mut entries = self.entries.write().expect("RwLock poisoned");
        if entries.map.len() >= entries.sweep_at {
            let removed = entries.purge(self.ttl);
            trace!(removed, remaining = entries.map.len(), "Swept configuration cache");
        }
        entries.map.insert(cache_key, (Instant::now(), value.clone()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts lookups and answers with a fixed value
    struct CountingStore {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ConfigurationStore for CountingStore {
        async fn config_value(
            &self,
            _cluster: &str,
            _config_type: &str,
            key: &str,
        ) -> Result<Option<String>, ConfigStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ConfigStoreError::Backend("down".to_string()));
            }
            Ok((key == "set").then(|| "50070".to_string()))
        }
    }

    fn store(fail: bool) -> (CachedConfigurationStore<CountingStore>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = CountingStore {
            calls: calls.clone(),
            fail,
        };
        (CachedConfigurationStore::new(inner, Duration::from_secs(60)), calls)
    }

    #[tokio::test]
    async fn test_values_are_cached() {
        let (cache, calls) = store(false);
        for _ in 0..3 {
            assert_eq!(
                cache.config_value("c1", "hdfs-site", "set").await.unwrap(),
                Some("50070".to_string())
            );
            assert_eq!(cache.config_value("c1", "hdfs-site", "unset").await.unwrap(), None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (cache, calls) = store(true);
        assert!(cache.config_value("c1", "hdfs-site", "set").await.is_err());
        assert!(cache.config_value("c1", "hdfs-site", "set").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_cluster() {
        let (cache, calls) = store(false);
        cache.config_value("c1", "hdfs-site", "set").await.unwrap();
        cache.config_value("c2", "hdfs-site", "set").await.unwrap();

        cache.invalidate_cluster("c1");
        assert_eq!(cache.len(), 1);

        cache.config_value("c1", "hdfs-site", "set").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = CountingStore {
            calls: calls.clone(),
            fail: false,
        };
        let cache = CachedConfigurationStore::new(inner, Duration::ZERO);

        cache.config_value("c1", "hdfs-site", "set").await.unwrap();
        cache.config_value("c1", "hdfs-site", "set").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_swept_on_insert() {
        let inner = CountingStore {
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        };
        let cache = CachedConfigurationStore::new(inner, Duration::ZERO);

        for i in 0..5000 {
            let cluster = format!("c{}", i);
            cache.config_value(&cluster, "hdfs-site", "set").await.unwrap();
        }
        assert!(cache.len() <= SWEEP_THRESHOLD, "cache grew to {}", cache.len());

        let stale = cache.len();
        assert_eq!(cache.purge_expired(), stale);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_entries_survive_sweep() {
        let (cache, calls) = store(false);
        for i in 0..SWEEP_THRESHOLD + 10 {
            let cluster = format!("c{}", i);
            cache.config_value(&cluster, "hdfs-site", "set").await.unwrap();
        }
        assert_eq!(cache.len(), SWEEP_THRESHOLD + 10);
        assert_eq!(cache.purge_expired(), 0);

        cache.config_value("c0", "hdfs-site", "set").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), SWEEP_THRESHOLD + 10);
    }
}
