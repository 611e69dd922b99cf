use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One cached value plus its insertion time. Expiry is checked against a caller-supplied
/// TTL rather than stored per-entry, so the same `TtlCache` type serves every provider
/// kind even though fundamentals/liquidity/borrow/short-interest each have a different TTL.
#[derive(Clone)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// A single-kind, in-process TTL cache keyed by ticker (or any string key). Misses are
/// coalesced: concurrent callers for the same key share one in-flight fetch rather than
/// issuing the provider request N times.
pub struct TtlCache<T: Clone + Send + Sync + 'static> {
    entries: DashMap<String, CacheEntry<T>>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
    ttl_secs: i64,
}

impl<T: Clone + Send + Sync + 'static> TtlCache<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            ttl_secs,
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        let age = (Utc::now() - entry.cached_at).num_seconds();
        if age < self.ttl_secs {
            tracing::trace!(key, age, "cache hit");
            Some(entry.data.clone())
        } else {
            tracing::trace!(key, age, ttl = self.ttl_secs, "cache entry expired");
            None
        }
    }

    pub fn put(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        tracing::trace!(%key, "cache put");
        self.entries.insert(
            key,
            CacheEntry {
                data: value,
                cached_at: Utc::now(),
            },
        );
    }

    /// Fetch-or-compute with request coalescing: the first caller for a cold key runs
    /// `fetch`; concurrent callers for the same key wait on that result instead of
    /// re-issuing the provider call. Single-writer-multi-reader discipline for the
    /// provider TTL cache.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(v) = self.get(key) {
            return Ok(v);
        }

        let lock = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: another caller may have just populated it.
        if let Some(v) = self.get(key) {
            return Ok(v);
        }

        let value = fetch().await?;
        self.put(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit() {
        let cache: TtlCache<i32> = TtlCache::new(60);
        assert!(cache.get("AAPL").is_none());

        let v = cache
            .get_or_fetch("AAPL", || async { Ok::<i32, ()>(42) })
            .await
            .unwrap();
        assert_eq!(v, 42);
        assert_eq!(cache.get("AAPL"), Some(42));
    }

    #[tokio::test]
    async fn expired_entry_is_absent() {
        let cache: TtlCache<i32> = TtlCache::new(0);
        cache.put("AAPL", 7);
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(cache.get("AAPL").is_none());
    }

    #[tokio::test]
    async fn get_or_fetch_only_calls_fetch_once_per_key() {
        let cache: TtlCache<i32> = TtlCache::new(60);
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            cache
                .get_or_fetch("AAPL", || async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok::<i32, ()>(1)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
