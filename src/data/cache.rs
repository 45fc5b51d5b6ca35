use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

// ---------------------------------------------------------------------------
// Load-once-per-key cache
// ---------------------------------------------------------------------------

struct CacheEntry<T> {
    value: Arc<T>,
    loaded_at: Instant,
}

/// Memoises expensive loads (remote fetches) per source key.
///
/// An entry is reused until it is older than `ttl` or is invalidated
/// explicitly. Failed loads are never cached.
pub struct FetchCache<T> {
    ttl: Option<Duration>,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> FetchCache<T> {
    /// `ttl = None` keeps entries until they are invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Return the cached value for `key`, running `load` on a miss or when
    /// the entry has expired.
    pub fn get_or_load<F>(&mut self, key: &str, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        self.get_or_load_at(key, Instant::now(), load)
    }

    fn get_or_load_at<F>(&mut self, key: &str, now: Instant, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(entry) = self.entries.get(key) {
            if self.is_fresh(entry, now) {
                log::debug!("cache hit for {key}");
                return Ok(Arc::clone(&entry.value));
            }
            log::info!("cache entry for {key} expired, reloading");
        } else {
            log::debug!("cache miss for {key}");
        }

        let value = Arc::new(load()?);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::clone(&value),
                loaded_at: now,
            },
        );
        Ok(value)
    }

    fn is_fresh(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(entry.loaded_at) < ttl,
            None => true,
        }
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            log::info!("cache entry for {key} invalidated");
        }
        existed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_loads_once_per_key() {
        let calls = Cell::new(0);
        let mut cache: FetchCache<u32> = FetchCache::new(None);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(7)
        };
        assert_eq!(*cache.get_or_load("a", load).unwrap(), 7);
        assert_eq!(*cache.get_or_load("a", load).unwrap(), 7);
        assert_eq!(calls.get(), 1);
        cache.get_or_load("b", load).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_expired_entries_reload() {
        let calls = Cell::new(0);
        let mut cache: FetchCache<u32> = FetchCache::new(Some(Duration::from_secs(60)));
        let load = || {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };
        let t0 = Instant::now();
        assert_eq!(*cache.get_or_load_at("k", t0, load).unwrap(), 1);
        assert_eq!(
            *cache.get_or_load_at("k", t0 + Duration::from_secs(30), load).unwrap(),
            1
        );
        assert_eq!(
            *cache.get_or_load_at("k", t0 + Duration::from_secs(61), load).unwrap(),
            2
        );
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let calls = Cell::new(0);
        let mut cache: FetchCache<u32> = FetchCache::new(None);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(0)
        };
        cache.get_or_load("k", load).unwrap();
        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
        cache.get_or_load("k", load).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(cache.entries.contains_key("k"));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut cache: FetchCache<u32> = FetchCache::new(None);
        assert!(cache
            .get_or_load("k", || anyhow::bail!("connection refused"))
            .is_err());
        assert!(!cache.entries.contains_key("k"));
        assert_eq!(*cache.get_or_load("k", || Ok(3)).unwrap(), 3);
    }
}
