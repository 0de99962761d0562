//! Search Result Cache
//!
//! TTL plus size-bounded cache in front of the marketplace search API. Keys
//! are normalised (trimmed, lowercased) so `" Toner "` and `"toner"` share an
//! entry. A single lock guards the map, the recency index and the counters so
//! every check-evict-insert sequence is atomic.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::models::watch::round2;

/// Snapshot of cache counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    /// Percent of lookups that hit, 2 decimals
    pub hit_rate: f64,
    pub current_size: usize,
    pub max_size: usize,
    pub ttl_seconds: u64,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
    /// Recency position, moves on every hit
    tick: u64,
    /// Position in the expiry index, fixed at insert
    seq: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    /// Access tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    /// (expires_at, seq) -> key, soonest first
    expiry: BTreeMap<(Instant, u64), String>,
    next_tick: u64,
    hits: u64,
    misses: u64,
    sets: u64,
}

impl<V> Inner<V> {
    fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.tick);
                self.expiry.remove(&(entry.expires_at, entry.seq));
                true
            }
            None => false,
        }
    }

    /// Pops expired entries off the front of the expiry index
    fn purge_expired(&mut self, now: Instant) {
        while let Some(entry) = self.expiry.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let key = entry.remove();
            if let Some(removed) = self.entries.remove(&key) {
                self.recency.remove(&removed.tick);
            }
        }
    }

    fn evict_lru(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        if let Some(removed) = self.entries.remove(&key) {
            self.expiry.remove(&(removed.expires_at, removed.seq));
        }
        Some(key)
    }
}

pub struct SearchResultCache<V> {
    inner: Mutex<Inner<V>>,
    ttl: Duration,
    max_size: usize,
}

impl<V: Clone> SearchResultCache<V> {
    /// `max_size` below 1 is treated as 1
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                expiry: BTreeMap::new(),
                next_tick: 0,
                hits: 0,
                misses: 0,
                sets: 0,
            }),
            ttl,
            max_size: max_size.max(1),
        }
    }

    pub fn normalize_key(key: &str) -> String {
        key.trim().to_lowercase()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let key = Self::normalize_key(key);
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let lookup = inner
            .entries
            .get(&key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));

        let fresh = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                inner.remove(&key);
                None
            }
            None => None,
        };

        match fresh {
            Some(value) => {
                inner.hits += 1;
                inner.touch(&key);
                debug!(key = %key, "Search cache hit");
                Some(value)
            }
            None => {
                inner.misses += 1;
                debug!(key = %key, "Search cache miss");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: V) {
        let key = Self::normalize_key(key);
        let now = Instant::now();
        let mut inner = self.inner.lock();

        inner.purge_expired(now);
        inner.remove(&key);

        let tick = inner.next_tick;
        inner.next_tick += 1;
        let expires_at = now + self.ttl;
        inner.entries.insert(
            key.clone(),
            Entry {
                value,
                expires_at,
                tick,
                seq: tick,
            },
        );
        inner.expiry.insert((expires_at, tick), key.clone());
        inner.recency.insert(tick, key);
        inner.sets += 1;

        while inner.entries.len() > self.max_size {
            match inner.evict_lru() {
                Some(evicted) => debug!(key = %evicted, "Evicted least recently used search entry"),
                None => break,
            }
        }
    }

    /// Returns whether an entry was removed
    pub fn delete(&self, key: &str) -> bool {
        let key = Self::normalize_key(key);
        self.inner.lock().remove(&key)
    }

    /// Drops every entry and returns how many were held. Counters are kept.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.recency.clear();
        inner.expiry.clear();
        count
    }

    /// Presence check that leaves counters and recency untouched
    pub fn contains(&self, key: &str) -> bool {
        let key = Self::normalize_key(key);
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .get(&key)
            .is_some_and(|e| e.expires_at > now)
    }

    /// Live keys, least recently used first
    pub fn keys(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner.purge_expired(Instant::now());
        inner.recency.values().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let mut inner = self.inner.lock();
        inner.purge_expired(Instant::now());

        let lookups = inner.hits + inner.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            round2(inner.hits as f64 / lookups as f64 * 100.0)
        };

        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            sets: inner.sets,
            hit_rate,
            current_size: inner.entries.len(),
            max_size: self.max_size,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_secs: u64, max_size: usize) -> SearchResultCache<String> {
        SearchResultCache::new(Duration::from_secs(ttl_secs), max_size)
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_returns_value() {
        let cache = cache(60, 10);
        cache.set("toner", "v1".to_string());

        assert_eq!(cache.get("toner"), Some("v1".to_string()));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.current_size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_normalized() {
        let cache = cache(60, 10);
        cache.set("  Face Wash ", "v".to_string());

        assert_eq!(cache.get("face wash"), Some("v".to_string()));
        assert_eq!(cache.get("FACE WASH"), Some("v".to_string()));
        assert_eq!(cache.keys(), vec!["face wash".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = cache(60, 10);
        cache.set("toner", "v".to_string());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("toner").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("toner"), None);
        assert_eq!(cache.stats().current_size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_do_not_count_toward_size() {
        let cache = cache(60, 10);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        tokio::time::advance(Duration::from_secs(61)).await;
        let stats = cache.stats();
        assert_eq!(stats.current_size, 0);
        assert!(!cache.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_least_recently_used() {
        let cache = cache(60, 2);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        // Reading "a" makes "b" the eviction candidate
        assert!(cache.get("a").is_some());
        cache.set("c", "3".to_string());

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.stats().current_size, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_grow() {
        let cache = cache(60, 2);
        cache.set("a", "1".to_string());
        cache.set("a", "2".to_string());

        assert_eq!(cache.get("a"), Some("2".to_string()));
        let stats = cache.stats();
        assert_eq!(stats.current_size, 1);
        assert_eq!(stats.sets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewritten_entry_outlives_original_expiry() {
        let cache = cache(60, 3);
        cache.set("a", "1".to_string());
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.set("b", "2".to_string());
        cache.set("a", "3".to_string());

        // Past the first "a" deadline, before the rewritten one
        tokio::time::advance(Duration::from_secs(31)).await;
        cache.set("c", "4".to_string());

        assert_eq!(cache.get("a"), Some("3".to_string()));
        assert_eq!(
            cache.keys(),
            vec!["b".to_string(), "c".to_string(), "a".to_string()]
        );

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.keys(), vec!["c".to_string()]);

        let inner = cache.inner.lock();
        assert_eq!(inner.expiry.len(), inner.entries.len());
        assert_eq!(inner.recency.len(), inner.entries.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_rate() {
        let cache = cache(60, 10);
        cache.set("a", "1".to_string());
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 66.67);
        assert_eq!(stats.ttl_seconds, 60);
        assert_eq!(stats.max_size, 10);
    }

    #[test]
    fn test_hit_rate_zero_without_lookups() {
        let cache = cache(60, 10);
        assert_eq!(cache.stats().hit_rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_and_clear() {
        let cache = cache(60, 10);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        assert!(cache.delete(" A "));
        assert!(!cache.delete("a"));
        assert_eq!(cache.clear(), 1);
        assert!(cache.keys().is_empty());
        assert_eq!(cache.stats().sets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_does_not_touch_counters() {
        let cache = cache(60, 10);
        cache.set("a", "1".to_string());
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = cache(60, 0);
        assert_eq!(cache.stats().max_size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sets_are_counted() {
        let cache = std::sync::Arc::new(cache(60, 1000));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    cache.set(&format!("k{}-{}", worker, i), "v".to_string());
                    cache.get(&format!("k{}-{}", worker, i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.sets, 400);
        assert_eq!(stats.hits, 400);
        assert_eq!(stats.current_size, 400);
    }
}
