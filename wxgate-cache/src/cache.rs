//! In-memory TTL + LRU cache.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use wxgate_core::constants::DEFAULT_CACHE_MAX_SIZE;
use wxgate_core::Ttl;

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    /// `None` is the never-expires sentinel.
    expires_at: Option<Instant>,
    last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Ttl, now: Instant) -> Self {
        let expires_at = match ttl {
            Ttl::Finite(d) => now.checked_add(d),
            Ttl::Infinite => None,
        };
        Self {
            value,
            stored_at: now,
            expires_at,
            last_accessed_at: now,
        }
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Drop expired entries before evicting live ones when full
    pub auto_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_SIZE,
            auto_cleanup: true,
        }
    }
}

impl CacheConfig {
    /// Configuration with the given capacity.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }
}

struct Inner<V> {
    /// Recency order lives in the LRU list: every hit or insert moves the
    /// key to the front, so the back is always the oldest access.
    entries: LruCache<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> Inner<V> {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }
}

/// Bounded key-value cache with TTL expiry and LRU eviction.
///
/// Each operation takes the internal lock once, so compound
/// check-then-write sequences (expire-then-read, evict-then-insert) are
/// atomic even when the cache is shared across tasks.
pub struct BoundedCache<V> {
    inner: Mutex<Inner<V>>,
    max_entries: NonZeroUsize,
    auto_cleanup: bool,
}

impl<V: Clone> BoundedCache<V> {
    /// Creates a cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    ///
    /// A zero capacity is clamped to one entry.
    pub fn with_config(config: CacheConfig) -> Self {
        let max_entries = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            max_entries,
            auto_cleanup: config.auto_cleanup,
        }
    }

    /// Returns the value for `key` if present and not expired.
    ///
    /// A hit refreshes the entry's recency but never its expiry. An expired
    /// entry is removed and counted as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = match inner.entries.peek(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.pop(key);
            inner.expirations += 1;
            inner.misses += 1;
            return None;
        }

        let entry = inner.entries.get_mut(key)?;
        entry.last_accessed_at = now;
        inner.hits += 1;
        Some(entry.value.clone())
    }

    /// Inserts or overwrites `key` with a fresh lifetime.
    ///
    /// When a new key would exceed capacity, the least recently accessed
    /// entry is evicted first.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Ttl) {
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if !inner.entries.contains(&key) && inner.entries.len() >= self.max_entries.get() {
            if self.auto_cleanup {
                inner.purge_expired(now);
            }
            if inner.entries.len() >= self.max_entries.get() && inner.entries.pop_lru().is_some() {
                inner.evictions += 1;
            }
        }

        inner.entries.put(key, CacheEntry::new(value, ttl, now));
    }

    /// Returns true if `key` holds a live entry. No statistics or recency side effects.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .peek(key)
            .is_some_and(|e| !e.is_expired_at(now))
    }

    /// Time since `key` was stored, if it holds a live entry.
    pub fn age(&self, key: &str) -> Option<std::time::Duration> {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .peek(key)
            .filter(|e| !e.is_expired_at(now))
            .map(|e| now.saturating_duration_since(e.stored_at))
    }

    /// Time since `key` was last read or written, if present.
    pub fn idle_time(&self, key: &str) -> Option<std::time::Duration> {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .peek(key)
            .map(|e| now.saturating_duration_since(e.last_accessed_at))
    }

    /// Removes a cached entry.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.inner.lock().entries.pop(key).map(|e| e.value)
    }

    /// Clears all cached entries. Statistics are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Resets hit/miss/eviction/expiration counters.
    pub fn reset_stats(&self) {
        let mut inner = self.inner.lock();
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
        inner.expirations = 0;
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.inner.lock().purge_expired(Instant::now())
    }

    /// Returns the number of cached entries (live or not yet purged).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Configured capacity.
    pub fn max_entries(&self) -> usize {
        self.max_entries.get()
    }

    /// Returns cache statistics.
    ///
    /// Expired entries are purged first so `size` reflects live entries.
    pub fn stats(&self) -> CacheStats {
        let mut inner = self.inner.lock();
        inner.purge_expired(Instant::now());
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            size: inner.entries.len(),
            max_size: self.max_entries.get(),
        }
    }
}

impl<V: Clone> Default for BoundedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Successful reads
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Live entries dropped to make room
    pub evictions: u64,
    /// Entries dropped because they expired
    pub expirations: u64,
    /// Current number of entries
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
}

impl CacheStats {
    /// Total number of reads.
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// `hits / (hits + misses)`, or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} entries, {} hits, {} misses ({:.1}% hit rate), {} evictions, {} expirations",
            self.size,
            self.max_size,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.expirations
        )
    }
}
