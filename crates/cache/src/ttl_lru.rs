use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use lru::LruCache;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A cached value with its bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    /// Last write or hit, unix milliseconds
    pub timestamp: u64,
    pub access_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// On-disk form: entries from least to most recently used
#[derive(Deserialize)]
struct CacheSnapshot<T> {
    entries: Vec<CacheEntry<T>>,
}

#[derive(Serialize)]
struct CacheSnapshotRef<'a, T> {
    entries: Vec<&'a CacheEntry<T>>,
}

/// Bounded key/value cache with least-recently-used eviction and a
/// time-to-live measured from the last write or hit.
pub struct TtlLruCache<T> {
    entries: LruCache<String, CacheEntry<T>>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<T> TtlLruCache<T> {
    /// A capacity of 0 is treated as 1.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            clock,
            stats: CacheStats::default(),
        }
    }

    /// Look up a live entry. A hit refreshes both recency and the TTL
    /// window; an expired entry is dropped and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<&T> {
        let now = self.clock.now_ms();
        let expired = match self.entries.peek(key) {
            Some(entry) => is_expired(entry.timestamp, now, self.ttl_ms),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.pop(key);
            self.stats.misses += 1;
            self.stats.expirations += 1;
            log::trace!("Cache entry expired: {key}");
            return None;
        }

        self.stats.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.timestamp = now;
        entry.access_count += 1;
        Some(&entry.value)
    }

    /// Insert or replace. Inserting a new key into a full cache evicts the
    /// least recently used entry first.
    pub fn set(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        let now = self.clock.now_ms();

        if !self.entries.contains(key.as_str()) && self.entries.len() >= self.entries.cap().get() {
            if let Some((evicted, _)) = self.entries.pop_lru() {
                self.stats.evictions += 1;
                log::trace!("Cache evicted {evicted}");
            }
        }

        let entry = CacheEntry {
            key: key.clone(),
            value,
            timestamp: now,
            access_count: 0,
        };
        self.entries.put(key, entry);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .peek(key)
            .is_some_and(|entry| !is_expired(entry.timestamp, self.clock.now_ms(), self.ttl_ms))
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        self.entries.pop(key).map(|entry| entry.value)
    }

    /// Remove every key matching `pattern` (regular expression).
    pub fn invalidate_pattern(&mut self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| regex.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            self.entries.pop(key.as_str());
        }
        if !matching.is_empty() {
            log::debug!("Invalidated {} cache entries matching {pattern}", matching.len());
        }
        Ok(matching.len())
    }

    /// Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Entries from least to most recently used, without touching recency
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry<T>> {
        self.entries.iter().rev().map(|(_, entry)| entry)
    }
}

impl<T: Serialize> TtlLruCache<T> {
    /// Write all entries as `{"entries": [...]}`, least recently used first.
    /// Writes go through a temp file and a rename.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = CacheSnapshotRef {
            entries: self.entries().collect(),
        };
        let json = serde_json::to_vec(&snapshot)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        log::debug!("Saved {} cache entries to {}", self.len(), path.display());
        Ok(())
    }
}

impl<T: DeserializeOwned> TtlLruCache<T> {
    /// Restore a cache from a snapshot. Entries older than the TTL are
    /// dropped. A missing, unreadable or malformed snapshot yields an empty
    /// cache.
    #[must_use]
    pub fn load_snapshot(
        path: &Path,
        capacity: usize,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut cache = Self::with_clock(capacity, ttl, clock);

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No cache snapshot at {}", path.display());
                return cache;
            }
            Err(e) => {
                log::warn!("Failed to read cache snapshot {}: {e}", path.display());
                return cache;
            }
        };

        let snapshot: CacheSnapshot<T> = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Ignoring malformed cache snapshot {}: {e}", path.display());
                return cache;
            }
        };

        let now = cache.clock.now_ms();
        let total = snapshot.entries.len();
        for entry in snapshot.entries {
            if now.saturating_sub(entry.timestamp) < cache.ttl_ms {
                cache.restore(entry);
            }
        }

        log::debug!(
            "Restored {} of {total} cache entries from {}",
            cache.len(),
            path.display()
        );
        cache
    }

    fn restore(&mut self, entry: CacheEntry<T>) {
        self.entries.put(entry.key.clone(), entry);
    }
}

const fn is_expired(timestamp: u64, now: u64, ttl_ms: u64) -> bool {
    now.saturating_sub(timestamp) > ttl_ms
}
