use crate::clock::Clock;
use crate::ttl_lru::{CacheStats, TtlLruCache};
use crate::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Embedding vectors keyed by the SHA-256 of the embedded text
pub struct EmbeddingCache {
    inner: TtlLruCache<Vec<f32>>,
}

impl EmbeddingCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: TtlLruCache::new(capacity, ttl),
        }
    }

    #[must_use]
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TtlLruCache::with_clock(capacity, ttl, clock),
        }
    }

    /// Lowercase hex SHA-256 of `text`
    #[must_use]
    pub fn key_for(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex_encode_lower(&hasher.finalize())
    }

    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        self.inner.get(&Self::key_for(text)).cloned()
    }

    pub fn insert(&mut self, text: &str, vector: Vec<f32>) {
        self.inner.set(Self::key_for(text), vector);
    }

    /// Return the cached vector or compute, store and return it.
    /// `compute` runs only on a miss.
    pub fn get_or_compute<F>(&mut self, text: &str, compute: F) -> Vec<f32>
    where
        F: FnOnce(&str) -> Vec<f32>,
    {
        let key = Self::key_for(text);
        if let Some(vector) = self.inner.get(&key) {
            return vector.clone();
        }
        let vector = compute(text);
        self.inner.set(key, vector.clone());
        vector
    }

    /// Fallible variant of [`Self::get_or_compute`]; errors are not cached.
    pub fn try_get_or_compute<F, E>(&mut self, text: &str, compute: F) -> std::result::Result<Vec<f32>, E>
    where
        F: FnOnce(&str) -> std::result::Result<Vec<f32>, E>,
    {
        let key = Self::key_for(text);
        if let Some(vector) = self.inner.get(&key) {
            return Ok(vector.clone());
        }
        let vector = compute(text)?;
        self.inner.set(key, vector.clone());
        Ok(vector)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        self.inner.clear()
    }

    pub const fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        self.inner.save_snapshot(path)
    }

    #[must_use]
    pub fn load_snapshot(path: &Path, capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TtlLruCache::load_snapshot(path, capacity, ttl, clock),
        }
    }
}

fn hex_encode_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
