use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use context_cache::EmbeddingCache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DEFAULT_DIMENSION: usize = 384;

/// Turns texts into vectors, one per text, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Deterministic embedder derived only from the text bytes. Identical text
/// gives a bit-identical unit vector in every process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[must_use]
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        hash_embed(text, self.dimension)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Embeds through an optional provider, falling back to [`HashEmbedder`]
/// when the provider is missing, fails, or answers with the wrong shape.
/// Results are cached by text.
pub struct ResilientEmbedder {
    provider: Option<Arc<dyn Embedder>>,
    fallback: HashEmbedder,
    cache: Mutex<EmbeddingCache>,
    fallback_batches: AtomicUsize,
}

impl ResilientEmbedder {
    pub fn new(provider: Option<Arc<dyn Embedder>>, cache: EmbeddingCache) -> Self {
        let dimension = provider
            .as_ref()
            .map_or(DEFAULT_DIMENSION, |p| p.dimension());
        Self {
            provider,
            fallback: HashEmbedder::new(dimension),
            cache: Mutex::new(cache),
            fallback_batches: AtomicUsize::new(0),
        }
    }

    /// No provider: every vector comes from the hash embedder
    pub fn hash_only(dimension: usize, cache: EmbeddingCache) -> Self {
        Self {
            provider: None,
            fallback: HashEmbedder::new(dimension),
            cache: Mutex::new(cache),
            fallback_batches: AtomicUsize::new(0),
        }
    }

    /// Batches answered by the fallback after a provider problem
    pub fn fallback_batches(&self) -> usize {
        self.fallback_batches.load(Ordering::Relaxed)
    }

    pub fn with_cache<T>(&self, f: impl FnOnce(&mut EmbeddingCache) -> T) -> Result<T> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|_| VectorStoreError::EmbeddingError("Failed to lock embedding cache".into()))?;
        Ok(f(&mut guard))
    }

    async fn embed_misses(&self, misses: &[String]) -> (Vec<Vec<f32>>, bool) {
        let Some(provider) = &self.provider else {
            return (misses.iter().map(|t| self.fallback.embed_one(t)).collect(), true);
        };

        match provider.embed(misses).await {
            Ok(vectors) if is_well_formed(&vectors, misses.len(), self.fallback.dimension) => (vectors, true),
            Ok(vectors) => {
                log::warn!(
                    "Embedding provider '{}' returned {} vectors for {} texts; using fallback embeddings",
                    provider.model_id(),
                    vectors.len(),
                    misses.len()
                );
                self.fallback_batches.fetch_add(1, Ordering::Relaxed);
                (misses.iter().map(|t| self.fallback.embed_one(t)).collect(), false)
            }
            Err(e) => {
                log::warn!("Embedding provider '{}' failed: {e}; using fallback embeddings", provider.model_id());
                self.fallback_batches.fetch_add(1, Ordering::Relaxed);
                (misses.iter().map(|t| self.fallback.embed_one(t)).collect(), false)
            }
        }
    }
}

#[async_trait]
impl Embedder for ResilientEmbedder {
    fn dimension(&self) -> usize {
        self.fallback.dimension
    }

    fn model_id(&self) -> &str {
        self.provider
            .as_ref()
            .map_or("hash", |p| p.model_id())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut misses: Vec<String> = Vec::new();
        let mut miss_slots: HashMap<String, Vec<usize>> = HashMap::new();
        let dimension = self.fallback.dimension;

        self.with_cache(|cache| {
            for (slot, text) in texts.iter().enumerate() {
                // Entries of another dimension (e.g. an older snapshot) are misses
                match cache.get(text) {
                    Some(vector) if vector.len() == dimension => {
                        out[slot] = Some(vector);
                        continue;
                    }
                    Some(vector) => {
                        log::debug!("Dropping cached embedding of dimension {}", vector.len());
                    }
                    None => {}
                }
                let slots = miss_slots.entry(text.clone()).or_default();
                if slots.is_empty() {
                    misses.push(text.clone());
                }
                slots.push(slot);
            }
        })?;

        if !misses.is_empty() {
            log::debug!("Embedding {} texts ({} cached)", misses.len(), texts.len() - misses.len());
            let (vectors, cacheable) = self.embed_misses(&misses).await;

            if cacheable {
                self.with_cache(|cache| {
                    for (text, vector) in misses.iter().zip(&vectors) {
                        cache.insert(text, vector.clone());
                    }
                })?;
            }

            for (text, vector) in misses.iter().zip(vectors) {
                for &slot in miss_slots.get(text).into_iter().flatten() {
                    out[slot] = Some(vector.clone());
                }
            }
        }

        Ok(out.into_iter().map(Option::unwrap_or_default).collect())
    }
}

fn is_well_formed(vectors: &[Vec<f32>], count: usize, dimension: usize) -> bool {
    vectors.len() == count && vectors.iter().all(|v| v.len() == dimension)
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
