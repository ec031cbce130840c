use crate::error::{Result, VectorStoreError};
use crate::types::{ScoredRecord, VectorRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

const NORM_EPSILON: f32 = 1e-8;

/// Cosine similarity with a small epsilon in the denominator, so zero
/// vectors score 0 instead of NaN.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    dot_product / (norm_a * norm_b + NORM_EPSILON)
}

#[derive(Serialize)]
struct IndexSnapshotRef<'a> {
    dimension: Option<usize>,
    records: &'a [VectorRecord],
}

#[derive(Deserialize)]
struct IndexSnapshot {
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
}

/// Exact (brute-force) cosine index. Records keep insertion order;
/// upserting an existing id replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    /// Dimension is fixed by the first record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    pub fn upsert(&mut self, record: VectorRecord) -> Result<()> {
        self.upsert_many(std::iter::once(record))
    }

    /// All-or-nothing: a dimension mismatch anywhere in the batch leaves
    /// the index unchanged.
    pub fn upsert_many(&mut self, records: impl IntoIterator<Item = VectorRecord>) -> Result<()> {
        let records: Vec<VectorRecord> = records.into_iter().collect();

        let mut expected = self.dimension;
        for record in &records {
            let actual = record.embedding.len();
            match expected {
                Some(expected) if expected != actual => {
                    return Err(VectorStoreError::InvalidDimension { expected, actual });
                }
                Some(_) => {}
                None => expected = Some(actual),
            }
        }
        self.dimension = expected;

        for record in records {
            match self.positions.get(&record.id) {
                Some(&pos) => self.records[pos] = record,
                None => {
                    self.positions.insert(record.id.clone(), self.records.len());
                    self.records.push(record);
                }
            }
        }
        Ok(())
    }

    /// Top `k` records by cosine similarity, best first. Ties keep
    /// insertion order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredRecord>> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut scores: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, record)| (pos, cosine_similarity(vector, &record.embedding)))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(k);

        Ok(scores
            .into_iter()
            .map(|(pos, score)| ScoredRecord {
                record: self.records[pos].clone(),
                score,
            })
            .collect())
    }

    pub fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    pub fn remove(&mut self, id: &str) -> Option<VectorRecord> {
        let pos = self.positions.remove(id)?;
        let removed = self.records.remove(pos);
        for later in &self.records[pos..] {
            if let Some(p) = self.positions.get_mut(&later.id) {
                *p -= 1;
            }
        }
        Some(removed)
    }

    /// Drop every record whose id starts with `prefix`
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !r.id.starts_with(prefix));
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id.clone(), pos))
            .collect();
        before - self.records.len()
    }

    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot = IndexSnapshotRef {
            dimension: self.dimension,
            records: &self.records,
        };
        let data = serde_json::to_vec(&snapshot)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, path).await?;
        log::debug!("Saved {} vectors to {}", self.records.len(), path.display());
        Ok(())
    }

    /// `Ok(None)` when nothing was saved at `path`
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: IndexSnapshot = serde_json::from_slice(&data)?;

        let mut index = snapshot
            .dimension
            .map_or_else(Self::new, Self::with_dimension);
        index.upsert_many(snapshot.records)?;
        log::debug!("Loaded {} vectors from {}", index.len(), path.display());
        Ok(Some(index))
    }
}
