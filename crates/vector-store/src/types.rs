use context_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document and its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Map::new(),
            embedding,
        }
    }

    /// Record for a chunk; the id is the chunk id and location goes into metadata
    pub fn from_chunk(chunk: &CodeChunk, embedding: Vec<f32>) -> Self {
        let mut record = Self::new(chunk.id(), chunk.content.clone(), embedding)
            .with_metadata("file_path", chunk.file_path.clone())
            .with_metadata("start_line", chunk.start_line)
            .with_metadata("end_line", chunk.end_line);
        if let Some(name) = &chunk.metadata.symbol_name {
            record = record.with_metadata("symbol", name.clone());
        }
        record
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f32,
}
