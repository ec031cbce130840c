use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for chunking source files before embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Longest chunk in source lines; longer spans are split into windows
    pub max_chunk_lines: usize,

    /// Spans made only of blank lines are dropped
    pub skip_blank_chunks: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_lines: 80,
            skip_blank_chunks: true,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_lines == 0 {
            return Err(ChunkerError::invalid_config(
                "max_chunk_lines must be greater than 0",
            ));
        }
        Ok(())
    }
}
