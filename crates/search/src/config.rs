use crate::error::Result;
use context_code_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STATE_DIR_NAME: &str = ".context";

const GRAPH_SNAPSHOT_FILE: &str = "graph.json";
const VECTOR_INDEX_FILE: &str = "vectors.json";
const EMBEDDING_CACHE_FILE: &str = "embeddings.json";

/// Everything the engine needs to know, read once from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// State directory, relative to the project root unless absolute
    pub state_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub query_cache: QueryCacheConfig,
    pub chunker: ChunkerConfig,
    pub search: SearchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(STATE_DIR_NAME),
            embedding: EmbeddingConfig::default(),
            query_cache: QueryCacheConfig::default(),
            chunker: ChunkerConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            cache_capacity: 10_000,
            cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        if config.state_dir.as_os_str().is_empty() {
            config.state_dir = PathBuf::from(STATE_DIR_NAME);
        }
        config.chunker.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn state_dir_for(&self, root: &Path) -> PathBuf {
        if self.state_dir.as_os_str().is_empty() {
            root.join(STATE_DIR_NAME)
        } else {
            root.join(&self.state_dir)
        }
    }

    pub fn graph_snapshot_path(&self, root: &Path) -> PathBuf {
        self.state_dir_for(root).join(GRAPH_SNAPSHOT_FILE)
    }

    pub fn vector_index_path(&self, root: &Path) -> PathBuf {
        self.state_dir_for(root).join(VECTOR_INDEX_FILE)
    }

    pub fn embedding_cache_path(&self, root: &Path) -> PathBuf {
        self.state_dir_for(root).join(EMBEDDING_CACHE_FILE)
    }

    pub fn embedding_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.embedding.cache_ttl_secs)
    }

    pub fn query_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.query_cache.ttl_secs)
    }
}
