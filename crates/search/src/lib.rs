//! # Context Search
//!
//! Graph-aware retrieval over an indexed TypeScript / JavaScript project.
//!
//! ## Pipeline
//!
//! ```text
//! query
//!   │
//!   ├──> Embedder (provider or hash fallback, cached)
//!   │
//!   ├──> VectorIndex::query(3 × limit candidates)
//!   │
//!   ├──> rank score 1 / (rank + 1)
//!   │
//!   ├──> graph boosts per candidate file
//!   │    ├─> imported by > 2 files      +0.3
//!   │    ├─> imports > 3 files          +0.2
//!   │    └─> each import-linked hit     +0.4
//!   │
//!   └──> stable sort, truncate to limit
//! ```
//!
//! [`CodeEngine`] ties the graph builder, chunker, vector index and caches
//! together for one project root.

mod config;
mod engine;
mod error;
mod file_hint;
mod hybrid;

pub use config::{EmbeddingConfig, EngineConfig, QueryCacheConfig, SearchConfig, STATE_DIR_NAME};
pub use engine::{CodeEngine, IndexReport, PersistedState};
pub use error::{Result, SearchError};
pub use file_hint::extract_file_path;
pub use hybrid::{
    apply_graph_boosts, HybridRetriever, SearchHit, CANDIDATE_MULTIPLIER, CENTRAL_BOOST,
    CENTRAL_IMPORTED_BY, INTEGRATION_BOOST, INTEGRATION_IMPORTS, RELATED_BOOST,
};
