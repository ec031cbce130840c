//! # Context Vector Store
//!
//! Vector storage and similarity search for code chunks.
//!
//! ## Features
//!
//! - **Exact cosine search** over every stored vector, stable on ties
//! - **Pluggable embedders** behind the [`Embedder`] trait
//! - **Deterministic fallback** embeddings derived from the text alone
//! - **Persistent storage** with JSON serialization
//!
//! ## Architecture
//!
//! ```text
//! CodeChunk[]
//!     │
//!     ├──> ResilientEmbedder
//!     │      ├─ EmbeddingCache (by text hash)
//!     │      ├─ provider (optional)
//!     │      └─ HashEmbedder (fallback)
//!     │
//!     ├──> VectorIndex
//!     │      └─> top-K cosine search
//!     │
//!     └──> Persistent Storage
//!            └─> JSON
//! ```
//!
//! ## Example
//!
//! ```
//! use context_vector_store::{HashEmbedder, VectorIndex, VectorRecord};
//!
//! let embedder = HashEmbedder::new(32);
//! let mut index = VectorIndex::new();
//! index.upsert(VectorRecord::new("a", "fn a", embedder.embed_one("fn a"))).unwrap();
//! index.upsert(VectorRecord::new("b", "fn b", embedder.embed_one("fn b"))).unwrap();
//!
//! let hits = index.query(&embedder.embed_one("fn a"), 1).unwrap();
//! assert_eq!(hits[0].record.id, "a");
//! ```

mod embeddings;
mod error;
mod store;
mod types;

pub use embeddings::{Embedder, HashEmbedder, ResilientEmbedder, DEFAULT_DIMENSION};
pub use error::{Result, VectorStoreError};
pub use store::{cosine_similarity, VectorIndex};
pub use types::{ScoredRecord, VectorRecord};
