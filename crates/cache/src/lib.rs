//! Time- and size-bounded caches
//!
//! [`TtlLruCache`] is the general store: least-recently-used eviction at a
//! fixed capacity plus a time-to-live refreshed on every hit. Two
//! specializations sit on top of it:
//!
//! - [`EmbeddingCache`] keys vectors by the SHA-256 of their source text
//! - [`GraphQueryCache`] keys graph query results by type and parameters
//!
//! ```
//! use context_cache::TtlLruCache;
//! use std::time::Duration;
//!
//! let mut cache = TtlLruCache::new(2, Duration::from_secs(60));
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.set("c", 3);
//! assert!(cache.get("a").is_none());
//! assert_eq!(cache.get("c"), Some(&3));
//! ```

mod clock;
mod embedding;
mod error;
mod graph_query;
mod ttl_lru;

pub use clock::{Clock, ManualClock, SystemClock};
pub use embedding::EmbeddingCache;
pub use error::{CacheError, Result};
pub use graph_query::GraphQueryCache;
pub use ttl_lru::{CacheEntry, CacheStats, TtlLruCache};
