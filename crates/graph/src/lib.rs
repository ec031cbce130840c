//! # Context Graph
//!
//! File and symbol relationships of a TypeScript/JavaScript project.
//!
//! ## Architecture
//!
//! ```text
//! file paths
//!     │
//!     ├──> SourceReader (filesystem or memory)
//!     │
//!     ├──> SymbolExtractor (per file)
//!     │      ├─ file node + symbol nodes
//!     │      └─ contains edges
//!     │
//!     ├──> Second pass
//!     │      ├─ imports: relative specifiers probed against known files
//!     │      └─ calls: resolved within the calling file
//!     │
//!     └──> CodeGraph (petgraph) + JSON snapshot
//! ```
//!
//! Node ids are `file:<path>` and `<type>:<path>:<name>`.

mod builder;
mod error;
mod graph;
mod resolve;
mod snapshot;
mod source;
mod types;

pub use builder::{BuildReport, BuiltGraph, FileDiagnostic, GraphBuilder, SkipReason, SkippedFile};
pub use error::{GraphError, Result};
pub use graph::{FileConnectivity, GraphStats};
pub use resolve::{normalize_path, resolve_import, IMPORT_PROBE_SUFFIXES};
pub use snapshot::{load_graph, save_graph, LoadedGraph};
pub use source::{FsSourceReader, MemorySourceReader, SourceReader};
pub use types::{CodeGraph, EdgeType, GraphEdge, GraphNode, NodeType};
