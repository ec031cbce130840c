//! # Context Code Chunker
//!
//! Structural extraction and chunking of TypeScript / JavaScript sources.
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Tree-sitter Parsing → AST
//!     │
//!     ├──> SymbolExtractor
//!     │    ├─> Declarations (functions, classes + methods, interfaces, types, variables)
//!     │    ├─> Import bindings (default, named, namespace)
//!     │    └─> Call sites attributed to the innermost named function
//!     │
//!     └──> Chunker
//!          ├─> Cut along top-level declaration spans
//!          └─> Emit CodeChunk[] with a `File:` header line
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_code_chunker::SymbolExtractor;
//!
//! let mut extractor = SymbolExtractor::new();
//! let result = extractor
//!     .extract("src/b.ts", "export function helper() { return 1; }")
//!     .unwrap();
//! assert_eq!(result.symbols[0].name, "helper");
//! assert!(result.symbols[0].exported);
//! ```

mod chunker;
mod config;
mod error;
mod extractor;
mod language;
mod types;

pub use chunker::{Chunker, FILE_HEADER_PREFIX};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use extractor::SymbolExtractor;
pub use language::Language;
pub use types::{
    CallSite, ChunkMetadata, CodeChunk, CodeSymbol, FileSymbols, ImportBinding, SymbolKind,
};
