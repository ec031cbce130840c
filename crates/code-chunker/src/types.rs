use serde::{Deserialize, Serialize};

/// Kind of a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Variable,
}

impl SymbolKind {
    /// Get human-readable name (also the prefix of graph node ids)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Variable => "variable",
        }
    }
}

/// A named declaration found in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSymbol {
    /// Symbol name; methods use `Class.method`
    pub name: String,

    pub kind: SymbolKind,

    /// Source file path
    pub file_path: String,

    /// Start line (1-indexed)
    pub span_start: usize,

    /// End line (1-indexed, inclusive)
    pub span_end: usize,

    /// Declared with an `export` qualifier
    pub exported: bool,
}

/// One imported binding, before any path resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBinding {
    /// Local binding name (`*` for side-effect imports)
    pub imported_name: String,

    /// Module specifier exactly as written
    pub module_path: String,

    /// File containing the import statement
    pub file_path: String,

    pub is_default: bool,
}

impl ImportBinding {
    /// Relative specifiers (`./x`, `../y`) are the only ones the graph resolves
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.module_path.starts_with('.')
    }
}

/// A call expression with its attribution context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Innermost enclosing function/method, `None` for top-level calls
    pub caller_symbol: Option<String>,

    /// Bare identifier or `receiver.method`
    pub callee_name: String,

    pub file_path: String,

    /// Line of the call (1-indexed)
    pub line: usize,
}

/// Everything one extraction pass produces for a single file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSymbols {
    pub symbols: Vec<CodeSymbol>,
    pub imports: Vec<ImportBinding>,
    pub calls: Vec<CallSite>,
}

impl FileSymbols {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.imports.is_empty() && self.calls.is_empty()
    }
}

/// A retrievable piece of a source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeChunk {
    /// Source file path
    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// `File: <path>` header followed by the source lines
    pub content: String,

    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Create a new code chunk
    #[must_use]
    pub const fn new(
        file_path: String,
        start_line: usize,
        end_line: usize,
        content: String,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            file_path,
            start_line,
            end_line,
            content,
            metadata,
        }
    }

    /// Stable chunk id: `<path>:<start>:<end>`
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.file_path, self.start_line, self.end_line)
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Metadata about a code chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Programming language
    pub language: Option<String>,

    /// Kind of the symbol this chunk was cut around
    pub symbol_kind: Option<SymbolKind>,

    /// Symbol name (function name, class name, etc.)
    pub symbol_name: Option<String>,
}

impl ChunkMetadata {
    /// Create metadata with language only
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Default::default()
        }
    }

    /// Builder: set symbol kind
    #[must_use]
    pub const fn symbol_kind(mut self, kind: SymbolKind) -> Self {
        self.symbol_kind = Some(kind);
        self
    }

    /// Builder: set symbol name
    #[must_use]
    pub fn symbol_name(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_line_count() {
        let chunk = CodeChunk::new(
            "a.ts".to_string(),
            10,
            15,
            "code".to_string(),
            ChunkMetadata::default(),
        );
        assert_eq!(chunk.line_count(), 6);
        assert_eq!(chunk.id(), "a.ts:10:15");
    }

    #[test]
    fn test_chunk_contains_line() {
        let chunk = CodeChunk::new(
            "a.ts".to_string(),
            10,
            15,
            "code".to_string(),
            ChunkMetadata::default(),
        );
        assert!(chunk.contains_line(10));
        assert!(chunk.contains_line(15));
        assert!(!chunk.contains_line(9));
        assert!(!chunk.contains_line(16));
    }

    #[test]
    fn test_import_is_relative() {
        let binding = ImportBinding {
            imported_name: "helper".to_string(),
            module_path: "./b".to_string(),
            file_path: "a.ts".to_string(),
            is_default: false,
        };
        assert!(binding.is_relative());

        let bare = ImportBinding {
            module_path: "react".to_string(),
            ..binding
        };
        assert!(!bare.is_relative());
    }

    #[test]
    fn test_symbol_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SymbolKind::Interface).unwrap();
        assert_eq!(json, "\"interface\"");
    }
}
