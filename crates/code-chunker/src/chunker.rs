use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::extractor::SymbolExtractor;
use crate::language::Language;
use crate::types::{ChunkMetadata, CodeChunk, CodeSymbol};

/// Header line every chunk starts with; retrieval reads the path back from it.
pub const FILE_HEADER_PREFIX: &str = "File: ";

/// Splits source files into chunks cut along top-level declarations
pub struct Chunker {
    config: ChunkerConfig,
    extractor: SymbolExtractor,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            extractor: SymbolExtractor::new(),
        })
    }

    /// Chunk one file. Files that fail extraction are cut into line windows.
    pub fn chunk_str(&mut self, content: &str, file_path: &str) -> Result<Vec<CodeChunk>> {
        if content.trim().is_empty() {
            return Err(ChunkerError::EmptyContent);
        }

        let symbols = match self.extractor.extract(file_path, content) {
            Ok(result) => result.symbols,
            Err(e) => {
                log::debug!("Chunking {file_path} by line windows: {e}");
                Vec::new()
            }
        };

        Ok(self.chunk_with_symbols(content, file_path, &symbols))
    }

    /// Chunk along the spans of already extracted symbols
    #[must_use]
    pub fn chunk_with_symbols(
        &self,
        content: &str,
        file_path: &str,
        symbols: &[CodeSymbol],
    ) -> Vec<CodeChunk> {
        let lines: Vec<&str> = content.lines().collect();
        let language = Language::from_path(file_path);
        let mut chunks = Vec::new();
        let mut next_line = 1;

        for symbol in top_level(symbols) {
            if symbol.span_start < next_line || symbol.span_start > lines.len() {
                continue;
            }
            if symbol.span_start > next_line {
                let metadata = ChunkMetadata::with_language(language.as_str());
                self.push_span(&mut chunks, &lines, file_path, next_line, symbol.span_start - 1, &metadata);
            }
            let end = symbol.span_end.min(lines.len());
            let metadata = ChunkMetadata::with_language(language.as_str())
                .symbol_kind(symbol.kind)
                .symbol_name(symbol.name.clone());
            self.push_span(&mut chunks, &lines, file_path, symbol.span_start, end, &metadata);
            next_line = end + 1;
        }

        if next_line <= lines.len() {
            let metadata = ChunkMetadata::with_language(language.as_str());
            self.push_span(&mut chunks, &lines, file_path, next_line, lines.len(), &metadata);
        }

        chunks
    }

    fn push_span(
        &self,
        chunks: &mut Vec<CodeChunk>,
        lines: &[&str],
        file_path: &str,
        start: usize,
        end: usize,
        metadata: &ChunkMetadata,
    ) {
        let mut window_start = start;
        while window_start <= end {
            let window_end = (window_start + self.config.max_chunk_lines - 1).min(end);
            let body = &lines[window_start - 1..window_end];

            if !(self.config.skip_blank_chunks && body.iter().all(|l| l.trim().is_empty())) {
                let mut content = String::with_capacity(FILE_HEADER_PREFIX.len() + file_path.len() + 1);
                content.push_str(FILE_HEADER_PREFIX);
                content.push_str(file_path);
                content.push('\n');
                content.push_str(&body.join("\n"));

                chunks.push(CodeChunk::new(
                    file_path.to_string(),
                    window_start,
                    window_end,
                    content,
                    metadata.clone(),
                ));
            }
            window_start = window_end + 1;
        }
    }
}

/// Symbols not nested inside an earlier symbol's span, ordered by start line.
fn top_level(symbols: &[CodeSymbol]) -> Vec<&CodeSymbol> {
    let mut sorted: Vec<&CodeSymbol> = symbols.iter().collect();
    sorted.sort_by_key(|s| (s.span_start, std::cmp::Reverse(s.span_end)));

    let mut kept: Vec<&CodeSymbol> = Vec::new();
    for symbol in sorted {
        let nested = kept
            .last()
            .is_some_and(|outer| symbol.span_end <= outer.span_end);
        if !nested {
            kept.push(symbol);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymbolKind;
    use pretty_assertions::assert_eq;

    fn chunker(max_lines: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            max_chunk_lines: max_lines,
            ..ChunkerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn chunks_follow_top_level_declarations() {
        let code = "import { x } from './x';\n\nexport class A {\n  run() { x(); }\n}\n\nfunction b() {}\n";
        let chunks = chunker(80).chunk_str(code, "src/a.ts").unwrap();

        let spans: Vec<(usize, usize, Option<&str>)> = chunks
            .iter()
            .map(|c| (c.start_line, c.end_line, c.metadata.symbol_name.as_deref()))
            .collect();
        assert_eq!(
            spans,
            vec![(1, 2, None), (3, 5, Some("A")), (7, 7, Some("b"))]
        );
        assert_eq!(chunks[1].metadata.symbol_kind, Some(SymbolKind::Class));
        assert!(chunks[1].content.starts_with("File: src/a.ts\nexport class A {"));
    }

    #[test]
    fn long_spans_are_windowed() {
        let code: String = (0..10).map(|i| format!("call{i}();\n")).collect();
        let chunks = chunker(4).chunk_str(&code, "script.js").unwrap();
        let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start_line, c.end_line)).collect();
        assert_eq!(spans, vec![(1, 4), (5, 8), (9, 10)]);
    }

    #[test]
    fn unparsable_files_still_chunk() {
        let chunks = chunker(80).chunk_str("function (((", "broken.ts").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "File: broken.ts\nfunction (((");
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(matches!(
            chunker(80).chunk_str("  \n", "a.ts"),
            Err(ChunkerError::EmptyContent)
        ));
    }
}
