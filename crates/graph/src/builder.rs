use crate::error::{GraphError, Result};
use crate::resolve::{normalize_path, resolve_import};
use crate::snapshot::{self, LoadedGraph};
use crate::source::SourceReader;
use crate::types::{CodeGraph, EdgeType, GraphNode, NodeType};
use context_code_chunker::{FileSymbols, SymbolExtractor};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    Missing,
    Empty,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// A file that made it into the graph with degraded extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiagnostic {
    pub path: String,
    pub message: String,
}

/// What one build did, including everything it had to leave out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub files_indexed: usize,
    pub skipped: Vec<SkippedFile>,
    pub diagnostics: Vec<FileDiagnostic>,
    pub imports_resolved: usize,
    pub imports_unresolved: usize,
    pub calls_resolved: usize,
    pub calls_unresolved: usize,
    pub snapshot_written: bool,
}

#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: Arc<CodeGraph>,
    pub report: BuildReport,
}

/// Builds the file/symbol graph of a project
pub struct GraphBuilder {
    reader: Arc<dyn SourceReader>,
    extractor: SymbolExtractor,
    snapshot_path: Option<PathBuf>,
    graph: Option<Arc<CodeGraph>>,
}

impl GraphBuilder {
    pub fn new(reader: Arc<dyn SourceReader>) -> Self {
        Self {
            reader,
            extractor: SymbolExtractor::new(),
            snapshot_path: None,
            graph: None,
        }
    }

    /// Persist every built graph to `path`, and load from it
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// The most recently built or loaded graph
    pub fn graph(&self) -> Option<Arc<CodeGraph>> {
        self.graph.clone()
    }

    pub async fn build_complete_graph(&mut self, files: &[String]) -> Result<BuiltGraph> {
        let never = AtomicBool::new(false);
        self.build_with_cancel(files, &never).await
    }

    /// Build from scratch. `cancel` is checked between files; a cancelled
    /// build leaves the previous graph in place.
    pub async fn build_with_cancel(&mut self, files: &[String], cancel: &AtomicBool) -> Result<BuiltGraph> {
        let mut graph = CodeGraph::new();
        let mut report = BuildReport::default();
        let mut extracted: Vec<(String, FileSymbols)> = Vec::with_capacity(files.len());
        let mut seen = HashSet::new();

        for raw in files {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Graph build cancelled after {} files", report.files_indexed);
                return Err(GraphError::Cancelled);
            }

            let path = normalize_path(raw);
            if !seen.insert(path.clone()) {
                continue;
            }

            let source = match self.reader.read_source(&path).await {
                Ok(Some(source)) if !source.is_empty() => source,
                Ok(Some(_)) => {
                    skip(&mut report, path, SkipReason::Empty);
                    continue;
                }
                Ok(None) => {
                    skip(&mut report, path, SkipReason::Missing);
                    continue;
                }
                Err(e) => {
                    skip(&mut report, path, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };

            let symbols = match self.extractor.extract(&path, &source) {
                Ok(symbols) => symbols,
                Err(e) => {
                    log::warn!("Symbol extraction failed for {path}: {e}");
                    report.diagnostics.push(FileDiagnostic {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                    FileSymbols::default()
                }
            };

            add_file(&mut graph, &path, &symbols);
            report.files_indexed += 1;
            extracted.push((path, symbols));
        }

        for (path, symbols) in &extracted {
            link_imports(&mut graph, &mut report, path, symbols);
            link_calls(&mut graph, &mut report, path, symbols);
        }

        log::info!(
            "Built code graph: {} nodes, {} edges ({} files, {} skipped)",
            graph.node_count(),
            graph.edge_count(),
            report.files_indexed,
            report.skipped.len()
        );

        let graph = Arc::new(graph);
        if let Some(path) = &self.snapshot_path {
            match snapshot::save_graph(&graph, path).await {
                Ok(()) => report.snapshot_written = true,
                Err(e) => log::warn!("Failed to write graph snapshot {}: {e}", path.display()),
            }
        }

        self.graph = Some(Arc::clone(&graph));
        Ok(BuiltGraph { graph, report })
    }

    /// Restore the last persisted graph. `Ok(None)` when there is no
    /// snapshot (or no snapshot path configured).
    pub async fn load_graph(&mut self) -> Result<Option<Arc<CodeGraph>>> {
        let Some(path) = &self.snapshot_path else {
            return Ok(None);
        };
        let Some(LoadedGraph { graph, quarantined }) = snapshot::load_graph(path).await? else {
            return Ok(None);
        };

        log::debug!(
            "Loaded graph snapshot: {} nodes, {} edges, {quarantined} quarantined",
            graph.node_count(),
            graph.edge_count()
        );
        let graph = Arc::new(graph);
        self.graph = Some(Arc::clone(&graph));
        Ok(Some(graph))
    }
}

fn skip(report: &mut BuildReport, path: String, reason: SkipReason) {
    log::warn!("Skipping {path}: {reason:?}");
    report.skipped.push(SkippedFile { path, reason });
}

fn add_file(graph: &mut CodeGraph, path: &str, symbols: &FileSymbols) {
    let file_id = GraphNode::file_id(path);
    graph.add_node(GraphNode::file(path));

    for symbol in &symbols.symbols {
        let node = GraphNode::symbol(symbol, path);
        if graph.contains(&node.id) {
            log::debug!("Duplicate declaration {} (keeping the first)", node.id);
            continue;
        }
        let id = node.id.clone();
        graph.add_node(node);
        graph.add_edge(&file_id, &id, EdgeType::Contains);
    }
}

fn link_imports(graph: &mut CodeGraph, report: &mut BuildReport, path: &str, symbols: &FileSymbols) {
    let file_id = GraphNode::file_id(path);

    for import in symbols.imports.iter().filter(|i| i.is_relative()) {
        let target = resolve_import(path, &import.module_path, |candidate| {
            graph.contains(&GraphNode::file_id(candidate))
        });
        let Some(target) = target else {
            log::debug!("Unresolved import '{}' in {path}", import.module_path);
            report.imports_unresolved += 1;
            continue;
        };

        let target_id = GraphNode::file_id(&target);
        if !graph.has_edge(&file_id, &target_id, EdgeType::Imports) {
            graph.add_edge(&file_id, &target_id, EdgeType::Imports);
            report.imports_resolved += 1;
        }
    }
}

/// Calls resolve within the calling file only
fn link_calls(graph: &mut CodeGraph, report: &mut BuildReport, path: &str, symbols: &FileSymbols) {
    for call in &symbols.calls {
        let target_id = GraphNode::symbol_id(NodeType::Function, path, &call.callee_name);
        let source_id = match &call.caller_symbol {
            Some(caller) => GraphNode::symbol_id(NodeType::Function, path, caller),
            None => GraphNode::file_id(path),
        };

        if graph.add_edge(&source_id, &target_id, EdgeType::Calls) {
            report.calls_resolved += 1;
        } else {
            log::debug!("Unresolved call {} -> {} in {path}", source_id, call.callee_name);
            report.calls_unresolved += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySourceReader;
    use pretty_assertions::assert_eq;

    fn builder(reader: MemorySourceReader) -> GraphBuilder {
        GraphBuilder::new(Arc::new(reader))
    }

    #[tokio::test]
    async fn contains_edges_for_every_symbol() {
        let reader = MemorySourceReader::new().with_file(
            "src/a.ts",
            "export class A { run() {} }\ninterface I {}\ntype T = string;\nconst x = 1;\n",
        );
        let built = builder(reader)
            .build_complete_graph(&["./src/a.ts".to_string()])
            .await
            .unwrap();

        let mut contained: Vec<&str> = built
            .graph
            .symbols_in("file:src/a.ts")
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        contained.sort_unstable();
        assert_eq!(
            contained,
            vec![
                "class:src/a.ts:A",
                "function:src/a.ts:A.run",
                "interface:src/a.ts:I",
                "type:src/a.ts:T",
                "variable:src/a.ts:x",
            ]
        );
        assert_eq!(built.graph.node("class:src/a.ts:A").unwrap().exported, Some(true));
    }

    #[tokio::test]
    async fn skipped_files_are_reported() {
        let reader = MemorySourceReader::new()
            .with_file("blank.ts", "")
            .with_file("spaces.ts", "  \n")
            .with_file("ok.ts", "export const a = 1;\n");
        let files = vec![
            "blank.ts".to_string(),
            "gone.ts".to_string(),
            "spaces.ts".to_string(),
            "ok.ts".to_string(),
        ];
        let built = builder(reader).build_complete_graph(&files).await.unwrap();

        assert_eq!(built.report.files_indexed, 2);
        assert_eq!(
            built.report.skipped,
            vec![
                SkippedFile { path: "blank.ts".to_string(), reason: SkipReason::Empty },
                SkippedFile { path: "gone.ts".to_string(), reason: SkipReason::Missing },
            ]
        );
        assert!(!built.graph.contains("file:gone.ts"));
        assert!(!built.graph.contains("file:blank.ts"));
        assert!(built.graph.contains("file:spaces.ts"));
    }

    #[tokio::test]
    async fn parse_failure_keeps_file_node() {
        let reader = MemorySourceReader::new().with_file("bad.ts", "function ((( {");
        let built = builder(reader)
            .build_complete_graph(&["bad.ts".to_string()])
            .await
            .unwrap();

        assert!(built.graph.contains("file:bad.ts"));
        assert_eq!(built.graph.node_count(), 1);
        assert_eq!(built.report.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn same_file_calls_are_linked() {
        let code = "function helper() {}\nclass Svc { go() { helper(); this.stop(); } stop() {} }\nhelper();\n";
        let reader = MemorySourceReader::new().with_file("a.ts", code);
        let built = builder(reader)
            .build_complete_graph(&["a.ts".to_string()])
            .await
            .unwrap();
        let graph = built.graph;

        let callers: Vec<&str> = graph
            .callers_of("function:a.ts:helper")
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(callers, vec!["function:a.ts:Svc.go", "file:a.ts"]);
        // `this.stop()` looks for a bare `stop` function
        assert_eq!(built.report.calls_unresolved, 1);
    }

    #[tokio::test]
    async fn cancelled_build_keeps_previous_graph() {
        let reader = MemorySourceReader::new().with_file("a.ts", "export const a = 1;\n");
        let mut builder = builder(reader);
        let files = vec!["a.ts".to_string()];
        builder.build_complete_graph(&files).await.unwrap();

        let cancel = AtomicBool::new(true);
        let result = builder.build_with_cancel(&files, &cancel).await;
        assert!(matches!(result, Err(GraphError::Cancelled)));
        assert!(builder.graph().unwrap().contains("file:a.ts"));
    }
}
