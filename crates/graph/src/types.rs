use context_code_chunker::{CodeSymbol, SymbolKind};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Function,
    Class,
    Interface,
    Type,
    Variable,
}

impl NodeType {
    /// Id prefix and snapshot tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Variable => "variable",
        }
    }
}

impl From<SymbolKind> for NodeType {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Function => Self::Function,
            SymbolKind::Class => Self::Class,
            SymbolKind::Interface => Self::Interface,
            SymbolKind::Type => Self::Type,
            SymbolKind::Variable => Self::Variable,
        }
    }
}

/// Type of relationship between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// File declares symbol
    Contains,

    /// File imports file
    Imports,

    /// Function (or file top level) calls function
    Calls,
}

impl EdgeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Imports => "imports",
            Self::Calls => "calls",
        }
    }
}

/// Node in code graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// `file:<path>` or `<type>:<path>:<name>`
    pub id: String,

    /// Display name: the path for files, the symbol name otherwise
    pub label: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported: Option<bool>,
}

impl GraphNode {
    #[must_use]
    pub fn file_id(path: &str) -> String {
        format!("file:{path}")
    }

    #[must_use]
    pub fn symbol_id(node_type: NodeType, path: &str, name: &str) -> String {
        format!("{}:{path}:{name}", node_type.as_str())
    }

    #[must_use]
    pub fn file(path: &str) -> Self {
        Self {
            id: Self::file_id(path),
            label: path.to_string(),
            node_type: NodeType::File,
            path: Some(path.to_string()),
            exported: None,
        }
    }

    /// Node for an extracted symbol; `path` is the normalized file path
    #[must_use]
    pub fn symbol(symbol: &CodeSymbol, path: &str) -> Self {
        let node_type = NodeType::from(symbol.kind);
        Self {
            id: Self::symbol_id(node_type, path, &symbol.name),
            label: symbol.name.clone(),
            node_type,
            path: Some(path.to_string()),
            exported: Some(symbol.exported),
        }
    }
}

/// Edge in code graph, as exposed and persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,

    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

/// Directed multigraph of files and symbols
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    pub(crate) graph: DiGraph<GraphNode, EdgeType>,

    /// Node id -> NodeIndex mapping for fast lookup
    pub(crate) index: HashMap<String, NodeIndex>,
}

impl CodeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add node to graph. Ids are unique: re-adding an id keeps the first
    /// node and returns its index.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add edge between existing nodes. Returns `false` (and adds nothing)
    /// when either endpoint is unknown.
    pub fn add_edge(&mut self, source: &str, target: &str, edge_type: EdgeType) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&from), Some(&to)) => {
                self.graph.add_edge(from, to, edge_type);
                true
            }
            _ => false,
        }
    }

    pub fn has_edge(&self, source: &str, target: &str, edge_type: EdgeType) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        self.graph
            .edges_connecting(from, to)
            .any(|e| *e.weight() == edge_type)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.graph.edge_indices().filter_map(move |e| self.edge(e))
    }

    fn edge(&self, e: EdgeIndex) -> Option<GraphEdge> {
        let (from, to) = self.graph.edge_endpoints(e)?;
        Some(GraphEdge {
            source: self.graph[from].id.clone(),
            target: self.graph[to].id.clone(),
            edge_type: *self.graph.edge_weight(e)?,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_ids_keep_first_node() {
        let mut graph = CodeGraph::new();
        let first = graph.add_node(GraphNode::file("a.ts"));
        let mut other = GraphNode::file("a.ts");
        other.label = "changed".to_string();
        let second = graph.add_node(other);

        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("file:a.ts").unwrap().label, "a.ts");
    }

    #[test]
    fn edges_need_known_endpoints() {
        let mut graph = CodeGraph::new();
        graph.add_node(GraphNode::file("a.ts"));
        assert!(!graph.add_edge("file:a.ts", "file:missing.ts", EdgeType::Imports));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn node_json_uses_type_tag() {
        let node = GraphNode::file("src/a.ts");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "file:src/a.ts", "label": "src/a.ts", "type": "file", "path": "src/a.ts"})
        );

        let edge = GraphEdge {
            source: "file:a.ts".to_string(),
            target: "file:b.ts".to_string(),
            edge_type: EdgeType::Imports,
        };
        assert_eq!(
            serde_json::to_value(&edge).unwrap()["type"],
            serde_json::json!("imports")
        );
    }
}
