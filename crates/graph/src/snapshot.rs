use crate::error::{GraphError, Result};
use crate::types::{CodeGraph, GraphEdge, GraphNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    nodes: Vec<&'a GraphNode>,
    edges: Vec<GraphEdge>,
}

/// Entries are parsed one by one so a bad entry doesn't reject the file
#[derive(Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    nodes: Vec<Value>,
    #[serde(default)]
    edges: Vec<Value>,
}

/// A graph restored from disk
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: CodeGraph,
    /// Entries dropped because they were malformed, duplicated or dangling
    pub quarantined: usize,
}

/// Write `{nodes, edges}` JSON through a temp file and a rename
pub async fn save_graph(graph: &CodeGraph, path: &Path) -> Result<()> {
    let snapshot = SnapshotOut {
        nodes: graph.nodes().collect(),
        edges: graph.edges().collect(),
    };
    let json = serde_json::to_vec(&snapshot)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// `Ok(None)` when no snapshot exists
pub async fn load_graph(path: &Path) -> Result<Option<LoadedGraph>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let raw: SnapshotIn = serde_json::from_slice(&bytes)
        .map_err(|e| GraphError::InvalidSnapshot(format!("{}: {e}", path.display())))?;
    Ok(Some(restore(raw)))
}

fn restore(raw: SnapshotIn) -> LoadedGraph {
    let mut graph = CodeGraph::new();
    let mut quarantined = 0;

    for value in raw.nodes {
        match serde_json::from_value::<GraphNode>(value) {
            Ok(node) if !graph.contains(&node.id) => {
                graph.add_node(node);
            }
            Ok(node) => {
                log::debug!("Dropping duplicate snapshot node {}", node.id);
                quarantined += 1;
            }
            Err(e) => {
                log::debug!("Dropping malformed snapshot node: {e}");
                quarantined += 1;
            }
        }
    }

    for value in raw.edges {
        match serde_json::from_value::<GraphEdge>(value) {
            Ok(edge) => {
                if !graph.add_edge(&edge.source, &edge.target, edge.edge_type) {
                    log::debug!("Dropping dangling snapshot edge {} -> {}", edge.source, edge.target);
                    quarantined += 1;
                }
            }
            Err(e) => {
                log::debug!("Dropping malformed snapshot edge: {e}");
                quarantined += 1;
            }
        }
    }

    if quarantined > 0 {
        log::warn!("Graph snapshot: quarantined {quarantined} malformed entries");
    }
    LoadedGraph { graph, quarantined }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeType;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_graph(&dir.path().join("graph.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trip_preserves_nodes_and_edges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/graph.json");

        let mut graph = CodeGraph::new();
        graph.add_node(GraphNode::file("a.ts"));
        graph.add_node(GraphNode::file("b.ts"));
        graph.add_edge("file:a.ts", "file:b.ts", EdgeType::Imports);
        save_graph(&graph, &path).await.unwrap();

        let loaded = load_graph(&path).await.unwrap().unwrap();
        assert_eq!(loaded.quarantined, 0);
        assert_eq!(loaded.graph.nodes().collect::<Vec<_>>(), graph.nodes().collect::<Vec<_>>());
        assert_eq!(loaded.graph.edges().collect::<Vec<_>>(), graph.edges().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn malformed_entries_are_quarantined() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        let json = serde_json::json!({
            "nodes": [
                {"id": "file:a.ts", "label": "a.ts", "type": "file", "path": "a.ts"},
                {"id": "file:a.ts", "label": "dup", "type": "file"},
                {"id": "x", "label": "x", "type": "module"},
                42
            ],
            "edges": [
                {"source": "file:a.ts", "target": "file:a.ts", "type": "imports"},
                {"source": "file:a.ts", "target": "file:gone.ts", "type": "imports"},
                {"source": "file:a.ts", "target": "file:a.ts", "type": "extends"}
            ]
        });
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        let loaded = load_graph(&path).await.unwrap().unwrap();
        assert_eq!(loaded.graph.node_count(), 1);
        assert_eq!(loaded.graph.edge_count(), 1);
        assert_eq!(loaded.quarantined, 5);
    }

    #[tokio::test]
    async fn non_object_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, b"\"not a graph\"").unwrap();
        assert!(matches!(
            load_graph(&path).await,
            Err(GraphError::InvalidSnapshot(_))
        ));
    }
}
