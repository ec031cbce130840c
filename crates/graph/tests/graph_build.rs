use context_graph::{
    CodeGraph, EdgeType, FsSourceReader, GraphBuilder, GraphEdge, MemorySourceReader, NodeType,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn fixture() -> MemorySourceReader {
    MemorySourceReader::new()
        .with_file("a.ts", "import { helper } from './b';\n\nfunction main() { helper(); }\n")
        .with_file("b.ts", "export function helper() { return 42; }\n")
}

async fn build(reader: MemorySourceReader, files: &[&str]) -> Arc<CodeGraph> {
    let files: Vec<String> = files.iter().map(ToString::to_string).collect();
    GraphBuilder::new(Arc::new(reader))
        .build_complete_graph(&files)
        .await
        .expect("build succeeds")
        .graph
}

fn edge(source: &str, target: &str, edge_type: EdgeType) -> GraphEdge {
    GraphEdge {
        source: source.to_string(),
        target: target.to_string(),
        edge_type,
    }
}

#[tokio::test]
async fn import_resolution_example() {
    let graph = build(fixture(), &["a.ts", "b.ts"]).await;

    let ids: HashSet<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
    assert_eq!(
        ids,
        HashSet::from(["file:a.ts", "file:b.ts", "function:a.ts:main", "function:b.ts:helper"])
    );

    let edges: HashSet<GraphEdge> = graph.edges().collect();
    assert!(edges.contains(&edge("file:a.ts", "file:b.ts", EdgeType::Imports)));
    assert!(edges.contains(&edge("file:a.ts", "function:a.ts:main", EdgeType::Contains)));
    assert!(edges.contains(&edge("file:b.ts", "function:b.ts:helper", EdgeType::Contains)));
}

#[tokio::test]
async fn calls_do_not_cross_files() {
    let graph = build(fixture(), &["a.ts", "b.ts"]).await;

    assert!(graph.callees_of("function:a.ts:main").is_empty());
    assert!(graph.callers_of("function:b.ts:helper").is_empty());
    assert_eq!(graph.edges().filter(|e| e.edge_type == EdgeType::Calls).count(), 0);
}

#[tokio::test]
async fn ids_are_unique_and_edges_never_dangle() {
    let reader = fixture()
        .with_file("c.ts", "function f() {}\nfunction f() {}\nf();\n")
        .with_file("d.ts", "import x from './nowhere';\nimport React from 'react';\nx();\n");
    let graph = build(reader, &["a.ts", "b.ts", "c.ts", "d.ts"]).await;

    let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());

    for e in graph.edges() {
        assert!(graph.contains(&e.source), "dangling source {}", e.source);
        assert!(graph.contains(&e.target), "dangling target {}", e.target);
    }
    assert!(graph.imports_of("file:d.ts").is_empty());
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let reader = fixture();
    let mut builder = GraphBuilder::new(Arc::new(reader));
    let files = vec!["a.ts".to_string(), "b.ts".to_string()];

    let first = builder.build_complete_graph(&files).await.unwrap().graph;
    let reversed: Vec<String> = files.iter().rev().cloned().collect();
    let second = builder.build_complete_graph(&reversed).await.unwrap().graph;

    let node_ids = |g: &CodeGraph| g.nodes().map(|n| n.id.clone()).collect::<HashSet<_>>();
    let edge_set = |g: &CodeGraph| g.edges().collect::<HashSet<_>>();
    assert_eq!(node_ids(&*first), node_ids(&*second));
    assert_eq!(edge_set(&*first), edge_set(&*second));
}

#[tokio::test]
async fn import_cycle_counts() {
    let reader = MemorySourceReader::new()
        .with_file("a.ts", "import './b';\nexport const a = 1;\n")
        .with_file("b.ts", "import './c';\nexport const b = 2;\n")
        .with_file("c.ts", "import './a';\nexport const c = 3;\n");
    let graph = build(reader, &["a.ts", "b.ts", "c.ts"]).await;

    let connectivity = graph.file_connectivity();
    for path in ["a.ts", "b.ts", "c.ts"] {
        let c = connectivity[path];
        assert_eq!((c.imports, c.imported_by), (1, 1), "{path}");
    }
    assert_eq!(graph.transitive_imports("file:a.ts", 8).len(), 2);
}

#[tokio::test]
async fn index_files_resolve_through_directories() {
    let reader = MemorySourceReader::new()
        .with_file("src/app.ts", "import { util } from './lib';\nimport { x } from '../shared/x';\n")
        .with_file("src/lib/index.ts", "export function util() {}\n")
        .with_file("shared/x.tsx", "export const x = 1;\n");
    let graph = build(reader, &["src/app.ts", "src/lib/index.ts", "shared/x.tsx"]).await;

    let imported: Vec<&str> = graph
        .imports_of("file:src/app.ts")
        .into_iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(imported, vec!["file:src/lib/index.ts", "file:shared/x.tsx"]);
}

#[tokio::test]
async fn filesystem_build_persists_and_reloads() {
    let project = TempDir::new().unwrap();
    std::fs::create_dir_all(project.path().join("src")).unwrap();
    std::fs::write(project.path().join("src/a.ts"), "import './b';\nexport class A {}\n").unwrap();
    std::fs::write(project.path().join("src/b.ts"), "export type B = number;\n").unwrap();
    let snapshot = project.path().join(".context/graph.json");

    let reader = Arc::new(FsSourceReader::new(project.path()));
    let mut builder = GraphBuilder::new(reader.clone()).with_snapshot_path(&snapshot);
    let built = builder
        .build_complete_graph(&["src/a.ts".to_string(), "src/b.ts".to_string()])
        .await
        .unwrap();
    assert!(built.report.snapshot_written);

    let mut fresh = GraphBuilder::new(reader).with_snapshot_path(&snapshot);
    let loaded = fresh.load_graph().await.unwrap().expect("snapshot exists");
    assert_eq!(loaded.node_count(), built.graph.node_count());
    assert_eq!(loaded.edge_count(), built.graph.edge_count());
    assert_eq!(loaded.stats().nodes_by_type.get(&NodeType::Type), Some(&1));
}
