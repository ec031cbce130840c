use async_trait::async_trait;
use context_graph::{CodeGraph, MemorySourceReader};
use context_search::{extract_file_path, CodeEngine, EngineConfig, HybridRetriever};
use context_vector_store::{Embedder, HashEmbedder, VectorIndex, VectorRecord, VectorStoreError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

const DIMENSION: usize = 32;

fn project() -> MemorySourceReader {
    MemorySourceReader::new()
        .with_file(
            "src/core.ts",
            "export function helper() { return 42; }\n\nexport class Store {\n  get() { return helper(); }\n}\n",
        )
        .with_file("src/a.ts", "import { helper } from './core';\n\nexport function main() { helper(); }\n")
        .with_file("src/b.ts", "import { Store } from './core';\n\nexport const store = new Store();\n")
}

fn files() -> Vec<String> {
    ["src/core.ts", "src/a.ts", "src/b.ts"].iter().map(ToString::to_string).collect()
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.embedding.dimension = DIMENSION;
    config
}

fn engine(dir: &TempDir) -> CodeEngine {
    CodeEngine::with_parts(dir.path(), config(), Arc::new(project()), None).unwrap()
}

struct OfflineProvider;

#[async_trait]
impl Embedder for OfflineProvider {
    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_id(&self) -> &str {
        "offline"
    }

    async fn embed(&self, _texts: &[String]) -> context_vector_store::Result<Vec<Vec<f32>>> {
        Err(VectorStoreError::EmbeddingError("connection refused".into()))
    }
}

#[tokio::test]
async fn empty_graph_falls_back_to_vector_ranking() {
    let embedder = HashEmbedder::new(DIMENSION);
    let mut index = VectorIndex::new();
    for i in 0..12 {
        let text = format!("File: src/f{i}.ts\nexport function f{i}() {{}}");
        index
            .upsert(VectorRecord::new(format!("f{i}"), text.clone(), embedder.embed_one(&text)))
            .unwrap();
    }

    let expected: Vec<String> = index
        .query(&embedder.embed_one("export function"), 4)
        .unwrap()
        .into_iter()
        .map(|r| r.record.id)
        .collect();

    let mut retriever = HybridRetriever::new(Arc::new(embedder), index);
    let without_graph: Vec<String> = retriever
        .search("export function", 4)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.record.id)
        .collect();
    assert_eq!(without_graph, expected);

    retriever.set_graph(Some(Arc::new(CodeGraph::new())));
    let hits = retriever.search("export function", 4).await.unwrap();
    assert_eq!(hits.iter().map(|h| h.record.id.clone()).collect::<Vec<_>>(), expected);
    assert!(hits.iter().all(|h| h.multiplier == 1.0));
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let dir = TempDir::new().unwrap();
    let engine = engine(&dir);
    assert!(engine.search("   ", 5).await.is_err());
}

#[tokio::test]
async fn index_then_search_attributes_files() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);

    let built = engine.build_complete_graph(&files()).await.unwrap();
    assert_eq!(built.report.files_indexed, 3);
    let report = engine.index_files(&files()).await.unwrap();
    assert_eq!(report.files_indexed, 3);
    assert!(report.chunks_indexed >= 3);

    let hits = engine.search("helper", 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    for hit in &hits {
        let path = hit.file_path.as_deref().expect("chunk names its file");
        assert!(files().iter().any(|f| f == path), "unexpected file {path}");
        assert!(hit.multiplier >= 1.0);
    }
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn chunk_headers_are_readable_by_retriever() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.index_files(&files()).await.unwrap();

    for record in engine.retriever().index().records() {
        let expected = record.metadata["file_path"].as_str().unwrap();
        assert_eq!(extract_file_path(&record.text).as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn rebuild_invalidates_graph_queries() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine(&dir);
    engine.build_complete_graph(&files()).await.unwrap();

    let importers: Vec<String> = engine
        .importers_of("file:src/core.ts")
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(importers, vec!["file:src/a.ts", "file:src/b.ts"]);
    assert_eq!(engine.query_cache().len(), 1);

    // served from cache
    assert_eq!(engine.importers_of("file:src/core.ts").unwrap().len(), 2);
    assert_eq!(engine.query_cache().stats().hits, 1);

    engine
        .build_complete_graph(&["src/core.ts".to_string(), "src/a.ts".to_string()])
        .await
        .unwrap();
    assert!(engine.query_cache().is_empty());
    assert_eq!(engine.importers_of("file:src/core.ts").unwrap().len(), 1);
}

#[tokio::test]
async fn provider_outage_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut engine = CodeEngine::with_parts(
        dir.path(),
        config(),
        Arc::new(project()),
        Some(Arc::new(OfflineProvider)),
    )
    .unwrap();

    let report = engine.index_files(&files()).await.unwrap();
    assert_eq!(report.fallback_batches, 3);
    assert!(!engine.search("store", 2).await.unwrap().is_empty());
}

#[tokio::test]
async fn persisted_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let mut first = engine(&dir);
    first.build_complete_graph(&files()).await.unwrap();
    let report = first.index_files(&files()).await.unwrap();
    first.save_index().await.unwrap();
    first.persist_caches().unwrap();

    let mut second = engine(&dir);
    let state = second.load_persisted_state().await.unwrap();
    assert!(state.graph_loaded);
    assert_eq!(state.vectors_loaded, report.chunks_indexed);
    assert_eq!(state.embeddings_loaded, first.embedder().with_cache(|c| c.len()).unwrap());

    let before = first.search("helper", 3).await.unwrap();
    let after = second.search("helper", 3).await.unwrap();
    assert_eq!(
        before.iter().map(|h| &h.record.id).collect::<Vec<_>>(),
        after.iter().map(|h| &h.record.id).collect::<Vec<_>>()
    );
}
