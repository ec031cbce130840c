use crate::config::EngineConfig;
use crate::error::Result;
use crate::hybrid::{HybridRetriever, SearchHit};
use context_cache::{EmbeddingCache, GraphQueryCache, SystemClock};
use context_code_chunker::{Chunker, ChunkerError};
use context_graph::{
    normalize_path, BuiltGraph, CodeGraph, FsSourceReader, GraphBuilder, GraphNode, GraphStats,
    SkipReason, SkippedFile, SourceReader,
};
use context_vector_store::{Embedder, ResilientEmbedder, VectorIndex, VectorRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of [`CodeEngine::index_files`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub files_indexed: usize,
    pub chunks_indexed: usize,
    pub skipped: Vec<SkippedFile>,

    /// Embedding batches answered by the fallback embedder
    pub fallback_batches: usize,
}

/// What [`CodeEngine::load_persisted_state`] found on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistedState {
    pub graph_loaded: bool,
    pub vectors_loaded: usize,
    pub embeddings_loaded: usize,
}

/// One project: its graph, vector index and caches
pub struct CodeEngine {
    root: PathBuf,
    config: EngineConfig,
    reader: Arc<dyn SourceReader>,
    builder: GraphBuilder,
    chunker: Chunker,
    embedder: Arc<ResilientEmbedder>,
    retriever: HybridRetriever,
    query_cache: GraphQueryCache<Vec<GraphNode>>,
}

impl CodeEngine {
    /// Files are read from disk under `root`; embeddings come from the hash embedder
    pub fn new(root: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        let root = root.into();
        let reader = Arc::new(FsSourceReader::new(root.clone()));
        Self::with_parts(root, config, reader, None)
    }

    pub fn with_parts(
        root: impl Into<PathBuf>,
        config: EngineConfig,
        reader: Arc<dyn SourceReader>,
        provider: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        let root = root.into();
        let chunker = Chunker::new(config.chunker.clone())?;

        let cache = EmbeddingCache::new(config.embedding.cache_capacity, config.embedding_cache_ttl());
        let embedder = Arc::new(match provider {
            Some(provider) => ResilientEmbedder::new(Some(provider), cache),
            None => ResilientEmbedder::hash_only(config.embedding.dimension, cache),
        });
        let retriever = HybridRetriever::new(
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            VectorIndex::with_dimension(embedder.dimension()),
        );

        let builder =
            GraphBuilder::new(Arc::clone(&reader)).with_snapshot_path(config.graph_snapshot_path(&root));
        let query_cache = GraphQueryCache::new(config.query_cache.capacity, config.query_cache_ttl());

        Ok(Self {
            root,
            config,
            reader,
            builder,
            chunker,
            embedder,
            retriever,
            query_cache,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embedder(&self) -> &ResilientEmbedder {
        &self.embedder
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub fn graph(&self) -> Option<Arc<CodeGraph>> {
        self.retriever.graph()
    }

    /// Rebuild the graph from scratch, attach it to the retriever and drop
    /// every cached graph query.
    pub async fn build_complete_graph(&mut self, files: &[String]) -> Result<BuiltGraph> {
        let built = self.builder.build_complete_graph(files).await?;
        self.retriever.set_graph(Some(Arc::clone(&built.graph)));

        self.query_cache.invalidate_all();
        Ok(built)
    }

    /// Chunk, embed and upsert `files`. Re-indexing a file replaces all of
    /// its previous chunks.
    pub async fn index_files(&mut self, files: &[String]) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        let fallback_before = self.embedder.fallback_batches();

        for raw in files {
            let path = normalize_path(raw);
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

            let chunks = match self.chunker.chunk_str(&source, &path) {
                Ok(chunks) => chunks,
                // Whitespace only: indexed, with nothing to embed
                Err(ChunkerError::EmptyContent) => Vec::new(),
                Err(e) => {
                    skip(&mut report, path, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };

            let index = self.retriever.index_mut();
            let removed = index.remove_prefix(&format!("{path}:"));
            if removed > 0 {
                log::debug!("Replacing {removed} chunks of {path}");
            }
            if chunks.is_empty() {
                report.files_indexed += 1;
                continue;
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            let records: Vec<VectorRecord> = chunks
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
                .collect();

            report.chunks_indexed += records.len();
            report.files_indexed += 1;
            self.retriever.index_mut().upsert_many(records)?;
        }

        report.fallback_batches = self.embedder.fallback_batches() - fallback_before;
        log::info!(
            "Indexed {} chunks from {} files ({} skipped)",
            report.chunks_indexed,
            report.files_indexed,
            report.skipped.len()
        );
        Ok(report)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.retriever.search(query, limit).await
    }

    pub fn graph_stats(&self) -> Option<GraphStats> {
        self.retriever.graph_stats()
    }

    pub fn callers_of(&mut self, id: &str) -> Result<Vec<GraphNode>> {
        self.cached_query("callers", id, CodeGraph::callers_of)
    }

    pub fn callees_of(&mut self, id: &str) -> Result<Vec<GraphNode>> {
        self.cached_query("callees", id, CodeGraph::callees_of)
    }

    pub fn imports_of(&mut self, file_id: &str) -> Result<Vec<GraphNode>> {
        self.cached_query("imports", file_id, CodeGraph::imports_of)
    }

    pub fn importers_of(&mut self, file_id: &str) -> Result<Vec<GraphNode>> {
        self.cached_query("importers", file_id, CodeGraph::importers_of)
    }

    pub fn query_cache(&self) -> &GraphQueryCache<Vec<GraphNode>> {
        &self.query_cache
    }

    fn cached_query<F>(&mut self, query_type: &str, id: &str, run: F) -> Result<Vec<GraphNode>>
    where
        F: for<'g> Fn(&'g CodeGraph, &str) -> Vec<&'g GraphNode>,
    {
        let Some(graph) = self.retriever.graph() else {
            return Ok(Vec::new());
        };
        if let Some(cached) = self.query_cache.get(query_type, id) {
            return Ok(cached);
        }

        let nodes: Vec<GraphNode> = run(&*graph, id).into_iter().cloned().collect();
        self.query_cache.set(query_type, id, nodes.clone())?;
        Ok(nodes)
    }

    /// Warm start from the state directory. Anything missing or unreadable
    /// is logged and left empty.
    pub async fn load_persisted_state(&mut self) -> Result<PersistedState> {
        let mut state = PersistedState::default();

        match self.builder.load_graph().await {
            Ok(Some(graph)) => {
                self.retriever.set_graph(Some(graph));
                self.query_cache.invalidate_all();
                state.graph_loaded = true;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring graph snapshot: {e}"),
        }

        let vectors_path = self.config.vector_index_path(&self.root);
        match VectorIndex::load(&vectors_path).await {
            Ok(Some(index)) if index.dimension().map_or(true, |d| d == self.embedder.dimension()) => {
                state.vectors_loaded = index.len();
                self.retriever.set_index(index);
            }
            Ok(Some(index)) => log::warn!(
                "Ignoring vector index {}: dimension {:?} does not match embedder dimension {}",
                vectors_path.display(),
                index.dimension(),
                self.embedder.dimension()
            ),
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring vector index {}: {e}", vectors_path.display()),
        }

        state.embeddings_loaded = self.load_embedding_cache()?;

        log::debug!("Loaded persisted state: {state:?}");
        Ok(state)
    }

    /// Replace the embedding cache with its snapshot; returns the entries kept
    pub fn load_embedding_cache(&self) -> Result<usize> {
        let cache = EmbeddingCache::load_snapshot(
            &self.config.embedding_cache_path(&self.root),
            self.config.embedding.cache_capacity,
            self.config.embedding_cache_ttl(),
            Arc::new(SystemClock),
        );
        let loaded = cache.len();
        self.embedder.with_cache(|current| *current = cache)?;
        Ok(loaded)
    }

    pub async fn save_index(&self) -> Result<()> {
        let path = self.config.vector_index_path(&self.root);
        self.retriever.index().save(&path).await?;
        Ok(())
    }

    /// Write the embedding cache snapshot
    pub fn persist_caches(&self) -> Result<()> {
        let path = self.config.embedding_cache_path(&self.root);
        self.embedder.with_cache(|cache| cache.save_snapshot(&path))??;
        Ok(())
    }
}

fn skip(report: &mut IndexReport, path: String, reason: SkipReason) {
    log::warn!("Not indexing {path}: {reason:?}");
    report.skipped.push(SkippedFile { path, reason });
}
