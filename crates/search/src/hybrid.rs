use crate::error::{Result, SearchError};
use crate::file_hint::extract_file_path;
use context_graph::{CodeGraph, GraphNode, GraphStats};
use context_vector_store::{Embedder, VectorIndex, VectorRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Candidates fetched per requested result
pub const CANDIDATE_MULTIPLIER: usize = 3;

/// Boost for files imported by more than [`CENTRAL_IMPORTED_BY`] files
pub const CENTRAL_BOOST: f32 = 0.3;
pub const CENTRAL_IMPORTED_BY: usize = 2;

/// Boost for files importing more than [`INTEGRATION_IMPORTS`] files
pub const INTEGRATION_BOOST: f32 = 0.2;
pub const INTEGRATION_IMPORTS: usize = 3;

/// Boost per other candidate in a directly import-connected file
pub const RELATED_BOOST: f32 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub record: VectorRecord,

    /// Final ranking score
    pub score: f32,

    /// Raw cosine similarity to the query
    pub similarity: f32,

    /// Graph multiplier applied to the rank score (1.0 = unboosted)
    pub multiplier: f32,

    /// File the hit was attributed to, when its text names one
    pub file_path: Option<String>,
}

/// Vector search re-ranked with import-graph structure
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
    graph: Option<Arc<CodeGraph>>,
}

impl HybridRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: VectorIndex) -> Self {
        Self {
            embedder,
            index,
            graph: None,
        }
    }

    pub fn set_graph(&mut self, graph: Option<Arc<CodeGraph>>) {
        self.graph = graph;
    }

    pub fn graph(&self) -> Option<Arc<CodeGraph>> {
        self.graph.clone()
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut VectorIndex {
        &mut self.index
    }

    pub fn set_index(&mut self, index: VectorIndex) {
        self.index = index;
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if limit == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        log::debug!("Hybrid search: query='{query}', limit={limit}");

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Other("Embedder returned no vector for the query".into()))?;

        let candidates = self
            .index
            .query(&query_vector, limit.saturating_mul(CANDIDATE_MULTIPLIER))?;

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .enumerate()
            .map(|(rank, candidate)| SearchHit {
                file_path: extract_file_path(&candidate.record.text),
                score: 1.0 / (rank as f32 + 1.0),
                similarity: candidate.score,
                multiplier: 1.0,
                record: candidate.record,
            })
            .collect();

        match self.graph.as_deref() {
            Some(graph) if !graph.is_empty() => apply_graph_boosts(&mut hits, graph),
            _ => log::debug!("No graph available, returning vector ranking"),
        }

        hits.truncate(limit);
        Ok(hits)
    }

    /// `None` when no graph is attached
    pub fn graph_stats(&self) -> Option<GraphStats> {
        self.graph.as_ref().map(|graph| graph.stats())
    }
}

/// Multiply each hit's score by its graph boosts and re-sort (stable).
/// Hits without a known file keep their score.
pub fn apply_graph_boosts(hits: &mut [SearchHit], graph: &CodeGraph) {
    let multipliers = graph_multipliers(hits, graph);
    for (hit, multiplier) in hits.iter_mut().zip(multipliers) {
        hit.multiplier = multiplier;
        hit.score *= multiplier;
    }
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
}

fn graph_multipliers(hits: &[SearchHit], graph: &CodeGraph) -> Vec<f32> {
    let connectivity = graph.file_connectivity();

    let candidate_files: HashSet<&str> = hits
        .iter()
        .filter_map(|h| h.file_path.as_deref())
        .filter(|path| graph.contains(&GraphNode::file_id(path)))
        .collect();

    let import_neighbors: HashMap<&str, HashSet<&str>> = candidate_files
        .iter()
        .map(|&path| {
            let id = GraphNode::file_id(path);
            let neighbors = graph
                .imports_of(&id)
                .into_iter()
                .chain(graph.importers_of(&id))
                .filter_map(|node| node.path.as_deref())
                .collect();
            (path, neighbors)
        })
        .collect();

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let Some(path) = hit.file_path.as_deref() else {
                return 1.0;
            };
            let Some(neighbors) = import_neighbors.get(path) else {
                return 1.0;
            };

            let counters = connectivity.get(path).copied().unwrap_or_default();
            let mut multiplier = 1.0;
            if counters.imported_by > CENTRAL_IMPORTED_BY {
                multiplier += CENTRAL_BOOST;
            }
            if counters.imports > INTEGRATION_IMPORTS {
                multiplier += INTEGRATION_BOOST;
            }

            let related = hits
                .iter()
                .enumerate()
                .filter(|&(j, other)| {
                    j != i
                        && other
                            .file_path
                            .as_deref()
                            .is_some_and(|p| neighbors.contains(p))
                })
                .count();
            multiplier + RELATED_BOOST * related as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_graph::EdgeType;
    use context_vector_store::HashEmbedder;
    use pretty_assertions::assert_eq;

    fn hit(id: &str, file: Option<&str>, rank: usize) -> SearchHit {
        SearchHit {
            record: VectorRecord::new(id, "", vec![1.0]),
            score: 1.0 / (rank as f32 + 1.0),
            similarity: 0.0,
            multiplier: 1.0,
            file_path: file.map(ToString::to_string),
        }
    }

    fn graph(files: &[&str], imports: &[(&str, &str)]) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for file in files {
            graph.add_node(GraphNode::file(file));
        }
        for (from, to) in imports {
            graph.add_edge(&GraphNode::file_id(from), &GraphNode::file_id(to), EdgeType::Imports);
        }
        graph
    }

    fn order(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.record.id.as_str()).collect()
    }

    #[test]
    fn central_dependency_boost() {
        let graph = graph(
            &["core.ts", "a.ts", "b.ts", "c.ts", "other.ts"],
            &[("a.ts", "core.ts"), ("b.ts", "core.ts"), ("c.ts", "core.ts")],
        );
        let mut hits = vec![hit("other", Some("other.ts"), 0), hit("core", Some("core.ts"), 1)];
        apply_graph_boosts(&mut hits, &graph);

        assert_eq!(hits[1].record.id, "core");
        assert!((hits[1].multiplier - 1.3).abs() < 1e-6);
        assert!((hits[1].score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn integration_point_boost() {
        let graph = graph(
            &["app.ts", "a.ts", "b.ts", "c.ts", "d.ts"],
            &[("app.ts", "a.ts"), ("app.ts", "b.ts"), ("app.ts", "c.ts"), ("app.ts", "d.ts")],
        );
        let mut hits = vec![hit("app", Some("app.ts"), 0)];
        apply_graph_boosts(&mut hits, &graph);
        assert!((hits[0].multiplier - 1.2).abs() < 1e-6);
    }

    #[test]
    fn related_candidates_lift_each_other() {
        let graph = graph(&["a.ts", "b.ts", "c.ts"], &[("a.ts", "b.ts")]);
        let mut hits = vec![
            hit("c", Some("c.ts"), 0),
            hit("a", Some("a.ts"), 1),
            hit("b", Some("b.ts"), 2),
        ];
        apply_graph_boosts(&mut hits, &graph);

        // a: 0.5 * 1.4 = 0.7, b: 0.333 * 1.4 = 0.467, c: 1.0
        assert_eq!(order(&hits), vec!["c", "a", "b"]);
        assert!((hits[1].multiplier - 1.4).abs() < 1e-6);
        assert!((hits[0].multiplier - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_files_are_left_alone() {
        let graph = graph(&["a.ts"], &[]);
        let mut hits = vec![hit("x", None, 0), hit("y", Some("missing.ts"), 1)];
        apply_graph_boosts(&mut hits, &graph);
        assert_eq!(order(&hits), vec!["x", "y"]);
        assert!(hits.iter().all(|h| h.multiplier == 1.0));
    }

    #[test]
    fn import_cycle_keeps_order() {
        let graph = graph(
            &["a.ts", "b.ts", "c.ts"],
            &[("a.ts", "b.ts"), ("b.ts", "c.ts"), ("c.ts", "a.ts")],
        );
        let mut hits = vec![
            hit("a", Some("a.ts"), 0),
            hit("b", Some("b.ts"), 1),
            hit("c", Some("c.ts"), 2),
        ];
        apply_graph_boosts(&mut hits, &graph);

        assert_eq!(order(&hits), vec!["a", "b", "c"]);
        let multipliers: Vec<f32> = hits.iter().map(|h| h.multiplier).collect();
        assert!(multipliers.iter().all(|m| (m - multipliers[0]).abs() < 1e-6));
    }

    #[tokio::test]
    async fn search_over_import_cycle_matches_vector_ranking() {
        let embedder = HashEmbedder::new(16);
        let mut index = VectorIndex::with_dimension(16);
        for (id, text) in [
            ("a", "File: a.ts\nexport function parse() {}"),
            ("b", "File: b.ts\nexport function render() {}"),
            ("c", "File: c.ts\nexport function store() {}"),
        ] {
            index.upsert(VectorRecord::new(id, text, embedder.embed_one(text))).unwrap();
        }

        let query = "parse the input";
        let expected: Vec<String> = index
            .query(&embedder.embed_one(query), 3)
            .unwrap()
            .into_iter()
            .map(|scored| scored.record.id)
            .collect();

        let mut retriever = HybridRetriever::new(Arc::new(embedder), index);
        retriever.set_graph(Some(Arc::new(graph(
            &["a.ts", "b.ts", "c.ts"],
            &[("a.ts", "b.ts"), ("b.ts", "c.ts"), ("c.ts", "a.ts")],
        ))));
        let hits = retriever.search(query, 3).await.unwrap();

        assert_eq!(order(&hits), expected.iter().map(String::as_str).collect::<Vec<_>>());
        // Every file has both cycle neighbours among the candidates
        assert!(hits.iter().all(|h| (h.multiplier - 1.8).abs() < 1e-6));
    }
}
