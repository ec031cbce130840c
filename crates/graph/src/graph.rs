use crate::types::{CodeGraph, EdgeType, GraphNode, NodeType};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Per-file relationship counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileConnectivity {
    pub imports: usize,
    pub imported_by: usize,
    pub calls: usize,
    pub called_by: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    pub edges_by_type: BTreeMap<EdgeType, usize>,
}

impl CodeGraph {
    /// Nodes with a `calls` edge into `id`
    pub fn callers_of(&self, id: &str) -> Vec<&GraphNode> {
        self.neighbors(id, EdgeType::Calls, Direction::Incoming)
    }

    /// Nodes `id` has a `calls` edge to
    pub fn callees_of(&self, id: &str) -> Vec<&GraphNode> {
        self.neighbors(id, EdgeType::Calls, Direction::Outgoing)
    }

    /// Files directly imported by the file `file_id`
    pub fn imports_of(&self, file_id: &str) -> Vec<&GraphNode> {
        self.neighbors(file_id, EdgeType::Imports, Direction::Outgoing)
    }

    /// Files directly importing the file `file_id`
    pub fn importers_of(&self, file_id: &str) -> Vec<&GraphNode> {
        self.neighbors(file_id, EdgeType::Imports, Direction::Incoming)
    }

    /// Symbols declared in the file `file_id`
    pub fn symbols_in(&self, file_id: &str) -> Vec<&GraphNode> {
        self.neighbors(file_id, EdgeType::Contains, Direction::Outgoing)
    }

    /// Breadth-first walk over `imports` edges. Returns each reachable file
    /// once with its distance; import cycles terminate on the visited set.
    pub fn transitive_imports(&self, file_id: &str, max_depth: usize) -> Vec<(&GraphNode, usize)> {
        let Some(&start) = self.index.get(file_id) else {
            return Vec::new();
        };

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbor_indices(current, EdgeType::Imports, Direction::Outgoing) {
                if visited.insert(next) {
                    result.push((&self.graph[next], depth + 1));
                    queue.push_back((next, depth + 1));
                }
            }
        }

        result
    }

    /// Relationship counters per file path, from one pass over all edges.
    /// Call edges count for the file owning each endpoint.
    pub fn file_connectivity(&self) -> HashMap<String, FileConnectivity> {
        let mut counters: HashMap<String, FileConnectivity> = HashMap::new();

        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()];
            let target = &self.graph[edge.target()];
            let (Some(source_path), Some(target_path)) = (&source.path, &target.path) else {
                continue;
            };

            match edge.weight() {
                EdgeType::Imports => {
                    counters.entry(source_path.clone()).or_default().imports += 1;
                    counters.entry(target_path.clone()).or_default().imported_by += 1;
                }
                EdgeType::Calls => {
                    counters.entry(source_path.clone()).or_default().calls += 1;
                    counters.entry(target_path.clone()).or_default().called_by += 1;
                }
                EdgeType::Contains => {}
            }
        }

        counters
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.node_count(),
            total_edges: self.edge_count(),
            ..GraphStats::default()
        };
        for node in self.graph.node_weights() {
            *stats.nodes_by_type.entry(node.node_type).or_default() += 1;
        }
        for edge_type in self.graph.edge_weights() {
            *stats.edges_by_type.entry(*edge_type).or_default() += 1;
        }
        stats
    }

    fn neighbors(&self, id: &str, edge_type: EdgeType, direction: Direction) -> Vec<&GraphNode> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        self.neighbor_indices(idx, edge_type, direction)
            .into_iter()
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Distinct neighbors in edge insertion order
    fn neighbor_indices(&self, idx: NodeIndex, edge_type: EdgeType, direction: Direction) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == edge_type)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);

        let mut seen = HashSet::new();
        edges
            .into_iter()
            .filter_map(|(_, other)| seen.insert(other).then_some(other))
            .collect()
    }
}
