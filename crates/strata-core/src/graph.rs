//! File-level dependency index over petgraph::StableDiGraph

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::model::{ANALYZER_VERSION, CodebaseGraph, DependencyEdge, FileNode};
use crate::{cycles, fingerprint, metrics};

/// Arena view of a graph: one vertex per file, one arc per distinct
/// `(source, target)` pair regardless of how many edge kinds connect them.
pub struct DependencyIndex {
    inner: StableDiGraph<PathBuf, ()>,
    by_path: HashMap<PathBuf, NodeIndex>,
}

impl std::fmt::Debug for DependencyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyIndex")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyIndex {
    pub fn new() -> Self {
        DependencyIndex {
            inner: StableDiGraph::new(),
            by_path: HashMap::new(),
        }
    }

    /// Build an index from nodes and edges. Nodes are inserted in the given
    /// order, which fixes the traversal order of [`DependencyIndex::files`].
    pub fn from_parts(nodes: &[FileNode], edges: &[DependencyEdge]) -> Self {
        let mut index = DependencyIndex::new();
        for node in nodes {
            index.add_file(&node.path);
        }
        for edge in edges {
            index.add_dependency(&edge.source, &edge.target);
        }
        index
    }

    /// Add a file vertex, returning the existing index if already present.
    pub fn add_file(&mut self, path: &Path) -> NodeIndex {
        if let Some(&idx) = self.by_path.get(path) {
            return idx;
        }
        let idx = self.inner.add_node(path.to_path_buf());
        self.by_path.insert(path.to_path_buf(), idx);
        idx
    }

    /// Record that `source` depends on `target`. Duplicate pairs collapse.
    pub fn add_dependency(&mut self, source: &Path, target: &Path) {
        let from = self.add_file(source);
        let to = self.add_file(target);
        if self.inner.find_edge(from, to).is_none() {
            self.inner.add_edge(from, to, ());
        }
    }

    pub fn index_of(&self, path: &Path) -> Option<NodeIndex> {
        self.by_path.get(path).copied()
    }

    pub fn path(&self, idx: NodeIndex) -> Option<&Path> {
        self.inner.node_weight(idx).map(PathBuf::as_path)
    }

    /// Vertices in insertion order.
    pub fn files(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }

    /// Direct successors of `idx` in insertion order of the arcs.
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        // petgraph yields outgoing arcs newest first
        out.reverse();
        out
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.inner.edges_directed(idx, Direction::Incoming).count()
    }

    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.inner.edges_directed(idx, Direction::Outgoing).count()
    }

    pub fn file_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Remove a file and every arc touching it.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        match self.by_path.remove(path) {
            Some(idx) => self.inner.remove_node(idx).is_some(),
            None => false,
        }
    }
}

impl Default for DependencyIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalize parts into a finished graph: sort nodes and edges, flag
/// circular edges, compute metrics and the graph hash.
///
/// Edges whose endpoints are not both present as nodes are dropped.
pub fn assemble(
    project_root: PathBuf,
    mut nodes: Vec<FileNode>,
    mut edges: Vec<DependencyEdge>,
) -> CodebaseGraph {
    nodes.sort_by(|a, b| a.path.cmp(&b.path));
    nodes.dedup_by(|a, b| a.path == b.path);

    let known: HashSet<&Path> = nodes.iter().map(|n| n.path.as_path()).collect();
    edges.retain(|e| known.contains(e.source.as_path()) && known.contains(e.target.as_path()));
    edges.sort_by(|a, b| {
        (&a.source, &a.target, a.kind).cmp(&(&b.source, &b.target, b.kind))
    });

    let index = DependencyIndex::from_parts(&nodes, &edges);
    let circular = cycles::mark_circular(&mut edges, &index);
    let metrics = metrics::compute(&nodes, &edges);
    let graph_hash = fingerprint::graph_hash(&nodes, &edges, &project_root);

    tracing::debug!(
        "Assembled graph: {} files, {} dependencies, {} circular",
        nodes.len(),
        edges.len(),
        circular
    );

    CodebaseGraph {
        project_root,
        nodes,
        edges,
        metrics,
        graph_hash,
        analyzed_at: Utc::now(),
        analyzer_version: ANALYZER_VERSION.to_string(),
    }
}
