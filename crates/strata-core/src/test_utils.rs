//! Test utilities for building graphs by hand

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::model::*;

/// A Python source node under `root` with a content hash derived from its
/// name.
pub fn file_node(root: &Path, relative: &str) -> FileNode {
    let path = root.join(relative);
    FileNode {
        language: Language::from_path(&path),
        role: FileRole::classify(Path::new(relative)),
        relative_path: relative.to_string(),
        line_count: 1,
        fingerprint: format!("fp-{relative}"),
        content_hash: crate::fingerprint::content_hash(relative.as_bytes()),
        last_modified: Utc::now(),
        imports: Vec::new(),
        exports: Vec::new(),
        path,
    }
}

/// A static import edge between two files under `root`.
pub fn import_edge(root: &Path, from: &str, to: &str) -> DependencyEdge {
    let mut edge = DependencyEdge::new(root.join(from), root.join(to), DependencyKind::StaticImport);
    edge.is_runtime = true;
    edge
}

/// Assemble a graph from relative file names and `(from, to)` imports.
pub fn graph_of(files: &[&str], imports: &[(&str, &str)]) -> CodebaseGraph {
    let root = PathBuf::from("/project");
    let nodes = files.iter().map(|f| file_node(&root, f)).collect();
    let edges = imports
        .iter()
        .map(|(a, b)| import_edge(&root, a, b))
        .collect();
    crate::graph::assemble(root, nodes, edges)
}
