//! Graph-wide metrics

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::model::{DependencyEdge, FileNode, GraphMetrics};

/// Share of files (by coupling rank) that sit below the critical threshold.
const CRITICAL_PERCENTILE: f64 = 0.8;

/// Compute metrics for a graph. Every node gets a coupling entry, zero
/// included. `edges` are counted per edge record, so two kinds between the
/// same pair contribute twice.
pub fn compute(nodes: &[FileNode], edges: &[DependencyEdge]) -> GraphMetrics {
    let mut coupling: BTreeMap<PathBuf, usize> =
        nodes.iter().map(|n| (n.path.clone(), 0)).collect();
    let mut connected: HashSet<&Path> = HashSet::new();

    for edge in edges {
        if let Some(c) = coupling.get_mut(&edge.source) {
            *c += 1;
        }
        if let Some(c) = coupling.get_mut(&edge.target) {
            *c += 1;
        }
        connected.insert(edge.source.as_path());
        connected.insert(edge.target.as_path());
    }

    let orphan_files = nodes
        .iter()
        .filter(|n| !connected.contains(n.path.as_path()))
        .count();

    let average_coupling = if coupling.is_empty() {
        0.0
    } else {
        coupling.values().sum::<usize>() as f64 / coupling.len() as f64
    };

    let critical_files = critical_files(&coupling);

    let mut language_distribution = BTreeMap::new();
    for node in nodes {
        *language_distribution.entry(node.language).or_insert(0) += 1;
    }

    GraphMetrics {
        total_files: nodes.len(),
        total_dependencies: edges.len(),
        circular_dependencies: edges.iter().filter(|e| e.is_circular).count(),
        orphan_files,
        highly_coupled_files: critical_files.len(),
        critical_files,
        coupling,
        average_coupling,
        language_distribution,
    }
}

/// Files whose coupling is at or above the 80th percentile value, in path
/// order. Graphs with a single file have no critical files, and files with
/// zero coupling never qualify.
fn critical_files(coupling: &BTreeMap<PathBuf, usize>) -> Vec<PathBuf> {
    let n = coupling.len();
    if n <= 1 {
        return Vec::new();
    }

    let mut sorted: Vec<usize> = coupling.values().copied().collect();
    sorted.sort_unstable();
    let rank = ((n as f64) * CRITICAL_PERCENTILE).floor() as usize;
    let threshold = sorted[rank.min(n - 1)];

    coupling
        .iter()
        .filter(|&(_, &c)| c > 0 && c >= threshold)
        .map(|(p, _)| p.clone())
        .collect()
}
