//! Circular dependency detection

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use petgraph::stable_graph::NodeIndex;

use crate::graph::DependencyIndex;
use crate::model::DependencyEdge;

/// Every `(from, to)` pair that lies on a dependency cycle found by a
/// depth-first walk of `index`.
///
/// Roots are visited in vertex order, so for a fixed insertion order the
/// result is deterministic. Self-imports count as a one-element cycle.
pub fn find_cycle_pairs(index: &DependencyIndex) -> BTreeSet<(PathBuf, PathBuf)> {
    let mut pairs: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut on_stack: HashSet<NodeIndex> = HashSet::new();

    for root in index.files() {
        if visited.contains(&root) {
            continue;
        }

        // (vertex, successors, next successor to try)
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
        let mut path: Vec<NodeIndex> = Vec::new();

        visited.insert(root);
        on_stack.insert(root);
        path.push(root);
        stack.push((root, index.successors(root), 0));

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.2 >= frame.1.len() {
                on_stack.remove(&node);
                path.pop();
                stack.pop();
                continue;
            }

            let neighbor = frame.1[frame.2];
            frame.2 += 1;

            if on_stack.contains(&neighbor) {
                if let Some(pos) = path.iter().position(|&n| n == neighbor) {
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(neighbor);
                    for window in cycle.windows(2) {
                        pairs.insert((window[0], window[1]));
                    }
                }
            } else if visited.insert(neighbor) {
                on_stack.insert(neighbor);
                path.push(neighbor);
                stack.push((neighbor, index.successors(neighbor), 0));
            }
        }
    }

    pairs
        .into_iter()
        .filter_map(|(from, to)| {
            let from = index.path(from)?.to_path_buf();
            let to = index.path(to)?.to_path_buf();
            Some((from, to))
        })
        .collect()
}

/// Recompute `is_circular` on every edge. Returns the number of circular
/// edges.
pub fn mark_circular(edges: &mut [DependencyEdge], index: &DependencyIndex) -> usize {
    let pairs = find_cycle_pairs(index);
    let mut count = 0;
    for edge in edges.iter_mut() {
        edge.is_circular = pairs.contains(&(edge.source.clone(), edge.target.clone()));
        if edge.is_circular {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn index(arcs: &[(&str, &str)]) -> DependencyIndex {
        let mut index = DependencyIndex::new();
        for (from, to) in arcs {
            index.add_dependency(Path::new(from), Path::new(to));
        }
        index
    }

    fn pair(a: &str, b: &str) -> (PathBuf, PathBuf) {
        (PathBuf::from(a), PathBuf::from(b))
    }

    #[test]
    fn triangle_is_fully_circular() {
        let pairs = find_cycle_pairs(&index(&[("a", "b"), ("b", "c"), ("c", "a")]));
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&pair("c", "a")));
    }

    #[test]
    fn chain_has_no_cycles() {
        assert!(find_cycle_pairs(&index(&[("a", "b"), ("b", "c")])).is_empty());
    }

    #[test]
    fn tail_into_cycle_is_not_circular() {
        let pairs = find_cycle_pairs(&index(&[("a", "b"), ("b", "c"), ("c", "b")]));
        assert_eq!(pairs.len(), 2);
        assert!(!pairs.contains(&pair("a", "b")));
    }

    #[test]
    fn self_import_is_a_cycle() {
        let pairs = find_cycle_pairs(&index(&[("a", "a")]));
        assert!(pairs.contains(&pair("a", "a")));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("f{i}")).collect();
        let mut idx = DependencyIndex::new();
        for w in names.windows(2) {
            idx.add_dependency(Path::new(&w[0]), Path::new(&w[1]));
        }
        assert!(find_cycle_pairs(&idx).is_empty());
    }
}
