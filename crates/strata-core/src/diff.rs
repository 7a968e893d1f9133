//! Change detection between a cached graph and the working tree

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::CodebaseGraph;

/// Files that differ between a cached graph and the current file set.
/// Each list is sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    /// Compare cached fingerprints against the current ones.
    pub fn compute(
        cached: &BTreeMap<PathBuf, String>,
        current: &BTreeMap<PathBuf, String>,
    ) -> Self {
        let mut changes = ChangeSet::default();

        for (path, fingerprint) in current {
            match cached.get(path) {
                None => changes.added.push(path.clone()),
                Some(old) if old != fingerprint => changes.modified.push(path.clone()),
                Some(_) => {}
            }
        }

        changes.deleted = cached
            .keys()
            .filter(|p| !current.contains_key(*p))
            .cloned()
            .collect();

        changes
    }

    /// Compare a cached graph against current fingerprints.
    pub fn against_graph(graph: &CodebaseGraph, current: &BTreeMap<PathBuf, String>) -> Self {
        let cached: BTreeMap<PathBuf, String> = graph
            .nodes
            .iter()
            .map(|n| (n.path.clone(), n.fingerprint.clone()))
            .collect();
        ChangeSet::compute(&cached, current)
    }

    /// Check if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Files that must be parsed again.
    pub fn dirty(&self) -> impl Iterator<Item = &PathBuf> {
        self.added.iter().chain(self.modified.iter())
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            added: self.added.len(),
            modified: self.modified.len(),
            deleted: self.deleted.len(),
        }
    }
}

/// Counts reported to callers after a partial rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} modified, {} deleted",
            self.added, self.modified, self.deleted
        )
    }
}
