//! Strata Core: dependency graph model, cycle detection, metrics and cache

pub mod cache;
pub mod cycles;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod metrics;
pub mod model;


#[cfg(test)]
pub mod test_utils;

pub use cache::{CACHE_DIR, CacheDocument, GRAPH_CACHE, cache_dir, clear_cache, graph_cache_path, load_document, save_document};
pub use diff::{ChangeSet, ChangeSummary};
pub use error::{GraphError, Result};
pub use graph::{DependencyIndex, assemble};
pub use model::{
    ANALYZER_VERSION, CodebaseGraph, DependencyEdge, DependencyKind, FileNode, FileRole,
    GraphMetrics, ImportKind, ImportRecord, Language,
};
