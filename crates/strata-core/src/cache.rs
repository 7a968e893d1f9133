//! On-disk cache of the last built graph

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::model::{CodebaseGraph, ImportRecord};

/// Cache directory: .strata/
pub const CACHE_DIR: &str = ".strata";

/// Graph cache file
pub const GRAPH_CACHE: &str = "graph.json";

/// Bumped whenever the document layout changes. Older documents are
/// treated as missing.
pub const FORMAT_VERSION: u32 = 1;

/// Everything persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDocument {
    pub format_version: u32,
    pub graph: CodebaseGraph,
    /// Raw import records per file, kept so unchanged files can be resolved
    /// again without re-parsing.
    #[serde(default)]
    pub imports: BTreeMap<PathBuf, Vec<ImportRecord>>,
    /// Fingerprints of discovered files that produced no node, so an
    /// untouched unreadable file does not count as added on every run.
    #[serde(default)]
    pub skipped: BTreeMap<PathBuf, String>,
}

impl CacheDocument {
    pub fn new(graph: CodebaseGraph, imports: BTreeMap<PathBuf, Vec<ImportRecord>>) -> Self {
        CacheDocument {
            format_version: FORMAT_VERSION,
            graph,
            imports,
            skipped: BTreeMap::new(),
        }
    }

    pub fn with_skipped(mut self, skipped: BTreeMap<PathBuf, String>) -> Self {
        self.skipped = skipped;
        self
    }
}

/// Default cache directory for a project root
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Cache file inside a cache directory
pub fn graph_cache_path(dir: &Path) -> PathBuf {
    dir.join(GRAPH_CACHE)
}

/// Load the cache document from `dir`.
///
/// A missing file, an unreadable or malformed file, and a document with a
/// different format version all yield `None`; only the latter two are
/// logged.
pub fn load_document(dir: &Path) -> Option<CacheDocument> {
    let path = graph_cache_path(dir);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable cache {}: {}", path.display(), e);
            return None;
        }
    };

    let doc: CacheDocument = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Ignoring corrupt cache {}: {}", path.display(), e);
            return None;
        }
    };

    if doc.format_version != FORMAT_VERSION {
        tracing::warn!(
            "Ignoring cache {} with format version {} (expected {})",
            path.display(),
            doc.format_version,
            FORMAT_VERSION
        );
        return None;
    }

    tracing::debug!("Graph cache loaded from: {}", path.display());
    Some(doc)
}

/// Persist the cache document into `dir`. The file is written next to its
/// final location and renamed over it, so readers never see a partial
/// document.
pub fn save_document(dir: &Path, doc: &CacheDocument) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| GraphError::io(dir, e))?;

    let path = graph_cache_path(dir);
    let tmp = dir.join(format!("{GRAPH_CACHE}.tmp"));
    let json = serde_json::to_vec_pretty(doc)?;
    fs::write(&tmp, json).map_err(|e| GraphError::io(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| GraphError::io(&path, e))?;

    tracing::debug!("Graph cache saved: {}", path.display());
    Ok(())
}

/// Remove the cache file from `dir`, and `dir` itself once empty.
pub fn clear_cache(dir: &Path) -> Result<()> {
    let path = graph_cache_path(dir);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(GraphError::io(&path, e)),
    }
    // Leaves directories holding anything else alone
    let _ = fs::remove_dir(dir);
    Ok(())
}
