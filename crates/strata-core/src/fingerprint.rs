//! Change-detection hashes

use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::{GraphError, Result};
use crate::model::{DependencyEdge, FileNode};

/// Stat-only fingerprint: `sha256("path:mtime_ns:size")`.
///
/// Access time is not part of the input, so reading a file never changes it.
pub fn fingerprint(path: &Path, metadata: &Metadata) -> String {
    let mtime_ns = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let input = format!("{}:{}:{}", path.display(), mtime_ns, metadata.len());
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Fingerprint a file on disk.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let metadata = std::fs::metadata(path).map_err(|e| GraphError::io(path, e))?;
    Ok(fingerprint(path, &metadata))
}

/// SHA-256 of file contents.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Modification time as a UTC timestamp, falling back to now when the
/// platform cannot report it.
pub fn modified_at(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Signature of a whole graph.
///
/// Built from relative paths so the hash survives moving the project
/// directory. `nodes` and `edges` must already be in canonical order.
pub fn graph_hash(nodes: &[FileNode], edges: &[DependencyEdge], root: &Path) -> String {
    let mut hasher = Sha256::new();
    for node in nodes {
        hasher.update(node.relative_path.as_bytes());
        hasher.update(b"\0");
        hasher.update(node.content_hash.as_bytes());
        hasher.update(b"\n");
    }
    for edge in edges {
        let source = edge.source.strip_prefix(root).unwrap_or(&edge.source);
        let target = edge.target.strip_prefix(root).unwrap_or(&edge.target);
        hasher.update(format!("{}->{}:{:?}\n", source.display(), target.display(), edge.kind));
    }
    format!("{:x}", hasher.finalize())
}
