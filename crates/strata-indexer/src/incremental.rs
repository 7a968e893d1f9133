//! Cache-backed rebuilds that only re-parse changed files

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use strata_core::fingerprint::{fingerprint, fingerprint_file};
use strata_core::{
    CacheDocument, ChangeSet, ChangeSummary, CodebaseGraph, FileNode, ImportRecord, Result,
};

use crate::builder::{Assembly, BuildOutcome, GraphBuilder, resolve_file};
use crate::diagnostics::Diagnostics;
use crate::discovery;
use crate::resolver::{ImportResolver, LocalModules};

/// How the cache took part in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No usable cache document; everything was parsed.
    NoCache,
    /// The cache was bypassed on request.
    Forced,
    /// Nothing changed; the cached graph was returned as is.
    Unchanged,
    PartiallyStale(ChangeSummary),
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheState::NoCache => f.write_str("no cache, full build"),
            CacheState::Forced => f.write_str("forced full build"),
            CacheState::Unchanged => f.write_str("unchanged"),
            CacheState::PartiallyStale(summary) => write!(f, "rebuilt ({summary})"),
        }
    }
}

impl GraphBuilder {
    /// Build through the on-disk cache. `force` ignores any cached state.
    /// The resulting graph is persisted in every case but [`CacheState::Unchanged`].
    pub fn build_incremental(&self, force: bool) -> Result<CodebaseGraph> {
        self.analyze_incremental(force).map(|outcome| outcome.graph)
    }

    pub fn analyze_incremental(&self, force: bool) -> Result<BuildOutcome> {
        let dir = self.cache_dir();
        let cached = if force {
            None
        } else {
            strata_core::load_document(&dir).filter(|doc| {
                let same_root = doc.graph.project_root == self.root();
                if !same_root {
                    tracing::warn!(
                        "Ignoring cache built for {}",
                        doc.graph.project_root.display()
                    );
                }
                same_root
            })
        };

        let Some(doc) = cached else {
            let state = if force {
                CacheState::Forced
            } else {
                CacheState::NoCache
            };
            let assembly = self.assemble_full(None)?;
            let skipped = skipped_fingerprints(&assembly.diagnostics, &BTreeMap::new());
            self.persist(&assembly.graph, &assembly.imports, skipped);
            return Ok(BuildOutcome {
                graph: assembly.graph,
                diagnostics: assembly.diagnostics,
                state,
            });
        };

        let started = Instant::now();
        let discovered = discovery::discover(self.root(), self.config())?;
        let current: BTreeMap<PathBuf, String> = discovered
            .sources
            .iter()
            .filter_map(|path| match std::fs::metadata(path) {
                Ok(metadata) => Some((path.clone(), fingerprint(path, &metadata))),
                Err(e) => {
                    tracing::debug!("Cannot stat {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        // Files skipped last time and untouched since stay out of the diff
        let mut carried = BTreeMap::new();
        let mut tracked = current.clone();
        for (path, previous) in &doc.skipped {
            if current.get(path) == Some(previous) && !doc.graph.contains(path) {
                tracked.remove(path);
                carried.insert(path.clone(), previous.clone());
            }
        }

        let mut changes = ChangeSet::against_graph(&doc.graph, &tracked);
        // Nodes the document holds no import records for cannot be re-resolved
        for node in &doc.graph.nodes {
            let untracked = !doc.imports.contains_key(&node.path);
            if untracked && current.contains_key(&node.path) && !changes.modified.contains(&node.path) {
                changes.modified.push(node.path.clone());
            }
        }
        changes.modified.sort();

        if changes.is_empty() {
            tracing::info!(
                "Graph cache is current ({} files, {} skipped)",
                doc.graph.nodes.len(),
                carried.len()
            );
            return Ok(BuildOutcome {
                graph: doc.graph,
                diagnostics: Diagnostics::default(),
                state: CacheState::Unchanged,
            });
        }

        let summary = changes.summary();
        tracing::info!("Cache is stale: {}", summary);

        let assembly = self.assemble_partial(doc, &changes, &discovered.manifests);
        tracing::info!(
            "Incremental rebuild of {} files took {:.2?}",
            summary.added + summary.modified,
            started.elapsed()
        );
        let mut skipped = skipped_fingerprints(&assembly.diagnostics, &current);
        skipped.extend(carried);
        self.persist(&assembly.graph, &assembly.imports, skipped);

        Ok(BuildOutcome {
            graph: assembly.graph,
            diagnostics: assembly.diagnostics,
            state: CacheState::PartiallyStale(summary),
        })
    }

    /// Delete the cache document for this project.
    pub fn clear_cache(&self) -> Result<()> {
        strata_core::clear_cache(&self.cache_dir())
    }

    /// Re-parse dirty files, keep cached nodes for the rest and resolve every
    /// import against the current file set. Unchanged files are never
    /// re-parsed; their stored records are resolved again so edges into
    /// added files appear and edges into deleted files go away.
    fn assemble_partial(
        &self,
        doc: CacheDocument,
        changes: &ChangeSet,
        manifests: &[PathBuf],
    ) -> Assembly {
        let mut diagnostics = Diagnostics::default();

        let dirty: Vec<PathBuf> = changes.dirty().cloned().collect();
        let stale: HashSet<&PathBuf> = changes
            .dirty()
            .chain(changes.deleted.iter())
            .collect();

        let CacheDocument {
            graph: cached,
            imports: mut cached_imports,
            ..
        } = doc;

        let mut files: Vec<(FileNode, Vec<ImportRecord>)> = cached
            .nodes
            .into_iter()
            .filter(|node| !stale.contains(&node.path))
            .map(|node| {
                let records = cached_imports.remove(&node.path).unwrap_or_default();
                (node, records)
            })
            .collect();
        for parsed in self.parse_all(&dirty, &mut diagnostics) {
            if parsed.failed {
                tracing::debug!("Re-parse failed for {}", parsed.node.path.display());
            }
            files.push((parsed.node, parsed.records));
        }
        files.sort_by(|a, b| a.0.path.cmp(&b.0.path));

        let known: Vec<PathBuf> = files.iter().map(|(node, _)| node.path.clone()).collect();
        let resolver = ImportResolver::load(self.root(), known.iter().cloned());
        let modules = LocalModules::discover(self.root(), &known, manifests);

        let mut nodes = Vec::with_capacity(files.len());
        let mut edges = Vec::new();
        let mut imports = BTreeMap::new();
        for (node, records) in files {
            edges.extend(resolve_file(&resolver, &modules, &node, &records, &mut diagnostics));
            imports.insert(node.path.clone(), records);
            nodes.push(node);
        }

        let graph = strata_core::assemble(self.root().to_path_buf(), nodes, edges);
        Assembly {
            graph,
            imports,
            diagnostics,
        }
    }

    /// A failed write costs the next run a full build, not this one its result.
    fn persist(
        &self,
        graph: &CodebaseGraph,
        imports: &BTreeMap<PathBuf, Vec<ImportRecord>>,
        skipped: BTreeMap<PathBuf, String>,
    ) {
        let dir = self.cache_dir();
        let doc = CacheDocument::new(graph.clone(), imports.clone()).with_skipped(skipped);
        if let Err(e) = strata_core::save_document(&dir, &doc) {
            tracing::warn!("Failed to write graph cache to {}: {}", dir.display(), e);
        }
    }
}

/// Fingerprints of the files a build skipped. `known` holds fingerprints
/// already taken this run; anything else is stat'ed, and files that cannot
/// be stat'ed are left out so they are retried next time.
fn skipped_fingerprints(
    diagnostics: &Diagnostics,
    known: &BTreeMap<PathBuf, String>,
) -> BTreeMap<PathBuf, String> {
    diagnostics
        .skipped_files
        .iter()
        .filter_map(|skipped| {
            let print = match known.get(&skipped.path) {
                Some(print) => print.clone(),
                None => fingerprint_file(&skipped.path).ok()?,
            };
            Some((skipped.path.clone(), print))
        })
        .collect()
}
