//! Graph assembly: discovery, parsing, resolution, finishing

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use strata_core::fingerprint::{content_hash, fingerprint, modified_at};
use strata_core::{
    CodebaseGraph, DependencyEdge, FileNode, FileRole, GraphError, ImportRecord, Language, Result,
};

use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostics, SkipReason, SkippedFile, UnresolvedImport};
use crate::discovery::{self, Discovered};
use crate::incremental::CacheState;
use crate::languages::parser_for;
use crate::resolver::{ImportResolver, LocalModules, Resolution, normalize_path};

/// A finished build plus what it had to recover from.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub graph: CodebaseGraph,
    pub diagnostics: Diagnostics,
    pub state: CacheState,
}

/// One file after reading and parsing, before resolution.
#[derive(Debug, Clone)]
pub(crate) struct ParsedFile {
    pub node: FileNode,
    pub records: Vec<ImportRecord>,
    pub failed: bool,
}

/// Everything a build produces, including what the cache keeps.
pub(crate) struct Assembly {
    pub graph: CodebaseGraph,
    pub imports: BTreeMap<PathBuf, Vec<ImportRecord>>,
    pub diagnostics: Diagnostics,
}

/// Builds dependency graphs for one project root.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    root: PathBuf,
    config: AnalyzerConfig,
}

impl GraphBuilder {
    /// Fails with [`GraphError::InvalidRoot`] unless `root` is an existing
    /// directory. The root is canonicalized.
    pub fn new(root: impl AsRef<Path>, config: AnalyzerConfig) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|_| GraphError::InvalidRoot(root.to_path_buf()))?;
        if !canonical.is_dir() {
            return Err(GraphError::InvalidRoot(root.to_path_buf()));
        }
        Ok(GraphBuilder {
            root: canonical,
            config,
        })
    }

    /// Builder configured from the project's `.strata.toml`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(GraphError::InvalidRoot(root.to_path_buf()));
        }
        let config = AnalyzerConfig::load(root)?;
        GraphBuilder::new(root, config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.config.cache_dir_for(&self.root)
    }

    /// Build a graph over `files`, or over every discovered file when `None`.
    pub fn build(&self, files: Option<&[PathBuf]>) -> Result<CodebaseGraph> {
        self.analyze(files).map(|outcome| outcome.graph)
    }

    /// Like [`GraphBuilder::build`], also returning diagnostics.
    pub fn analyze(&self, files: Option<&[PathBuf]>) -> Result<BuildOutcome> {
        let assembly = self.assemble_full(files)?;
        Ok(BuildOutcome {
            graph: assembly.graph,
            diagnostics: assembly.diagnostics,
            state: CacheState::NoCache,
        })
    }

    pub(crate) fn assemble_full(&self, files: Option<&[PathBuf]>) -> Result<Assembly> {
        let started = Instant::now();
        let mut diagnostics = Diagnostics::default();

        let discovered = match files {
            Some(list) => self.explicit_files(list, &mut diagnostics)?,
            None => discovery::discover(&self.root, &self.config)?,
        };

        let parsed = self.parse_all(&discovered.sources, &mut diagnostics);
        let known: Vec<PathBuf> = parsed.iter().map(|p| p.node.path.clone()).collect();
        let resolver = ImportResolver::load(&self.root, known.iter().cloned());
        let modules = LocalModules::discover(&self.root, &known, &discovered.manifests);

        let mut nodes = Vec::with_capacity(parsed.len());
        let mut edges = Vec::new();
        let mut imports = BTreeMap::new();
        for file in parsed {
            edges.extend(resolve_file(&resolver, &modules, &file.node, &file.records, &mut diagnostics));
            imports.insert(file.node.path.clone(), file.records);
            nodes.push(file.node);
        }

        let graph = strata_core::assemble(self.root.clone(), nodes, edges);
        tracing::info!(
            "Indexed {} files, {} dependencies ({} circular) in {:.2?}",
            graph.metrics.total_files,
            graph.metrics.total_dependencies,
            graph.metrics.circular_dependencies,
            started.elapsed()
        );

        Ok(Assembly {
            graph,
            imports,
            diagnostics,
        })
    }

    /// Validate a caller-supplied file list. Relative entries are taken from
    /// the project root; anything outside the root is an error.
    fn explicit_files(&self, list: &[PathBuf], diagnostics: &mut Diagnostics) -> Result<Discovered> {
        let mut found = Discovered::default();
        for file in list {
            let absolute = if file.is_absolute() {
                file.clone()
            } else {
                self.root.join(file)
            };
            let absolute = absolute
                .canonicalize()
                .unwrap_or_else(|_| normalize_path(&absolute));
            if !absolute.starts_with(&self.root) {
                return Err(GraphError::FileOutsideRoot {
                    path: file.clone(),
                    root: self.root.clone(),
                });
            }

            if absolute.file_name().is_some_and(|n| n == "package.json") {
                found.manifests.push(absolute);
            } else if Language::from_path(&absolute).is_supported() {
                found.sources.push(absolute);
            } else {
                diagnostics.skipped_files.push(SkippedFile {
                    path: absolute,
                    reason: SkipReason::UnsupportedLanguage,
                });
            }
        }
        found.sources.sort();
        found.sources.dedup();
        found.manifests.sort();
        found.manifests.dedup();
        Ok(found)
    }

    /// Read and parse `paths`, on the rayon pool when configured. Output
    /// keeps input order; skipped files are reported and left out.
    pub(crate) fn parse_all(&self, paths: &[PathBuf], diagnostics: &mut Diagnostics) -> Vec<ParsedFile> {
        let outcomes: Vec<std::result::Result<ParsedFile, SkippedFile>> = if self.config.parallel {
            paths.par_iter().map(|p| self.parse_file(p)).collect()
        } else {
            paths.iter().map(|p| self.parse_file(p)).collect()
        };

        let mut parsed = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(file) => {
                    if file.failed {
                        diagnostics.parse_failures.push(file.node.path.clone());
                    }
                    parsed.push(file);
                }
                Err(skipped) => diagnostics.skipped_files.push(skipped),
            }
        }
        parsed
    }

    fn parse_file(&self, path: &Path) -> std::result::Result<ParsedFile, SkippedFile> {
        let skip = |reason: SkipReason| {
            tracing::debug!("Skipping {}: {}", path.display(), reason);
            SkippedFile {
                path: path.to_path_buf(),
                reason,
            }
        };

        let language = Language::from_path(path);
        let Some(parser) = parser_for(language) else {
            return Err(skip(SkipReason::UnsupportedLanguage));
        };
        let metadata = std::fs::metadata(path).map_err(|e| skip(SkipReason::Unreadable(e.to_string())))?;
        let bytes = std::fs::read(path).map_err(|e| skip(SkipReason::Unreadable(e.to_string())))?;
        let text = std::str::from_utf8(&bytes).map_err(|_| skip(SkipReason::NotUtf8))?;

        let parsed = parser.parse(text);
        if parsed.failed {
            tracing::debug!("Parse failed for {}", path.display());
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let node = FileNode {
            path: path.to_path_buf(),
            relative_path: slash_path(relative),
            language,
            role: FileRole::classify(relative),
            line_count: text.lines().count(),
            fingerprint: fingerprint(path, &metadata),
            content_hash: content_hash(&bytes),
            last_modified: modified_at(&metadata),
            imports: parsed.import_specifiers(),
            exports: parsed.export_names(),
        };

        Ok(ParsedFile {
            node,
            records: parsed.imports,
            failed: parsed.failed,
        })
    }
}

/// Resolve one file's imports into merged edges. Statements that reach the
/// same target with the same kind share an edge.
pub(crate) fn resolve_file(
    resolver: &ImportResolver,
    modules: &LocalModules,
    node: &FileNode,
    records: &[ImportRecord],
    diagnostics: &mut Diagnostics,
) -> Vec<DependencyEdge> {
    let mut edges: Vec<DependencyEdge> = Vec::new();

    for record in records {
        let resolution = match resolver.resolve(record, &node.path, node.language, modules) {
            // Files on disk but outside this build would only become dangling edges
            Resolution::Resolved(target) if !resolver.is_indexed(&target) => {
                Resolution::Unresolved(resolver.outside_index_category(&target))
            }
            other => other,
        };
        let target = match resolution {
            Resolution::Resolved(target) => target,
            Resolution::Unresolved(category) => {
                diagnostics.unresolved.push(UnresolvedImport {
                    file: node.path.clone(),
                    specifier: record.specifier.clone(),
                    line: record.line,
                    category,
                });
                continue;
            }
        };

        let kind = record.kind.edge_kind();
        let position = edges
            .iter()
            .position(|e| e.target == target && e.kind == kind);
        let edge = match position {
            Some(idx) => &mut edges[idx],
            None => {
                let mut edge = DependencyEdge::new(node.path.clone(), target, kind);
                edge.is_development = node.role == FileRole::Test;
                edges.push(edge);
                let last = edges.len() - 1;
                &mut edges[last]
            }
        };

        for symbol in &record.symbols {
            if !edge.symbols.contains(symbol) {
                edge.symbols.push(symbol.clone());
            }
        }
        edge.lines.push(record.line);
        edge.is_runtime |= !record.type_only;
    }

    edges
}

/// Relative path with `/` separators on every platform.
fn slash_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
