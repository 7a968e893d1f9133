//! Core data structures for the dependency graph

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version stamped into every graph this crate produces.
pub const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Languages the parsers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Unknown,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Language::Python,
            Some("ts") | Some("tsx") => Language::TypeScript,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            _ => Language::Unknown,
        }
    }

    /// True for the languages the indexer knows how to parse.
    pub fn is_supported(self) -> bool {
        !matches!(self, Language::Unknown)
    }

    /// JavaScript and TypeScript share a parser and a resolver strategy.
    pub fn is_script_family(self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// What a file is for. Exactly one role per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Source,
    Test,
    Config,
    EntryPoint,
}

const ENTRY_POINT_NAMES: &[&str] = &[
    "main.py",
    "app.py",
    "__main__.py",
    "index.js",
    "index.ts",
    "main.js",
    "main.ts",
    "server.js",
    "server.ts",
];

const CONFIG_NAMES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "jsconfig.json",
    "setup.py",
    "pyproject.toml",
    "requirements.txt",
    "Dockerfile",
    "docker-compose.yml",
    ".gitignore",
    ".env.example",
    "conftest.py",
];

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__"];

impl FileRole {
    /// Classify a file. Precedence is test > config > entry point > source.
    ///
    /// `relative` is the path below the project root, so directories above
    /// the project never influence the role.
    pub fn classify(relative: &Path) -> Self {
        let name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        if is_test_file(relative, name) {
            FileRole::Test
        } else if CONFIG_NAMES.contains(&name) {
            FileRole::Config
        } else if ENTRY_POINT_NAMES.contains(&name) {
            FileRole::EntryPoint
        } else {
            FileRole::Source
        }
    }
}

fn is_test_file(relative: &Path, name: &str) -> bool {
    let in_test_dir = relative
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .any(|c| TEST_DIRS.iter().any(|d| c.as_os_str() == *d));
    if in_test_dir {
        return true;
    }

    name.starts_with("test_")
        || name.starts_with("test.")
        || name.ends_with("_test.py")
        || [".test.", ".spec."].iter().any(|marker| name.contains(marker))
}

/// One analyzed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    /// Absolute, canonicalized path. Unique within a graph.
    pub path: PathBuf,
    /// Path below the project root with `/` separators.
    pub relative_path: String,
    pub language: Language,
    pub role: FileRole,
    pub line_count: usize,
    /// Cheap stat-derived fingerprint used to detect changes.
    pub fingerprint: String,
    /// SHA-256 of the file bytes.
    pub content_hash: String,
    pub last_modified: DateTime<Utc>,
    /// Raw import specifiers in source order (not resolved paths).
    pub imports: Vec<String>,
    /// Exported symbol names in source order.
    pub exports: Vec<String>,
}

impl FileNode {
    /// Equality that ignores `last_modified`.
    pub fn same_content(&self, other: &FileNode) -> bool {
        self.path == other.path
            && self.relative_path == other.relative_path
            && self.language == other.language
            && self.role == other.role
            && self.line_count == other.line_count
            && self.fingerprint == other.fingerprint
            && self.content_hash == other.content_hash
            && self.imports == other.imports
            && self.exports == other.exports
    }
}

/// How a dependency is expressed in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    StaticImport,
    DynamicImport,
    ReExport,
}

/// A resolved dependency from one project file to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: PathBuf,
    pub target: PathBuf,
    pub kind: DependencyKind,
    /// Imported symbol names, accumulated over every statement merged into this edge.
    pub symbols: Vec<String>,
    /// 1-based line numbers of the statements behind this edge.
    pub lines: Vec<usize>,
    pub is_circular: bool,
    /// False when every statement behind the edge is type-only.
    pub is_runtime: bool,
    /// True when the importing file is a test.
    pub is_development: bool,
}

impl DependencyEdge {
    pub fn new(source: PathBuf, target: PathBuf, kind: DependencyKind) -> Self {
        DependencyEdge {
            source,
            target,
            kind,
            symbols: Vec::new(),
            lines: Vec::new(),
            is_circular: false,
            is_runtime: false,
            is_development: false,
        }
    }

    /// True if either endpoint is `path`.
    pub fn touches(&self, path: &Path) -> bool {
        self.source == path || self.target == path
    }
}

/// Syntactic form of an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Static,
    Dynamic,
    /// CommonJS `require(...)`.
    Require,
    ReExport,
}

impl ImportKind {
    /// Edge kind produced when an import of this form resolves.
    pub fn edge_kind(self) -> DependencyKind {
        match self {
            ImportKind::Static | ImportKind::Require => DependencyKind::StaticImport,
            ImportKind::Dynamic => DependencyKind::DynamicImport,
            ImportKind::ReExport => DependencyKind::ReExport,
        }
    }
}

/// One import statement as written in source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Module specifier exactly as written, including leading dots for
    /// Python relative imports.
    pub specifier: String,
    pub kind: ImportKind,
    pub symbols: Vec<String>,
    /// 1-based line of the statement.
    pub line: usize,
    /// Python relative import depth; 0 for absolute imports.
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub type_only: bool,
}

impl ImportRecord {
    pub fn new(specifier: impl Into<String>, kind: ImportKind, line: usize) -> Self {
        ImportRecord {
            specifier: specifier.into(),
            kind,
            symbols: Vec::new(),
            line,
            level: 0,
            type_only: false,
        }
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn type_only(mut self) -> Self {
        self.type_only = true;
        self
    }
}

/// Aggregates derived from nodes and edges. Never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub total_files: usize,
    pub total_dependencies: usize,
    pub circular_dependencies: usize,
    pub orphan_files: usize,
    /// In-degree plus out-degree per file.
    pub coupling: BTreeMap<PathBuf, usize>,
    pub average_coupling: f64,
    pub highly_coupled_files: usize,
    pub critical_files: Vec<PathBuf>,
    pub language_distribution: BTreeMap<Language, usize>,
}

/// The aggregate root handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebaseGraph {
    pub project_root: PathBuf,
    pub nodes: Vec<FileNode>,
    pub edges: Vec<DependencyEdge>,
    pub metrics: GraphMetrics,
    pub graph_hash: String,
    pub analyzed_at: DateTime<Utc>,
    pub analyzer_version: String,
}

impl CodebaseGraph {
    /// Look up a node by its absolute path.
    pub fn node(&self, path: &Path) -> Option<&FileNode> {
        self.nodes
            .binary_search_by(|n| n.path.as_path().cmp(path))
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.node(path).is_some()
    }

    /// Outgoing edges of `path`.
    pub fn get_dependencies_for_file(&self, path: &Path) -> Vec<&DependencyEdge> {
        self.edges.iter().filter(|e| e.source == path).collect()
    }

    /// Incoming edges of `path`.
    pub fn get_dependents_for_file(&self, path: &Path) -> Vec<&DependencyEdge> {
        self.edges.iter().filter(|e| e.target == path).collect()
    }

    pub fn circular_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(|e| e.is_circular)
    }

    /// Structural equality ignoring timestamps.
    pub fn same_structure(&self, other: &CodebaseGraph) -> bool {
        self.project_root == other.project_root
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.same_content(b))
            && self.edges == other.edges
            && self.metrics == other.metrics
            && self.graph_hash == other.graph_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_precedence() {
        assert_eq!(FileRole::classify(Path::new("tests/main.py")), FileRole::Test);
        assert_eq!(FileRole::classify(Path::new("src/test_utils.py")), FileRole::Test);
        assert_eq!(FileRole::classify(Path::new("web/app.test.ts")), FileRole::Test);
        assert_eq!(FileRole::classify(Path::new("setup.py")), FileRole::Config);
        assert_eq!(FileRole::classify(Path::new("src/index.ts")), FileRole::EntryPoint);
        assert_eq!(FileRole::classify(Path::new("src/utils.ts")), FileRole::Source);
    }

    #[test]
    fn test_dir_is_matched_on_components_only() {
        assert_eq!(FileRole::classify(Path::new("contest/solver.py")), FileRole::Source);
        assert_eq!(FileRole::classify(Path::new("__tests__/button.js")), FileRole::Test);
    }

    #[test]
    fn language_detection() {
        let cases = [
            ("a.py", Language::Python),
            ("a.ts", Language::TypeScript),
            ("a.tsx", Language::TypeScript),
            ("a.mjs", Language::JavaScript),
            ("a.cjs", Language::JavaScript),
            ("a.rs", Language::Unknown),
        ];
        for (file, expected) in cases {
            assert_eq!(Language::from_path(Path::new(file)), expected, "{file}");
        }
    }
}
