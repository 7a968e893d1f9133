//! Unit tests for strata-indexer

use std::fs;
use std::path::{Path, PathBuf};

use strata_core::{DependencyKind, FileRole, GraphError, Language};

use crate::*;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn edge_pairs(builder: &GraphBuilder, graph: &strata_core::CodebaseGraph) -> Vec<(String, String)> {
    let rel = |p: &Path| {
        p.strip_prefix(builder.root())
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/")
    };
    graph
        .edges
        .iter()
        .map(|e| (rel(&e.source), rel(&e.target)))
        .collect()
}

fn python_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "app/__init__.py", "");
    write(
        root,
        "app/main.py",
        "import os\nfrom app.utils import helper\nfrom . import models\n",
    );
    write(root, "app/utils.py", "def helper():\n    return 1\n");
    write(root, "app/models.py", "class User:\n    pass\n");
    write(root, "tests/test_main.py", "from app.main import run\n");
    dir
}

#[test]
fn test_python_project_edges() {
    let dir = python_project();
    let builder = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();
    let outcome = builder.analyze(None).unwrap();
    let graph = &outcome.graph;

    assert_eq!(graph.nodes.len(), 5);
    assert_eq!(
        edge_pairs(&builder, graph),
        vec![
            ("app/main.py".to_string(), "app/models.py".to_string()),
            ("app/main.py".to_string(), "app/utils.py".to_string()),
            ("tests/test_main.py".to_string(), "app/main.py".to_string()),
        ]
    );

    let test_edge = graph
        .edges
        .iter()
        .find(|e| e.source.ends_with("tests/test_main.py"))
        .unwrap();
    assert!(test_edge.is_development);
    assert_eq!(test_edge.symbols, vec!["run"]);

    let test_node = graph.node(&builder.root().join("tests/test_main.py")).unwrap();
    assert_eq!(test_node.role, FileRole::Test);
    assert_eq!(test_node.language, Language::Python);

    // `os` is the only import left over
    assert_eq!(outcome.diagnostics.unresolved.len(), 1);
    assert_eq!(outcome.diagnostics.unresolved[0].category, ImportCategory::StandardLibrary);
    assert_eq!(outcome.diagnostics.unresolved_local().count(), 0);
}

#[test]
fn test_script_cycle_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/index.ts", "import { a } from './a';\n");
    write(root, "src/a.ts", "import { b } from './b';\nexport const a = 1;\n");
    write(root, "src/b.ts", "import { a } from './a';\nexport const b = 2;\n");

    let builder = GraphBuilder::new(root, AnalyzerConfig::default()).unwrap();
    let graph = builder.build(None).unwrap();

    assert_eq!(graph.edges.len(), 3);
    assert_eq!(graph.metrics.circular_dependencies, 2);
    let index_edge = graph
        .edges
        .iter()
        .find(|e| e.source.ends_with("src/index.ts"))
        .unwrap();
    assert!(!index_edge.is_circular);
    assert_eq!(index_edge.kind, DependencyKind::StaticImport);
}

#[test]
fn test_invalid_root() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = GraphBuilder::new(&missing, AnalyzerConfig::default()).unwrap_err();
    assert!(matches!(err, GraphError::InvalidRoot(_)));

    write(dir.path(), "file.py", "");
    let err = GraphBuilder::open(dir.path().join("file.py")).unwrap_err();
    assert!(matches!(err, GraphError::InvalidRoot(_)));
}

#[test]
fn test_explicit_file_outside_root() {
    let outside = tempfile::tempdir().unwrap();
    write(outside.path(), "stray.py", "");
    let dir = python_project();

    let builder = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();
    let files = vec![outside.path().join("stray.py")];
    let err = builder.build(Some(&files)).unwrap_err();
    assert!(matches!(err, GraphError::FileOutsideRoot { .. }));

    let files = vec![PathBuf::from("../escape.py")];
    assert!(builder.build(Some(&files)).is_err());
}

#[test]
fn test_explicit_file_list_limits_nodes() {
    let dir = python_project();
    let builder = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();
    let files = vec![
        PathBuf::from("app/main.py"),
        PathBuf::from("app/utils.py"),
        PathBuf::from("README.md"),
    ];
    let outcome = builder.analyze(Some(&files)).unwrap();

    assert_eq!(outcome.graph.nodes.len(), 2);
    assert_eq!(
        edge_pairs(&builder, &outcome.graph),
        vec![("app/main.py".to_string(), "app/utils.py".to_string())]
    );
    assert_eq!(outcome.diagnostics.skipped_files.len(), 1);
    assert_eq!(
        outcome.diagnostics.skipped_files[0].reason,
        SkipReason::UnsupportedLanguage
    );

    // `from . import models` finds a file the list leaves out
    let local: Vec<_> = outcome.diagnostics.unresolved_local().collect();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].file, builder.root().join("app/main.py"));
    assert_eq!(local[0].line, 3);
}

#[test]
fn test_unreadable_content_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "good.py", "import bad\n");
    fs::write(root.join("bad.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
    write(root, "broken.py", "def broken(:\n    pass\n");

    let builder = GraphBuilder::new(root, AnalyzerConfig::default()).unwrap();
    let outcome = builder.analyze(None).unwrap();

    let names: Vec<_> = outcome
        .graph
        .nodes
        .iter()
        .map(|n| n.relative_path.as_str())
        .collect();
    assert_eq!(names, vec!["broken.py", "good.py"]);
    assert_eq!(outcome.diagnostics.skipped_files.len(), 1);
    assert_eq!(outcome.diagnostics.skipped_files[0].reason, SkipReason::NotUtf8);
    assert_eq!(outcome.diagnostics.parse_failures, vec![builder.root().join("broken.py")]);

    let broken = outcome.graph.node(&builder.root().join("broken.py")).unwrap();
    assert!(broken.imports.is_empty());
}

#[test]
fn test_sequential_matches_parallel() {
    let dir = python_project();
    let parallel = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();
    let sequential = GraphBuilder::new(
        dir.path(),
        AnalyzerConfig {
            parallel: false,
            ..AnalyzerConfig::default()
        },
    )
    .unwrap();

    let a = parallel.build(None).unwrap();
    let b = sequential.build(None).unwrap();
    assert!(a.same_structure(&b));
}

#[test]
fn test_incremental_states() {
    let dir = python_project();
    let builder = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();

    let first = builder.analyze_incremental(false).unwrap();
    assert_eq!(first.state, CacheState::NoCache);
    assert!(builder.cache_dir().join(strata_core::GRAPH_CACHE).exists());

    let second = builder.analyze_incremental(false).unwrap();
    assert_eq!(second.state, CacheState::Unchanged);
    assert_eq!(second.graph, first.graph);

    let forced = builder.analyze_incremental(true).unwrap();
    assert_eq!(forced.state, CacheState::Forced);
    assert!(forced.graph.same_structure(&first.graph));
}

#[test]
fn test_incremental_modification_matches_full_build() {
    let dir = python_project();
    let builder = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();
    builder.build_incremental(false).unwrap();

    write(
        dir.path(),
        "app/utils.py",
        "from app import models\n\ndef helper():\n    return 2\n",
    );
    let outcome = builder.analyze_incremental(false).unwrap();
    let CacheState::PartiallyStale(summary) = outcome.state else {
        panic!("expected a partial rebuild, got {:?}", outcome.state);
    };
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.added + summary.deleted, 0);

    let full = builder.build(None).unwrap();
    assert!(outcome.graph.same_structure(&full));
}

#[test]
fn test_incremental_addition_links_old_importers() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.ts", "import { b } from './b';\n");

    let builder = GraphBuilder::new(root, AnalyzerConfig::default()).unwrap();
    let before = builder.build_incremental(false).unwrap();
    assert!(before.edges.is_empty());

    write(root, "src/b.ts", "export const b = 1;\n");
    let outcome = builder.analyze_incremental(false).unwrap();
    assert_eq!(
        outcome.state,
        CacheState::PartiallyStale(strata_core::ChangeSummary {
            added: 1,
            modified: 0,
            deleted: 0,
        })
    );
    assert_eq!(
        edge_pairs(&builder, &outcome.graph),
        vec![("src/a.ts".to_string(), "src/b.ts".to_string())]
    );
}

#[test]
fn test_clear_cache() {
    let dir = python_project();
    let builder = GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap();
    builder.build_incremental(false).unwrap();
    builder.clear_cache().unwrap();
    assert!(!builder.cache_dir().exists());

    // Clearing twice is fine
    builder.clear_cache().unwrap();
    let rebuilt = builder.analyze_incremental(false).unwrap();
    assert_eq!(rebuilt.state, CacheState::NoCache);
}

#[test]
fn test_configured_cache_dir() {
    let dir = python_project();
    write(dir.path(), ".strata.toml", "cache_dir = \"var/graph\"\n");
    let builder = GraphBuilder::open(dir.path()).unwrap();
    builder.build_incremental(false).unwrap();

    assert!(builder.root().join("var/graph").join(strata_core::GRAPH_CACHE).exists());
    assert!(!builder.root().join(".strata").exists());
}

#[test]
fn test_skipped_files_do_not_keep_cache_stale() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a.py", "import os\n");
    fs::write(root.join("bad.py"), [0xff, 0xfe, 0x00]).unwrap();

    let builder = GraphBuilder::new(root, AnalyzerConfig::default()).unwrap();
    let first = builder.analyze_incremental(false).unwrap();
    assert_eq!(first.state, CacheState::NoCache);
    assert_eq!(first.diagnostics.skipped_files.len(), 1);

    let doc = strata_core::load_document(&builder.cache_dir()).unwrap();
    assert!(doc.skipped.contains_key(&builder.root().join("bad.py")));

    for _ in 0..2 {
        let again = builder.analyze_incremental(false).unwrap();
        assert_eq!(again.state, CacheState::Unchanged);
    }

    // A rewrite is picked up once, then settles again
    fs::write(root.join("bad.py"), [0xff, 0xfe, 0x00, 0x80, 0x81]).unwrap();
    let rewritten = builder.analyze_incremental(false).unwrap();
    assert!(matches!(rewritten.state, CacheState::PartiallyStale(_)));
    assert_eq!(rewritten.diagnostics.skipped_files.len(), 1);
    let settled = builder.analyze_incremental(false).unwrap();
    assert_eq!(settled.state, CacheState::Unchanged);
    assert_eq!(settled.graph.nodes.len(), 1);
}
