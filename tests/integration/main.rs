//! Integration tests for Strata
//!
//! These tests drive the library and the binary against real project trees.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, SystemTime};

use strata_core::CodebaseGraph;
use strata_indexer::{AnalyzerConfig, CacheState, GraphBuilder};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn builder(dir: &TempDir) -> GraphBuilder {
    GraphBuilder::new(dir.path(), AnalyzerConfig::default()).unwrap()
}

fn rel_edges(graph: &CodebaseGraph) -> Vec<(String, String)> {
    graph
        .edges
        .iter()
        .map(|e| {
            let name = |p: &Path| graph.node(p).unwrap().relative_path.clone();
            (name(&e.source), name(&e.target))
        })
        .collect()
}

/// A mixed project: a Python package and a TypeScript frontend.
fn mixed_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "backend/__init__.py", "");
    write(
        root,
        "backend/api.py",
        "import json\nfrom .db import connect\nfrom backend.models import User\n",
    );
    write(root, "backend/db.py", "import sqlite3\n\ndef connect():\n    pass\n");
    write(root, "backend/models.py", "from dataclasses import dataclass\n\n@dataclass\nclass User:\n    name: str\n");
    write(root, "scripts/oneoff.py", "print('hello')\n");
    write(
        root,
        "web/src/index.tsx",
        "import React from 'react';\nimport { App } from './App';\nimport type { Props } from './types';\n",
    );
    write(root, "web/src/App.tsx", "import { api } from './api';\nexport function App() {}\n");
    write(root, "web/src/api.ts", "const lazy = () => import('./App');\nexport const api = {};\n");
    write(root, "web/src/types.ts", "export interface Props {}\n");
    write(root, "web/node_modules/react/index.js", "module.exports = {};\n");
    dir
}

#[test]
fn test_no_dangling_edges() {
    let dir = mixed_project();
    let graph = builder(&dir).build(None).unwrap();

    assert_eq!(graph.nodes.len(), 9);
    for edge in &graph.edges {
        assert!(graph.contains(&edge.source), "dangling source {}", edge.source.display());
        assert!(graph.contains(&edge.target), "dangling target {}", edge.target.display());
    }
    assert!(!graph.nodes.iter().any(|n| n.relative_path.contains("node_modules")));
}

#[test]
fn test_mixed_project_shape() {
    let dir = mixed_project();
    let graph = builder(&dir).build(None).unwrap();

    let edges = rel_edges(&graph);
    for expected in [
        ("backend/api.py", "backend/db.py"),
        ("backend/api.py", "backend/models.py"),
        ("web/src/App.tsx", "web/src/api.ts"),
        ("web/src/api.ts", "web/src/App.tsx"),
        ("web/src/index.tsx", "web/src/App.tsx"),
        ("web/src/index.tsx", "web/src/types.ts"),
    ] {
        assert!(
            edges.contains(&(expected.0.to_string(), expected.1.to_string())),
            "missing edge {expected:?} in {edges:?}"
        );
    }
    assert_eq!(edges.len(), 6);

    // App <-> api through a dynamic import
    assert_eq!(graph.metrics.circular_dependencies, 2);

    let types_edge = graph
        .edges
        .iter()
        .find(|e| e.target.ends_with("web/src/types.ts"))
        .unwrap();
    assert!(!types_edge.is_runtime);
}

#[test]
fn test_idempotent_builds() {
    let dir = mixed_project();
    let builder = builder(&dir);
    let first = builder.build(None).unwrap();
    let second = builder.build(None).unwrap();

    assert!(first.same_structure(&second));
    assert_eq!(first.graph_hash, second.graph_hash);
}

#[test]
fn test_incremental_equivalence() {
    let dir = mixed_project();
    let root = dir.path();
    let builder = builder(&dir);
    builder.build_incremental(false).unwrap();

    write(root, "backend/cache.py", "from .db import connect\n");
    write(
        root,
        "backend/db.py",
        "import sqlite3\nfrom .cache import *\n\ndef connect():\n    return None\n",
    );
    fs::remove_file(root.join("web/src/types.ts")).unwrap();

    let outcome = builder.analyze_incremental(false).unwrap();
    let CacheState::PartiallyStale(summary) = outcome.state else {
        panic!("expected a partial rebuild, got {:?}", outcome.state);
    };
    assert_eq!((summary.added, summary.modified, summary.deleted), (1, 1, 1));

    let full = builder.build(None).unwrap();
    assert!(outcome.graph.same_structure(&full));
    assert_eq!(outcome.graph.graph_hash, full.graph_hash);

    // The cached result is what the next run sees
    let again = builder.analyze_incremental(false).unwrap();
    assert_eq!(again.state, CacheState::Unchanged);
    assert!(again.graph.same_structure(&full));
}

#[test]
fn test_cycle_detection() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "import b\n");
    write(dir.path(), "b.py", "import c\n");
    write(dir.path(), "c.py", "import a\n");
    let graph = builder(&dir).build(None).unwrap();
    assert_eq!(graph.edges.len(), 3);
    assert_eq!(graph.metrics.circular_dependencies, 3);
    assert!(graph.edges.iter().all(|e| e.is_circular));

    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "import b\n");
    write(dir.path(), "b.py", "import c\n");
    write(dir.path(), "c.py", "");
    let graph = builder(&dir).build(None).unwrap();
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(graph.metrics.circular_dependencies, 0);
}

#[test]
fn test_orphan_detection() {
    let dir = mixed_project();
    let graph = builder(&dir).build(None).unwrap();

    // scripts/oneoff.py and the empty package marker
    assert_eq!(graph.metrics.orphan_files, 2);
    let oneoff = graph.node(&builder(&dir).root().join("scripts/oneoff.py")).unwrap();
    assert!(graph.get_dependencies_for_file(&oneoff.path).is_empty());
    assert!(graph.get_dependents_for_file(&oneoff.path).is_empty());
}

#[test]
fn test_deletion_propagation() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.ts", "import { b } from './b';\nimport { c } from './c';\n");
    write(dir.path(), "src/b.ts", "import { c } from './c';\nexport const b = 1;\n");
    write(dir.path(), "src/c.ts", "export const c = 2;\n");
    let builder = builder(&dir);

    let before = builder.build_incremental(false).unwrap();
    assert_eq!(before.edges.len(), 3);

    fs::remove_file(dir.path().join("src/b.ts")).unwrap();
    let after = builder.build_incremental(false).unwrap();

    let deleted = builder.root().join("src/b.ts");
    assert!(!after.contains(&deleted));
    assert!(after.edges.iter().all(|e| !e.touches(&deleted)));
    assert_eq!(after.metrics.total_files, 2);
    assert_eq!(
        rel_edges(&after),
        vec![("src/a.ts".to_string(), "src/c.ts".to_string())]
    );
    assert_eq!(after.get_dependents_for_file(&builder.root().join("src/c.ts")).len(), 1);
}

#[test]
fn test_alias_resolution() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "tsconfig.json",
        r#"{
  // path aliases
  "compilerOptions": {
    "baseUrl": ".",
    "paths": { "@app/*": ["src/app/*"], },
  },
}"#,
    );
    write(root, "src/main.ts", "import { store } from '@app/store';\n");
    write(root, "src/app/store.ts", "export const store = {};\n");

    let graph = builder(&dir).build(None).unwrap();
    assert_eq!(
        rel_edges(&graph),
        vec![("src/main.ts".to_string(), "src/app/store.ts".to_string())]
    );

    fs::remove_file(root.join("tsconfig.json")).unwrap();
    let outcome = builder(&dir).analyze(None).unwrap();
    assert!(outcome.graph.edges.is_empty());
    let unresolved: Vec<_> = outcome.diagnostics.unresolved.iter().map(|u| u.specifier.as_str()).collect();
    assert_eq!(unresolved, vec!["@app/store"]);
}

#[test]
fn test_fingerprint_sensitivity() {
    use strata_core::fingerprint::fingerprint_file;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mod.py");
    fs::write(&path, "x = 1\n").unwrap();
    let original = fingerprint_file(&path).unwrap();

    // Reading or touching only the access time changes nothing
    let _ = fs::read(&path).unwrap();
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_times(fs::FileTimes::new().set_accessed(SystemTime::now() + Duration::from_secs(60)))
        .unwrap();
    drop(file);
    assert_eq!(fingerprint_file(&path).unwrap(), original);

    fs::write(&path, "x = 10\n").unwrap();
    assert_ne!(fingerprint_file(&path).unwrap(), original);
}

#[test]
fn test_cli_index_and_queries() {
    let dir = mixed_project();
    let bin = env!("CARGO_BIN_EXE_strata");

    let output = Command::new(bin)
        .args(["--root"])
        .arg(dir.path())
        .arg("index")
        .output()
        .expect("Failed to execute strata");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("files:          9"), "{stdout}");
    assert!(stdout.contains("circular imports:"));
    assert!(dir.path().join(".strata/graph.json").exists());

    let output = Command::new(bin)
        .args(["--root"])
        .arg(dir.path())
        .args(["dependents", "web/src/App.tsx"])
        .output()
        .expect("Failed to execute strata");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("web/src/index.tsx"));
    assert!(stdout.contains("web/src/api.ts"));

    let output = Command::new(bin)
        .args(["--root"])
        .arg(dir.path())
        .arg("clear")
        .output()
        .expect("Failed to execute strata");
    assert!(output.status.success());
    assert!(!dir.path().join(".strata/graph.json").exists());
}
