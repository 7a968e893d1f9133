//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::Context;
use strata_core::{CodebaseGraph, DependencyEdge};
use strata_indexer::{AnalyzerConfig, GraphBuilder};

/// Builder for `root` with `.strata.toml` applied and flags layered on top.
pub fn builder(root: &Path, cache_dir: Option<PathBuf>) -> anyhow::Result<GraphBuilder> {
    let mut config = AnalyzerConfig::load(root)
        .with_context(|| format!("Failed to load config for {}", root.display()))?;
    if cache_dir.is_some() {
        config.cache_dir = cache_dir;
    }
    let builder = GraphBuilder::new(root, config)?;
    Ok(builder)
}

pub fn index(builder: &GraphBuilder, force: bool, full: bool) -> anyhow::Result<()> {
    tracing::info!("Indexing project: {}", builder.root().display());

    let outcome = if full {
        builder.analyze(None)?
    } else {
        builder.analyze_incremental(force)?
    };
    let graph = &outcome.graph;
    let metrics = &graph.metrics;

    println!("{} ({})", graph.project_root.display(), outcome.state);
    println!("  files:          {}", metrics.total_files);
    println!("  dependencies:   {}", metrics.total_dependencies);
    println!("  circular:       {}", metrics.circular_dependencies);
    println!("  orphans:        {}", metrics.orphan_files);
    println!("  avg coupling:   {:.2}", metrics.average_coupling);

    if !metrics.language_distribution.is_empty() {
        let languages: Vec<String> = metrics
            .language_distribution
            .iter()
            .map(|(language, count)| format!("{language} {count}"))
            .collect();
        println!("  languages:      {}", languages.join(", "));
    }

    if !metrics.critical_files.is_empty() {
        println!("critical files:");
        for path in &metrics.critical_files {
            let coupling = metrics.coupling.get(path).copied().unwrap_or(0);
            println!("  {} ({})", display(graph, path), coupling);
        }
    }

    let circular: Vec<&DependencyEdge> = graph.circular_edges().collect();
    if !circular.is_empty() {
        println!("circular imports:");
        for edge in circular {
            println!("  {} -> {}", display(graph, &edge.source), display(graph, &edge.target));
        }
    }

    let diagnostics = &outcome.diagnostics;
    for skipped in &diagnostics.skipped_files {
        tracing::warn!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    for path in &diagnostics.parse_failures {
        tracing::warn!("Could not parse {}", path.display());
    }
    for import in diagnostics.unresolved_local() {
        tracing::debug!(
            "Unresolved local import {:?} in {}:{}",
            import.specifier,
            import.file.display(),
            import.line
        );
    }

    Ok(())
}

pub fn deps(builder: &GraphBuilder, file: &Path) -> anyhow::Result<()> {
    let graph = builder.build_incremental(false)?;
    let path = locate(builder, &graph, file)?;
    for edge in graph.get_dependencies_for_file(&path) {
        print_edge(&graph, &edge.target, edge);
    }
    Ok(())
}

pub fn dependents(builder: &GraphBuilder, file: &Path) -> anyhow::Result<()> {
    let graph = builder.build_incremental(false)?;
    let path = locate(builder, &graph, file)?;
    for edge in graph.get_dependents_for_file(&path) {
        print_edge(&graph, &edge.source, edge);
    }
    Ok(())
}

pub fn clear(builder: &GraphBuilder) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", builder.root().display());

    builder.clear_cache()?;

    tracing::info!("Cache cleared");
    Ok(())
}

/// Map a user-supplied path onto a node of `graph`.
fn locate(builder: &GraphBuilder, graph: &CodebaseGraph, file: &Path) -> anyhow::Result<PathBuf> {
    let candidate = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()?.join(file)
    };
    let candidate = candidate.canonicalize().unwrap_or(candidate);
    if graph.contains(&candidate) {
        return Ok(candidate);
    }

    // Fall back to a path relative to the project root
    let from_root = builder.root().join(file);
    if graph.contains(&from_root) {
        return Ok(from_root);
    }
    anyhow::bail!("{} is not part of the graph", file.display())
}

fn print_edge(graph: &CodebaseGraph, other: &Path, edge: &DependencyEdge) {
    let mut flags = Vec::new();
    if edge.is_circular {
        flags.push("circular");
    }
    if !edge.is_runtime {
        flags.push("type-only");
    }
    if edge.is_development {
        flags.push("dev");
    }
    let lines: Vec<String> = edge.lines.iter().map(|l| l.to_string()).collect();
    let mut line = format!("{}  {:?}  line {}", display(graph, other), edge.kind, lines.join(","));
    if !flags.is_empty() {
        line.push_str(&format!("  [{}]", flags.join(", ")));
    }
    println!("{line}");
}

fn display(graph: &CodebaseGraph, path: &Path) -> String {
    graph
        .node(path)
        .map(|n| n.relative_path.clone())
        .unwrap_or_else(|| path.display().to_string())
}
