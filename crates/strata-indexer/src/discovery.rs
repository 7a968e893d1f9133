//! Source file discovery

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use strata_core::{GraphError, Language, Result};

use crate::config::AnalyzerConfig;

/// Directories that are never descended into.
pub const SKIP_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    ".git",
    ".venv",
    "venv",
    "env",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "target",
    "bin",
    "obj",
    strata_core::CACHE_DIR,
];

/// File names that are never analyzed.
pub const SKIP_PATTERNS: &[&str] = &[
    "*.pyc", "*.pyo", "*.pyd", "*.so", "*.dylib", "*.dll", "*.exe", "*.min.js", "*.min.css",
    "*.map",
];

/// What a walk of the project found. Both lists are sorted.
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    /// Files in a supported language.
    pub sources: Vec<PathBuf>,
    /// Every `package.json`, used for local package names.
    pub manifests: Vec<PathBuf>,
}

/// Walk `root` with gitignore handling switched off, pruning skipped
/// directories and dropping skipped file names.
pub fn discover(root: &Path, config: &AnalyzerConfig) -> Result<Discovered> {
    let skip_files = skip_globs(root, config)?;
    let skip_dirs: HashSet<String> = SKIP_DIRS
        .iter()
        .map(|s| s.to_string())
        .chain(config.skip_dirs.iter().cloned())
        .collect();
    let cache_dir = config.cache_dir_for(root);

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir {
                return true;
            }
            let pruned = entry
                .file_name()
                .to_str()
                .is_some_and(|name| skip_dirs.contains(name));
            !pruned && entry.path() != cache_dir
        })
        .build();

    let mut found = Discovered::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.into_path();
        let Some(name) = path.file_name() else {
            continue;
        };
        if skip_files.is_match(name) {
            continue;
        }
        if name == "package.json" {
            found.manifests.push(path);
        } else if Language::from_path(&path).is_supported() {
            found.sources.push(path);
        }
    }

    found.sources.sort();
    found.manifests.sort();
    tracing::debug!(
        "Discovered {} source files and {} manifests under {}",
        found.sources.len(),
        found.manifests.len(),
        root.display()
    );
    Ok(found)
}

fn skip_globs(root: &Path, config: &AnalyzerConfig) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let patterns = SKIP_PATTERNS
        .iter()
        .copied()
        .chain(config.skip_patterns.iter().map(String::as_str));
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| GraphError::Config {
            path: root.join(crate::config::CONFIG_FILE),
            message: format!("bad skip pattern {pattern:?}: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| GraphError::Config {
        path: root.join(crate::config::CONFIG_FILE),
        message: e.to_string(),
    })
}
