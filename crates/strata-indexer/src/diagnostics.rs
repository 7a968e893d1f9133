//! Per-build report of everything that was recovered from

use std::path::PathBuf;

use crate::resolver::ImportCategory;

/// Why a file produced no node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unreadable(String),
    NotUtf8,
    UnsupportedLanguage,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::NotUtf8 => f.write_str("not valid UTF-8"),
            SkipReason::UnsupportedLanguage => f.write_str("unsupported language"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// An import that did not become an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedImport {
    pub file: PathBuf,
    pub specifier: String,
    pub line: usize,
    pub category: ImportCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub skipped_files: Vec<SkippedFile>,
    /// Files kept as nodes whose text did not parse.
    pub parse_failures: Vec<PathBuf>,
    pub unresolved: Vec<UnresolvedImport>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.skipped_files.is_empty() && self.parse_failures.is_empty() && self.unresolved.is_empty()
    }

    /// Unresolved imports that point at project code.
    pub fn unresolved_local(&self) -> impl Iterator<Item = &UnresolvedImport> {
        self.unresolved
            .iter()
            .filter(|u| u.category == ImportCategory::Local)
    }
}
