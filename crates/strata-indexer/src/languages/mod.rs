//! Import/export extraction for the supported languages

pub mod javascript;
pub mod python;

use serde::{Deserialize, Serialize};
use strata_core::{ImportRecord, Language};

pub use strata_core::ImportKind;

/// How a symbol leaves its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Function,
    Class,
    Variable,
    Default,
    /// `export { a as b }` or a Python `__all__` entry.
    Named,
    /// `export * from` / `export * as ns from`.
    ReExport,
    /// `module.exports` / `exports.x` assignments.
    CommonJs,
}

/// One exported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub kind: ExportKind,
    pub line: usize,
}

impl ExportRecord {
    pub fn new(name: impl Into<String>, kind: ExportKind, line: usize) -> Self {
        ExportRecord {
            name: name.into(),
            kind,
            line,
        }
    }
}

/// Everything a parser pulls out of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    /// Set when the text could not be parsed; both lists are then empty.
    pub failed: bool,
}

impl ParsedSource {
    pub fn failed() -> Self {
        ParsedSource {
            failed: true,
            ..ParsedSource::default()
        }
    }

    /// Raw specifiers in source order.
    pub fn import_specifiers(&self) -> Vec<String> {
        self.imports.iter().map(|i| i.specifier.clone()).collect()
    }

    /// Exported names in source order, without repeats.
    pub fn export_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.exports.len());
        for export in &self.exports {
            if !names.contains(&export.name) {
                names.push(export.name.clone());
            }
        }
        names
    }
}

/// Pure extraction of imports and exports from source text. Implementations
/// never touch the filesystem.
pub trait SourceParser: Send + Sync {
    fn parse(&self, source: &str) -> ParsedSource;
}

static PYTHON: python::PythonParser = python::PythonParser;
static JAVASCRIPT: javascript::ScriptParser = javascript::ScriptParser;

/// Parser for a language, if one exists.
pub fn parser_for(language: Language) -> Option<&'static dyn SourceParser> {
    match language {
        Language::Python => Some(&PYTHON),
        Language::JavaScript | Language::TypeScript => Some(&JAVASCRIPT),
        Language::Unknown => None,
    }
}
