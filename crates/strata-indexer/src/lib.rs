//! Source parsing, import resolution and graph building

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod incremental;
pub mod languages;
pub mod resolver;

#[cfg(test)]
pub mod tests;

pub use builder::{BuildOutcome, GraphBuilder};
pub use config::AnalyzerConfig;
pub use diagnostics::{Diagnostics, SkipReason, SkippedFile, UnresolvedImport};
pub use incremental::CacheState;
pub use languages::{ParsedSource, SourceParser, parser_for};
pub use resolver::{ImportCategory, ImportResolver, Resolution};
