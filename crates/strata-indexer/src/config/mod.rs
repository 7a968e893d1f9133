//! Analyzer configuration from `.strata.toml`

use std::path::{Path, PathBuf};

use serde::Deserialize;
use strata_core::{GraphError, Result};

/// Optional per-project config file at the project root.
pub const CONFIG_FILE: &str = ".strata.toml";

/// Knobs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Directory names pruned in addition to the built-in deny-list.
    pub skip_dirs: Vec<String>,
    /// File-name globs skipped in addition to the built-in patterns.
    pub skip_patterns: Vec<String>,
    /// Where the cache document lives. Relative paths are taken from the
    /// project root. Defaults to `<root>/.strata`.
    pub cache_dir: Option<PathBuf>,
    /// Parse files on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            skip_dirs: Vec::new(),
            skip_patterns: Vec::new(),
            cache_dir: None,
            parallel: true,
        }
    }
}

impl AnalyzerConfig {
    /// Read `.strata.toml` from `root`, or defaults when there is none.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(GraphError::io(&path, e)),
        };
        let config = Self::parse(&text).map_err(|message| GraphError::Config {
            path: path.clone(),
            message,
        })?;
        tracing::debug!("Loaded analyzer config from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Absolute cache directory for `root`.
    pub fn cache_dir_for(&self, root: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => strata_core::cache_dir(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalyzerConfig::load(dir.path()).unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert!(config.parallel);
        assert_eq!(config.cache_dir_for(dir.path()), dir.path().join(".strata"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AnalyzerConfig::parse("skip_dirs = [\"fixtures\"]\ncache_dir = \"tmp/cache\"\n").unwrap();
        assert_eq!(config.skip_dirs, vec!["fixtures"]);
        assert!(config.parallel);
        assert_eq!(
            config.cache_dir_for(Path::new("/repo")),
            PathBuf::from("/repo/tmp/cache")
        );
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "parallel = \"sometimes\"").unwrap();
        let err = AnalyzerConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, GraphError::Config { .. }));
    }
}
