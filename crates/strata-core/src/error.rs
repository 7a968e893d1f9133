//! Error types shared across the workspace

use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a build. Per-file problems never surface here; they
/// are recovered and reported through build diagnostics instead.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("project root {0} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    #[error("{path} is not inside project root {root}")]
    FileOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl GraphError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
