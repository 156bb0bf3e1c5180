/// Error type shared by every fallible operation in the core.
///
/// Nothing in this crate treats an error as fatal to a session: scan, cache
/// and hash failures are logged and skipped, deletion failures become
/// [`crate::session::Notice`]s. The variants exist so callers can tell those
/// situations apart in logs and tests.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    /// A filesystem call failed for a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The walker could not read an entry.
    #[error("walk error: {0}")]
    Walk(String),

    /// The cache file could not be parsed or written.
    #[error("cache error: {0}")]
    Csv(#[from] csv::Error),

    /// The configuration file is not valid JSON for [`crate::config::DedupConfig`].
    #[error("configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// A path does not exist in the archive (or in the simulated filesystem).
    #[error("not found: {0}")]
    NotFound(String),

    /// The background scanner thread could not be started.
    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl DedupError {
    /// Wrap an `io::Error` together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;
