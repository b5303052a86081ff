//! Error types for the watcher

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting or running a [`crate::Watcher`]
#[derive(Debug, Error)]
pub enum WatchError {
    /// A watched root does not exist or cannot be resolved
    #[error("cannot watch {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No roots were given
    #[error("no paths to watch")]
    NoRoots,

    /// Options out of range
    #[error("invalid watch options: {0}")]
    Config(String),

    /// Ignore files or patterns could not be parsed
    #[error("invalid ignore rules: {0}")]
    Ignore(String),

    /// The filesystem notification backend failed
    #[error("watch backend error: {0}")]
    Backend(#[from] notify::Error),

    /// The aggregator could not be attached
    #[error(transparent)]
    Aggregate(#[from] batchwatch_core::Error),
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
