//! Error types for the aggregation core

use thiserror::Error;

/// Boxed error returned by consumer and setup routines
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised at construction or reported through the error sink
#[derive(Debug, Error)]
pub enum Error {
    /// Construction was attempted outside of a tokio runtime and no
    /// runtime handle was supplied
    #[error("no tokio runtime available to drive the scheduler")]
    NoRuntime,

    /// The notification source no longer accepts handlers
    #[error("notification source is closed")]
    SourceClosed,

    /// The setup routine reported failure
    #[error("setup failed: {0}")]
    Setup(#[source] BoxError),

    /// The consumer reported failure for one batch
    #[error("consumer failed: {0}")]
    Consumer(#[source] BoxError),

    /// A callback-style routine dropped its completion handle without
    /// signalling
    #[error("completion handle dropped without being signalled")]
    CompletionDropped,

    /// A routine panicked while running
    #[error("routine panicked: {0}")]
    Panicked(String),

    /// The notification source itself reported a failure
    #[error("notification source failed: {0}")]
    Source(#[source] BoxError),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_cause() {
        let err = Error::Setup("disk full".into());
        assert_eq!(err.to_string(), "setup failed: disk full");
    }
}
