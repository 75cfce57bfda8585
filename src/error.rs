//! Error handling for replay-rs
//!
//! This module defines the error kinds surfaced by the chunk codec, the frame
//! store and the recording/replay sessions, plus a Result alias for use
//! throughout the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for replay-rs operations
#[derive(Error, Debug)]
pub enum ReplayError {
    /// A chunk declared more records than its bytes can hold
    #[error("Corrupt chunk: declared {declared} records ({needed} bytes) but only {available} bytes available")]
    CorruptChunk {
        declared: i64,
        needed: usize,
        available: usize,
    },

    /// Replay was requested without a bound frame source
    #[error("No data source bound to replay session")]
    NoDataSource,

    /// Playback was requested on an empty window
    #[error("No frames loaded to replay")]
    NoFramesLoaded,

    /// The operation conflicts with an active recording
    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// A session was started while already active
    #[error("Session already active: {0}")]
    DuplicateStart(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReplayError>,
    },
}

impl ReplayError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReplayError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Error for a write or delete that collides with an active writer claim
    pub fn directory_in_use(dir: impl Into<PathBuf>) -> Self {
        ReplayError::OperationNotAllowed(format!(
            "recording in progress in {}",
            dir.into().display()
        ))
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &ReplayError {
        match self {
            ReplayError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for replay-rs operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReplayError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReplayError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplayError::NoFramesLoaded;
        assert_eq!(err.to_string(), "No frames loaded to replay");
    }

    #[test]
    fn test_error_with_context() {
        let err = ReplayError::NoDataSource;
        let with_ctx = err.with_context("Failed to load playback");
        assert!(with_ctx.to_string().contains("Failed to load playback"));
        assert!(matches!(with_ctx.root(), ReplayError::NoDataSource));
    }

    #[test]
    fn test_corrupt_chunk_error() {
        let err = ReplayError::CorruptChunk {
            declared: 10,
            needed: 120,
            available: 60,
        };
        assert!(err.to_string().contains("declared 10"));
        assert!(err.to_string().contains("only 60 bytes"));
    }

    #[test]
    fn test_io_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("Reading chunk").unwrap_err();
        assert!(err.to_string().starts_with("Reading chunk"));
        assert!(matches!(err.root(), ReplayError::Io(_)));
    }
}
