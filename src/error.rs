//! Error types for dicto.
//!
//! Indexing failures come in two flavours: file-scoped ones (the file could
//! not be read, parsed or routed to a grammar) that a batch driver may skip,
//! and everything else, which ends the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DictoError>;

/// Unified error type for dicto.
#[derive(Error, Debug)]
pub enum DictoError {
    /// The indexer or a run was configured incompletely (e.g. no store).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A source file could not be read.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parser rejected a source file.
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// No grammar is registered for the file.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A rule file or selector is invalid.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// The store refused or failed to record something.
    #[error("Store error: {0}")]
    Store(String),
}

impl DictoError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a parse error for a file
    pub fn parse(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create an input validation error
    pub fn input_validation(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether the failure is scoped to a single file.
    ///
    /// A batch driver may continue with the remaining files after a
    /// recoverable error; the partial records of the failed file stay in
    /// the store.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DictoError::Io { .. } | DictoError::Parse { .. } | DictoError::UnsupportedLanguage(_)
        )
    }
}
