//! Error types for the `docqa-rag` crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document or persisted index could not be located.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// The path that did not resolve to a readable file or directory.
        path: PathBuf,
    },

    /// The file exists but is not a document this crate can read.
    #[error("Unsupported format ({}): {reason}", .path.display())]
    UnsupportedFormat {
        /// The offending file.
        path: PathBuf,
        /// Why the file was rejected.
        reason: String,
    },

    /// Bad chunk size, overlap, `k`, or other configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A vector's length differs from the index's established dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality established by the index.
        expected: usize,
        /// Dimensionality of the rejected vector.
        actual: usize,
    },

    /// A search was issued against an index with no entries.
    #[error("Vector index is empty")]
    EmptyIndex,

    /// A persisted index is malformed or was built for a different embedder.
    #[error("Incompatible index at {}: {reason}", .path.display())]
    IncompatibleIndex {
        /// The index directory or file that was rejected.
        path: PathBuf,
        /// Why the index was rejected.
        reason: String,
    },

    /// A call to an external service exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that was cut off.
        operation: String,
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingFailure {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generator failed or returned malformed output.
    #[error("Generation failed ({provider}): {message}")]
    GenerationFailure {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An I/O error outside of the cases above.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::FileNotFound { path: path.as_ref().to_path_buf() }
    }

    pub(crate) fn unsupported(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat { path: path.as_ref().to_path_buf(), reason: reason.into() }
    }

    pub(crate) fn incompatible(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::IncompatibleIndex { path: path.as_ref().to_path_buf(), reason: reason.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
