//! Error types for the knowledge pipeline.

use thiserror::Error;

/// Errors raised at the component boundaries of the pipeline.
///
/// Use [`KnowledgeError::kind`] to decide between "skip and continue"
/// ([`ErrorKind::Transient`]) and "abort" ([`ErrorKind::Fatal`] or
/// [`ErrorKind::Configuration`]).
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Invalid parameters, e.g. `overlap >= chunk_size` or `k == 0`.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider failed for a request.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// Model or provider name.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store backend failed for a read or write.
    #[error("Vector store error ({backend}): {message}")]
    Store {
        /// Backend name (`memory`, `sqlite`).
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector did not match the store's established dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A required component (embedding model, persistent store) could not be initialized.
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Coarse classification of a [`KnowledgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised immediately, never silently fixed.
    Configuration,
    /// Recoverable at batch granularity.
    Transient,
    /// Any operation requiring the failed component must stop.
    Fatal,
}

impl KnowledgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KnowledgeError::Config(_) => ErrorKind::Configuration,
            KnowledgeError::Embedding { .. }
            | KnowledgeError::Store { .. }
            | KnowledgeError::DimensionMismatch { .. } => ErrorKind::Transient,
            KnowledgeError::Init(_) => ErrorKind::Fatal,
        }
    }

    pub fn embedding(provider: &str, message: impl Into<String>) -> Self {
        KnowledgeError::Embedding {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn store(backend: &str, message: impl Into<String>) -> Self {
        KnowledgeError::Store {
            backend: backend.to_string(),
            message: message.into(),
        }
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
