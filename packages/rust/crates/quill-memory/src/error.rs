//! Retrieval error types.

use thiserror::Error;

/// Failure talking to an embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport-level failure (connect, timeout, ...).
    #[error("embedding request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("embedding provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// Response body could not be decoded.
    #[error("embedding response decode failed: {0}")]
    Decode(String),
    /// Provider returned fewer vectors than texts.
    #[error("embedding provider returned {returned} vectors for {requested} texts")]
    MissingVectors {
        /// Texts sent.
        requested: usize,
        /// Vectors received.
        returned: usize,
    },
}

/// Failure in the retrieval index.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedding provider failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Vector width does not match the index.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Index dimension.
        expected: usize,
        /// Returned dimension.
        actual: usize,
    },
}
