//! quill-memory - relevant-history retrieval for long conversations.
//!
//! Stores every indexed turn as an [`EmbeddingRecord`] and answers
//! nearest-neighbour queries over them. Results are de-duplicated against
//! the lines already present in the conversation window so the same content
//! is never sent twice.
//!
//! ```text
//!   turn text ──► Embedder ──► EmbeddingRecord ──► RetrievalIndex
//!                                                       │
//!   query ──► Embedder ──► L2 rank ──► top-k ──► join ──► dedup vs window
//! ```
//!
//! Embedding failures are returned as [`RetrievalError::Embedding`]; callers
//! decide whether to continue without augmentation.

mod dedup;
mod embedder;
mod error;
mod http;
mod index;

pub use dedup::dedup_against_window;
pub use embedder::{DEFAULT_EMBEDDING_DIM, Embedder, HashEmbedder, euclidean_distance};
pub use error::{EmbeddingError, RetrievalError};
pub use http::HttpEmbedder;
pub use index::{EmbeddingRecord, RetrievalIndex};
