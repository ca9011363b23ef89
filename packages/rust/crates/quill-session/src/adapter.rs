//! Model adapter seam.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::prompt::AssembledPrompt;

/// Failure reported by a model adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The request never produced a stream.
    #[error("model request failed: {0}")]
    Request(String),
    /// The stream broke after it started.
    #[error("model stream interrupted: {0}")]
    Interrupted(String),
}

/// Text fragments of one model response, in order.
pub type FragmentStream = BoxStream<'static, Result<String, AdapterError>>;

/// Streaming call into a language-model backend. Retries, timeouts and
/// backend selection belong to the implementation.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Start streaming a response to `prompt`.
    async fn stream(&self, prompt: &AssembledPrompt) -> Result<FragmentStream, AdapterError>;
}
