//! Memory strategies behind one capability interface.
//!
//! The window keeps recent turns verbatim; retrieval recalls older turns by
//! similarity. A session composes both; neither knows about the other.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use quill_memory::{Embedder, HashEmbedder, HttpEmbedder, RetrievalError, RetrievalIndex};
use quill_types::Message;
use quill_window::{ConversationWindow, TurnPair};

use crate::config::RetrievalConfig;

/// What a memory contributes to the next prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recall {
    /// Verbatim turns, oldest first.
    Turns(Vec<Message>),
    /// Free text for the `<relevant_history>` block.
    Relevant(String),
}

/// One way of remembering a conversation.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Strategy name for logs.
    fn strategy(&self) -> &'static str;

    /// Record a completed exchange.
    async fn remember(&mut self, pair: &TurnPair) -> Result<(), RetrievalError>;

    /// Context for a new user message. `window_lines` holds lines already
    /// sent verbatim, which a memory must not repeat.
    async fn recall(
        &self,
        query: &str,
        window_lines: &HashSet<String>,
    ) -> Result<Recall, RetrievalError>;
}

#[async_trait]
impl ConversationMemory for ConversationWindow {
    fn strategy(&self) -> &'static str {
        "window"
    }

    async fn remember(&mut self, pair: &TurnPair) -> Result<(), RetrievalError> {
        self.push_pair(pair.clone());
        Ok(())
    }

    async fn recall(
        &self,
        _query: &str,
        _window_lines: &HashSet<String>,
    ) -> Result<Recall, RetrievalError> {
        Ok(Recall::Turns(self.history()))
    }
}

/// Embedding-indexed recall over every turn of the session.
pub struct RetrievalMemory {
    index: RetrievalIndex,
    top_k: usize,
}

impl RetrievalMemory {
    /// Empty index over `embedder`, recalling `top_k` records per query.
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index: RetrievalIndex::new(embedder),
            top_k,
        }
    }

    /// Remote embedder when a URL is configured, otherwise the in-process
    /// hash embedder.
    #[must_use]
    pub fn from_config(config: &RetrievalConfig) -> Self {
        let embedder: Arc<dyn Embedder> = match config.embedding_url.as_deref() {
            Some(url) => Arc::new(HttpEmbedder::new(
                url,
                config.embedding_model.clone(),
                config.dimension,
                config.timeout_secs,
            )),
            None => Arc::new(HashEmbedder::new(config.dimension)),
        };
        Self::new(embedder, config.top_k)
    }

    /// Underlying index.
    #[must_use]
    pub fn index(&self) -> &RetrievalIndex {
        &self.index
    }

    /// Records recalled per query.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl ConversationMemory for RetrievalMemory {
    fn strategy(&self) -> &'static str {
        "retrieval"
    }

    /// User and assistant text are indexed as separate records, stored
    /// together once both are embedded.
    async fn remember(&mut self, pair: &TurnPair) -> Result<(), RetrievalError> {
        let user = pair.user.text();
        let assistant = pair.assistant.text();
        self.index.index_all(&[&user, &assistant]).await?;
        Ok(())
    }

    async fn recall(
        &self,
        query: &str,
        window_lines: &HashSet<String>,
    ) -> Result<Recall, RetrievalError> {
        let relevant = self.index.query(query, self.top_k, window_lines).await?;
        Ok(Recall::Relevant(relevant))
    }
}
