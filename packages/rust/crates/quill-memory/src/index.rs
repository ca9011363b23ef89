//! Session-scoped embedding index of past turns.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dedup::dedup_against_window;
use crate::embedder::{Embedder, euclidean_distance};
use crate::error::RetrievalError;

/// One indexed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Monotonic id in insertion order.
    pub sequence_id: u64,
    /// Source text.
    pub text: String,
    /// Embedding of `text`.
    pub vector: Vec<f32>,
}

/// Embedding index owned by a single session.
///
/// Records are never evicted; the host caps session lifetime.
pub struct RetrievalIndex {
    embedder: Arc<dyn Embedder>,
    records: Vec<EmbeddingRecord>,
    next_sequence_id: u64,
}

impl RetrievalIndex {
    /// Create an empty index backed by `embedder`.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: Vec::new(),
            next_sequence_id: 0,
        }
    }

    /// Embed and store `text`. Blank text is skipped and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures and dimension mismatches; the index is
    /// unchanged in that case.
    pub async fn index(&mut self, text: &str) -> Result<Option<u64>, RetrievalError> {
        Ok(self.index_all(&[text]).await?.into_iter().next().flatten())
    }

    /// Embed every text first, then store them together in order. Blank
    /// texts are skipped and yield `None` in their position.
    ///
    /// Nothing is stored until every embedding has succeeded, so a failure
    /// or a dropped future never leaves a partial group behind.
    ///
    /// # Errors
    ///
    /// The first embedding failure or dimension mismatch.
    pub async fn index_all(&mut self, texts: &[&str]) -> Result<Vec<Option<u64>>, RetrievalError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            if text.trim().is_empty() {
                vectors.push(None);
            } else {
                vectors.push(Some(self.embed_checked(text).await?));
            }
        }

        let mut ids = Vec::with_capacity(texts.len());
        for (text, vector) in texts.iter().zip(vectors) {
            let Some(vector) = vector else {
                ids.push(None);
                continue;
            };
            let sequence_id = self.next_sequence_id;
            self.next_sequence_id += 1;
            self.records.push(EmbeddingRecord {
                sequence_id,
                text: (*text).to_string(),
                vector,
            });
            ids.push(Some(sequence_id));
        }
        log::debug!(
            "retrieval index stored {} record(s) (embedder={}, records={})",
            ids.iter().flatten().count(),
            self.embedder.name(),
            self.records.len()
        );
        Ok(ids)
    }

    /// The `k` nearest records to `text`, nearest first, joined by newlines,
    /// with lines already present in the window removed.
    ///
    /// An empty index or `k == 0` returns an empty string without calling
    /// the embedder.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures and dimension mismatches.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        window_lines: &HashSet<String>,
    ) -> Result<String, RetrievalError> {
        if k == 0 || self.records.is_empty() {
            return Ok(String::new());
        }
        let query_vector = self.embed_checked(text).await?;

        let mut ranked: Vec<(f32, &EmbeddingRecord)> = self
            .records
            .iter()
            .map(|record| (euclidean_distance(&query_vector, &record.vector), record))
            .collect();
        ranked.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.sequence_id.cmp(&b.1.sequence_id))
        });

        let joined = ranked
            .into_iter()
            .take(k)
            .map(|(_, record)| record.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(dedup_against_window(&joined, window_lines))
    }

    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let vector = self.embedder.embed(text).await?;
        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// Stored records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been indexed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
