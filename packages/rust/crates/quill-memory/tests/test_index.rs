//! RetrievalIndex tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quill_memory::{Embedder, EmbeddingError, HashEmbedder, RetrievalError, RetrievalIndex};

/// Maps a text to a fixed point on a line so distances are predictable.
struct LineEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for LineEmbedder {
    fn name(&self) -> &'static str {
        "line"
    }

    fn dimension(&self) -> usize {
        1
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let position: f32 = text
            .split_whitespace()
            .next()
            .and_then(|w| w.parse().ok())
            .unwrap_or(0.0);
        Ok(vec![position])
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Decode("service unavailable".to_string()))
    }
}

struct WrongWidthEmbedder;

#[async_trait]
impl Embedder for WrongWidthEmbedder {
    fn name(&self) -> &'static str {
        "wrong-width"
    }

    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![0.0; 3])
    }
}

/// Fails on any text containing "reject".
struct PickyEmbedder;

#[async_trait]
impl Embedder for PickyEmbedder {
    fn name(&self) -> &'static str {
        "picky"
    }

    fn dimension(&self) -> usize {
        1
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains("reject") {
            return Err(EmbeddingError::Decode("rejected".to_string()));
        }
        Ok(vec![1.0])
    }
}

fn line_index() -> (RetrievalIndex, Arc<LineEmbedder>) {
    let embedder = Arc::new(LineEmbedder {
        calls: AtomicUsize::new(0),
    });
    (RetrievalIndex::new(embedder.clone()), embedder)
}

#[tokio::test]
async fn test_query_orders_by_ascending_distance() -> anyhow::Result<()> {
    let (mut index, _) = line_index();
    for text in ["10 far", "1 near", "4 middle", "2 close"] {
        index.index(text).await?;
    }
    let result = index.query("0 origin", 3, &HashSet::new()).await?;
    assert_eq!(result, "1 near\n2 close\n4 middle");
    Ok(())
}

#[tokio::test]
async fn test_query_ties_break_by_insertion_order() -> anyhow::Result<()> {
    let (mut index, _) = line_index();
    index.index("5 first").await?;
    index.index("5 second").await?;
    let result = index.query("5", 2, &HashSet::new()).await?;
    assert_eq!(result, "5 first\n5 second");
    Ok(())
}

#[tokio::test]
async fn test_query_removes_lines_present_in_window() -> anyhow::Result<()> {
    let (mut index, _) = line_index();
    index.index("1 already in window").await?;
    index.index("2 only in memory").await?;
    let window: HashSet<String> = ["1 already in window".to_string()].into_iter().collect();
    let result = index.query("0", 2, &window).await?;
    assert_eq!(result, "2 only in memory");
    Ok(())
}

#[tokio::test]
async fn test_empty_index_and_zero_k_skip_embedder() -> anyhow::Result<()> {
    let (mut index, embedder) = line_index();
    assert_eq!(index.query("anything", 3, &HashSet::new()).await?, "");
    index.index("1 stored").await?;
    assert_eq!(index.query("anything", 0, &HashSet::new()).await?, "");
    assert_eq!(embedder.calls.load(Ordering::Relaxed), 1);
    Ok(())
}

#[tokio::test]
async fn test_blank_text_is_not_indexed() -> anyhow::Result<()> {
    let (mut index, _) = line_index();
    assert_eq!(index.index("   ").await?, None);
    assert!(index.is_empty());
    assert_eq!(index.index("1 real").await?, Some(0));
    assert_eq!(index.index("2 real").await?, Some(1));
    assert_eq!(index.records()[1].sequence_id, 1);
    Ok(())
}

#[tokio::test]
async fn test_embedding_failure_is_surfaced() {
    let mut index = RetrievalIndex::new(Arc::new(FailingEmbedder));
    let result = index.index("some turn").await;
    assert!(matches!(result, Err(RetrievalError::Embedding(_))));
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_dimension_mismatch_is_rejected() {
    let mut index = RetrievalIndex::new(Arc::new(WrongWidthEmbedder));
    let result = index.index("some turn").await;
    assert!(matches!(
        result,
        Err(RetrievalError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[tokio::test]
async fn test_hash_embedder_prefers_shared_vocabulary() -> anyhow::Result<()> {
    let mut index = RetrievalIndex::new(Arc::new(HashEmbedder::default()));
    index
        .index("The deployment uses blue green rollout on the cluster")
        .await?;
    index
        .index("Data model: users table with email and created_at")
        .await?;
    let result = index
        .query("what rollout strategy does the deployment use", 1, &HashSet::new())
        .await?;
    assert!(result.contains("deployment"));
    Ok(())
}

#[tokio::test]
async fn test_index_all_stores_nothing_when_any_embedding_fails() {
    let mut index = RetrievalIndex::new(Arc::new(PickyEmbedder));
    let result = index.index_all(&["user turn", "reject this reply"]).await;
    assert!(matches!(result, Err(RetrievalError::Embedding(_))));
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_index_all_keeps_order_and_skips_blanks() -> anyhow::Result<()> {
    let (mut index, _) = line_index();
    let ids = index.index_all(&["1 user", "  ", "2 assistant"]).await?;
    assert_eq!(ids, vec![Some(0), None, Some(1)]);
    let texts: Vec<&str> = index.records().iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["1 user", "2 assistant"]);
    Ok(())
}
