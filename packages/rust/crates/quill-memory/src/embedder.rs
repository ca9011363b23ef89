//! Embedding providers.
//!
//! [`HashEmbedder`] is a deterministic feature-hashing encoder with no
//! external dependencies; texts that share words land close together. Real
//! deployments swap in [`crate::HttpEmbedder`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Common embedding width.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Maps text to a fixed-width vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider identifier for logs.
    fn name(&self) -> &'static str;

    /// Width of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Feature-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder with the given width (minimum 1).
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Encode synchronously.
    ///
    /// Each lowercase word is hashed to a bucket and a sign; the bucket sums
    /// are normalised to unit length. Text without words encodes to zeros.
    #[must_use]
    pub fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        let width = u64::try_from(self.dimension).unwrap_or(u64::MAX);

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = usize::try_from(hash % width).unwrap_or(0);
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        Self::normalize(&embedding)
    }

    fn normalize(v: &[f32]) -> Vec<f32> {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return v.to_vec();
        }
        v.iter().map(|x| x / norm).collect()
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.encode(text))
    }
}

/// Euclidean distance. Mismatched widths compare as infinitely far apart.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_deterministic_and_normalised() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.encode("API endpoint specification");
        let b = embedder.encode("api ENDPOINT specification");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn encode_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        assert!(embedder.encode("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn distance_of_mismatched_widths_is_infinite() {
        assert!(euclidean_distance(&[1.0], &[1.0, 0.0]).is_infinite());
        assert!(euclidean_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }
}
