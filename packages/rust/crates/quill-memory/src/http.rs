//! Embedding client for an HTTP `/embed/batch` service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::embedder::Embedder;
use crate::error::EmbeddingError;

const ERROR_BODY_PREVIEW_CHARS: usize = 256;

#[derive(Deserialize)]
struct EmbedBatchResponse {
    #[serde(default)]
    vectors: Vec<Vec<f32>>,
}

/// HTTP embedding provider.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: Option<String>,
    dimension: usize,
}

impl HttpEmbedder {
    /// Create a client for `base_url` (trailing slash ignored).
    #[must_use]
    pub fn new(base_url: &str, model: Option<String>, dimension: usize, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            dimension,
        }
    }

    /// Embed several texts in one request.
    ///
    /// # Errors
    ///
    /// Returns an [`EmbeddingError`] on transport failure, non-success
    /// status, undecodable body or a short vector list.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let started = Instant::now();
        let url = format!("{}/embed/batch", self.base_url);
        let mut body = serde_json::json!({ "texts": texts });
        if let Some(model) = self.model.as_deref() {
            body["model"] = serde_json::Value::String(model.to_string());
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(EmbeddingError::Request)?;
        let status = resp.status();
        if !status.is_success() {
            let body: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_PREVIEW_CHARS)
                .collect();
            log::debug!(
                "embedding http returned status {status} after {}ms",
                started.elapsed().as_millis()
            );
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let data: EmbedBatchResponse = resp
            .json()
            .await
            .map_err(|error| EmbeddingError::Decode(error.to_string()))?;
        if data.vectors.len() < texts.len() {
            return Err(EmbeddingError::MissingVectors {
                requested: texts.len(),
                returned: data.vectors.len(),
            });
        }
        log::debug!(
            "embedding http completed: texts={} elapsed_ms={}",
            texts.len(),
            started.elapsed().as_millis()
        );
        Ok(data.vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &'static str {
        "http"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        Ok(vectors.swap_remove(0))
    }
}
