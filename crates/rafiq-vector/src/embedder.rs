// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the OpenAI-compatible embeddings endpoint.

use std::time::Duration;

use rafiq_core::RafiqError;
use serde::Deserialize;
use tracing::debug;

/// Pooled client for the embedding model server (1024-dim BGE-M3 class).
#[derive(Debug, Clone)]
pub struct Embedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl Embedder {
    pub fn new(base_url: String, model: String, dimension: usize) -> Result<Self, RafiqError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RafiqError::Config(format!("failed to build embeddings client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
        })
    }

    /// Expected vector dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds a batch of texts, preserving order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RafiqError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({"model": self.model, "input": texts});
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RafiqError::backend("embedding", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RafiqError::backend_msg(
                "embedding",
                format!("embeddings endpoint returned {status}: {text}"),
            ));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| RafiqError::backend("embedding", e))?;
        if parsed.data.len() != texts.len() {
            return Err(RafiqError::backend_msg(
                "embedding",
                format!("expected {} vectors, got {}", texts.len(), parsed.data.len()),
            ));
        }
        debug!(count = texts.len(), "embedded texts");
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }

    /// Embeds a single text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RafiqError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RafiqError::backend_msg("embedding", "empty embeddings response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(serde_json::json!({"model": "bge-m3"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.1, 0.2]},
                    {"embedding": [0.3, 0.4]}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = Embedder::new(format!("{}/v1", server.uri()), "bge-m3".into(), 2).unwrap();
        let vectors = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2]);
        assert_eq!(vectors[1], vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn embed_empty_batch_skips_request() {
        let embedder = Embedder::new("http://unused".into(), "bge-m3".into(), 2).unwrap();
        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn count_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1]}]
            })))
            .mount(&server)
            .await;

        let embedder = Embedder::new(format!("{}/v1", server.uri()), "bge-m3".into(), 1).unwrap();
        let err = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 vectors"));
    }
}
