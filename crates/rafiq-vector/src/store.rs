// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vector store service: embedding + approximate-NN over one
//! collection, with the payload conventions the rest of the system relies
//! on.

use rafiq_core::{time, RafiqError};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::client::QdrantClient;
use crate::embedder::Embedder;
use crate::types::{PointPayload, ScrolledPoint, SearchFilters, SearchHit};

/// Embedding + vector search over the shared collection.
#[derive(Debug, Clone)]
pub struct VectorStore {
    client: QdrantClient,
    embedder: Embedder,
    tz_offset_hours: i32,
}

impl VectorStore {
    pub fn new(client: QdrantClient, embedder: Embedder, tz_offset_hours: i32) -> Self {
        Self {
            client,
            embedder,
            tz_offset_hours,
        }
    }

    /// Creates the collection/index when missing. Called once at startup.
    pub async fn start(&self) -> Result<(), RafiqError> {
        self.client
            .ensure_collection(self.embedder.dimension())
            .await
    }

    pub fn client(&self) -> &QdrantClient {
        &self.client
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Embeds a batch of texts.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RafiqError> {
        self.embedder.embed(texts).await
    }

    /// Embeds and stores chunks with their payloads. Returns the number of
    /// points written.
    pub async fn upsert_chunks(
        &self,
        chunks: &[String],
        payloads: Vec<PointPayload>,
    ) -> Result<usize, RafiqError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let vectors = self.embedder.embed(chunks).await?;
        self.upsert_with_vectors(chunks, vectors, payloads).await
    }

    /// Stores chunks with precomputed vectors (saves re-embedding in batch
    /// entity registration).
    pub async fn upsert_with_vectors(
        &self,
        chunks: &[String],
        vectors: Vec<Vec<f32>>,
        payloads: Vec<PointPayload>,
    ) -> Result<usize, RafiqError> {
        let now = time::now_iso(self.tz_offset_hours);
        let points = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| {
                let mut payload = payloads.get(i).cloned().unwrap_or_default();
                payload.text = chunk.clone();
                payload.created_at = now.clone();
                let payload_json =
                    serde_json::to_value(&payload).unwrap_or_else(|_| Value::Object(Default::default()));
                (Uuid::new_v4().to_string(), vector, payload_json)
            })
            .collect();
        let written = self.client.upsert_points(points).await?;
        debug!(count = written, "upserted vector points");
        Ok(written)
    }

    /// Embeds the query and searches with optional filters.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, RafiqError> {
        let vector = self.embedder.embed_one(query).await?;
        self.client.search(&vector, limit, filters).await
    }

    /// Searches with a precomputed vector.
    pub async fn search_by_vector(
        &self,
        vector: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, RafiqError> {
        self.client.search(vector, limit, filters).await
    }

    /// Removes every point ingested from the given file.
    pub async fn delete_by_file_hash(&self, file_hash: &str) -> Result<(), RafiqError> {
        self.client.delete_by_field("file_hash", file_hash).await
    }

    /// Full dump for backup.
    pub async fn scroll_all(&self) -> Result<Vec<ScrolledPoint>, RafiqError> {
        self.client.scroll_all(100).await
    }

    /// Restores scrolled points (backup restore).
    pub async fn restore_points(&self, points: Vec<ScrolledPoint>) -> Result<usize, RafiqError> {
        let mut total = 0;
        for batch in points.chunks(100) {
            let rows = batch
                .iter()
                .filter_map(|p| {
                    p.vector.as_ref().map(|v| {
                        (
                            p.id.as_str().unwrap_or_default().to_string(),
                            v.clone(),
                            Value::Object(p.payload.clone()),
                        )
                    })
                })
                .collect::<Vec<_>>();
            total += self.client.upsert_points(rows).await?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_embeddings(server: &MockServer, vectors: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": vectors})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn upsert_chunks_stamps_payload() {
        let server = MockServer::start().await;
        mock_embeddings(&server, serde_json::json!([{"embedding": [0.1, 0.2]}])).await;
        Mock::given(method("PUT"))
            .and(path("/collections/personal_life/points"))
            .and(body_partial_json(serde_json::json!({
                "points": [{"payload": {"text": "chunk", "source_type": "note", "file_hash": "abc"}}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = VectorStore::new(
            QdrantClient::new(server.uri(), "personal_life".into()).unwrap(),
            Embedder::new(format!("{}/v1", server.uri()), "bge-m3".into(), 2).unwrap(),
            3,
        );
        let payload = PointPayload {
            source_type: Some("note".into()),
            file_hash: Some("abc".into()),
            ..Default::default()
        };
        let written = store
            .upsert_chunks(&["chunk".to_string()], vec![payload])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn search_embeds_then_queries() {
        let server = MockServer::start().await;
        mock_embeddings(&server, serde_json::json!([{"embedding": [0.5, 0.5]}])).await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_life/points/search"))
            .and(body_partial_json(serde_json::json!({"vector": [0.5, 0.5]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [{"score": 0.8, "payload": {"text": "hit"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = VectorStore::new(
            QdrantClient::new(server.uri(), "personal_life".into()).unwrap(),
            Embedder::new(format!("{}/v1", server.uri()), "bge-m3".into(), 2).unwrap(),
            3,
        );
        let hits = store
            .search("query", 5, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "hit");
    }
}
