// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Qdrant REST client.
//!
//! Thin typed wrapper over the points API: ensure-collection, upsert,
//! filtered search, delete-by-field, and scroll (used by backup).

use std::time::Duration;

use rafiq_core::RafiqError;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::types::{ScrolledPoint, SearchFilters, SearchHit};

/// Pooled REST client for one Qdrant collection.
#[derive(Debug, Clone)]
pub struct QdrantClient {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    max_retries: u32,
}

impl QdrantClient {
    pub fn new(base_url: String, collection: String) -> Result<Self, RafiqError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RafiqError::Config(format!("failed to build Qdrant client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection,
            max_retries: 1,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<Value>,
    ) -> Result<Value, RafiqError> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            let mut req = self.client.request(method.clone(), &url);
            if let Some(ref b) = body {
                req = req.json(b);
            }
            let response = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt < self.max_retries {
                        warn!(error = %e, attempt, "Qdrant request failed, retrying");
                        last_error = Some(RafiqError::backend("vector", e));
                        continue;
                    }
                    return Err(RafiqError::backend("vector", e));
                }
            };
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return serde_json::from_str(&text).map_err(|e| {
                    RafiqError::backend_msg("vector", format!("bad Qdrant body: {e}"))
                });
            }
            if status.is_server_error() && attempt < self.max_retries {
                warn!(status = %status, attempt, "Qdrant transient error, retrying");
                last_error = Some(RafiqError::backend_msg(
                    "vector",
                    format!("Qdrant returned {status}: {text}"),
                ));
                continue;
            }
            return Err(RafiqError::backend_msg(
                "vector",
                format!("Qdrant returned {status}: {text}"),
            ));
        }
        Err(last_error.unwrap_or_else(|| RafiqError::backend_msg("vector", "request failed")))
    }

    /// Creates the collection and the `file_hash` payload index when absent.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), RafiqError> {
        let existing = self
            .request(
                reqwest::Method::GET,
                format!("{}/collections", self.base_url),
                None,
            )
            .await?;
        let names: Vec<&str> = existing["result"]["collections"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|c| c["name"].as_str()).collect())
            .unwrap_or_default();

        if !names.contains(&self.collection.as_str()) {
            self.request(
                reqwest::Method::PUT,
                self.url(""),
                Some(serde_json::json!({
                    "vectors": {"size": dimension, "distance": "Cosine"}
                })),
            )
            .await?;
            info!(collection = %self.collection, "created Qdrant collection");
        }

        // Payload index on file_hash for fast per-file cleanup. Qdrant
        // answers 4xx when it already exists; that is fine.
        let index = self
            .request(
                reqwest::Method::PUT,
                self.url("/index"),
                Some(serde_json::json!({
                    "field_name": "file_hash",
                    "field_schema": "keyword"
                })),
            )
            .await;
        if let Err(e) = index {
            debug!(error = %e, "file_hash index creation skipped");
        }
        Ok(())
    }

    /// Upserts points; each entry is (id, vector, payload).
    pub async fn upsert_points(
        &self,
        points: Vec<(String, Vec<f32>, Value)>,
    ) -> Result<usize, RafiqError> {
        if points.is_empty() {
            return Ok(0);
        }
        let count = points.len();
        let body = serde_json::json!({
            "points": points
                .into_iter()
                .map(|(id, vector, payload)| serde_json::json!({
                    "id": id, "vector": vector, "payload": payload
                }))
                .collect::<Vec<_>>()
        });
        self.request(reqwest::Method::PUT, self.url("/points?wait=true"), Some(body))
            .await?;
        Ok(count)
    }

    /// Nearest-neighbour search with optional payload filters.
    pub async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, RafiqError> {
        let mut body = serde_json::json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filters.to_qdrant() {
            body["filter"] = filter;
        }
        let result = self
            .request(reqwest::Method::POST, self.url("/points/search"), Some(body))
            .await?;

        let hits = result["result"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|row| {
                        let payload = row["payload"]
                            .as_object()
                            .cloned()
                            .unwrap_or_else(Map::new);
                        SearchHit {
                            text: payload
                                .get("text")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            score: row["score"].as_f64().unwrap_or(0.0) as f32,
                            payload,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    /// Deletes every point whose payload `field` equals `value`.
    pub async fn delete_by_field(&self, field: &str, value: &str) -> Result<(), RafiqError> {
        let body = serde_json::json!({
            "filter": {"must": [{"key": field, "match": {"value": value}}]}
        });
        self.request(
            reqwest::Method::POST,
            self.url("/points/delete?wait=true"),
            Some(body),
        )
        .await?;
        info!(field, value = %truncate(value, 12), "deleted vector points by field");
        Ok(())
    }

    /// Scrolls the whole collection in batches (vectors included).
    pub async fn scroll_all(&self, batch_size: usize) -> Result<Vec<ScrolledPoint>, RafiqError> {
        let mut all = Vec::new();
        let mut offset: Option<Value> = None;
        loop {
            let mut body = serde_json::json!({
                "limit": batch_size,
                "with_payload": true,
                "with_vector": true,
            });
            if let Some(ref o) = offset {
                body["offset"] = o.clone();
            }
            let result = self
                .request(reqwest::Method::POST, self.url("/points/scroll"), Some(body))
                .await?;
            let points: Vec<ScrolledPoint> =
                serde_json::from_value(result["result"]["points"].clone()).unwrap_or_default();
            let empty = points.is_empty();
            all.extend(points);
            offset = match result["result"]["next_page_offset"].clone() {
                Value::Null => None,
                v => Some(v),
            };
            if offset.is_none() || empty {
                break;
            }
        }
        Ok(all)
    }
}

fn truncate(s: &str, n: usize) -> &str {
    &s[..s.len().min(n)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_client(server: &MockServer) -> QdrantClient {
        QdrantClient::new(server.uri(), "personal_life".into()).unwrap()
    }

    #[tokio::test]
    async fn search_parses_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_life/points/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [
                    {"score": 0.92, "payload": {"text": "chunk one", "source_type": "note"}},
                    {"score": 0.55, "payload": {"text": "chunk two"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let hits = client
            .search(&[0.1, 0.2], 5, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "chunk one");
        assert!((hits[0].score - 0.92).abs() < 1e-6);
        assert_eq!(hits[0].payload_str("source_type"), "note");
    }

    #[tokio::test]
    async fn search_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_life/points/search"))
            .and(body_partial_json(serde_json::json!({
                "filter": {"must": [{"key": "entity_type", "match": {"value": "Person"}}]}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let hits = client
            .search(&[0.1], 3, &SearchFilters::entity("Person"))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_by_field_builds_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_life/points/delete"))
            .and(body_partial_json(serde_json::json!({
                "filter": {"must": [{"key": "file_hash", "match": {"value": "abc123"}}]}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        client.delete_by_field("file_hash", "abc123").await.unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"collections": [{"name": "other"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/personal_life"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": true})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/personal_life/index"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": {}})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        client.ensure_collection(1024).await.unwrap();
    }

    #[tokio::test]
    async fn scroll_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_life/points/scroll"))
            .and(body_partial_json(serde_json::json!({"offset": "p2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"points": [{"id": "2", "vector": [0.2], "payload": {}}], "next_page_offset": null}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_life/points/scroll"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"points": [{"id": "1", "vector": [0.1], "payload": {}}], "next_page_offset": "p2"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let points = client.scroll_all(100).await.unwrap();
        assert_eq!(points.len(), 2);
    }
}
