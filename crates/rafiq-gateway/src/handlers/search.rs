// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Direct search endpoint: vector, graph, or auto (hybrid).

use axum::extract::State;
use axum::Json;
use rafiq_vector::SearchFilters;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_source() -> String {
    "auto".into()
}

fn default_limit() -> usize {
    5
}

pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(rafiq_core::RafiqError::Validation("سؤال البحث فارغ".into()).into());
    }
    let services = state.services();
    let query_en = services.llm.translate_to_english(&req.query).await?;

    let mut results: Vec<Value> = Vec::new();
    let mut source_used = req.source.clone();

    if req.source == "vector" || req.source == "auto" {
        let hits = services
            .vector
            .search(&query_en, req.limit, &SearchFilters::default())
            .await?;
        // Self-RAG filter: chunks below the relevance floor are discarded;
        // when that empties the result set, the graph strategy below is the
        // flipped retry.
        let threshold = services.config.chat.self_rag_threshold;
        for hit in hits.into_iter().filter(|h| h.score >= threshold) {
            results.push(json!({
                "text": hit.text,
                "score": hit.score,
                "source": "vector",
                "metadata": hit.payload,
            }));
        }
        source_used = "vector".into();
    }

    if req.source == "graph" || (req.source == "auto" && results.len() < 2) {
        let graph_text = services.graph.search_nodes(&query_en, req.limit).await?;
        if !graph_text.is_empty() {
            results.push(json!({
                "text": graph_text,
                "score": 1.0,
                "source": "graph",
                "metadata": {},
            }));
            source_used = if req.source == "graph" {
                "graph".into()
            } else {
                "hybrid".into()
            };
        }
    }

    Ok(Json(json!({"results": results, "source_used": source_used})))
}
