// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat endpoints: one-shot, NDJSON streaming, and the session summary.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use futures::StreamExt;
use rafiq_core::ChatReply;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session")]
    pub session_id: String,
}

fn default_session() -> String {
    "default".into()
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(rafiq_core::RafiqError::Validation("الرسالة فارغة".into()).into());
    }
    let reply = state.orchestrator.chat(&req.message, &req.session_id).await?;
    Ok(Json(reply))
}

/// NDJSON stream: one JSON object per line, `meta` → `token`* →
/// `tool_call`* → `done`. Consumers must tolerate unknown types.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if req.message.trim().is_empty() {
        return Err(rafiq_core::RafiqError::Validation("الرسالة فارغة".into()).into());
    }
    let stream = state
        .orchestrator
        .chat_stream(&req.message, &req.session_id)
        .await;
    let body = Body::from_stream(
        stream.map(|line| Ok::<_, std::convert::Infallible>(line.to_ndjson())),
    );
    let response = Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(body)
        .map_err(|e| rafiq_core::RafiqError::Internal(e.to_string()))?;
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_session")]
    pub session_id: String,
}

/// Working-memory turns plus the stored compression summary.
pub async fn chat_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, ApiError> {
    let services = state.services();
    let turns = services
        .memory
        .store()
        .get_working_memory(&query.session_id)
        .await?;
    let summary = services
        .memory
        .store()
        .get_conversation_summary(&query.session_id)
        .await?;
    Ok(Json(json!({
        "session_id": query.session_id,
        "turns": turns,
        "summary": summary,
    })))
}
