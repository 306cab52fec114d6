// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph visualisation endpoints: export, schema, stats. PNG rendering is
//! delegated to clients; the image endpoint reports that plainly.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn export(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.export_graph().await?))
}

pub async fn schema(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.graph_schema().await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.graph_stats().await?))
}

pub async fn image() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "detail": "PNG rendering is not available server-side; use /graph/export with a client renderer"
        })),
    )
}
