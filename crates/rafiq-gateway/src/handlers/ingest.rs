// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion endpoints: text, file upload, URL, and file download.

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rafiq_core::RafiqError;
use rafiq_ingest::IngestRequest;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    pub text: String,
    #[serde(default = "default_source")]
    pub source_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_source() -> String {
    "note".into()
}

pub async fn ingest_text(
    State(state): State<AppState>,
    Json(req): Json<IngestTextRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(RafiqError::Validation("النص فارغ".into()).into());
    }
    let summary = state
        .pipeline
        .ingest_text(IngestRequest {
            text: req.text,
            source_type: req.source_type,
            tags: req.tags,
            topic: req.topic,
            session_id: req.session_id,
            file_hash: None,
            active_project: None,
        })
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "chunks_stored": summary.chunks_stored,
        "facts_extracted": summary.facts_extracted,
    })))
}

/// Multipart upload: `file` plus optional `context`, `tags`, `topic`.
pub async fn ingest_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut filename = "unknown".to_string();
    let mut content_type = "application/octet-stream".to_string();
    let mut context = String::new();
    let mut tags: Vec<String> = Vec::new();
    let mut topic: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RafiqError::Validation(format!("bad multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                if let Some(name) = field.file_name() {
                    filename = name.to_string();
                }
                if let Some(mime) = field.content_type() {
                    content_type = mime.to_string();
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| RafiqError::Validation(format!("failed to read file: {e}")))?;
                bytes = Some(data.to_vec());
            }
            "context" => {
                context = field.text().await.unwrap_or_default();
            }
            "tags" => {
                let raw = field.text().await.unwrap_or_default();
                tags = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "topic" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.is_empty() {
                    topic = Some(raw);
                }
            }
            _ => {}
        }
    }

    let Some(bytes) = bytes else {
        return Err(RafiqError::Validation("missing file field".into()).into());
    };
    if bytes.is_empty() {
        return Err(RafiqError::Validation("empty file".into()).into());
    }
    let max_bytes = state.config.ingest.max_file_size_mb * 1024 * 1024;
    if bytes.len() as u64 > max_bytes {
        return Err(RafiqError::Validation(format!(
            "file too large; max {}MB",
            state.config.ingest.max_file_size_mb
        ))
        .into());
    }

    let timeout = std::time::Duration::from_secs(state.config.ingest.file_timeout_seconds);
    let result = tokio::time::timeout(
        timeout,
        state
            .files
            .process_file(bytes, &filename, &content_type, &context, tags, topic),
    )
    .await
    .map_err(|_| RafiqError::backend_msg("ingest", "file processing timed out"))??;

    info!(filename = %filename, status = %result["status"].as_str().unwrap_or(""), "file processed");
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct IngestUrlRequest {
    pub url: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn ingest_url(
    State(state): State<AppState>,
    Json(req): Json<IngestUrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let page = rafiq_ingest::url::fetch_url(&state.http, &req.url).await?;
    if page.text.trim().is_empty() {
        return Err(RafiqError::Validation(format!("no text at {}", req.url)).into());
    }
    let summary = state
        .pipeline
        .ingest_text(IngestRequest {
            text: page.text,
            source_type: page.source_type,
            tags: vec![],
            topic: None,
            session_id: req.session_id,
            file_hash: None,
            active_project: None,
        })
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "url": req.url,
        "chunks_stored": summary.chunks_stored,
        "facts_extracted": summary.facts_extracted,
    })))
}

/// Serves stored bytes back by hash.
pub async fn download_file(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Response, ApiError> {
    if hash.len() < 16 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RafiqError::Validation("invalid file hash".into()).into());
    }
    let bytes = state.files.load_file(&hash).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}
