// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder administration endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default = "default_true")]
    pub include_overdue: bool,
}

fn default_true() -> bool {
    true
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let text = state
        .services()
        .graph
        .query_reminders(query.status.as_deref(), query.include_overdue)
        .await?;
    Ok(Json(json!({"reminders": text})))
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub title: String,
    /// done | snooze | cancel
    pub action: String,
    #[serde(default)]
    pub snooze_until: Option<String>,
}

pub async fn action(
    State(state): State<AppState>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<Value>, ApiError> {
    if !["done", "snooze", "cancel"].contains(&req.action.as_str()) {
        return Err(rafiq_core::RafiqError::Validation(format!(
            "action must be done|snooze|cancel, got '{}'",
            req.action
        ))
        .into());
    }
    let result = state
        .services()
        .graph
        .update_reminder_status(&req.title, &req.action, req.snooze_until.as_deref())
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub title: String,
    #[serde(default)]
    pub new_title: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recurrence: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut updates = serde_json::Map::new();
    if let Some(v) = req.new_title {
        updates.insert("new_title".into(), json!(v));
    }
    if let Some(v) = req.due_date {
        updates.insert("due_date".into(), json!(v));
    }
    if let Some(v) = req.priority {
        updates.insert("priority".into(), json!(v));
    }
    if let Some(v) = req.description {
        updates.insert("description".into(), json!(v));
    }
    if let Some(v) = req.recurrence {
        updates.insert("recurrence".into(), json!(v));
    }
    let result = state
        .services()
        .graph
        .update_reminder(&req.title, updates)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub title: String,
}

pub async fn delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.delete_reminder(&req.title).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeleteAllRequest {
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn delete_all(
    State(state): State<AppState>,
    Json(req): Json<DeleteAllRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .delete_all_reminders(req.status.as_deref())
            .await?,
    ))
}

pub async fn merge_duplicates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.merge_duplicate_reminders().await?))
}
