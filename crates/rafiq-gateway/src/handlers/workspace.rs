// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tasks, projects, and knowledge endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>, ApiError> {
    let text = state
        .services()
        .graph
        .query_active_tasks(query.status.as_deref())
        .await?;
    Ok(Json(json!({"tasks": text})))
}

#[derive(Debug, Deserialize)]
pub struct TaskUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

pub async fn update_task(
    State(state): State<AppState>,
    Json(req): Json<TaskUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .services()
        .graph
        .update_task(
            &req.title,
            req.status.as_deref(),
            req.priority,
            req.due_date.as_deref(),
            req.project.as_deref(),
        )
        .await?;
    Ok(Json(result))
}

pub async fn merge_duplicate_tasks(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.merge_duplicate_tasks().await?))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>, ApiError> {
    let text = state
        .services()
        .graph
        .query_projects_overview(query.status.as_deref())
        .await?;
    Ok(Json(json!({"projects": text})))
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

pub async fn project_details(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>, ApiError> {
    let text = state.services().graph.query_project_details(&query.name).await?;
    Ok(Json(json!({"project": text})))
}

#[derive(Debug, Deserialize)]
pub struct ProjectDeleteRequest {
    pub name: String,
}

pub async fn delete_project(
    State(state): State<AppState>,
    Json(req): Json<ProjectDeleteRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.delete_project(&req.name).await?))
}

#[derive(Debug, Deserialize)]
pub struct MergeProjectsRequest {
    pub target_name: String,
    pub source_names: Vec<String>,
}

pub async fn merge_projects(
    State(state): State<AppState>,
    Json(req): Json<MergeProjectsRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.source_names.is_empty() {
        return Err(rafiq_core::RafiqError::Validation("source_names is empty".into()).into());
    }
    Ok(Json(
        state
            .services()
            .graph
            .merge_projects(&req.source_names, &req.target_name)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
}

pub async fn list_knowledge(
    State(state): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Result<Json<Value>, ApiError> {
    let text = state
        .services()
        .graph
        .query_knowledge(query.topic.as_deref())
        .await?;
    Ok(Json(json!({"knowledge": text})))
}
