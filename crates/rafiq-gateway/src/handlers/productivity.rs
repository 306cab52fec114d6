// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Productivity endpoints: sprints, focus sessions, time-blocking.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SprintCreateRequest {
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

pub async fn create_sprint(
    State(state): State<AppState>,
    Json(req): Json<SprintCreateRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut props = Map::new();
    if let Some(goal) = req.goal {
        props.insert("goal".into(), json!(goal));
    }
    if let Some(project) = req.project {
        props.insert("project".into(), json!(project));
    }
    Ok(Json(
        state
            .services()
            .graph
            .create_sprint(&req.name, req.start_date.as_deref(), req.end_date.as_deref(), props)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SprintListQuery {
    pub status: Option<String>,
}

pub async fn list_sprints(
    State(state): State<AppState>,
    Query(query): Query<SprintListQuery>,
) -> Result<Json<Value>, ApiError> {
    let sprints = state
        .services()
        .graph
        .query_sprints(query.status.as_deref())
        .await?;
    Ok(Json(json!({"sprints": sprints})))
}

pub async fn sprint_details(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_sprint(&name).await?))
}

pub async fn sprint_burndown(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_sprint_burndown(&name).await?))
}

pub async fn complete_sprint(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.complete_sprint(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct VelocityQuery {
    pub project: Option<String>,
}

pub async fn velocity(
    State(state): State<AppState>,
    Query(query): Query<VelocityQuery>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .query_sprint_velocity(query.project.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct AssignSprintRequest {
    pub task_title: String,
    pub sprint_name: String,
}

pub async fn assign_task(
    State(state): State<AppState>,
    Json(req): Json<AssignSprintRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .assign_task_to_sprint(&req.task_title, &req.sprint_name)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct FocusStartRequest {
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub task: Option<String>,
}

pub async fn start_focus(
    State(state): State<AppState>,
    Json(req): Json<FocusStartRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .start_focus_session(req.duration_minutes, req.task.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct FocusCompleteRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_true")]
    pub completed: bool,
}

fn default_true() -> bool {
    true
}

pub async fn complete_focus(
    State(state): State<AppState>,
    Json(req): Json<FocusCompleteRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .complete_focus_session(req.session_id.as_deref(), req.completed)
            .await?,
    ))
}

pub async fn focus_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_focus_stats().await?))
}

#[derive(Debug, Deserialize)]
pub struct TimeblockSuggestRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub energy_profile: Option<String>,
}

pub async fn suggest_timeblocks(
    State(state): State<AppState>,
    Json(req): Json<TimeblockSuggestRequest>,
) -> Result<Json<Value>, ApiError> {
    let services = state.services();
    let date = req
        .date
        .unwrap_or_else(|| rafiq_core::time::today(services.tz()));
    Ok(Json(
        services
            .graph
            .suggest_time_blocks(&date, req.energy_profile.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct TimeblockApplyRequest {
    pub date: String,
    pub blocks: Vec<rafiq_graph::productivity::TimeBlock>,
}

pub async fn apply_timeblocks(
    State(state): State<AppState>,
    Json(req): Json<TimeblockApplyRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .apply_time_blocks(&req.blocks, &req.date)
            .await?,
    ))
}
