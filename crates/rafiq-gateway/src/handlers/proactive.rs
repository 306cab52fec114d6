// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proactive endpoints consumed by the scheduler jobs.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn morning_summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let graph = &state.services().graph;
    let (daily_plan, spending_alerts) =
        tokio::join!(graph.query_daily_plan(), graph.query_spending_alerts());
    let alerts = spending_alerts?;
    Ok(Json(json!({
        "daily_plan": daily_plan?,
        "spending_alerts": if alerts.is_empty() { Value::Null } else { json!(alerts) },
    })))
}

pub async fn noon_checkin(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let overdue = state.services().graph.query_overdue_reminders().await?;
    Ok(Json(json!({"overdue_reminders": overdue})))
}

pub async fn evening_summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_evening_summary().await?))
}

pub async fn due_reminders(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let due = state.services().graph.query_due_reminders().await?;
    Ok(Json(json!({"due_reminders": due})))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub title: String,
    pub recurrence: String,
}

pub async fn advance_reminder(
    State(state): State<AppState>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(recurrence) = crate::handlers::parse_recurrence(&req.recurrence) else {
        return Err(rafiq_core::RafiqError::Validation(format!(
            "recurrence must be daily|weekly|monthly|yearly, got '{}'",
            req.recurrence
        ))
        .into());
    };
    Ok(Json(
        state
            .services()
            .graph
            .advance_recurring_reminder(&req.title, recurrence)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct MarkNotifiedRequest {
    pub title: String,
}

/// Idempotent set operation; duplicate delivery is harmless.
pub async fn mark_notified(
    State(state): State<AppState>,
    Json(req): Json<MarkNotifiedRequest>,
) -> Result<Json<Value>, ApiError> {
    state.services().graph.mark_reminder_notified(&req.title).await?;
    Ok(Json(json!({"status": "notified", "title": req.title})))
}

pub async fn reschedule_persistent(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .reschedule_persistent_reminders()
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

pub async fn stalled_projects(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Value>, ApiError> {
    let days = query.days.unwrap_or(state.config.proactive.stalled_days);
    let projects = state.services().graph.query_stalled_projects(days).await?;
    Ok(Json(json!({"stalled_projects": projects, "days_threshold": days})))
}

pub async fn old_debts(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Value>, ApiError> {
    let days = query.days.unwrap_or(state.config.proactive.old_debt_days);
    let debts = state.services().graph.query_old_debts(days).await?;
    Ok(Json(json!({"old_debts": debts, "days_threshold": days})))
}
