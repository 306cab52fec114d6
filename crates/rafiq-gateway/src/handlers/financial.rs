// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Financial endpoints: monthly report, debts, payments, spending alerts.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Datelike;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(default)]
    pub compare: bool,
}

pub async fn report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, ApiError> {
    let services = state.services();
    let now = rafiq_core::time::now_local(services.tz());
    let month = query.month.unwrap_or(now.month());
    let year = query.year.unwrap_or(now.year());
    if !(1..=12).contains(&month) {
        return Err(rafiq_core::RafiqError::Validation("month must be 1-12".into()).into());
    }
    let report = if query.compare {
        services.graph.query_month_comparison(month, year).await?
    } else {
        services.graph.query_monthly_report(month, year).await?
    };
    Ok(Json(report))
}

pub async fn debts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_debt_summary().await?))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub person: Option<String>,
    pub debt_id: Option<i64>,
    pub amount: f64,
    #[serde(default)]
    pub direction: Option<String>,
}

pub async fn record_payment(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.amount <= 0.0 {
        return Err(rafiq_core::RafiqError::Validation("المبلغ لازم يكون أكبر من صفر".into()).into());
    }
    let graph = &state.services().graph;
    let result = match (req.debt_id, req.person.as_deref()) {
        (Some(id), _) => graph.apply_debt_payment_by_id(id, req.amount).await?,
        (None, Some(person)) => {
            graph
                .record_debt_payment(person, req.amount, req.direction.as_deref())
                .await?
        }
        (None, None) => {
            return Err(
                rafiq_core::RafiqError::Validation("person or debt_id is required".into()).into(),
            )
        }
    };
    Ok(Json(result))
}

pub async fn alerts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let alerts = state.services().graph.query_spending_alerts().await?;
    Ok(Json(json!({
        "alerts": if alerts.is_empty() { Value::Null } else { json!(alerts) }
    })))
}
