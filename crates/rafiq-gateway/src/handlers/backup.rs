// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backup endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn create(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let result = state.backup.create_backup().await?;
    // Retention cleanup rides on every successful create.
    let removed = state.backup.cleanup_old_backups().await?;
    let mut result = result;
    result["old_backups_removed"] = json!(removed);
    Ok(Json(result))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let backups = state.backup.list_backups().await?;
    Ok(Json(json!({"backups": backups})))
}

pub async fn restore(
    State(state): State<AppState>,
    Path(timestamp): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if timestamp.len() != 15 || !timestamp.contains('_') {
        return Err(
            rafiq_core::RafiqError::Validation("timestamp must be YYYYMMDD_HHMMSS".into()).into(),
        );
    }
    Ok(Json(state.backup.restore_backup(&timestamp).await?))
}
