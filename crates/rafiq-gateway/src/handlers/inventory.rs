// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let text = state
        .services()
        .graph
        .query_inventory(query.search.as_deref(), query.category.as_deref())
        .await?;
    Ok(Json(json!({"items": text})))
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_inventory_summary().await?))
}

pub async fn report(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.services().graph.query_inventory_report().await?))
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// "set" (default) or "add".
    #[serde(default)]
    pub quantity_mode: Option<String>,
}

pub async fn upsert_item(
    State(state): State<AppState>,
    Json(req): Json<ItemRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut props = Map::new();
    if let Some(q) = req.quantity {
        props.insert("quantity".into(), json!(q));
    }
    for (key, value) in [
        ("location", &req.location),
        ("category", &req.category),
        ("brand", &req.brand),
        ("condition", &req.condition),
        ("description", &req.description),
    ] {
        if let Some(v) = value {
            props.insert(key.into(), json!(v));
        }
    }
    let mode = req.quantity_mode.as_deref().unwrap_or("set");
    Ok(Json(
        state.services().graph.upsert_item(&req.name, mode, props).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub name: String,
    pub to_location: String,
    #[serde(default)]
    pub from_location: Option<String>,
}

pub async fn move_item(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .move_item(&req.name, &req.to_location, req.from_location.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub name: String,
    pub delta: i64,
}

pub async fn adjust_quantity(
    State(state): State<AppState>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .services()
            .graph
            .adjust_item_quantity(&req.name, req.delta)
            .await?,
    ))
}

pub async fn by_file(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = state.services().graph.find_item_by_file_hash(&hash).await?;
    match item {
        Some(item) => Ok(Json(item)),
        None => Err(rafiq_core::RafiqError::NotFound(format!("no item for file {hash}")).into()),
    }
}

pub async fn by_barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = state.services().graph.find_item_by_barcode(&code).await?;
    match item {
        Some(item) => Ok(Json(item)),
        None => Err(rafiq_core::RafiqError::NotFound(format!("no item with barcode {code}")).into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct UnusedQuery {
    pub days: Option<i64>,
}

pub async fn unused(
    State(state): State<AppState>,
    Query(query): Query<UnusedQuery>,
) -> Result<Json<Value>, ApiError> {
    let items = state.services().graph.query_unused_items(query.days).await?;
    Ok(Json(json!({"unused_items": items})))
}

#[derive(Debug, Deserialize)]
pub struct DuplicatesQuery {
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "name".into()
}

pub async fn duplicates(
    State(state): State<AppState>,
    Query(query): Query<DuplicatesQuery>,
) -> Result<Json<Value>, ApiError> {
    let graph = &state.services().graph;
    let duplicates = match query.method.as_str() {
        "vector" => graph.detect_duplicate_items_vector().await?,
        "name" => graph.detect_duplicate_items().await?,
        other => {
            return Err(rafiq_core::RafiqError::Validation(format!(
                "method must be name|vector, got '{other}'"
            ))
            .into())
        }
    };
    Ok(Json(json!({"duplicates": duplicates, "method": query.method})))
}

#[derive(Debug, Deserialize)]
pub struct SimilarRequest {
    pub name: String,
}

pub async fn search_similar(
    State(state): State<AppState>,
    Json(req): Json<SimilarRequest>,
) -> Result<Json<Value>, ApiError> {
    let items = state.services().graph.find_similar_items(&req.name).await?;
    Ok(Json(json!({"similar_items": items})))
}
