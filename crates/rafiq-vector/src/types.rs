// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the vector store and embedding endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload attached to every stored point.
///
/// `file_hash` is the only handle used for per-file cleanup; entity points
/// carry `entity_type`/`entity_name` for resolution lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text_ar: Option<String>,
}

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    pub payload: Map<String, Value>,
}

impl SearchHit {
    /// Payload field as &str, empty when absent.
    pub fn payload_str(&self, key: &str) -> &str {
        self.payload.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Optional payload filters applied to a search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub source_type: Option<String>,
    pub entity_type: Option<String>,
    pub topic: Option<String>,
}

impl SearchFilters {
    pub fn source(source_type: impl Into<String>) -> Self {
        Self {
            source_type: Some(source_type.into()),
            ..Default::default()
        }
    }

    pub fn entity(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Default::default()
        }
    }

    /// Qdrant filter JSON, or None when no filter is set.
    pub fn to_qdrant(&self) -> Option<Value> {
        let mut must = Vec::new();
        for (key, value) in [
            ("source_type", &self.source_type),
            ("entity_type", &self.entity_type),
            ("topic", &self.topic),
        ] {
            if let Some(v) = value {
                must.push(serde_json::json!({"key": key, "match": {"value": v}}));
            }
        }
        if must.is_empty() {
            None
        } else {
            Some(serde_json::json!({"must": must}))
        }
    }
}

/// A stored point as returned by scroll (used by backup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrolledPoint {
    pub id: Value,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// Cosine similarity between two equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_build_qdrant_must_clauses() {
        let f = SearchFilters {
            source_type: Some("note".into()),
            entity_type: None,
            topic: Some("farm".into()),
        };
        let v = f.to_qdrant().unwrap();
        let must = v["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "source_type");
        assert_eq!(must[1]["match"]["value"], "farm");

        assert!(SearchFilters::default().to_qdrant().is_none());
    }

    #[test]
    fn payload_omits_absent_fields() {
        let payload = PointPayload {
            text: "chunk".into(),
            created_at: "2026-02-11T00:00:00Z".into(),
            source_type: Some("note".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert!(v.get("file_hash").is_none());
        assert!(v.get("tags").is_none());
        assert_eq!(v["source_type"], "note");
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
