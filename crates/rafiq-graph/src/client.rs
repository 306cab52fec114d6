// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bolt client wrapper.
//!
//! Thin layer over `neo4rs`: connection setup, parameter binding from JSON
//! values, and row collection. All Cypher in this crate goes through here.

use neo4rs::{query, BoltType, Graph, Query, Row};
use rafiq_core::RafiqError;
use serde_json::Value;
use tracing::info;

fn graph_err(e: neo4rs::Error) -> RafiqError {
    RafiqError::backend("graph", e)
}

/// Pooled Bolt connection to the graph store.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, RafiqError> {
        let graph = Graph::new(uri, user, password).await.map_err(graph_err)?;
        info!(uri, "graph store connected");
        Ok(Self { graph })
    }

    /// Executes a write query, discarding rows.
    pub async fn run(&self, q: Query) -> Result<(), RafiqError> {
        self.graph.run(q).await.map_err(graph_err)
    }

    /// Executes a query and collects all rows.
    pub async fn fetch_all(&self, q: Query) -> Result<Vec<Row>, RafiqError> {
        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(graph_err)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Executes a query and returns the first row, if any.
    pub async fn fetch_one(&self, q: Query) -> Result<Option<Row>, RafiqError> {
        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        stream.next().await.map_err(graph_err)
    }
}

/// Builds a query with parameters bound from JSON values.
pub fn build_query(cypher: &str, params: &[(&str, Value)]) -> Query {
    let mut q = query(cypher);
    for (key, value) in params {
        q = q.param(key, bolt_from_json(value));
    }
    q
}

/// Converts a JSON value into a Bolt parameter.
///
/// The graph's property rule is primitives and arrays of primitives; nested
/// maps and object arrays are serialised to JSON strings at this edge.
/// Null-valued parameters never reach here in practice (props are filtered
/// first); they bind as empty strings.
pub fn bolt_from_json(value: &Value) -> BoltType {
    match value {
        Value::Null => String::new().into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        Value::String(s) => s.clone().into(),
        Value::Array(items) => {
            let strings_only = items.iter().all(|i| i.is_string());
            if strings_only {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
                    .into()
            } else if items.iter().all(|i| i.is_i64()) {
                items
                    .iter()
                    .filter_map(Value::as_i64)
                    .collect::<Vec<_>>()
                    .into()
            } else {
                items
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .into()
            }
        }
        Value::Object(_) => value.to_string().into(),
    }
}

/// Converts a Bolt value back into JSON (used by export and formatting).
pub fn json_from_bolt(value: &BoltType) -> Value {
    match value {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::from(i.value),
        BoltType::Float(f) => Value::from(f.value),
        BoltType::String(s) => Value::String(s.value.clone()),
        BoltType::List(list) => Value::Array(list.value.iter().map(json_from_bolt).collect()),
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_map_to_bolt() {
        assert!(matches!(bolt_from_json(&Value::Bool(true)), BoltType::Boolean(_)));
        assert!(matches!(bolt_from_json(&serde_json::json!(5)), BoltType::Integer(_)));
        assert!(matches!(bolt_from_json(&serde_json::json!(2.5)), BoltType::Float(_)));
        assert!(matches!(bolt_from_json(&serde_json::json!("x")), BoltType::String(_)));
        assert!(matches!(bolt_from_json(&Value::Null), BoltType::String(_)));
    }

    #[test]
    fn string_arrays_stay_arrays() {
        let v = serde_json::json!(["a", "b"]);
        match bolt_from_json(&v) {
            BoltType::List(list) => assert_eq!(list.value.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn nested_objects_are_serialised_to_strings() {
        let v = serde_json::json!({"k": {"nested": true}});
        match bolt_from_json(&v) {
            BoltType::String(s) => assert!(s.value.contains("nested")),
            other => panic!("expected string, got {other:?}"),
        }

        // Arrays of objects become arrays of JSON strings.
        let arr = serde_json::json!([{"a": 1}, {"b": 2}]);
        match bolt_from_json(&arr) {
            BoltType::List(list) => {
                assert!(matches!(&list.value[0], BoltType::String(s) if s.value.contains("\"a\"")));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn bolt_json_round_trip_for_scalars() {
        for v in [
            serde_json::json!(true),
            serde_json::json!(42),
            serde_json::json!(2.25),
            serde_json::json!("نص"),
            serde_json::json!(["a", "b"]),
        ] {
            assert_eq!(json_from_bolt(&bolt_from_json(&v)), v);
        }
    }
}
