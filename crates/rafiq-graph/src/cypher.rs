// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cypher construction helpers shared by the service modules.

use serde_json::{Map, Value};

/// Properties hidden from any LLM-facing context formatter.
pub const INTERNAL_PROPS: [&str; 5] = ["name_aliases", "created_at", "updated_at", "file_hash", "source"];

/// Labels keyed by `title` instead of `name`.
const TITLE_KEYED: [&str; 4] = ["Task", "Idea", "Reminder", "Knowledge"];

/// The unique-key property for a label.
pub fn key_field(label: &str) -> &'static str {
    if TITLE_KEYED.contains(&label) {
        "title"
    } else if label == "Location" {
        "path"
    } else if label == "File" {
        "file_hash"
    } else {
        "name"
    }
}

/// Labels must come from a known set before being spliced into Cypher;
/// parameters cannot carry labels or relationship types.
pub fn is_safe_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Drops nulls/empties and flattens nested structures to JSON strings so
/// every stored property is a scalar or a scalar array.
pub fn sanitize_props(props: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in props {
        if !is_safe_identifier(k) {
            continue;
        }
        match v {
            Value::Null => {}
            Value::String(s) if s.is_empty() => {}
            Value::Object(_) => {
                out.insert(k.clone(), Value::String(v.to_string()));
            }
            Value::Array(items) => {
                if items.iter().any(|i| i.is_object() || i.is_array()) {
                    out.insert(
                        k.clone(),
                        Value::Array(
                            items
                                .iter()
                                .map(|i| {
                                    if i.is_object() || i.is_array() {
                                        Value::String(i.to_string())
                                    } else {
                                        i.clone()
                                    }
                                })
                                .collect(),
                        ),
                    );
                } else {
                    out.insert(k.clone(), v.clone());
                }
            }
            _ => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

/// Builds `, var.k = $k, ...` for an update clause. Empty when no props.
pub fn set_clause(props: &Map<String, Value>, var: &str) -> String {
    if props.is_empty() {
        return String::new();
    }
    let assignments: Vec<String> = props.keys().map(|k| format!("{var}.{k} = ${k}")).collect();
    format!(", {}", assignments.join(", "))
}

/// Builds `, k: $k, ...` inline property syntax for a CREATE clause.
pub fn inline_props(props: &Map<String, Value>) -> String {
    if props.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = props.keys().map(|k| format!("{k}: ${k}")).collect();
    format!(", {}", pairs.join(", "))
}

/// Strips internal bookkeeping props before formatting for the LLM.
pub fn clean_props(props: &Map<String, Value>) -> Map<String, Value> {
    props
        .iter()
        .filter(|(k, _)| !INTERNAL_PROPS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Display helper: `"<name_ar> (<name>)"` when the Arabic surface form is
/// present, else the canonical name/title.
pub fn display_name(props: &Map<String, Value>) -> String {
    let name = props
        .get("name")
        .or_else(|| props.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("?");
    match props.get("name_ar").and_then(Value::as_str) {
        Some(ar) if !ar.is_empty() => format!("{ar} ({name})"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_field_per_label() {
        assert_eq!(key_field("Person"), "name");
        assert_eq!(key_field("Task"), "title");
        assert_eq!(key_field("Knowledge"), "title");
        assert_eq!(key_field("Location"), "path");
        assert_eq!(key_field("File"), "file_hash");
    }

    #[test]
    fn identifier_safety() {
        assert!(is_safe_identifier("Person"));
        assert!(is_safe_identifier("name_aliases"));
        assert!(!is_safe_identifier("Person) DETACH DELETE (n"));
        assert!(!is_safe_identifier(""));
    }

    #[test]
    fn sanitize_drops_nulls_and_flattens_nesting() {
        let props = serde_json::json!({
            "amount": 45,
            "vendor": "Tamimi",
            "empty": "",
            "missing": null,
            "nested": {"a": 1},
            "items": [{"name": "x"}],
            "tags": ["a", "b"],
            "bad key!": "v"
        });
        let out = sanitize_props(props.as_object().unwrap());
        assert_eq!(out.len(), 5);
        assert!(out["nested"].is_string());
        assert!(out["items"][0].is_string());
        assert_eq!(out["tags"], serde_json::json!(["a", "b"]));
        assert!(!out.contains_key("empty"));
        assert!(!out.contains_key("bad key!"));
    }

    #[test]
    fn clause_builders() {
        let props = sanitize_props(
            serde_json::json!({"status": "active", "priority": 3})
                .as_object()
                .unwrap(),
        );
        let set = set_clause(&props, "p");
        assert!(set.starts_with(", "));
        assert!(set.contains("p.status = $status"));
        assert!(set.contains("p.priority = $priority"));

        let inline = inline_props(&props);
        assert!(inline.contains("status: $status"));

        assert_eq!(set_clause(&Map::new(), "p"), "");
        assert_eq!(inline_props(&Map::new()), "");
    }

    #[test]
    fn display_name_prefers_arabic_pair() {
        let props = serde_json::json!({"name": "Mohammed", "name_ar": "محمد"});
        assert_eq!(display_name(props.as_object().unwrap()), "محمد (Mohammed)");

        let plain = serde_json::json!({"title": "renew passport"});
        assert_eq!(display_name(plain.as_object().unwrap()), "renew passport");
    }

    #[test]
    fn clean_props_hides_internal_fields() {
        let props = serde_json::json!({
            "name": "Farm", "created_at": "x", "name_aliases": ["f"], "status": "active"
        });
        let cleaned = clean_props(props.as_object().unwrap());
        assert!(cleaned.contains_key("name"));
        assert!(cleaned.contains_key("status"));
        assert!(!cleaned.contains_key("created_at"));
        assert!(!cleaned.contains_key("name_aliases"));
    }
}
