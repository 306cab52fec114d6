// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-hop context retrieval, node search, and the graph export used by
//! backup and visualisation.

use neo4rs::Node;
use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};

use crate::client::build_query;
use crate::cypher::{clean_props, display_name, is_safe_identifier, key_field};
use crate::GraphService;

/// Relationship types allowed on the third hop.
const HOP3_RELS: &str = "['BELONGS_TO','INVOLVES','WORKS_AT','RELATED_TO','TAGGED_WITH','STORED_IN','SIMILAR_TO']";

/// All properties of a node as a JSON map.
pub fn node_props(node: &Node) -> Map<String, Value> {
    let mut props = Map::new();
    for key in node.keys() {
        if let Ok(value) = node.get::<Value>(key) {
            props.insert(key.to_string(), value);
        }
    }
    props
}

fn hop_fragment(rel: &Option<String>, label: &Option<String>, node: &Option<Node>) -> Option<String> {
    match (rel, node) {
        (Some(rel), Some(node)) if !rel.is_empty() => {
            let name = display_name(&node_props(node));
            let label = label.clone().unwrap_or_default();
            Some(format!("-[{rel}]-> [{label}] {name}"))
        }
        _ => None,
    }
}

impl GraphService {
    /// Multi-hop neighbourhood of one entity, display-formatted and capped
    /// at 30 lines. Hops 1–2 are unrestricted; hop 3 follows only the
    /// context-safe relationship types.
    pub async fn query_entity_context(
        &self,
        label: &str,
        value: &str,
    ) -> Result<String, RafiqError> {
        if !is_safe_identifier(label) {
            return Err(RafiqError::Validation(format!("invalid label: {label}")));
        }
        let key = key_field(label);
        let max_hops = self.config.resolution.graph_max_hops;

        let cypher = if max_hops <= 2 {
            format!(
                "MATCH (root:{label} {{{key}: $value}})
                 OPTIONAL MATCH (root)-[r1]-(n1)
                 OPTIONAL MATCH (n1)-[r2]-(n2)
                 WHERE n2 <> root
                 RETURN root, type(r1) AS t1, labels(n1)[0] AS l1, n1,
                        type(r2) AS t2, labels(n2)[0] AS l2, n2
                 LIMIT 50"
            )
        } else {
            format!(
                "MATCH (root:{label} {{{key}: $value}})
                 OPTIONAL MATCH (root)-[r1]-(n1)
                 OPTIONAL MATCH (n1)-[r2]-(n2)
                 WHERE n2 <> root
                 OPTIONAL MATCH (n2)-[r3]-(n3)
                 WHERE n3 <> root AND n3 <> n1 AND type(r3) IN {HOP3_RELS}
                 RETURN root, type(r1) AS t1, labels(n1)[0] AS l1, n1,
                        type(r2) AS t2, labels(n2)[0] AS l2, n2,
                        type(r3) AS t3, labels(n3)[0] AS l3, n3
                 LIMIT 80"
            )
        };
        let rows = self
            .client
            .fetch_all(build_query(&cypher, &[("value", Value::String(value.into()))]))
            .await?;

        let mut seen = std::collections::HashSet::new();
        let mut parts = Vec::new();
        for row in &rows {
            let mut fragments = Vec::new();
            if let Ok(root) = row.get::<Node>("root") {
                fragments.push(
                    serde_json::to_string(&clean_props(&node_props(&root))).unwrap_or_default(),
                );
            }
            for (t, l, n) in [("t1", "l1", "n1"), ("t2", "l2", "n2"), ("t3", "l3", "n3")] {
                let rel: Option<String> = row.get(t).ok();
                let label: Option<String> = row.get(l).ok();
                let node: Option<Node> = row.get(n).ok();
                if let Some(frag) = hop_fragment(&rel, &label, &node) {
                    fragments.push(frag);
                }
            }
            if fragments.len() > 1 || (fragments.len() == 1 && parts.is_empty()) {
                let line = fragments.join(" ");
                if seen.insert(line.clone()) {
                    parts.push(line);
                }
            }
        }
        parts.truncate(30);
        Ok(parts.join("\n"))
    }

    /// Person lookup: exact context, then candidate proper nouns / Arabic
    /// tokens from the query, then a summary of all known persons.
    pub async fn query_person_context(&self, query: &str) -> Result<String, RafiqError> {
        let ctx = self.query_entity_context("Person", query).await?;
        if !ctx.is_empty() {
            return Ok(ctx);
        }

        const STOP_WORDS: [&str; 24] = [
            "how", "old", "is", "my", "the", "what", "who", "when", "where", "about", "tell",
            "me", "many", "much", "does", "do", "are", "was", "number", "name", "age", "born",
            "date", "family",
        ];
        let mut candidates: Vec<String> = Vec::new();
        for word in query.split_whitespace() {
            let clean = word.trim_end_matches("'s").trim_matches(|c: char| !c.is_alphanumeric());
            if clean.chars().count() > 2
                && clean.chars().next().is_some_and(|c| c.is_uppercase())
                && clean.chars().all(|c| c.is_alphabetic())
                && !STOP_WORDS.contains(&clean.to_lowercase().as_str())
            {
                candidates.push(clean.to_string());
            }
        }
        // Arabic tokens are candidate names as well.
        candidates.extend(
            query
                .split_whitespace()
                .filter(|w| w.chars().any(|c| c as u32 > 127) && w.chars().count() > 1)
                .map(str::to_string),
        );

        let mut all_parts = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for candidate in &candidates {
            let rows = self
                .client
                .fetch_all(build_query(
                    "MATCH (p:Person) WHERE toLower(p.name) CONTAINS toLower($w)
                     RETURN p.name AS name LIMIT 5",
                    &[("w", Value::String(candidate.clone()))],
                ))
                .await?;
            for row in &rows {
                let name: String = row.get("name").unwrap_or_default();
                if name.is_empty() || !seen.insert(name.clone()) {
                    continue;
                }
                let ctx = self.query_entity_context("Person", &name).await?;
                if !ctx.is_empty() {
                    all_parts.push(ctx);
                }
            }
        }
        if !all_parts.is_empty() {
            return Ok(all_parts.join("\n\n"));
        }

        // No specific name found: summary of all persons.
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (p:Person)
                 OPTIONAL MATCH (p)-[r]->(other:Person)
                 RETURN p AS person, collect(DISTINCT type(r) + ' → ' + other.name) AS rels
                 ORDER BY p.name LIMIT 20",
                &[],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(String::new());
        }
        let mut parts = vec!["Known persons:".to_string()];
        for row in &rows {
            let Ok(node) = row.get::<Node>("person") else {
                continue;
            };
            let props = clean_props(&node_props(&node));
            let display = display_name(&props);
            let details: Vec<String> = props
                .iter()
                .filter(|(k, v)| !["name", "name_ar"].contains(&k.as_str()) && !v.is_null())
                .map(|(k, v)| format!("{k}: {}", v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                .collect();
            let rels: Vec<String> = row.get("rels").unwrap_or_default();
            let mut line = format!("  - {display}");
            if !details.is_empty() {
                line.push_str(&format!(" ({})", details.join(", ")));
            }
            let rels: Vec<String> = rels.into_iter().filter(|r| !r.ends_with("→ ")).collect();
            if !rels.is_empty() {
                line.push_str(&format!(" [{}]", rels.join(", ")));
            }
            parts.push(line);
        }
        Ok(parts.join("\n"))
    }

    /// Substring search over names, titles, and descriptions.
    pub async fn search_nodes(&self, text: &str, limit: usize) -> Result<String, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (n)
                 WHERE toLower(n.name) CONTAINS $text
                    OR toLower(n.title) CONTAINS $text
                    OR toLower(n.description) CONTAINS $text
                 RETURN labels(n)[0] AS label, coalesce(n.name, n.title) AS name
                 LIMIT $limit",
                &[
                    ("text", Value::String(text.to_lowercase())),
                    ("limit", Value::from(limit as i64)),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(String::new());
        }
        let mut parts = vec!["Graph search results:".to_string()];
        for row in &rows {
            let label: String = row.get("label").unwrap_or_default();
            let name: String = row.get("name").unwrap_or_default();
            parts.push(format!("  [{label}] {name}"));
        }
        Ok(parts.join("\n"))
    }

    /// Sections (and their projects) whose names match the text, with the
    /// entities assigned to them.
    pub async fn search_sections(&self, text: &str, limit: usize) -> Result<String, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (p:Project)-[:HAS_SECTION]->(s:Section)
                 WHERE toLower(s.name) CONTAINS $text OR toLower(p.name) CONTAINS $text
                 OPTIONAL MATCH (e)-[:IN_SECTION]->(s)
                 RETURN p.name AS project, s.name AS section,
                        collect(coalesce(e.name, e.title)) AS entities
                 LIMIT $limit",
                &[
                    ("text", Value::String(text.to_lowercase())),
                    ("limit", Value::from(limit as i64)),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::new();
        for row in &rows {
            let project: String = row.get("project").unwrap_or_default();
            let section: String = row.get("section").unwrap_or_default();
            let entities: Vec<String> = row.get("entities").unwrap_or_default();
            let entities: Vec<String> = entities.into_iter().filter(|e| !e.is_empty()).collect();
            let mut line = format!("Section '{section}' in project '{project}'");
            if !entities.is_empty() {
                line.push_str(&format!(": {}", entities.join(", ")));
            }
            parts.push(line);
        }
        Ok(parts.join("\n"))
    }

    // --- Export / schema / stats (backup + visualisation) ---

    /// Full export: nodes with labels + properties, edges with type,
    /// endpoints, and properties.
    pub async fn export_graph(&self) -> Result<Value, RafiqError> {
        let node_rows = self
            .client
            .fetch_all(build_query("MATCH (n) RETURN n AS node, labels(n) AS lbls", &[]))
            .await?;
        let mut nodes = Vec::new();
        for row in &node_rows {
            let Ok(node) = row.get::<Node>("node") else {
                continue;
            };
            let labels: Vec<String> = row.get("lbls").unwrap_or_default();
            nodes.push(json!({
                "labels": labels,
                "properties": Value::Object(node_props(&node)),
            }));
        }

        let edge_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (a)-[r]->(b)
                 RETURN coalesce(a.name, a.title, a.file_hash, a.path) AS source_name,
                        labels(a) AS source_labels, type(r) AS rel_type,
                        coalesce(b.name, b.title, b.file_hash, b.path) AS target_name,
                        labels(b) AS target_labels",
                &[],
            ))
            .await?;
        let mut edges = Vec::new();
        for row in &edge_rows {
            edges.push(json!({
                "source_name": row.get::<String>("source_name").unwrap_or_default(),
                "source_labels": row.get::<Vec<String>>("source_labels").unwrap_or_default(),
                "rel_type": row.get::<String>("rel_type").unwrap_or_default(),
                "target_name": row.get::<String>("target_name").unwrap_or_default(),
                "target_labels": row.get::<Vec<String>>("target_labels").unwrap_or_default(),
            }));
        }

        Ok(json!({"nodes": nodes, "edges": edges}))
    }

    /// Label and relationship-type counts.
    pub async fn graph_schema(&self) -> Result<Value, RafiqError> {
        let label_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (n) RETURN labels(n)[0] AS label, count(n) AS cnt ORDER BY cnt DESC",
                &[],
            ))
            .await?;
        let labels: Vec<Value> = label_rows
            .iter()
            .map(|r| {
                json!({
                    "label": r.get::<String>("label").unwrap_or_default(),
                    "count": r.get::<i64>("cnt").unwrap_or_default(),
                })
            })
            .collect();

        let rel_rows = self
            .client
            .fetch_all(build_query(
                "MATCH ()-[r]->() RETURN type(r) AS rel, count(r) AS cnt ORDER BY cnt DESC",
                &[],
            ))
            .await?;
        let rels: Vec<Value> = rel_rows
            .iter()
            .map(|r| {
                json!({
                    "type": r.get::<String>("rel").unwrap_or_default(),
                    "count": r.get::<i64>("cnt").unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({"labels": labels, "relationship_types": rels}))
    }

    /// Node/edge totals.
    pub async fn graph_stats(&self) -> Result<Value, RafiqError> {
        let nodes = self
            .client
            .fetch_one(build_query("MATCH (n) RETURN count(n) AS cnt", &[]))
            .await?
            .map(|r| r.get::<i64>("cnt").unwrap_or_default())
            .unwrap_or(0);
        let edges = self
            .client
            .fetch_one(build_query("MATCH ()-[r]->() RETURN count(r) AS cnt", &[]))
            .await?
            .map(|r| r.get::<i64>("cnt").unwrap_or_default())
            .unwrap_or(0);
        Ok(json!({"nodes": nodes, "edges": edges}))
    }

    /// MERGE-based restore of an exported graph (idempotent).
    pub async fn restore_graph(&self, data: &Value) -> Result<Value, RafiqError> {
        let mut node_count = 0usize;
        for node in data["nodes"].as_array().cloned().unwrap_or_default() {
            let labels = node["labels"].as_array().cloned().unwrap_or_default();
            let Some(label) = labels.first().and_then(Value::as_str) else {
                continue;
            };
            if !is_safe_identifier(label) {
                continue;
            }
            let Some(props) = node["properties"].as_object() else {
                continue;
            };
            let key = key_field(label);
            let Some(key_val) = props.get(key).and_then(Value::as_str) else {
                continue;
            };

            let rest: Map<String, Value> = props
                .iter()
                .filter(|(k, _)| k.as_str() != key && is_safe_identifier(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let set_clause = if rest.is_empty() {
                String::new()
            } else {
                let sets: Vec<String> = rest.keys().map(|k| format!("n.{k} = ${k}")).collect();
                format!(" SET {}", sets.join(", "))
            };
            let cypher = format!("MERGE (n:{label} {{{key}: $key_val}}){set_clause}");
            let mut params = vec![("key_val", Value::String(key_val.into()))];
            for (k, v) in &rest {
                params.push((k.as_str(), v.clone()));
            }
            if self.client.run(build_query(&cypher, &params)).await.is_ok() {
                node_count += 1;
            }
        }

        let mut edge_count = 0usize;
        for edge in data["edges"].as_array().cloned().unwrap_or_default() {
            let src_label = edge["source_labels"][0].as_str().unwrap_or_default();
            let tgt_label = edge["target_labels"][0].as_str().unwrap_or_default();
            let rel_type = edge["rel_type"].as_str().unwrap_or("RELATED_TO");
            let src = edge["source_name"].as_str().unwrap_or_default();
            let tgt = edge["target_name"].as_str().unwrap_or_default();
            if src.is_empty()
                || tgt.is_empty()
                || !is_safe_identifier(src_label)
                || !is_safe_identifier(tgt_label)
                || !is_safe_identifier(rel_type)
            {
                continue;
            }
            let src_key = key_field(src_label);
            let tgt_key = key_field(tgt_label);
            let cypher = format!(
                "MATCH (a:{src_label} {{{src_key}: $src}})
                 MATCH (b:{tgt_label} {{{tgt_key}: $tgt}})
                 MERGE (a)-[r:{rel_type}]->(b)"
            );
            if self
                .client
                .run(build_query(
                    &cypher,
                    &[
                        ("src", Value::String(src.into())),
                        ("tgt", Value::String(tgt.into())),
                    ],
                ))
                .await
                .is_ok()
            {
                edge_count += 1;
            }
        }

        Ok(json!({"nodes": node_count, "edges": edge_count}))
    }
}
