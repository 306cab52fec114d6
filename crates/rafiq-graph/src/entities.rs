// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed upserts for the simple entity labels and the generic relationship
//! helper. Project, reminder, task, list, inventory, and productivity nodes
//! have their own modules.

use rafiq_core::RafiqError;
use rafiq_vector::{PointPayload, SearchFilters};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::build_query;
use crate::cypher::{inline_props, is_safe_identifier, key_field, sanitize_props, set_clause};
use crate::normalize;
use crate::GraphService;

impl GraphService {
    fn props_params<'a>(
        props: &'a Map<String, Value>,
        base: Vec<(&'a str, Value)>,
    ) -> Vec<(&'a str, Value)> {
        let mut params = base;
        for (k, v) in props {
            params.push((k.as_str(), v.clone()));
        }
        params
    }

    /// Upserts a Person. A `date_of_birth` with year < 1900 is treated as
    /// Hijri: both surface forms are stored and the Gregorian one becomes
    /// the ordering value.
    pub async fn upsert_person(
        &self,
        name: &str,
        props: Map<String, Value>,
    ) -> Result<String, RafiqError> {
        let name = self.resolve_entity_name(name, "Person").await?;
        let mut props = sanitize_props(&props);
        if let Some(dob) = props.get("date_of_birth").and_then(Value::as_str) {
            let (gregorian, hijri) = normalize::convert_dob_if_hijri(dob);
            if let Some(h) = hijri {
                props.insert("date_of_birth".into(), Value::String(gregorian));
                props.insert("date_of_birth_hijri".into(), Value::String(h));
            }
        }
        let sets = set_clause(&props, "p");
        let cypher = format!(
            "MERGE (p:Person {{name: $name}})
             ON CREATE SET p.created_at = $now {sets}
             ON MATCH SET p.updated_at = $now {sets}"
        );
        let params = Self::props_params(
            &props,
            vec![
                ("name", Value::String(name.clone())),
                ("now", Value::String(self.now())),
            ],
        );
        self.client.run(build_query(&cypher, &params)).await?;
        Ok(name)
    }

    pub async fn upsert_company(
        &self,
        name: &str,
        props: Map<String, Value>,
    ) -> Result<String, RafiqError> {
        let name = self.resolve_entity_name(name, "Company").await?;
        let props = sanitize_props(&props);
        let sets = set_clause(&props, "c");
        let cypher = format!(
            "MERGE (c:Company {{name: $name}})
             ON CREATE SET c.created_at = $now {sets}
             ON MATCH SET c.updated_at = $now {sets}"
        );
        let params = Self::props_params(
            &props,
            vec![
                ("name", Value::String(name.clone())),
                ("now", Value::String(self.now())),
            ],
        );
        self.client.run(build_query(&cypher, &params)).await?;
        Ok(name)
    }

    pub async fn upsert_topic(
        &self,
        name: &str,
        props: Map<String, Value>,
    ) -> Result<String, RafiqError> {
        let name = self.resolve_entity_name(name, "Topic").await?;
        let props = sanitize_props(&props);
        let sets = set_clause(&props, "t");
        let cypher = format!(
            "MERGE (t:Topic {{name: $name}})
             ON CREATE SET t.created_at = $now {sets}"
        );
        let params = Self::props_params(
            &props,
            vec![
                ("name", Value::String(name.clone())),
                ("now", Value::String(self.now())),
            ],
        );
        self.client.run(build_query(&cypher, &params)).await?;
        Ok(name)
    }

    /// Normalises, vector-dedups (threshold 0.85), and merges a Tag node.
    /// Returns the canonical tag name.
    pub async fn upsert_tag(&self, name: &str) -> Result<String, RafiqError> {
        let mut name = normalize::normalize_tag(name);
        if name.is_empty() {
            return Ok(name);
        }

        if self.config.resolution.enabled {
            match self.vector.search(&name, 3, &SearchFilters::entity("Tag")).await {
                Ok(hits) => {
                    let mut matched = false;
                    for hit in hits {
                        let other = hit.payload_str("entity_name").to_string();
                        if !other.is_empty()
                            && other.to_lowercase() != name.to_lowercase()
                            && hit.score >= 0.85
                        {
                            info!(from = %name, to = %other, score = hit.score, "tag resolved");
                            name = other;
                            matched = true;
                            break;
                        }
                    }
                    if !matched {
                        let payload = PointPayload {
                            source_type: Some("entity".into()),
                            entity_type: Some("Tag".into()),
                            entity_name: Some(name.clone()),
                            ..Default::default()
                        };
                        if let Err(e) = self.vector.upsert_chunks(&[name.clone()], vec![payload]).await
                        {
                            debug!(error = %e, "tag registration skipped");
                        }
                    }
                }
                Err(e) => debug!(error = %e, "tag resolution failed"),
            }
        }

        self.client
            .run(build_query(
                "MERGE (t:Tag {name: $name}) ON CREATE SET t.created_at = $now",
                &[
                    ("name", Value::String(name.clone())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;
        Ok(name)
    }

    /// TAGGED_WITH edge between an entity and a (canonicalised) tag.
    pub async fn tag_entity(
        &self,
        entity_label: &str,
        entity_value: &str,
        tag_name: &str,
    ) -> Result<(), RafiqError> {
        let tag = self.upsert_tag(tag_name).await?;
        if tag.is_empty() {
            return Ok(());
        }
        if let Err(e) = self
            .create_relationship(entity_label, entity_value, "TAGGED_WITH", "Tag", &tag)
            .await
        {
            debug!(error = %e, "tag link skipped");
        }
        Ok(())
    }

    /// Creates a Knowledge node, auto-categorised when no category is given,
    /// and auto-tagged with its category.
    pub async fn upsert_knowledge(
        &self,
        title: &str,
        props: Map<String, Value>,
    ) -> Result<String, RafiqError> {
        let title = self.resolve_entity_name(title, "Knowledge").await?;
        let mut props = sanitize_props(&props);
        let category = props
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                let content = props.get("content").and_then(Value::as_str).unwrap_or("");
                normalize::guess_knowledge_category(&title, content).to_string()
            });
        props.insert("category".into(), Value::String(category.clone()));

        let inline = inline_props(&props);
        let cypher = format!("CREATE (k:Knowledge {{title: $title, created_at: $now{inline}}})");
        let params = Self::props_params(
            &props,
            vec![
                ("title", Value::String(title.clone())),
                ("now", Value::String(self.now())),
            ],
        );
        self.client.run(build_query(&cypher, &params)).await?;

        if !category.is_empty() {
            self.tag_entity("Knowledge", &title, &category).await?;
        }
        Ok(title)
    }

    /// Creates an Idea node and links semantically similar ideas.
    pub async fn create_idea(
        &self,
        title: &str,
        props: Map<String, Value>,
    ) -> Result<String, RafiqError> {
        let props = sanitize_props(&props);
        let inline = inline_props(&props);
        let cypher = format!("CREATE (i:Idea {{title: $title, created_at: $now{inline}}})");
        let params = Self::props_params(
            &props,
            vec![
                ("title", Value::String(title.to_string())),
                ("now", Value::String(self.now())),
            ],
        );
        self.client.run(build_query(&cypher, &params)).await?;

        let description = props
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");
        self.detect_similar_ideas(title, description).await;
        Ok(title.to_string())
    }

    /// Embeds the idea and creates SIMILAR_TO edges for matches ≥ 0.7.
    /// Failures are logged, never surfaced.
    async fn detect_similar_ideas(&self, title: &str, description: &str) {
        let idea_text = if description.is_empty() {
            title.to_string()
        } else {
            format!("{title}. {description}")
        };
        let payload = PointPayload {
            source_type: Some("entity".into()),
            entity_type: Some("Idea".into()),
            entity_name: Some(title.to_string()),
            ..Default::default()
        };
        if let Err(e) = self
            .vector
            .upsert_chunks(&[idea_text.clone()], vec![payload])
            .await
        {
            debug!(error = %e, "idea embedding skipped");
            return;
        }
        let hits = match self
            .vector
            .search(&idea_text, 5, &SearchFilters::entity("Idea"))
            .await
        {
            Ok(h) => h,
            Err(e) => {
                debug!(error = %e, "idea similarity search failed");
                return;
            }
        };
        for hit in hits {
            let other = hit.payload_str("entity_name");
            if !other.is_empty() && other != title && hit.score >= 0.7 {
                if let Err(e) = self
                    .create_relationship("Idea", title, "SIMILAR_TO", "Idea", other)
                    .await
                {
                    debug!(error = %e, "similar idea link skipped");
                } else {
                    info!(a = title, b = other, score = hit.score, "linked similar ideas");
                }
            }
        }
    }

    /// MERGE a relationship between two existing nodes, matched by their
    /// label key fields.
    pub async fn create_relationship(
        &self,
        from_label: &str,
        from_value: &str,
        rel_type: &str,
        to_label: &str,
        to_value: &str,
    ) -> Result<(), RafiqError> {
        if !is_safe_identifier(from_label)
            || !is_safe_identifier(to_label)
            || !is_safe_identifier(rel_type)
        {
            return Err(RafiqError::Validation(format!(
                "invalid relationship identifiers: {from_label}/{rel_type}/{to_label}"
            )));
        }
        let from_key = key_field(from_label);
        let to_key = key_field(to_label);
        let cypher = format!(
            "MATCH (a:{from_label} {{{from_key}: $from_val}})
             MATCH (b:{to_label} {{{to_key}: $to_val}})
             MERGE (a)-[:{rel_type}]->(b)"
        );
        self.client
            .run(build_query(
                &cypher,
                &[
                    ("from_val", Value::String(from_value.into())),
                    ("to_val", Value::String(to_value.into())),
                ],
            ))
            .await
    }

    /// Generic CREATE used by the extraction router for labels without a
    /// dedicated upsert.
    pub(crate) async fn create_generic(
        &self,
        label: &str,
        value: &str,
        props: Map<String, Value>,
    ) -> Result<(), RafiqError> {
        if !is_safe_identifier(label) {
            return Err(RafiqError::Validation(format!("invalid label: {label}")));
        }
        let key = key_field(label);
        let props = sanitize_props(&props);
        let inline = inline_props(&props);
        let cypher = format!("CREATE (n:{label} {{{key}: $value, created_at: $now{inline}}})");
        let params = Self::props_params(
            &props,
            vec![
                ("value", Value::String(value.into())),
                ("now", Value::String(self.now())),
            ],
        );
        self.client.run(build_query(&cypher, &params)).await
    }
}
