// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity resolution: collapse `Mohammed / Mohamed / محمد` into one
//! canonical node while keeping every surface form in `name_aliases`.

use std::collections::HashMap;
use std::sync::Arc;

use rafiq_vector::{PointPayload, SearchFilters};
use rafiq_core::RafiqError;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::build_query;
use crate::cypher::{is_safe_identifier, key_field};
use crate::GraphService;

/// Labels whose instances are never merged by resolution.
const SKIP_TYPES: [&str; 6] = ["Expense", "Debt", "Reminder", "Item", "Idea", "Tag"];

impl GraphService {
    fn threshold_for(&self, entity_type: &str) -> f32 {
        if entity_type == "Person" {
            self.config.resolution.person_threshold
        } else {
            self.config.resolution.default_threshold
        }
    }

    fn resolution_lock(&self, entity_type: &str, name: &str) -> Arc<Mutex<()>> {
        let key = format!("{entity_type}:{}", name.to_lowercase());
        self.resolution_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Resolves an incoming name against existing nodes of `label`.
    ///
    /// 1. Vector search over the `entity_type = label` namespace, top-k.
    /// 2. Above the label threshold: the stored name wins; the incoming
    ///    string is appended to its `name_aliases`.
    /// 3. Otherwise a case-insensitive CONTAINS fallback over name + aliases.
    /// 4. Still no match: the incoming name is canonical and its embedding
    ///    is registered for future lookups.
    ///
    /// Concurrent resolution of the same normalised name serialises on a
    /// per-name lock; the read-then-write of `name_aliases` stays short.
    pub async fn resolve_entity_name(&self, name: &str, entity_type: &str) -> Result<String, RafiqError> {
        if name.is_empty()
            || !self.config.resolution.enabled
            || SKIP_TYPES.contains(&entity_type)
            || !is_safe_identifier(entity_type)
        {
            return Ok(name.to_string());
        }

        let lock = self.resolution_lock(entity_type, name);
        let _guard = lock.lock().await;

        let mut found_self = false;

        // Strategy 1: vector similarity.
        match self
            .vector
            .search(name, 10, &SearchFilters::entity(entity_type))
            .await
        {
            Ok(hits) => {
                let threshold = self.threshold_for(entity_type);
                for hit in &hits {
                    let other = hit.payload_str("entity_name");
                    if other == name {
                        found_self = true;
                        continue;
                    }
                    if !other.is_empty() && hit.score >= threshold {
                        info!(
                            from = name,
                            to = other,
                            entity_type,
                            score = hit.score,
                            "entity resolved (vector)"
                        );
                        let canonical = other.to_string();
                        self.store_alias(entity_type, &canonical, name).await?;
                        return Ok(canonical);
                    }
                }
            }
            Err(e) => debug!(name, error = %e, "entity resolution vector search failed"),
        }

        // Strategy 2: graph CONTAINS fallback over name and aliases.
        if name.chars().count() >= 3 {
            if let Some(canonical) = self.resolve_by_graph_contains(name, entity_type).await? {
                return Ok(canonical);
            }
        }

        // No match: register the new name for future vector resolution.
        if !found_self {
            let payload = PointPayload {
                source_type: Some("entity".into()),
                entity_type: Some(entity_type.to_string()),
                entity_name: Some(name.to_string()),
                ..Default::default()
            };
            if let Err(e) = self
                .vector
                .upsert_chunks(&[name.to_string()], vec![payload])
                .await
            {
                debug!(name, error = %e, "entity registration skipped");
            }
        }

        Ok(name.to_string())
    }

    async fn resolve_by_graph_contains(
        &self,
        name: &str,
        entity_type: &str,
    ) -> Result<Option<String>, RafiqError> {
        let key = key_field(entity_type);
        let cypher = format!(
            "MATCH (n:{entity_type})
             WHERE toLower(n.{key}) CONTAINS toLower($term)
                OR any(a IN coalesce(n.name_aliases, []) WHERE toLower(a) CONTAINS toLower($term))
             RETURN n.{key} AS canonical
             LIMIT 3"
        );
        let rows = self
            .client
            .fetch_all(build_query(&cypher, &[("term", Value::String(name.into()))]))
            .await?;

        match rows.len() {
            1 => {
                let canonical: String = rows[0].get("canonical").unwrap_or_default();
                if canonical.is_empty() {
                    return Ok(None);
                }
                info!(from = name, to = %canonical, entity_type, "entity resolved (graph CONTAINS)");
                self.store_alias(entity_type, &canonical, name).await?;
                Ok(Some(canonical))
            }
            n if n > 1 => {
                debug!(name, candidates = n, "entity resolution ambiguous, keeping incoming name");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Appends an alias to the canonical node's `name_aliases`, once.
    pub(crate) async fn store_alias(
        &self,
        label: &str,
        canonical: &str,
        alias: &str,
    ) -> Result<(), RafiqError> {
        if alias == canonical || !is_safe_identifier(label) {
            return Ok(());
        }
        let key = key_field(label);
        let cypher = format!(
            "MATCH (n:{label} {{{key}: $canonical}})
             SET n.name_aliases = CASE
                 WHEN n.name_aliases IS NULL THEN [$alias]
                 WHEN NOT $alias IN n.name_aliases THEN n.name_aliases + [$alias]
                 ELSE n.name_aliases
             END"
        );
        self.client
            .run(build_query(
                &cypher,
                &[
                    ("canonical", Value::String(canonical.into())),
                    ("alias", Value::String(alias.into())),
                ],
            ))
            .await
    }

    /// Batch resolution for one extraction: embeds all names in a single
    /// call, searches concurrently, and registers the misses in one upsert.
    /// The returned map covers every input pair.
    pub async fn resolve_entity_names_batch(
        &self,
        pairs: &[(String, String)],
    ) -> Result<HashMap<(String, String), String>, RafiqError> {
        let mut resolved: HashMap<(String, String), String> = pairs
            .iter()
            .map(|p| (p.clone(), p.0.clone()))
            .collect();

        if !self.config.resolution.enabled {
            return Ok(resolved);
        }

        let mut to_resolve: Vec<(String, String)> = Vec::new();
        for (name, etype) in pairs {
            if name.is_empty()
                || SKIP_TYPES.contains(&etype.as_str())
                || !is_safe_identifier(etype)
                || to_resolve.contains(&(name.clone(), etype.clone()))
            {
                continue;
            }
            to_resolve.push((name.clone(), etype.clone()));
        }
        if to_resolve.is_empty() {
            return Ok(resolved);
        }

        // One embedding call for every name.
        let names: Vec<String> = to_resolve.iter().map(|(n, _)| n.clone()).collect();
        let vectors = self.vector.embed(&names).await?;
        debug!(count = names.len(), "batch entity resolution embedded names");

        // Concurrent searches, one per name.
        let searches = to_resolve.iter().zip(vectors.iter()).map(|((_, etype), vector)| {
            let filters = SearchFilters::entity(etype.clone());
            async move { self.vector.search_by_vector(vector, 10, &filters).await }
        });
        let results = futures::future::join_all(searches).await;

        let mut new_names: Vec<String> = Vec::new();
        let mut new_vectors: Vec<Vec<f32>> = Vec::new();
        let mut new_payloads: Vec<PointPayload> = Vec::new();

        for (i, hits) in results.into_iter().enumerate() {
            let (name, etype) = &to_resolve[i];
            let threshold = self.threshold_for(etype);
            let mut found_self = false;
            let mut winner: Option<String> = None;

            for hit in hits.unwrap_or_default() {
                let other = hit.payload_str("entity_name").to_string();
                if other == *name {
                    found_self = true;
                    continue;
                }
                if !other.is_empty() && hit.score >= threshold {
                    info!(from = %name, to = %other, entity_type = %etype, score = hit.score, "entity resolved (batch)");
                    winner = Some(other);
                    break;
                }
            }

            if let Some(canonical) = winner {
                self.store_alias(etype, &canonical, name).await?;
                resolved.insert((name.clone(), etype.clone()), canonical);
            } else if !found_self {
                new_names.push(name.clone());
                new_vectors.push(vectors[i].clone());
                new_payloads.push(PointPayload {
                    source_type: Some("entity".into()),
                    entity_type: Some(etype.clone()),
                    entity_name: Some(name.clone()),
                    ..Default::default()
                });
            }
        }

        if !new_names.is_empty() {
            let count = new_names.len();
            self.vector
                .upsert_with_vectors(&new_names, new_vectors, new_payloads)
                .await?;
            info!(count, "batch registered new entity names");
        }

        Ok(resolved)
    }
}
