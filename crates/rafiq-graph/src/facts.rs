// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing LLM-extracted facts into typed upserts.

use rafiq_core::{ExtractedEntity, ExtractedFacts, RafiqError};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::build_query;
use crate::cypher::key_field;
use crate::GraphService;

/// Pseudo-entities that mutate existing state instead of creating nodes.
const PSEUDO_TYPES: [&str; 4] = ["DebtPayment", "ItemUsage", "ItemMove", "ReminderAction"];

/// Created only through tools; the extractor must never materialise them.
const TOOL_ONLY_TYPES: [&str; 2] = ["Section", "ListEntry"];

/// Labels auto-linked to the focused project when extraction produced no
/// explicit project relationship.
const PROJECT_LINKABLE: [&str; 6] = ["Task", "Knowledge", "Idea", "Sprint", "Section", "List"];

/// Relationship targets that go through entity resolution.
const RESOLVABLE_TARGETS: [&str; 4] = ["Person", "Company", "Project", "Topic"];

fn props_of(entity: &ExtractedEntity) -> Map<String, Value> {
    entity.properties.clone().into_iter().collect()
}

impl GraphService {
    /// Upserts every extracted entity and its relationships. Entities from
    /// one document are processed serially so resolution stays consistent;
    /// names are batch-resolved up front. Returns the upsert count.
    ///
    /// Applying the same facts twice yields the same graph (MERGE-based
    /// upserts; pseudo-entity effects excepted by design).
    pub async fn upsert_from_facts(
        &self,
        facts: &ExtractedFacts,
        file_hash: Option<&str>,
        active_project: Option<&str>,
    ) -> Result<usize, RafiqError> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for entity in &facts.entities {
            if !entity.entity_type.is_empty() && !entity.entity_name.is_empty() {
                pairs.push((entity.entity_name.clone(), entity.entity_type.clone()));
                for rel in &entity.relationships {
                    if !rel.target_type.is_empty() && !rel.target_name.is_empty() {
                        pairs.push((rel.target_name.clone(), rel.target_type.clone()));
                    }
                }
            }
        }
        let resolved = self.resolve_entity_names_batch(&pairs).await?;
        let resolve = |name: &str, etype: &str| -> String {
            resolved
                .get(&(name.to_string(), etype.to_string()))
                .cloned()
                .unwrap_or_else(|| name.to_string())
        };

        let mut count = 0usize;
        for entity in &facts.entities {
            let etype = entity.entity_type.as_str();
            let ename = entity.entity_name.as_str();
            if etype.is_empty() || ename.is_empty() {
                continue;
            }
            if TOOL_ONLY_TYPES.contains(&etype) {
                debug!(etype, ename, "suppressed tool-only entity from extraction");
                continue;
            }
            if etype == "Project" && active_project.is_some() {
                info!(ename, active = active_project, "suppressed Project entity while a project is focused");
                continue;
            }

            match self
                .upsert_one(entity, &resolve(ename, etype), file_hash, active_project)
                .await
            {
                Ok(true) => count += 1,
                Ok(false) => {}
                Err(e) => warn!(etype, ename, error = %e, "failed to upsert extracted entity"),
            }
        }
        Ok(count)
    }

    /// Routes one entity by type. Returns whether anything was written.
    async fn upsert_one(
        &self,
        entity: &ExtractedEntity,
        resolved_name: &str,
        file_hash: Option<&str>,
        active_project: Option<&str>,
    ) -> Result<bool, RafiqError> {
        let etype = entity.entity_type.as_str();
        let mut props = props_of(entity);

        // Pseudo-entities: state transitions, no nodes, no provenance.
        match etype {
            "DebtPayment" => {
                let person = entity
                    .relationships
                    .iter()
                    .find(|r| r.target_type == "Person")
                    .map(|r| r.target_name.clone())
                    .unwrap_or_default();
                let amount = props.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
                let direction = props.get("direction").and_then(Value::as_str);
                if person.is_empty() || amount <= 0.0 {
                    return Ok(false);
                }
                let result = self.record_debt_payment(&person, amount, direction).await?;
                return Ok(result.get("error").is_none());
            }
            "ItemUsage" => {
                let used = props
                    .get("quantity_used")
                    .and_then(Value::as_i64)
                    .unwrap_or(1)
                    .abs();
                let result = self.adjust_item_quantity(&entity.entity_name, -used).await?;
                return Ok(result.get("error").is_none());
            }
            "ItemMove" => {
                let to = props
                    .get("to_location")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if to.is_empty() {
                    return Ok(false);
                }
                let from = props.get("from_location").and_then(Value::as_str);
                let result = self.move_item(&entity.entity_name, &to, from).await?;
                return Ok(result.get("error").is_none());
            }
            "ReminderAction" => {
                let action = props
                    .get("action")
                    .and_then(Value::as_str)
                    .unwrap_or("done")
                    .to_string();
                let title = props
                    .get("reminder_title")
                    .and_then(Value::as_str)
                    .unwrap_or(&entity.entity_name)
                    .to_string();
                let snooze = props.get("snooze_until").and_then(Value::as_str);
                let result = self.update_reminder_status(&title, &action, snooze).await?;
                return Ok(result.get("error").is_none());
            }
            _ => {}
        }

        // Regular entities.
        let written = match etype {
            "Person" => {
                self.upsert_person(resolved_name, props.clone()).await?;
                true
            }
            "Company" => {
                self.upsert_company(resolved_name, props.clone()).await?;
                true
            }
            "Project" => {
                self.upsert_project(resolved_name, props.clone()).await?;
                true
            }
            "Topic" => {
                self.upsert_topic(resolved_name, props.clone()).await?;
                true
            }
            "Tag" => {
                self.upsert_tag(resolved_name).await?;
                true
            }
            "Task" => {
                self.upsert_task(resolved_name, props.clone()).await?;
                true
            }
            "Knowledge" => {
                self.upsert_knowledge(resolved_name, props.clone()).await?;
                true
            }
            "Idea" => {
                self.create_idea(resolved_name, props.clone()).await?;
                true
            }
            "Reminder" => {
                self.create_reminder(resolved_name, props.clone()).await?;
                true
            }
            "Item" => {
                let result = self.upsert_item(resolved_name, "set", props.clone()).await?;
                result.get("error").is_none()
            }
            "List" => {
                let list_type = props
                    .get("list_type")
                    .and_then(Value::as_str)
                    .unwrap_or("checklist")
                    .to_string();
                self.create_list(resolved_name, &list_type, None, None).await?;
                true
            }
            "Expense" => {
                let amount = props.remove("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
                self.create_expense(resolved_name, amount, props.clone()).await?;
                true
            }
            "Debt" => {
                let person = entity
                    .relationships
                    .iter()
                    .find(|r| r.target_type == "Person")
                    .map(|r| r.target_name.clone())
                    .unwrap_or_else(|| resolved_name.to_string());
                let amount = props.remove("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let direction = props
                    .remove("direction")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| "i_owe".into());
                self.upsert_debt(&person, amount, &direction, props.clone()).await?;
                true
            }
            other => {
                self.create_generic(other, resolved_name, props.clone()).await?;
                true
            }
        };
        if !written {
            return Ok(false);
        }

        // Provenance edge; the File stub must already exist.
        if let Some(hash) = file_hash {
            if !PSEUDO_TYPES.contains(&etype) {
                if let Err(e) = self.link_entity_to_file(etype, resolved_name, hash).await {
                    debug!(etype, resolved_name, error = %e, "provenance link skipped");
                }
            }
        }

        // Auto-link to the focused project.
        if let Some(project) = active_project {
            if PROJECT_LINKABLE.contains(&etype)
                && !entity
                    .relationships
                    .iter()
                    .any(|r| r.target_type == "Project")
            {
                match self
                    .create_relationship(etype, resolved_name, "BELONGS_TO", "Project", project)
                    .await
                {
                    Ok(()) => info!(etype, resolved_name, project, "auto-linked to active project"),
                    Err(e) => debug!(error = %e, "active project link skipped"),
                }
            }
        }

        // Tasks with no project relationship: link by project-name mention.
        if etype == "Debt" {
            return Ok(true); // the INVOLVES edge is the only one a Debt gets
        }
        if etype == "Task"
            && !entity
                .relationships
                .iter()
                .any(|r| r.target_type == "Project" || r.rel_type == "BELONGS_TO")
        {
            self.auto_link_task_to_project(resolved_name).await;
        }

        // Remaining relationships.
        for rel in &entity.relationships {
            if rel.target_type.is_empty() || rel.target_name.is_empty() {
                continue;
            }
            let rel_type = if rel.rel_type.is_empty() {
                "RELATED_TO"
            } else {
                &rel.rel_type
            };
            let target_name = if RESOLVABLE_TARGETS.contains(&rel.target_type.as_str()) {
                self.resolve_entity_name(&rel.target_name, &rel.target_type)
                    .await?
            } else {
                rel.target_name.clone()
            };
            if rel.target_type == "Tag" {
                self.tag_entity(etype, resolved_name, &target_name).await?;
                continue;
            }
            if let Err(e) = self
                .create_relationship(etype, resolved_name, rel_type, &rel.target_type, &target_name)
                .await
            {
                debug!(error = %e, "relationship creation skipped");
            }
        }

        Ok(true)
    }

    /// Links a task to a project whose name appears inside the task title.
    async fn auto_link_task_to_project(&self, task_title: &str) {
        let rows = match self
            .client
            .fetch_all(build_query("MATCH (p:Project) RETURN p.name AS name", &[]))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                debug!(error = %e, "task auto-link project listing failed");
                return;
            }
        };
        let task_lower = task_title.to_lowercase();
        for row in &rows {
            let pname: String = row.get("name").unwrap_or_default();
            if !pname.is_empty() && task_lower.contains(&pname.to_lowercase()) {
                match self
                    .create_relationship("Task", task_title, "BELONGS_TO", "Project", &pname)
                    .await
                {
                    Ok(()) => {
                        info!(task = task_title, project = %pname, "auto-linked task to project");
                    }
                    Err(e) => debug!(error = %e, "task auto-link skipped"),
                }
                break;
            }
        }
    }
}

/// The key field used for a relationship endpoint (exposed for tests).
pub fn endpoint_key(label: &str) -> &'static str {
    key_field(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_and_tool_only_sets_are_disjoint() {
        for t in PSEUDO_TYPES {
            assert!(!TOOL_ONLY_TYPES.contains(&t));
        }
        assert!(TOOL_ONLY_TYPES.contains(&"Section"));
        assert!(TOOL_ONLY_TYPES.contains(&"ListEntry"));
    }

    #[test]
    fn project_linkable_excludes_persons() {
        assert!(PROJECT_LINKABLE.contains(&"Task"));
        assert!(!PROJECT_LINKABLE.contains(&"Person"));
        assert!(!PROJECT_LINKABLE.contains(&"Expense"));
    }

    #[test]
    fn endpoint_keys() {
        assert_eq!(endpoint_key("Task"), "title");
        assert_eq!(endpoint_key("Company"), "name");
    }
}
