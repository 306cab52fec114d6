// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lists and their entries. ListEntry nodes are tool-only.

use rafiq_core::RafiqError;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::client::build_query;
use crate::GraphService;

impl GraphService {
    pub async fn create_list(
        &self,
        name: &str,
        list_type: &str,
        project_name: Option<&str>,
        section_name: Option<&str>,
    ) -> Result<Value, RafiqError> {
        self.client
            .run(build_query(
                "CREATE (l:List {name: $name, list_type: $list_type, created_at: $now})",
                &[
                    ("name", Value::String(name.into())),
                    ("list_type", Value::String(list_type.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;

        if let Some(project) = project_name {
            let project = self.resolve_entity_name(project, "Project").await?;
            self.create_relationship("List", name, "BELONGS_TO", "Project", &project)
                .await?;
            if let Some(section) = section_name {
                if let Err(e) = self.assign_to_section(&project, section, "List", name).await {
                    debug!(error = %e, "list-section link skipped");
                }
            }
        }
        Ok(json!({"status": "created", "name": name, "list_type": list_type}))
    }

    pub async fn add_list_entry(&self, list_name: &str, content: &str) -> Result<Value, RafiqError> {
        let cypher = "MATCH (l:List {name: $lname})
                      CREATE (e:ListEntry {id: $id, content: $content, checked: false, added_at: $now})
                      CREATE (l)-[:HAS_ENTRY]->(e)
                      RETURN e.content AS content";
        let rows = self
            .client
            .fetch_all(build_query(
                cypher,
                &[
                    ("lname", Value::String(list_name.into())),
                    ("id", Value::String(Uuid::new_v4().to_string())),
                    ("content", Value::String(content.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("List '{list_name}' not found")}));
        }
        Ok(json!({"status": "added", "list": list_name, "entry": content}))
    }

    pub async fn check_list_entry(
        &self,
        list_name: &str,
        content: &str,
        checked: bool,
    ) -> Result<Value, RafiqError> {
        let cypher = "MATCH (l:List {name: $lname})-[:HAS_ENTRY]->(e:ListEntry)
                      WHERE toLower(e.content) CONTAINS toLower($content)
                      SET e.checked = $checked, e.checked_at = $now
                      RETURN e.content AS content";
        let rows = self
            .client
            .fetch_all(build_query(
                cypher,
                &[
                    ("lname", Value::String(list_name.into())),
                    ("content", Value::String(content.into())),
                    ("checked", Value::Bool(checked)),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Entry '{content}' not found in list '{list_name}'")}));
        }
        let entry: String = rows[0].get("content").unwrap_or_default();
        Ok(json!({"status": if checked { "checked" } else { "unchecked" }, "entry": entry}))
    }

    pub async fn remove_list_entry(&self, list_name: &str, content: &str) -> Result<Value, RafiqError> {
        let cypher = "MATCH (l:List {name: $lname})-[:HAS_ENTRY]->(e:ListEntry)
                      WHERE toLower(e.content) CONTAINS toLower($content)
                      WITH l, e
                      DETACH DELETE e
                      RETURN l.name AS name";
        let rows = self
            .client
            .fetch_all(build_query(
                cypher,
                &[
                    ("lname", Value::String(list_name.into())),
                    ("content", Value::String(content.into())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Entry '{content}' not found in list '{list_name}'")}));
        }
        Ok(json!({"status": "removed", "list": list_name, "entry": content}))
    }

    /// Renders one list with check marks.
    pub async fn query_list(&self, list_name: &str) -> Result<String, RafiqError> {
        let head = self
            .client
            .fetch_one(build_query(
                "MATCH (l:List {name: $lname}) RETURN l.name AS name, l.list_type AS ltype",
                &[("lname", Value::String(list_name.into()))],
            ))
            .await?;
        let Some(head) = head else {
            return Ok(format!("List '{list_name}' not found."));
        };
        let name: String = head.get("name").unwrap_or_default();
        let ltype: String = head.get("ltype").unwrap_or_else(|_| "checklist".into());

        let entries = self
            .client
            .fetch_all(build_query(
                "MATCH (l:List {name: $lname})-[:HAS_ENTRY]->(e:ListEntry)
                 RETURN e.content AS content, e.checked AS checked
                 ORDER BY e.added_at",
                &[("lname", Value::String(list_name.into()))],
            ))
            .await?;

        let mut parts = vec![format!("List: {name} ({ltype})")];
        if entries.is_empty() {
            parts.push("  (empty)".into());
        } else {
            for e in &entries {
                let content: String = e.get("content").unwrap_or_default();
                let checked: bool = e.get("checked").unwrap_or_default();
                let mark = if checked { "x" } else { " " };
                parts.push(format!("  [{mark}] {content}"));
            }
        }
        Ok(parts.join("\n"))
    }

    /// All lists (optionally one project's) with check progress.
    pub async fn query_lists_overview(&self, project_name: Option<&str>) -> Result<String, RafiqError> {
        let rows = match project_name {
            Some(project) => {
                let project = self.resolve_entity_name(project, "Project").await?;
                self.client
                    .fetch_all(build_query(
                        "MATCH (l:List)-[:BELONGS_TO]->(p:Project {name: $pname})
                         OPTIONAL MATCH (l)-[:HAS_ENTRY]->(e:ListEntry)
                         RETURN l.name AS name, l.list_type AS ltype, count(e) AS total,
                                sum(CASE WHEN e.checked = true THEN 1 ELSE 0 END) AS checked",
                        &[("pname", Value::String(project))],
                    ))
                    .await?
            }
            None => {
                self.client
                    .fetch_all(build_query(
                        "MATCH (l:List)
                         OPTIONAL MATCH (l)-[:HAS_ENTRY]->(e:ListEntry)
                         RETURN l.name AS name, l.list_type AS ltype, count(e) AS total,
                                sum(CASE WHEN e.checked = true THEN 1 ELSE 0 END) AS checked
                         LIMIT 30",
                        &[],
                    ))
                    .await?
            }
        };

        if rows.is_empty() {
            return Ok("No lists found.".into());
        }
        let mut parts = vec!["Lists:".to_string()];
        for row in &rows {
            let name: String = row.get("name").unwrap_or_default();
            let ltype: String = row.get("ltype").unwrap_or_default();
            let total: i64 = row.get("total").unwrap_or_default();
            let checked: i64 = row.get("checked").unwrap_or_default();
            let progress = if total > 0 {
                format!(" ({checked}/{total} checked)")
            } else {
                String::new()
            };
            parts.push(format!("  - {name} [{ltype}]{progress}"));
        }
        Ok(parts.join("\n"))
    }

    pub async fn delete_list(&self, list_name: &str) -> Result<Value, RafiqError> {
        self.client
            .run(build_query(
                "MATCH (l:List {name: $name})-[:HAS_ENTRY]->(e:ListEntry) DETACH DELETE e",
                &[("name", Value::String(list_name.into()))],
            ))
            .await?;
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (l:List {name: $name})
                 WITH l, l.name AS deleted
                 DETACH DELETE l
                 RETURN deleted",
                &[("name", Value::String(list_name.into()))],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("List '{list_name}' not found")}));
        }
        Ok(json!({"status": "deleted", "name": list_name}))
    }
}
