// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task lifecycle and duplicate merging.

use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::build_query;
use crate::cypher::{sanitize_props, set_clause};
use crate::normalize;
use crate::GraphService;

impl GraphService {
    pub async fn upsert_task(&self, title: &str, props: Map<String, Value>) -> Result<(), RafiqError> {
        let mut props = sanitize_props(&props);
        if let Some(level) = props.get("energy_level").and_then(Value::as_str) {
            props.insert(
                "energy_level".into(),
                Value::String(normalize::normalize_energy(level)),
            );
        }
        let sets = set_clause(&props, "t");
        let cypher = format!(
            "MERGE (t:Task {{title: $title}})
             ON CREATE SET t.status = 'todo', t.created_at = $now {sets}
             ON MATCH SET t.updated_at = $now {sets}"
        );
        let mut params = vec![
            ("title", Value::String(title.into())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        self.client.run(build_query(&cypher, &params)).await
    }

    /// Updates task fields by fuzzy title match; completing a task
    /// auto-dismisses matching pending reminders and the result carries
    /// their titles.
    pub async fn update_task(
        &self,
        title: &str,
        status: Option<&str>,
        priority: Option<i64>,
        due_date: Option<&str>,
        project: Option<&str>,
    ) -> Result<Value, RafiqError> {
        let mut sets = vec!["t.updated_at = $now".to_string()];
        let mut params = vec![
            ("title", Value::String(title.into())),
            ("now", Value::String(self.now())),
        ];
        if let Some(s) = status {
            sets.push("t.status = $status".into());
            params.push(("status", Value::String(s.into())));
        }
        if let Some(p) = priority {
            sets.push("t.priority = $priority".into());
            params.push(("priority", Value::from(p)));
        }
        if let Some(d) = due_date {
            sets.push("t.due_date = $due_date".into());
            params.push(("due_date", Value::String(d.into())));
        }
        if sets.len() == 1 && project.is_none() {
            return Ok(json!({"error": "No fields to update"}));
        }

        let cypher = format!(
            "MATCH (t:Task) WHERE toLower(t.title) CONTAINS toLower($title)
             SET {}
             RETURN t.title AS title, t.status AS status, t.due_date AS due_date, t.priority AS priority",
            sets.join(", ")
        );
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("No task found matching '{title}'")}));
        }
        let matched_title: String = rows[0].get("title").unwrap_or_default();
        let mut result = json!({
            "title": matched_title,
            "status": rows[0].get::<String>("status").unwrap_or_default(),
            "due_date": rows[0].get::<String>("due_date").unwrap_or_default(),
            "priority": rows[0].get::<i64>("priority").unwrap_or_default(),
        });

        if status == Some("done") {
            let dismissed = self.auto_dismiss_reminders(&matched_title).await?;
            if !dismissed.is_empty() {
                result["dismissed_reminders"] = json!(dismissed);
            }
        }

        if let Some(project) = project {
            let project = self.upsert_project(project, Map::new()).await?;
            if let Err(e) = self
                .create_relationship("Task", &matched_title, "BELONGS_TO", "Project", &project)
                .await
            {
                debug!(error = %e, "task-project link skipped");
            } else {
                result["project"] = json!(project);
            }
        }

        Ok(result)
    }

    pub async fn delete_task(&self, title: &str) -> Result<Value, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task) WHERE toLower(t.title) CONTAINS toLower($title)
                 WITH t, t.title AS tname
                 DETACH DELETE t
                 RETURN tname",
                &[("title", Value::String(title.into()))],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("No task found matching '{title}'")}));
        }
        let deleted: Vec<String> = rows.iter().filter_map(|r| r.get("tname").ok()).collect();
        Ok(json!({"deleted": deleted, "count": deleted.len()}))
    }

    /// Tasks with optional status filter, project links, and scheduling
    /// tags, capped at 30 lines.
    pub async fn query_active_tasks(&self, status_filter: Option<&str>) -> Result<String, RafiqError> {
        let (filter_clause, params): (&str, Vec<(&str, Value)>) = match status_filter {
            Some(s) => ("WHERE t.status = $status", vec![("status", Value::String(s.into()))]),
            None => ("WHERE t.status IN ['todo', 'in_progress']", vec![]),
        };
        let cypher = format!(
            "MATCH (t:Task)
             {filter_clause}
             OPTIONAL MATCH (t)-[:BELONGS_TO]->(p:Project)
             RETURN t.title AS title, t.status AS status, t.due_date AS due_date,
                    t.priority AS priority, p.name AS project,
                    t.estimated_duration AS est, t.energy_level AS energy,
                    t.start_time AS start_time, t.end_time AS end_time
             ORDER BY t.priority DESC, t.due_date
             LIMIT 30"
        );
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            let label = status_filter
                .map(|s| format!(" with status '{s}'"))
                .unwrap_or_default();
            return Ok(format!("No active tasks found{label}."));
        }

        let mut parts = vec!["Tasks:".to_string()];
        for row in &rows {
            let title: String = row.get("title").unwrap_or_default();
            let status: String = row.get("status").unwrap_or_default();
            let due: String = row.get("due_date").unwrap_or_default();
            let priority: i64 = row.get("priority").unwrap_or_default();
            let project: String = row.get("project").unwrap_or_default();
            let est: i64 = row.get("est").unwrap_or_default();
            let energy: String = row.get("energy").unwrap_or_default();
            let start: String = row.get("start_time").unwrap_or_default();
            let end: String = row.get("end_time").unwrap_or_default();

            let mut line = format!("  - {title} [{status}]");
            if priority > 0 {
                line.push_str(&format!(" [priority:{priority}]"));
            }
            if est > 0 {
                line.push_str(&format!(" ~{est}min"));
            }
            if !energy.is_empty() {
                line.push_str(&format!(" energy:{energy}"));
            }
            if !due.is_empty() {
                line.push_str(&format!(" (due: {due})"));
            }
            if start.len() >= 5 && end.len() >= 5 {
                line.push_str(&format!(" [{}-{}]", &start[start.len() - 5..], &end[end.len() - 5..]));
            }
            if !project.is_empty() {
                line.push_str(&format!(" @ {project}"));
            }
            parts.push(line);
        }
        Ok(parts.join("\n"))
    }

    /// Merges duplicate todo/in_progress tasks grouped by normalised title.
    /// Keeper: in_progress over todo, highest priority, earliest due date,
    /// lowest id.
    pub async fn merge_duplicate_tasks(&self) -> Result<Value, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task)
                 WHERE t.status IN ['todo', 'in_progress']
                 OPTIONAL MATCH (t)-[:BELONGS_TO]->(p:Project)
                 RETURN id(t) AS id, t.title AS title, t.due_date AS due_date,
                        t.priority AS priority, t.status AS status,
                        t.energy_level AS energy, t.description AS description,
                        p.name AS project
                 ORDER BY t.title",
                &[],
            ))
            .await?;

        #[derive(Clone)]
        struct Entry {
            id: i64,
            title: String,
            due_date: String,
            priority: i64,
            status: String,
            energy: String,
            description: String,
            project: String,
        }

        let mut groups: std::collections::BTreeMap<String, Vec<Entry>> = Default::default();
        for row in &rows {
            let entry = Entry {
                id: row.get("id").unwrap_or_default(),
                title: row.get("title").unwrap_or_default(),
                due_date: row.get("due_date").unwrap_or_default(),
                priority: row.get("priority").unwrap_or_default(),
                status: row.get("status").unwrap_or_default(),
                energy: row.get("energy").unwrap_or_default(),
                description: row.get("description").unwrap_or_default(),
                project: row.get("project").unwrap_or_default(),
            };
            groups
                .entry(entry.title.trim().to_lowercase())
                .or_default()
                .push(entry);
        }

        let mut merged_groups = Vec::new();
        let mut total_removed = 0usize;

        for (_, mut items) in groups {
            if items.len() < 2 {
                continue;
            }
            items.sort_by(|a, b| {
                let rank = |e: &Entry| (if e.status == "in_progress" { 0 } else { 1 });
                let due = |e: &Entry| {
                    if e.due_date.is_empty() {
                        "9999".to_string()
                    } else {
                        e.due_date.clone()
                    }
                };
                (rank(a), -a.priority, due(a), a.id).cmp(&(rank(b), -b.priority, due(b), b.id))
            });
            let keep = items[0].clone();
            let remove = &items[1..];

            let best_priority = remove
                .iter()
                .map(|e| e.priority)
                .chain([keep.priority])
                .max()
                .unwrap_or(0);
            let best_description = (keep.description.is_empty())
                .then(|| remove.iter().find(|e| !e.description.is_empty()))
                .flatten()
                .map(|e| e.description.clone());
            let best_energy = (keep.energy.is_empty())
                .then(|| remove.iter().find(|e| !e.energy.is_empty()))
                .flatten()
                .map(|e| e.energy.clone());
            let best_project = (keep.project.is_empty())
                .then(|| remove.iter().find(|e| !e.project.is_empty()))
                .flatten()
                .map(|e| e.project.clone());

            let mut sets = vec!["t.updated_at = $now".to_string()];
            let mut params = vec![
                ("kid", Value::from(keep.id)),
                ("now", Value::String(self.now())),
            ];
            if best_priority > keep.priority {
                sets.push("t.priority = $priority".into());
                params.push(("priority", Value::from(best_priority)));
            }
            if let Some(ref desc) = best_description {
                sets.push("t.description = $description".into());
                params.push(("description", Value::String(desc.clone())));
            }
            if let Some(ref energy) = best_energy {
                sets.push("t.energy_level = $energy".into());
                params.push(("energy", Value::String(energy.clone())));
            }
            let update = format!("MATCH (t:Task) WHERE id(t) = $kid SET {}", sets.join(", "));
            self.client.run(build_query(&update, &params)).await?;

            if let Some(ref project) = best_project {
                if let Err(e) = self
                    .create_relationship("Task", &keep.title, "BELONGS_TO", "Project", project)
                    .await
                {
                    debug!(error = %e, "merged-task project link skipped");
                }
            }

            let remove_ids: Vec<i64> = remove.iter().map(|e| e.id).collect();
            self.client
                .run(build_query(
                    "MATCH (t:Task) WHERE id(t) IN $ids DETACH DELETE t",
                    &[("ids", serde_json::json!(remove_ids))],
                ))
                .await?;

            total_removed += remove.len();
            merged_groups.push(json!({
                "kept": keep.title,
                "kept_id": keep.id,
                "removed_count": remove.len(),
                "removed_ids": remove_ids,
            }));
        }

        Ok(json!({"merged_groups": merged_groups, "total_removed": total_removed}))
    }
}
