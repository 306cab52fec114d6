// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Projects: CRUD with cascade delete, aliases, merging, sections and
//! phases, and the overview/detail views.

use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::client::build_query;
use crate::cypher::{inline_props, key_field, sanitize_props, set_clause};
use crate::GraphService;

/// Default phase sections created by `create_project_with_phases`.
pub const DEFAULT_PHASES: [&str; 4] = ["Planning", "Preparation", "Execution", "Review"];

/// Labels that may be assigned to sections via IN_SECTION.
pub const SECTION_LINKABLE: [&str; 7] = ["Task", "Knowledge", "Idea", "Reminder", "Item", "Sprint", "List"];

impl GraphService {
    pub async fn upsert_project(
        &self,
        name: &str,
        props: Map<String, Value>,
    ) -> Result<String, RafiqError> {
        let name = self.resolve_entity_name(name, "Project").await?;
        let props = sanitize_props(&props);
        let sets = set_clause(&props, "p");
        let cypher = format!(
            "MERGE (p:Project {{name: $name}})
             ON CREATE SET p.created_at = $now {sets}
             ON MATCH SET p.updated_at = $now {sets}"
        );
        let mut params = vec![
            ("name", Value::String(name.clone())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        self.client.run(build_query(&cypher, &params)).await?;
        Ok(name)
    }

    /// Creates a project together with its default phase sections and sets
    /// the first phase active.
    pub async fn create_project_with_phases(
        &self,
        name: &str,
        props: Map<String, Value>,
    ) -> Result<Value, RafiqError> {
        let name = self.upsert_project(name, props).await?;
        for (i, phase) in DEFAULT_PHASES.iter().enumerate() {
            let mut section_props = Map::new();
            section_props.insert("section_type".into(), json!("phase"));
            section_props.insert("order".into(), json!(i as i64 + 1));
            self.create_section(&name, phase, section_props).await?;
        }
        self.client
            .run(build_query(
                "MATCH (p:Project {name: $name}) SET p.active_phase = $phase",
                &[
                    ("name", Value::String(name.clone())),
                    ("phase", Value::String(DEFAULT_PHASES[0].into())),
                ],
            ))
            .await?;
        Ok(json!({"status": "created", "name": name, "phases": DEFAULT_PHASES}))
    }

    /// Deletes a project and cascades to its tasks, sections, lists, and
    /// list entries.
    pub async fn delete_project(&self, name: &str) -> Result<Value, RafiqError> {
        let cypher = "MATCH (p:Project) WHERE toLower(p.name) CONTAINS toLower($name)
                      OPTIONAL MATCH (t:Task)-[:BELONGS_TO]->(p)
                      OPTIONAL MATCH (p)-[:HAS_SECTION]->(s:Section)
                      OPTIONAL MATCH (l:List)-[:BELONGS_TO]->(p)
                      OPTIONAL MATCH (l)-[:HAS_ENTRY]->(le:ListEntry)
                      WITH p, p.name AS pname, collect(DISTINCT t) AS tasks,
                           collect(DISTINCT t.title) AS task_titles,
                           collect(DISTINCT s) AS sections,
                           collect(DISTINCT l) AS lists,
                           collect(DISTINCT le) AS list_entries
                      DETACH DELETE p
                      FOREACH (t IN tasks | DETACH DELETE t)
                      FOREACH (s IN sections | DETACH DELETE s)
                      FOREACH (l IN lists | DETACH DELETE l)
                      FOREACH (le IN list_entries | DETACH DELETE le)
                      RETURN pname, task_titles";
        let rows = self
            .client
            .fetch_all(build_query(cypher, &[("name", Value::String(name.into()))]))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("No project found matching '{name}'")}));
        }
        let pname: String = rows[0].get("pname").unwrap_or_default();
        let task_titles: Vec<String> = rows[0].get("task_titles").unwrap_or_default();
        Ok(json!({
            "deleted": pname,
            "tasks_deleted": task_titles.len(),
            "task_titles": task_titles,
        }))
    }

    /// Sets aliases on the project node and registers each one in the
    /// vector namespace pointing at the canonical name.
    pub async fn set_project_aliases(&self, name: &str, aliases: &[String]) -> Result<(), RafiqError> {
        let name = self.resolve_entity_name(name, "Project").await?;
        for alias in aliases {
            if !alias.is_empty() && alias != &name {
                self.store_alias("Project", &name, alias).await?;
            }
        }
        self.register_aliases_in_vector(&name, aliases, "Project").await;
        Ok(())
    }

    /// Vector registration so future resolution maps each alias onto the
    /// canonical name. Failures are logged, not surfaced.
    pub async fn register_aliases_in_vector(
        &self,
        canonical: &str,
        aliases: &[String],
        entity_type: &str,
    ) {
        use rafiq_vector::PointPayload;
        for alias in aliases {
            if alias.is_empty() || alias == canonical {
                continue;
            }
            let payload = PointPayload {
                source_type: Some("entity".into()),
                entity_type: Some(entity_type.to_string()),
                entity_name: Some(canonical.to_string()),
                ..Default::default()
            };
            match self.vector.upsert_chunks(&[alias.clone()], vec![payload]).await {
                Ok(_) => info!(alias = %alias, canonical, entity_type, "alias vector registered"),
                Err(e) => debug!(alias = %alias, error = %e, "alias vector registration failed"),
            }
        }
    }

    /// Merges source projects into the target: re-links BELONGS_TO and
    /// HAS_SECTION edges, unions aliases, deletes the sources.
    pub async fn merge_projects(
        &self,
        source_names: &[String],
        target_name: &str,
    ) -> Result<Value, RafiqError> {
        let target = self.upsert_project(target_name, Map::new()).await?;
        let mut tasks_moved: i64 = 0;
        let mut sources_deleted: i64 = 0;

        for src in source_names {
            let params = vec![
                ("src_name", Value::String(src.clone())),
                ("target_name", Value::String(target.clone())),
            ];

            let relink_tasks = "MATCH (t:Task)-[r:BELONGS_TO]->(src:Project)
                 WHERE toLower(src.name) CONTAINS toLower($src_name) AND src.name <> $target_name
                 MATCH (tgt:Project {name: $target_name})
                 DELETE r
                 MERGE (t)-[:BELONGS_TO]->(tgt)
                 RETURN count(t) AS moved";
            if let Some(row) = self.client.fetch_one(build_query(relink_tasks, &params)).await? {
                tasks_moved += row.get::<i64>("moved").unwrap_or_default();
            }

            let relink_sections = "MATCH (src:Project)-[r:HAS_SECTION]->(s:Section)
                 WHERE toLower(src.name) CONTAINS toLower($src_name) AND src.name <> $target_name
                 MATCH (tgt:Project {name: $target_name})
                 DELETE r
                 MERGE (tgt)-[:HAS_SECTION]->(s)";
            self.client.run(build_query(relink_sections, &params)).await?;

            let relink_lists = "MATCH (l:List)-[r:BELONGS_TO]->(src:Project)
                 WHERE toLower(src.name) CONTAINS toLower($src_name) AND src.name <> $target_name
                 MATCH (tgt:Project {name: $target_name})
                 DELETE r
                 MERGE (l)-[:BELONGS_TO]->(tgt)";
            self.client.run(build_query(relink_lists, &params)).await?;

            // Union the source's name and aliases into the target's aliases.
            let union_aliases = "MATCH (src:Project)
                 WHERE toLower(src.name) CONTAINS toLower($src_name) AND src.name <> $target_name
                 MATCH (tgt:Project {name: $target_name})
                 SET tgt.name_aliases = [x IN coalesce(tgt.name_aliases, []) + [src.name] +
                                         coalesce(src.name_aliases, [])
                                         WHERE x <> tgt.name]
                 RETURN src.name AS src";
            self.client.run(build_query(union_aliases, &params)).await?;

            let delete_src = "MATCH (p:Project)
                 WHERE toLower(p.name) CONTAINS toLower($src_name) AND p.name <> $target_name
                 DETACH DELETE p
                 RETURN count(p) AS deleted";
            if let Some(row) = self.client.fetch_one(build_query(delete_src, &params)).await? {
                sources_deleted += row.get::<i64>("deleted").unwrap_or_default();
            }
        }

        Ok(json!({
            "target": target,
            "sources_deleted": sources_deleted,
            "tasks_moved": tasks_moved,
        }))
    }

    // --- Sections ---

    /// Creates a section under a project. Sections are tool-only nodes.
    pub async fn create_section(
        &self,
        project_name: &str,
        section_name: &str,
        props: Map<String, Value>,
    ) -> Result<Value, RafiqError> {
        let project = self.resolve_entity_name(project_name, "Project").await?;
        let props = sanitize_props(&props);
        let inline = inline_props(&props);
        let cypher = format!(
            "MATCH (p:Project {{name: $pname}})
             CREATE (s:Section {{name: $sname, created_at: $now{inline}}})
             CREATE (p)-[:HAS_SECTION]->(s)
             RETURN s.name AS name"
        );
        let mut params = vec![
            ("pname", Value::String(project.clone())),
            ("sname", Value::String(section_name.into())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Project '{project}' not found")}));
        }
        Ok(json!({"status": "created", "section": section_name, "project": project}))
    }

    pub async fn update_section(
        &self,
        project_name: &str,
        section_name: &str,
        props: Map<String, Value>,
    ) -> Result<Value, RafiqError> {
        let project = self.resolve_entity_name(project_name, "Project").await?;
        let props = sanitize_props(&props);
        let sets = set_clause(&props, "s");
        if sets.is_empty() {
            return Ok(json!({"error": "No fields to update"}));
        }
        let cypher = format!(
            "MATCH (p:Project {{name: $pname}})-[:HAS_SECTION]->(s:Section {{name: $sname}})
             SET s.updated_at = $now {sets}
             RETURN s.name AS name"
        );
        let mut params = vec![
            ("pname", Value::String(project.clone())),
            ("sname", Value::String(section_name.into())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Section '{section_name}' not found in project '{project}'")}));
        }
        Ok(json!({"status": "updated", "section": section_name}))
    }

    pub async fn delete_section(
        &self,
        project_name: &str,
        section_name: &str,
    ) -> Result<Value, RafiqError> {
        let project = self.resolve_entity_name(project_name, "Project").await?;
        let cypher = "MATCH (p:Project {name: $pname})-[:HAS_SECTION]->(s:Section {name: $sname})
                      WITH p, s
                      DETACH DELETE s
                      RETURN p.name AS name";
        let rows = self
            .client
            .fetch_all(build_query(
                cypher,
                &[
                    ("pname", Value::String(project.clone())),
                    ("sname", Value::String(section_name.into())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Section '{section_name}' not found in project '{project}'")}));
        }
        Ok(json!({"status": "deleted", "section": section_name}))
    }

    /// IN_SECTION link between an existing entity and a section. Entities
    /// carry at most one section per project; re-assigning moves them.
    pub async fn assign_to_section(
        &self,
        project_name: &str,
        section_name: &str,
        entity_type: &str,
        entity_name: &str,
    ) -> Result<Value, RafiqError> {
        if !SECTION_LINKABLE.contains(&entity_type) {
            return Ok(json!({"error": format!("{entity_type} cannot be assigned to a section")}));
        }
        let project = self.resolve_entity_name(project_name, "Project").await?;
        let key = key_field(entity_type);
        let unlink = format!(
            "MATCH (e:{entity_type} {{{key}: $ename}})-[old:IN_SECTION]->(:Section)<-[:HAS_SECTION]-(p:Project {{name: $pname}})
             DELETE old"
        );
        self.client
            .run(build_query(
                &unlink,
                &[
                    ("ename", Value::String(entity_name.into())),
                    ("pname", Value::String(project.clone())),
                ],
            ))
            .await?;

        let cypher = format!(
            "MATCH (p:Project {{name: $pname}})-[:HAS_SECTION]->(s:Section {{name: $sname}})
             MATCH (e:{entity_type} {{{key}: $ename}})
             MERGE (e)-[:IN_SECTION]->(s)
             RETURN e.{key} AS name"
        );
        let rows = self
            .client
            .fetch_all(build_query(
                &cypher,
                &[
                    ("pname", Value::String(project)),
                    ("sname", Value::String(section_name.into())),
                    ("ename", Value::String(entity_name.into())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Could not link {entity_type} '{entity_name}' to section '{section_name}'")}));
        }
        Ok(json!({"status": "assigned", "entity": entity_name, "section": section_name}))
    }

    pub async fn set_active_phase(
        &self,
        project_name: &str,
        phase_name: &str,
    ) -> Result<Value, RafiqError> {
        let project = self.resolve_entity_name(project_name, "Project").await?;
        let cypher = "MATCH (p:Project {name: $pname})-[:HAS_SECTION]->(s:Section {name: $sname})
                      WHERE s.section_type = 'phase'
                      SET p.active_phase = $sname
                      RETURN p.name AS name";
        let rows = self
            .client
            .fetch_all(build_query(
                cypher,
                &[
                    ("pname", Value::String(project.clone())),
                    ("sname", Value::String(phase_name.into())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Phase '{phase_name}' not found in project '{project}'")}));
        }
        Ok(json!({"status": "updated", "project": project, "active_phase": phase_name}))
    }

    // --- Views ---

    /// All properties, sections (with their entities), unsectioned tasks,
    /// and lists for one project.
    pub async fn query_project_details(&self, name: &str) -> Result<String, RafiqError> {
        let name = self.resolve_entity_name(name, "Project").await?;
        let cypher = "MATCH (p:Project)
                      WHERE toLower(p.name) CONTAINS toLower($name)
                      RETURN p AS project";
        let row = self
            .client
            .fetch_one(build_query(cypher, &[("name", Value::String(name.clone()))]))
            .await?;
        let Some(row) = row else {
            return Ok(format!("No project found matching '{name}'."));
        };
        let node: neo4rs::Node = match row.get("project") {
            Ok(n) => n,
            Err(_) => return Ok(format!("No project found matching '{name}'.")),
        };
        let props = crate::context::node_props(&node);
        let pname = props
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&name)
            .to_string();
        let active_phase = props
            .get("active_phase")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut parts = vec![format!("Project: {pname}")];
        if let Some(aliases) = props.get("name_aliases").and_then(Value::as_array) {
            let list: Vec<&str> = aliases.iter().filter_map(Value::as_str).collect();
            if !list.is_empty() {
                parts.push(format!("  aliases: {}", list.join(", ")));
            }
        }
        let skip = ["name", "created_at", "updated_at", "name_aliases"];
        for (k, v) in &props {
            if skip.contains(&k.as_str()) || v.is_null() {
                continue;
            }
            parts.push(format!("  {k}: {}", render_value(v)));
        }

        // Sections with their assigned entities.
        let section_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (p:Project {name: $pname})-[:HAS_SECTION]->(s:Section)
                 RETURN s.name AS name, s.section_type AS stype, s.order AS sorder
                 ORDER BY coalesce(s.order, 999), s.name",
                &[("pname", Value::String(pname.clone()))],
            ))
            .await?;
        for section in &section_rows {
            let sname: String = section.get("name").unwrap_or_default();
            let stype: String = section.get("stype").unwrap_or_default();
            let label = if stype == "phase" { " (phase)" } else { "" };
            let active = if active_phase == sname { " *active*" } else { "" };
            parts.push(format!("\n  Section: {sname}{label}{active}"));

            let entity_rows = self
                .client
                .fetch_all(build_query(
                    "MATCH (:Project {name: $pname})-[:HAS_SECTION]->(s:Section {name: $sname})<-[:IN_SECTION]-(e)
                     RETURN labels(e)[0] AS label, coalesce(e.name, e.title) AS name, e.status AS status
                     LIMIT 50",
                    &[
                        ("pname", Value::String(pname.clone())),
                        ("sname", Value::String(sname.clone())),
                    ],
                ))
                .await?;
            if entity_rows.is_empty() {
                parts.push("    (empty)".into());
            } else {
                for e in &entity_rows {
                    let label: String = e.get("label").unwrap_or_default();
                    let ename: String = e.get("name").unwrap_or_default();
                    let status: String = e.get("status").unwrap_or_default();
                    let status = if status.is_empty() {
                        String::new()
                    } else {
                        format!(" [{status}]")
                    };
                    parts.push(format!("    - [{label}] {ename}{status}"));
                }
            }
        }

        // Tasks outside any section.
        let unsectioned = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task)-[:BELONGS_TO]->(p:Project {name: $pname})
                 WHERE NOT (t)-[:IN_SECTION]->(:Section)
                 RETURN t.title AS title, t.status AS status",
                &[("pname", Value::String(pname.clone()))],
            ))
            .await?;
        if !unsectioned.is_empty() {
            parts.push(format!("\n  Tasks (unsectioned, {}):", unsectioned.len()));
            for t in &unsectioned {
                let title: String = t.get("title").unwrap_or_default();
                let status: String = t.get("status").unwrap_or_default();
                let status = if status.is_empty() {
                    String::new()
                } else {
                    format!(" [{status}]")
                };
                parts.push(format!("    - {title}{status}"));
            }
        }

        // Lists linked to the project.
        let lists = self
            .client
            .fetch_all(build_query(
                "MATCH (l:List)-[:BELONGS_TO]->(p:Project {name: $pname})
                 OPTIONAL MATCH (l)-[:HAS_ENTRY]->(e:ListEntry)
                 RETURN l.name AS name, l.list_type AS ltype, count(e) AS total,
                        sum(CASE WHEN e.checked = true THEN 1 ELSE 0 END) AS checked",
                &[("pname", Value::String(pname.clone()))],
            ))
            .await?;
        let named_lists: Vec<_> = lists
            .iter()
            .filter(|l| !l.get::<String>("name").unwrap_or_default().is_empty())
            .collect();
        if !named_lists.is_empty() {
            parts.push("\n  Lists:".into());
            for l in named_lists {
                let lname: String = l.get("name").unwrap_or_default();
                let ltype: String = l.get("ltype").unwrap_or_default();
                let total: i64 = l.get("total").unwrap_or_default();
                let checked: i64 = l.get("checked").unwrap_or_default();
                let progress = if total > 0 {
                    format!(" ({checked}/{total})")
                } else {
                    String::new()
                };
                parts.push(format!("    - {lname} [{ltype}]{progress}"));
            }
        }

        Ok(parts.join("\n"))
    }

    /// Projects with progress percentages and an ETA from a three-week
    /// velocity window.
    pub async fn query_projects_overview(
        &self,
        status_filter: Option<&str>,
    ) -> Result<String, RafiqError> {
        let (filter, params): (&str, Vec<(&str, Value)>) = match status_filter {
            Some(s) => (
                "WHERE toLower(p.status) = toLower($status)",
                vec![("status", Value::String(s.into()))],
            ),
            None => ("", vec![]),
        };
        let cypher = format!(
            "MATCH (p:Project)
             {filter}
             OPTIONAL MATCH (t:Task)-[:BELONGS_TO]->(p)
             RETURN p.name AS name, p.status AS status, p.description AS description,
                    p.priority AS priority, count(t) AS total,
                    sum(CASE WHEN t.status = 'done' THEN 1 ELSE 0 END) AS done
             ORDER BY p.priority DESC, p.name
             LIMIT 30"
        );
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            let label = status_filter
                .map(|s| format!(" with status '{s}'"))
                .unwrap_or_default();
            return Ok(format!("No projects found{label}."));
        }

        let three_weeks_ago =
            (rafiq_core::time::now_local(self.tz()) - chrono::Duration::weeks(3)).to_rfc3339();

        let mut parts = vec!["Projects:".to_string()];
        for row in &rows {
            let name: String = row.get("name").unwrap_or_default();
            let status: String = row.get("status").unwrap_or_default();
            let description: String = row.get("description").unwrap_or_default();
            let priority: i64 = row.get("priority").unwrap_or_default();
            let total: i64 = row.get("total").unwrap_or_default();
            let done: i64 = row.get("done").unwrap_or_default();

            let progress = if total > 0 {
                let pct = (done as f64 / total as f64 * 1000.0).round() / 10.0;
                format!(" ({pct}% complete, {done}/{total} tasks)")
            } else {
                String::new()
            };
            let priority_tag = if priority > 0 {
                format!(" [priority:{priority}]")
            } else {
                String::new()
            };
            let status_tag = if status.is_empty() {
                String::new()
            } else {
                format!(" [{status}]")
            };

            let mut eta_tag = String::new();
            let active = status.is_empty() || status == "active" || status == "in_progress";
            if total > 0 && done < total && active {
                let vel_row = self
                    .client
                    .fetch_one(build_query(
                        "MATCH (t:Task)-[:BELONGS_TO]->(p:Project {name: $pname})
                         WHERE t.status = 'done' AND t.updated_at >= $since
                         RETURN count(t) AS recent",
                        &[
                            ("pname", Value::String(name.clone())),
                            ("since", Value::String(three_weeks_ago.clone())),
                        ],
                    ))
                    .await?;
                let recent: i64 = vel_row
                    .map(|r| r.get("recent").unwrap_or_default())
                    .unwrap_or(0);
                if recent > 0 {
                    let per_week = recent as f64 / 3.0;
                    let weeks_left = (total - done) as f64 / per_week;
                    let eta = rafiq_core::time::now_local(self.tz())
                        + chrono::Duration::days((weeks_left * 7.0).round() as i64);
                    eta_tag = format!(" [ETA: ~{}]", eta.format("%Y-%m-%d"));
                }
            }

            parts.push(format!("  - {name}{status_tag}{priority_tag}{progress}{eta_tag}"));
            if !description.is_empty() {
                let preview: String = description.chars().take(100).collect();
                parts.push(format!("    {preview}"));
            }
        }
        Ok(parts.join("\n"))
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
