// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sprints, focus sessions, and energy-aware time-blocking.

use chrono::NaiveDate;
use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::build_query;
use crate::cypher::sanitize_props;
use crate::GraphService;

/// Parses an `"H-H"` hour range.
fn parse_hour_range(s: &str) -> Option<(i64, i64)> {
    let mut parts = s.splitn(2, '-');
    let start = parts.next()?.trim().parse().ok()?;
    let end = parts.next()?.trim().parse().ok()?;
    Some((start, end))
}

/// One suggested time block for a task.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimeBlock {
    pub task_title: String,
    pub start_time: String,
    pub end_time: String,
    pub energy_level: String,
    pub priority: i64,
}

/// Pure scheduling over task buckets. Blocks are capped at two hours and
/// stop when the window is exhausted.
pub fn schedule_blocks(
    date: &str,
    tasks: &[(String, i64, String, i64)],
    start_hour: i64,
    end_hour: i64,
    blocks: &mut Vec<TimeBlock>,
) {
    let mut current_min = start_hour * 60;
    let end_min = end_hour * 60;
    for (title, priority, energy, duration) in tasks {
        let duration = (*duration).min(120);
        if current_min + duration > end_min {
            break;
        }
        let (s_h, s_m) = (current_min / 60, current_min % 60);
        let e_min = current_min + duration;
        let (e_h, e_m) = (e_min / 60, e_min % 60);
        blocks.push(TimeBlock {
            task_title: title.clone(),
            start_time: format!("{date}T{s_h:02}:{s_m:02}:00"),
            end_time: format!("{date}T{e_h:02}:{e_m:02}:00"),
            energy_level: energy.clone(),
            priority: *priority,
        });
        current_min = e_min;
    }
}

impl GraphService {
    /// Creates or updates a Sprint. Missing dates default to today + the
    /// configured sprint length.
    pub async fn create_sprint(
        &self,
        name: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        props: Map<String, Value>,
    ) -> Result<Value, RafiqError> {
        let start = start_date
            .map(str::to_string)
            .unwrap_or_else(|| self.today());
        let end = match end_date {
            Some(e) => e.to_string(),
            None => NaiveDate::parse_from_str(&start, "%Y-%m-%d")
                .map(|d| {
                    (d + chrono::Duration::weeks(self.config.productivity.sprint_default_weeks))
                        .format("%Y-%m-%d")
                        .to_string()
                })
                .unwrap_or_else(|_| start.clone()),
        };
        let props = sanitize_props(&props);
        let project = props
            .get("project")
            .and_then(Value::as_str)
            .map(str::to_string);

        let extra_sets: Vec<String> = props.keys().map(|k| format!("s.{k} = ${k}")).collect();
        let extra = if extra_sets.is_empty() {
            String::new()
        } else {
            format!(", {}", extra_sets.join(", "))
        };
        let cypher = format!(
            "MERGE (s:Sprint {{name: $name}})
             ON CREATE SET s.start_date = $start_date, s.end_date = $end_date,
                           s.status = 'active', s.created_at = $now{extra}
             ON MATCH SET s.updated_at = $now{extra}
             RETURN s.name AS name, s.status AS status, s.start_date AS start, s.end_date AS end"
        );
        let mut params = vec![
            ("name", Value::String(name.into())),
            ("start_date", Value::String(start.clone())),
            ("end_date", Value::String(end.clone())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;

        let mut result = match rows.first() {
            Some(row) => json!({
                "name": row.get::<String>("name").unwrap_or_default(),
                "status": row.get::<String>("status").unwrap_or_default(),
                "start_date": row.get::<String>("start").unwrap_or_default(),
                "end_date": row.get::<String>("end").unwrap_or_default(),
            }),
            None => json!({"name": name, "status": "active", "start_date": start, "end_date": end}),
        };

        if let Some(project) = project {
            let project = self.upsert_project(&project, Map::new()).await?;
            if let Err(e) = self
                .create_relationship("Sprint", name, "BELONGS_TO", "Project", &project)
                .await
            {
                debug!(error = %e, "sprint-project link skipped");
            } else {
                result["project"] = json!(project);
            }
        }
        Ok(result)
    }

    pub async fn update_sprint(&self, name: &str, props: Map<String, Value>) -> Result<Value, RafiqError> {
        let mut props = sanitize_props(&props);
        if props.is_empty() {
            return Ok(json!({"error": "No properties to update"}));
        }
        props.insert("updated_at".into(), Value::String(self.now()));
        let sets: Vec<String> = props.keys().map(|k| format!("s.{k} = ${k}")).collect();
        let cypher = format!(
            "MATCH (s:Sprint {{name: $name}})
             SET {}
             RETURN s.name AS name, s.status AS status, s.start_date AS start,
                    s.end_date AS end, s.goal AS goal",
            sets.join(", ")
        );
        let mut params = vec![("name", Value::String(name.into()))];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Sprint '{name}' not found")}));
        }
        Ok(json!({
            "name": rows[0].get::<String>("name").unwrap_or_default(),
            "status": rows[0].get::<String>("status").unwrap_or_default(),
            "start_date": rows[0].get::<String>("start").unwrap_or_default(),
            "end_date": rows[0].get::<String>("end").unwrap_or_default(),
            "goal": rows[0].get::<String>("goal").unwrap_or_default(),
        }))
    }

    pub async fn assign_task_to_sprint(
        &self,
        task_title: &str,
        sprint_name: &str,
    ) -> Result<Value, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task {title: $task})
                 MATCH (s:Sprint {name: $sprint})
                 MERGE (t)-[:IN_SPRINT]->(s)
                 RETURN t.title AS task, s.name AS sprint",
                &[
                    ("task", Value::String(task_title.into())),
                    ("sprint", Value::String(sprint_name.into())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Task '{task_title}' or Sprint '{sprint_name}' not found")}));
        }
        Ok(json!({
            "task": rows[0].get::<String>("task").unwrap_or_default(),
            "sprint": rows[0].get::<String>("sprint").unwrap_or_default(),
        }))
    }

    /// Sprint details with task breakdown and progress percentage.
    pub async fn query_sprint(&self, name: &str) -> Result<Value, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (s:Sprint {name: $name})
                 OPTIONAL MATCH (t:Task)-[:IN_SPRINT]->(s)
                 RETURN s.name AS name, s.status AS status, s.start_date AS start,
                        s.end_date AS end, s.goal AS goal,
                        count(t) AS total,
                        sum(CASE WHEN t.status = 'done' THEN 1 ELSE 0 END) AS done,
                        sum(CASE WHEN t.status = 'in_progress' THEN 1 ELSE 0 END) AS in_progress",
                &[("name", Value::String(name.into()))],
            ))
            .await?;
        let Some(row) = row else {
            return Ok(json!({"error": format!("Sprint '{name}' not found")}));
        };
        let total: i64 = row.get("total").unwrap_or_default();
        let done: i64 = row.get("done").unwrap_or_default();
        let progress = if total > 0 {
            (done as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        Ok(json!({
            "name": row.get::<String>("name").unwrap_or_default(),
            "status": row.get::<String>("status").unwrap_or_default(),
            "start_date": row.get::<String>("start").unwrap_or_default(),
            "end_date": row.get::<String>("end").unwrap_or_default(),
            "goal": row.get::<String>("goal").unwrap_or_default(),
            "total_tasks": total,
            "done_tasks": done,
            "in_progress_tasks": row.get::<i64>("in_progress").unwrap_or_default(),
            "progress_pct": progress,
        }))
    }

    pub async fn query_sprints(&self, status_filter: Option<&str>) -> Result<Vec<Value>, RafiqError> {
        let (where_clause, params): (&str, Vec<(&str, Value)>) = match status_filter {
            Some(s) => ("WHERE s.status = $status", vec![("status", Value::String(s.into()))]),
            None => ("", vec![]),
        };
        let cypher = format!(
            "MATCH (s:Sprint)
             {where_clause}
             OPTIONAL MATCH (t:Task)-[:IN_SPRINT]->(s)
             RETURN s.name AS name, s.status AS status, s.start_date AS start,
                    s.end_date AS end, s.goal AS goal,
                    count(t) AS total,
                    sum(CASE WHEN t.status = 'done' THEN 1 ELSE 0 END) AS done
             ORDER BY s.start_date DESC
             LIMIT 20"
        );
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let total: i64 = row.get("total").unwrap_or_default();
                let done: i64 = row.get("done").unwrap_or_default();
                let progress = if total > 0 {
                    (done as f64 / total as f64 * 1000.0).round() / 10.0
                } else {
                    0.0
                };
                json!({
                    "name": row.get::<String>("name").unwrap_or_default(),
                    "status": row.get::<String>("status").unwrap_or_default(),
                    "start_date": row.get::<String>("start").unwrap_or_default(),
                    "end_date": row.get::<String>("end").unwrap_or_default(),
                    "goal": row.get::<String>("goal").unwrap_or_default(),
                    "total_tasks": total,
                    "done_tasks": done,
                    "progress_pct": progress,
                })
            })
            .collect())
    }

    /// Burndown: ideal linear remaining vs actual.
    pub async fn query_sprint_burndown(&self, name: &str) -> Result<Value, RafiqError> {
        let sprint = self.query_sprint(name).await?;
        if sprint.get("error").is_some() {
            return Ok(sprint);
        }
        let total = sprint["total_tasks"].as_i64().unwrap_or(0);
        let done = sprint["done_tasks"].as_i64().unwrap_or(0);
        let remaining = total - done;

        let (total_days, days_passed, days_left) = match (
            NaiveDate::parse_from_str(sprint["start_date"].as_str().unwrap_or(""), "%Y-%m-%d"),
            NaiveDate::parse_from_str(sprint["end_date"].as_str().unwrap_or(""), "%Y-%m-%d"),
        ) {
            (Ok(start), Ok(end)) => {
                let now = rafiq_core::time::now_local(self.tz()).date_naive();
                let total_days = (end - start).num_days().max(1);
                let days_passed = (now - start).num_days().max(0);
                let days_left = (end - now).num_days().max(0);
                (total_days, days_passed, days_left)
            }
            _ => (14, 0, 14),
        };

        let ideal_remaining = if total_days > 0 {
            total as f64 * (1.0 - days_passed as f64 / total_days as f64)
        } else {
            total as f64
        };

        Ok(json!({
            "name": sprint["name"],
            "status": sprint["status"],
            "total_tasks": total,
            "done_tasks": done,
            "remaining": remaining,
            "total_days": total_days,
            "days_passed": days_passed,
            "days_left": days_left,
            "ideal_remaining": (ideal_remaining * 10.0).round() / 10.0,
            "progress_pct": sprint["progress_pct"],
        }))
    }

    /// Completes a sprint and records its velocity (done tasks per week).
    pub async fn complete_sprint(&self, name: &str) -> Result<Value, RafiqError> {
        let sprint = self.query_sprint(name).await?;
        if sprint.get("error").is_some() {
            return Ok(sprint);
        }
        let total = sprint["total_tasks"].as_i64().unwrap_or(0);
        let done = sprint["done_tasks"].as_i64().unwrap_or(0);

        let velocity = match NaiveDate::parse_from_str(
            sprint["start_date"].as_str().unwrap_or(""),
            "%Y-%m-%d",
        ) {
            Ok(start) => {
                let now = rafiq_core::time::now_local(self.tz()).date_naive();
                let weeks = ((now - start).num_days() as f64 / 7.0).max(1.0);
                (done as f64 / weeks * 10.0).round() / 10.0
            }
            Err(_) => 0.0,
        };

        self.client
            .run(build_query(
                "MATCH (s:Sprint {name: $name})
                 SET s.status = 'completed', s.completed_at = $now, s.velocity = $velocity",
                &[
                    ("name", Value::String(name.into())),
                    ("now", Value::String(self.now())),
                    ("velocity", json!(velocity)),
                ],
            ))
            .await?;
        Ok(json!({
            "name": name, "status": "completed", "done_tasks": done,
            "total_tasks": total, "velocity": velocity,
        }))
    }

    /// Average velocity across completed sprints, optionally per project.
    pub async fn query_sprint_velocity(&self, project_name: Option<&str>) -> Result<Value, RafiqError> {
        let (cypher, params): (&str, Vec<(&str, Value)>) = match project_name {
            Some(p) => (
                "MATCH (s:Sprint)-[:BELONGS_TO]->(p:Project {name: $project})
                 WHERE s.status = 'completed' AND s.velocity IS NOT NULL
                 RETURN avg(s.velocity) AS avg_vel, count(s) AS cnt",
                vec![("project", Value::String(p.into()))],
            ),
            None => (
                "MATCH (s:Sprint)
                 WHERE s.status = 'completed' AND s.velocity IS NOT NULL
                 RETURN avg(s.velocity) AS avg_vel, count(s) AS cnt",
                vec![],
            ),
        };
        let row = self.client.fetch_one(build_query(cypher, &params)).await?;
        match row {
            Some(row) => {
                let cnt: i64 = row.get("cnt").unwrap_or_default();
                if cnt == 0 {
                    return Ok(json!({"avg_velocity": 0, "completed_sprints": 0}));
                }
                let avg: f64 = row.get("avg_vel").unwrap_or_default();
                Ok(json!({
                    "avg_velocity": (avg * 10.0).round() / 10.0,
                    "completed_sprints": cnt,
                }))
            }
            None => Ok(json!({"avg_velocity": 0, "completed_sprints": 0})),
        }
    }

    // --- Focus sessions ---

    /// Starts a focus session, optionally linked to a task.
    pub async fn start_focus_session(
        &self,
        duration_minutes: Option<i64>,
        task_title: Option<&str>,
    ) -> Result<Value, RafiqError> {
        let duration = duration_minutes.unwrap_or(self.config.productivity.pomodoro_default_minutes);
        let sid: String = self
            .now()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(14)
            .collect();
        self.client
            .run(build_query(
                "CREATE (f:FocusSession {session_id: $sid, started_at: $now,
                                         duration_minutes: $dur, completed: false})",
                &[
                    ("sid", Value::String(sid.clone())),
                    ("now", Value::String(self.now())),
                    ("dur", Value::from(duration)),
                ],
            ))
            .await?;

        let mut result = json!({
            "session_id": sid,
            "started_at": self.now(),
            "duration_minutes": duration,
        });
        if let Some(task) = task_title {
            let link = "MATCH (f:FocusSession {session_id: $sid})
                        MATCH (t:Task)
                        WHERE toLower(t.title) CONTAINS toLower($task)
                        MERGE (f)-[:WORKED_ON]->(t)
                        RETURN t.title AS title";
            match self
                .client
                .fetch_one(build_query(
                    link,
                    &[
                        ("sid", result["session_id"].clone()),
                        ("task", Value::String(task.into())),
                    ],
                ))
                .await
            {
                Ok(Some(row)) => {
                    result["task"] = json!(row.get::<String>("title").unwrap_or_default());
                }
                Ok(None) => {}
                Err(e) => debug!(error = %e, "focus-task link skipped"),
            }
        }
        Ok(result)
    }

    /// Completes a session by id, or the newest incomplete one.
    pub async fn complete_focus_session(
        &self,
        session_id: Option<&str>,
        completed: bool,
    ) -> Result<Value, RafiqError> {
        let rows = match session_id {
            Some(sid) => {
                self.client
                    .fetch_all(build_query(
                        "MATCH (f:FocusSession {session_id: $sid})
                         WHERE f.completed = false
                         SET f.completed = $completed, f.ended_at = $now
                         RETURN f.session_id AS sid, f.started_at AS started,
                                f.ended_at AS ended, f.duration_minutes AS dur",
                        &[
                            ("sid", Value::String(sid.into())),
                            ("completed", Value::Bool(completed)),
                            ("now", Value::String(self.now())),
                        ],
                    ))
                    .await?
            }
            None => {
                self.client
                    .fetch_all(build_query(
                        "MATCH (f:FocusSession)
                         WHERE f.completed = false
                         WITH f ORDER BY f.started_at DESC LIMIT 1
                         SET f.completed = $completed, f.ended_at = $now
                         RETURN f.session_id AS sid, f.started_at AS started,
                                f.ended_at AS ended, f.duration_minutes AS dur",
                        &[
                            ("completed", Value::Bool(completed)),
                            ("now", Value::String(self.now())),
                        ],
                    ))
                    .await?
            }
        };
        if rows.is_empty() {
            return Ok(json!({"error": "No active focus session found"}));
        }
        Ok(json!({
            "session_id": rows[0].get::<String>("sid").unwrap_or_default(),
            "started_at": rows[0].get::<String>("started").unwrap_or_default(),
            "ended_at": rows[0].get::<String>("ended").unwrap_or_default(),
            "duration_minutes": rows[0].get::<i64>("dur").unwrap_or_default(),
            "completed": completed,
        }))
    }

    /// Focus statistics: today/week/total plus the top tasks by minutes.
    pub async fn query_focus_stats(&self) -> Result<Value, RafiqError> {
        let today = self.today();
        let week_ago = (rafiq_core::time::now_local(self.tz()) - chrono::Duration::days(7))
            .format("%Y-%m-%d")
            .to_string();

        let mut stats = json!({});
        for (prefix, since) in [("today", Some(&today)), ("week", Some(&week_ago)), ("total", None)] {
            let (cypher, params): (String, Vec<(&str, Value)>) = match since {
                Some(s) => (
                    "MATCH (f:FocusSession)
                     WHERE f.completed = true AND f.started_at >= $since
                     RETURN count(f) AS cnt, sum(f.duration_minutes) AS minutes"
                        .into(),
                    vec![("since", Value::String(s.clone()))],
                ),
                None => (
                    "MATCH (f:FocusSession)
                     WHERE f.completed = true
                     RETURN count(f) AS cnt, sum(f.duration_minutes) AS minutes"
                        .into(),
                    vec![],
                ),
            };
            let row = self.client.fetch_one(build_query(&cypher, &params)).await?;
            let (cnt, minutes) = row
                .map(|r| {
                    (
                        r.get::<i64>("cnt").unwrap_or_default(),
                        r.get::<i64>("minutes").unwrap_or_default(),
                    )
                })
                .unwrap_or((0, 0));
            stats[format!("{prefix}_sessions")] = json!(cnt);
            stats[format!("{prefix}_minutes")] = json!(minutes);
        }

        let task_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (f:FocusSession)-[:WORKED_ON]->(t:Task)
                 WHERE f.completed = true
                 RETURN t.title AS task, count(f) AS sessions, sum(f.duration_minutes) AS minutes
                 ORDER BY minutes DESC
                 LIMIT 10",
                &[],
            ))
            .await?;
        stats["by_task"] = Value::Array(
            task_rows
                .iter()
                .map(|r| {
                    json!({
                        "task": r.get::<String>("task").unwrap_or_default(),
                        "sessions": r.get::<i64>("sessions").unwrap_or_default(),
                        "minutes": r.get::<i64>("minutes").unwrap_or_default(),
                    })
                })
                .collect(),
        );
        Ok(stats)
    }

    // --- Time-blocking ---

    /// Suggests time blocks for a day: peak hours take high-energy tasks,
    /// low hours take low-energy ones, the remainder fills with medium.
    pub async fn suggest_time_blocks(
        &self,
        date: &str,
        energy_profile: Option<&str>,
    ) -> Result<Value, RafiqError> {
        let cfg = &self.config.productivity;
        let profile = energy_profile.unwrap_or(&cfg.default_energy_profile).to_string();

        let (mut peak_start, mut peak_end) =
            parse_hour_range(&cfg.energy_peak_hours).unwrap_or((7, 12));
        let (mut low_start, mut low_end) =
            parse_hour_range(&cfg.energy_low_hours).unwrap_or((14, 16));
        match profile.as_str() {
            "tired" => {
                peak_start += 1;
                peak_end -= 1;
                low_start -= 1;
                low_end += 1;
            }
            "energized" => {
                peak_start -= 1;
                peak_end += 1;
            }
            _ => {}
        }
        let day_start = cfg.work_day_start as i64;
        let day_end = cfg.work_day_end as i64;
        peak_start = peak_start.max(day_start);
        peak_end = peak_end.min(day_end);
        low_start = low_start.max(day_start);
        low_end = low_end.min(day_end);

        let eod = format!("{date}T23:59:59");
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task)
                 WHERE t.status IN ['todo', 'in_progress']
                   AND (t.start_time IS NULL OR t.start_time = '')
                   AND (t.due_date IS NULL OR t.due_date <= $eod)
                 RETURN t.title AS title, t.priority AS priority,
                        t.energy_level AS energy, t.estimated_duration AS duration
                 ORDER BY t.priority DESC
                 LIMIT 20",
                &[("eod", Value::String(eod))],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"blocks": [], "energy_profile": profile, "date": date}));
        }

        let slot = cfg.time_block_slot_minutes;
        let mut high = Vec::new();
        let mut medium = Vec::new();
        let mut low = Vec::new();
        for row in &rows {
            let title: String = row.get("title").unwrap_or_default();
            let priority: i64 = row.get("priority").unwrap_or_default();
            let energy: String = {
                let e: String = row.get("energy").unwrap_or_default();
                if e.is_empty() {
                    "medium".into()
                } else {
                    e
                }
            };
            let duration: i64 = {
                let d: i64 = row.get("duration").unwrap_or_default();
                if d > 0 {
                    d
                } else {
                    slot
                }
            };
            let task = (title, priority, energy.clone(), duration);
            match energy.as_str() {
                "high" => high.push(task),
                "low" => low.push(task),
                _ => medium.push(task),
            }
        }

        let mut blocks = Vec::new();
        schedule_blocks(date, &high, peak_start, peak_end, &mut blocks);
        schedule_blocks(date, &low, low_start, low_end, &mut blocks);
        let (medium_start, medium_end) = if peak_end < low_start {
            (peak_end, low_start)
        } else {
            (low_end, day_end)
        };
        schedule_blocks(date, &medium, medium_start, medium_end, &mut blocks);

        Ok(json!({"blocks": blocks, "energy_profile": profile, "date": date}))
    }

    /// Applies suggested blocks to the Task nodes.
    pub async fn apply_time_blocks(&self, blocks: &[TimeBlock], date: &str) -> Result<Value, RafiqError> {
        let mut applied = 0;
        for block in blocks {
            if block.task_title.is_empty() || block.start_time.is_empty() || block.end_time.is_empty() {
                continue;
            }
            let rows = self
                .client
                .fetch_all(build_query(
                    "MATCH (t:Task {title: $title})
                     SET t.start_time = $start, t.end_time = $end, t.updated_at = $now
                     RETURN t.title AS title",
                    &[
                        ("title", Value::String(block.task_title.clone())),
                        ("start", Value::String(block.start_time.clone())),
                        ("end", Value::String(block.end_time.clone())),
                        ("now", Value::String(self.now())),
                    ],
                ))
                .await?;
            if !rows.is_empty() {
                applied += 1;
            }
        }
        Ok(json!({"applied": applied, "date": date}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_range_parsing() {
        assert_eq!(parse_hour_range("7-12"), Some((7, 12)));
        assert_eq!(parse_hour_range(" 14 - 16 "), Some((14, 16)));
        assert_eq!(parse_hour_range("bad"), None);
    }

    #[test]
    fn blocks_fill_window_in_order() {
        let tasks = vec![
            ("deep work".to_string(), 5, "high".to_string(), 90),
            ("review".to_string(), 3, "high".to_string(), 60),
        ];
        let mut blocks = Vec::new();
        schedule_blocks("2026-02-11", &tasks, 7, 12, &mut blocks);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start_time, "2026-02-11T07:00:00");
        assert_eq!(blocks[0].end_time, "2026-02-11T08:30:00");
        assert_eq!(blocks[1].start_time, "2026-02-11T08:30:00");
    }

    #[test]
    fn blocks_stop_when_window_exhausted() {
        let tasks = vec![
            ("a".to_string(), 1, "low".to_string(), 60),
            ("b".to_string(), 1, "low".to_string(), 60),
            ("c".to_string(), 1, "low".to_string(), 60),
        ];
        let mut blocks = Vec::new();
        schedule_blocks("2026-02-11", &tasks, 14, 16, &mut blocks);
        assert_eq!(blocks.len(), 2, "only two hours available");
    }

    #[test]
    fn long_tasks_cap_at_two_hours() {
        let tasks = vec![("marathon".to_string(), 5, "high".to_string(), 300)];
        let mut blocks = Vec::new();
        schedule_blocks("2026-02-11", &tasks, 7, 12, &mut blocks);
        assert_eq!(blocks[0].end_time, "2026-02-11T09:00:00");
    }
}
