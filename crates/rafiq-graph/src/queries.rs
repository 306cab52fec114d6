// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-domain read queries: the daily plan, knowledge listing, and the
//! proactive-scheduler views (due reminders, stalled projects, old debts,
//! evening/noon summaries).

use rafiq_core::RafiqError;
use serde_json::{json, Value};

use crate::client::build_query;
use crate::GraphService;

impl GraphService {
    /// Today's actionable items: overdue + today reminders, active tasks by
    /// priority, debts I owe.
    pub async fn query_daily_plan(&self) -> Result<String, RafiqError> {
        let today_eod = format!("{}T23:59:59", self.today());
        let mut parts: Vec<String> = Vec::new();

        let reminder_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status = 'pending'
                   AND r.due_date IS NOT NULL
                   AND r.due_date <= $eod
                 RETURN r.title AS title, r.due_date AS due, r.priority AS priority
                 ORDER BY r.due_date
                 LIMIT 20",
                &[("eod", Value::String(today_eod))],
            ))
            .await?;
        if !reminder_rows.is_empty() {
            parts.push("Reminders (overdue + today):".into());
            for row in &reminder_rows {
                let title: String = row.get("title").unwrap_or_default();
                let due: String = row.get("due").unwrap_or_default();
                let priority: i64 = row.get("priority").unwrap_or_default();
                let due = if due.is_empty() {
                    String::new()
                } else {
                    format!(" (due: {due})")
                };
                let priority = if priority >= 3 {
                    format!(" [priority:{priority}]")
                } else {
                    String::new()
                };
                parts.push(format!("  - {title}{due}{priority}"));
            }
        }

        let task_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task)
                 WHERE t.status IN ['todo', 'in_progress']
                 OPTIONAL MATCH (t)-[:BELONGS_TO]->(p:Project)
                 RETURN t.title AS title, t.status AS status, t.due_date AS due,
                        t.priority AS priority, p.name AS project
                 ORDER BY t.priority DESC, t.due_date
                 LIMIT 20",
                &[],
            ))
            .await?;
        if !task_rows.is_empty() {
            parts.push("\nActive tasks:".into());
            for row in &task_rows {
                let title: String = row.get("title").unwrap_or_default();
                let status: String = row.get("status").unwrap_or_default();
                let due: String = row.get("due").unwrap_or_default();
                let project: String = row.get("project").unwrap_or_default();
                let status = if status != "todo" {
                    format!(" [{status}]")
                } else {
                    String::new()
                };
                let due = if due.is_empty() {
                    String::new()
                } else {
                    format!(" (due: {due})")
                };
                let project = if project.is_empty() {
                    String::new()
                } else {
                    format!(" @ {project}")
                };
                parts.push(format!("  - {title}{status}{due}{project}"));
            }
        }

        let debt_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (d:Debt)-[:INVOLVES]->(p:Person)
                 WHERE d.status IN ['open', 'partial'] AND d.direction = 'i_owe'
                 RETURN p.name AS person, d.amount AS amount, d.reason AS reason
                 ORDER BY d.amount DESC
                 LIMIT 10",
                &[],
            ))
            .await?;
        if !debt_rows.is_empty() {
            parts.push("\nDebts I owe:".into());
            for row in &debt_rows {
                let person: String = row.get("person").unwrap_or_default();
                let amount: f64 = row.get("amount").unwrap_or_default();
                let reason: String = row.get("reason").unwrap_or_default();
                let reason = if reason.is_empty() {
                    String::new()
                } else {
                    format!(" ({reason})")
                };
                parts.push(format!("  - {person}: {amount:.0} SAR{reason}"));
            }
        }

        Ok(if parts.is_empty() {
            "No actionable items for today.".into()
        } else {
            parts.join("\n")
        })
    }

    /// Knowledge entries, optionally filtered by topic text.
    pub async fn query_knowledge(&self, topic: Option<&str>) -> Result<String, RafiqError> {
        let rows = match topic {
            Some(topic) => {
                self.client
                    .fetch_all(build_query(
                        "MATCH (k:Knowledge)
                         WHERE toLower(k.title) CONTAINS toLower($topic)
                            OR toLower(k.content) CONTAINS toLower($topic)
                            OR toLower(k.category) CONTAINS toLower($topic)
                         RETURN k.title AS title, k.content AS content,
                                k.category AS category, k.source AS source
                         LIMIT 20",
                        &[("topic", Value::String(topic.into()))],
                    ))
                    .await?
            }
            None => {
                self.client
                    .fetch_all(build_query(
                        "MATCH (k:Knowledge)
                         RETURN k.title AS title, k.content AS content,
                                k.category AS category, k.source AS source
                         ORDER BY k.created_at DESC
                         LIMIT 20",
                        &[],
                    ))
                    .await?
            }
        };

        if rows.is_empty() {
            let label = topic.map(|t| format!(" about '{t}'")).unwrap_or_default();
            return Ok(format!("No knowledge entries found{label}."));
        }

        let mut parts = vec!["Knowledge:".to_string()];
        for row in &rows {
            let title: String = row.get("title").unwrap_or_default();
            let content: String = row.get("content").unwrap_or_default();
            let category: String = row.get("category").unwrap_or_default();
            let source: String = row.get("source").unwrap_or_default();
            let cat = if category.is_empty() {
                String::new()
            } else {
                format!(" [{category}]")
            };
            let src = if source.is_empty() {
                String::new()
            } else {
                format!(" (source: {source})")
            };
            parts.push(format!("  - {title}{cat}{src}"));
            if !content.is_empty() {
                let preview: String = content.chars().take(150).collect();
                let ellipsis = if content.chars().count() > 150 { "..." } else { "" };
                parts.push(format!("    {preview}{ellipsis}"));
            }
        }
        Ok(parts.join("\n"))
    }

    // --- Proactive views ---

    /// Reminders due now or earlier, with recurrence for advancement.
    pub async fn query_due_reminders(&self) -> Result<Vec<Value>, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status = 'pending'
                   AND r.due_date IS NOT NULL
                   AND r.due_date <= $now
                   AND r.notified_at IS NULL
                 RETURN r.title AS title, r.due_date AS due, r.reminder_type AS rtype,
                        r.priority AS priority, r.description AS description,
                        r.recurrence AS recurrence, r.persistent AS persistent
                 ORDER BY r.due_date
                 LIMIT 30",
                &[("now", Value::String(self.now()))],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                json!({
                    "title": row.get::<String>("title").unwrap_or_default(),
                    "due_date": row.get::<String>("due").unwrap_or_default(),
                    "reminder_type": row.get::<String>("rtype").unwrap_or_default(),
                    "priority": row.get::<i64>("priority").unwrap_or_default(),
                    "description": row.get::<String>("description").unwrap_or_default(),
                    "recurrence": row.get::<String>("recurrence").unwrap_or_default(),
                    "persistent": row.get::<bool>("persistent").unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Pending reminders already past due (noon check-in).
    pub async fn query_overdue_reminders(&self) -> Result<Vec<Value>, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status = 'pending'
                   AND r.due_date IS NOT NULL
                   AND r.due_date < $now
                 RETURN r.title AS title, r.due_date AS due, r.reminder_type AS rtype,
                        r.priority AS priority, r.description AS description
                 ORDER BY r.due_date
                 LIMIT 20",
                &[("now", Value::String(self.now()))],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                json!({
                    "title": row.get::<String>("title").unwrap_or_default(),
                    "due_date": row.get::<String>("due").unwrap_or_default(),
                    "reminder_type": row.get::<String>("rtype").unwrap_or_default(),
                    "priority": row.get::<i64>("priority").unwrap_or_default(),
                    "description": row.get::<String>("description").unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Completed-today (tasks + reminders) and tomorrow's reminders.
    pub async fn query_evening_summary(&self) -> Result<Value, RafiqError> {
        let today = self.today();
        let tomorrow = rafiq_core::time::tomorrow(self.tz());
        let tomorrow_eod = format!("{tomorrow}T23:59:59");

        let mut completed: Vec<String> = Vec::new();
        let task_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (t:Task)
                 WHERE t.status = 'done' AND t.updated_at IS NOT NULL AND t.updated_at >= $today
                 RETURN t.title AS title
                 LIMIT 20",
                &[("today", Value::String(today.clone()))],
            ))
            .await?;
        completed.extend(task_rows.iter().filter_map(|r| r.get::<String>("title").ok()));

        let reminder_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status = 'done' AND r.completed_at IS NOT NULL AND r.completed_at >= $today
                 RETURN r.title AS title
                 LIMIT 20",
                &[("today", Value::String(today))],
            ))
            .await?;
        completed.extend(reminder_rows.iter().filter_map(|r| r.get::<String>("title").ok()));

        let tomorrow_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status = 'pending'
                   AND r.due_date IS NOT NULL
                   AND r.due_date >= $tomorrow AND r.due_date <= $tomorrow_eod
                 RETURN r.title AS title, r.due_date AS due, r.reminder_type AS rtype,
                        r.priority AS priority
                 ORDER BY r.due_date
                 LIMIT 20",
                &[
                    ("tomorrow", Value::String(tomorrow)),
                    ("tomorrow_eod", Value::String(tomorrow_eod)),
                ],
            ))
            .await?;
        let tomorrow_reminders: Vec<Value> = tomorrow_rows
            .iter()
            .map(|row| {
                json!({
                    "title": row.get::<String>("title").unwrap_or_default(),
                    "due_date": row.get::<String>("due").unwrap_or_default(),
                    "reminder_type": row.get::<String>("rtype").unwrap_or_default(),
                    "priority": row.get::<i64>("priority").unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({
            "completed_today": completed,
            "tomorrow_reminders": tomorrow_reminders,
        }))
    }

    /// Active projects with no task activity for N days.
    pub async fn query_stalled_projects(&self, days: i64) -> Result<Vec<Value>, RafiqError> {
        let cutoff =
            (rafiq_core::time::now_local(self.tz()) - chrono::Duration::days(days)).to_rfc3339();
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (p:Project)
                 WHERE p.status IS NULL OR p.status IN ['active', 'in_progress']
                 OPTIONAL MATCH (t:Task)-[:BELONGS_TO]->(p)
                 WITH p,
                      max(coalesce(t.updated_at, p.updated_at, p.created_at)) AS last_activity,
                      count(t) AS task_count
                 WHERE last_activity < $cutoff
                 RETURN p.name AS name, p.status AS status, last_activity, task_count
                 ORDER BY last_activity
                 LIMIT 20",
                &[("cutoff", Value::String(cutoff))],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                json!({
                    "name": row.get::<String>("name").unwrap_or_default(),
                    "status": row.get::<String>("status").unwrap_or_default(),
                    "last_activity": row.get::<String>("last_activity").unwrap_or_default(),
                    "task_count": row.get::<i64>("task_count").unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Debts I owe that are older than N days.
    pub async fn query_old_debts(&self, days: i64) -> Result<Vec<Value>, RafiqError> {
        let cutoff =
            (rafiq_core::time::now_local(self.tz()) - chrono::Duration::days(days)).to_rfc3339();
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (d:Debt)-[:INVOLVES]->(p:Person)
                 WHERE d.status IN ['open', 'partial']
                   AND d.direction = 'i_owe'
                   AND d.created_at < $cutoff
                 RETURN p.name AS person, d.amount AS amount, d.reason AS reason,
                        d.created_at AS created_at, d.status AS status
                 ORDER BY d.amount DESC
                 LIMIT 20",
                &[("cutoff", Value::String(cutoff))],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                json!({
                    "person": row.get::<String>("person").unwrap_or_default(),
                    "amount": row.get::<f64>("amount").unwrap_or_default(),
                    "reason": row.get::<String>("reason").unwrap_or_default(),
                    "created_at": row.get::<String>("created_at").unwrap_or_default(),
                    "status": row.get::<String>("status").unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Re-schedules persistent reminders for the next nag cycle: any
    /// persistent pending reminder already notified gets its due date moved
    /// to now and the notified flag cleared.
    pub async fn reschedule_persistent_reminders(&self) -> Result<Value, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status = 'pending'
                   AND (r.persistent = true OR r.reminder_type = 'persistent')
                   AND r.notified_at IS NOT NULL
                 SET r.due_date = $now, r.notified_at = NULL, r.updated_at = $now
                 RETURN r.title AS title",
                &[("now", Value::String(self.now()))],
            ))
            .await?;
        let titles: Vec<String> = rows.iter().filter_map(|r| r.get("title").ok()).collect();
        Ok(json!({"rescheduled": titles.len(), "titles": titles}))
    }
}
