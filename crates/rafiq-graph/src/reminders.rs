// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder lifecycle: create/update/snooze/advance, multi-strategy title
//! matching, duplicate merging, and the grouped reminder views.

use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use rafiq_core::{RafiqError, Recurrence};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::client::build_query;
use crate::cypher::sanitize_props;
use crate::GraphService;

/// Parses a stored due date: RFC 3339, `YYYY-MM-DDTHH:MM:SS`, or bare date.
pub fn parse_due_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&raw[..raw.len().min(19)], "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)
}

/// Advances a due date by the recurrence interval until it is after `now`.
pub fn next_occurrence(due: NaiveDateTime, recurrence: Recurrence, now: NaiveDateTime) -> NaiveDateTime {
    let mut next = due;
    loop {
        next = match recurrence {
            Recurrence::Daily => next + Duration::days(1),
            Recurrence::Weekly => next + Duration::weeks(1),
            Recurrence::Monthly => next
                .checked_add_months(Months::new(1))
                .unwrap_or(next + Duration::days(30)),
            Recurrence::Yearly => next
                .checked_add_months(Months::new(12))
                .unwrap_or(next + Duration::days(365)),
        };
        if next > now {
            return next;
        }
    }
}

impl GraphService {
    /// Creates a reminder, or refreshes an existing pending/snoozed one
    /// with the same lowercased title instead of duplicating it.
    pub async fn create_reminder(
        &self,
        title: &str,
        props: Map<String, Value>,
    ) -> Result<(), RafiqError> {
        let mut props = sanitize_props(&props);
        props.entry("snooze_count".to_string()).or_insert(json!(0));
        let sets: Vec<String> = props.keys().map(|k| format!("r.{k} = ${k}")).collect();
        let sets = format!(", {}", sets.join(", "));

        let mut params = vec![
            ("title", Value::String(title.into())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }

        let update = format!(
            "MATCH (r:Reminder)
             WHERE toLower(r.title) = toLower($title)
               AND r.status IN ['pending', 'snoozed']
             SET r.updated_at = $now{sets}
             RETURN r.title AS title"
        );
        let rows = self.client.fetch_all(build_query(&update, &params)).await?;
        if !rows.is_empty() {
            return Ok(());
        }

        // New reminders always carry a due date; untimed ones land at the
        // end of today.
        let default_due = if props.contains_key("due_date") {
            String::new()
        } else {
            ", r.due_date = $default_due".to_string()
        };
        params.push((
            "default_due",
            Value::String(format!("{}T23:59:59", self.today())),
        ));
        let create = format!(
            "CREATE (r:Reminder {{title: $title}})
             SET r.status = 'pending', r.created_at = $now{sets}{default_due}"
        );
        self.client.run(build_query(&create, &params)).await
    }

    /// Multi-strategy reminder lookup, in specificity order:
    /// direct CONTAINS → singular/plural variant → all-keywords →
    /// reverse CONTAINS → vector resolution. Returns matching titles.
    pub async fn find_matching_reminders(
        &self,
        title: &str,
        statuses: &[&str],
    ) -> Result<Vec<String>, RafiqError> {
        let status_clause = if statuses.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = statuses.iter().map(|s| format!("'{s}'")).collect();
            format!(" AND r.status IN [{}]", list.join(", "))
        };

        let contains = format!(
            "MATCH (r:Reminder)
             WHERE toLower(r.title) CONTAINS toLower($title){status_clause}
             RETURN r.title AS title"
        );

        // Strategy 1: direct CONTAINS.
        let rows = self
            .client
            .fetch_all(build_query(&contains, &[("title", Value::String(title.into()))]))
            .await?;
        if !rows.is_empty() {
            return Ok(rows.iter().filter_map(|r| r.get("title").ok()).collect());
        }

        // Strategy 2: singular/plural variant.
        let trimmed = title.trim();
        let variant = if trimmed.ends_with('s') && trimmed.chars().count() > 3 {
            trimmed[..trimmed.len() - 1].to_string()
        } else {
            format!("{trimmed}s")
        };
        let rows = self
            .client
            .fetch_all(build_query(&contains, &[("title", Value::String(variant.clone()))]))
            .await?;
        if !rows.is_empty() {
            info!(variant = %variant, original = title, "reminder matched with plural variant");
            return Ok(rows.iter().filter_map(|r| r.get("title").ok()).collect());
        }

        // Strategy 3: every word (≥3 chars) must appear in the title.
        let words: Vec<String> = title
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() >= 3)
            .map(|w| w.replace('\'', ""))
            .collect();
        if words.len() >= 2 {
            let conditions: Vec<String> = words
                .iter()
                .map(|w| format!("toLower(r.title) CONTAINS '{w}'"))
                .collect();
            let keyword_q = format!(
                "MATCH (r:Reminder) WHERE {}{status_clause} RETURN r.title AS title",
                conditions.join(" AND ")
            );
            let rows = self.client.fetch_all(build_query(&keyword_q, &[])).await?;
            if !rows.is_empty() {
                info!(original = title, "reminder matched via keywords");
                return Ok(rows.iter().filter_map(|r| r.get("title").ok()).collect());
            }
        }

        // Strategy 4: reverse CONTAINS: the query text contains the stored
        // title (long decorated queries like "تحقق من التواريخ (متأخرة)").
        let reverse = format!(
            "MATCH (r:Reminder)
             WHERE toLower($title) CONTAINS toLower(r.title){status_clause}
             RETURN r.title AS title"
        );
        let rows = self
            .client
            .fetch_all(build_query(&reverse, &[("title", Value::String(title.into()))]))
            .await?;
        if !rows.is_empty() {
            info!(original = title, "reminder matched via reverse CONTAINS");
            return Ok(rows.iter().filter_map(|r| r.get("title").ok()).collect());
        }

        // Strategy 5: vector resolution over the Reminder namespace.
        let resolved = self.resolve_entity_name_unrestricted(title, "Reminder").await?;
        if resolved.to_lowercase() != title.to_lowercase() {
            let rows = self
                .client
                .fetch_all(build_query(&contains, &[("title", Value::String(resolved.clone()))]))
                .await?;
            if !rows.is_empty() {
                info!(resolved = %resolved, original = title, "reminder matched via vector similarity");
                return Ok(rows.iter().filter_map(|r| r.get("title").ok()).collect());
            }
        }

        Ok(Vec::new())
    }

    /// Resolution lookup that bypasses the skip-list (reminder titles are
    /// normally excluded from entity resolution).
    async fn resolve_entity_name_unrestricted(
        &self,
        name: &str,
        entity_type: &str,
    ) -> Result<String, RafiqError> {
        use rafiq_vector::SearchFilters;
        if !self.config.resolution.enabled {
            return Ok(name.to_string());
        }
        let hits = self
            .vector
            .search(name, 3, &SearchFilters::entity(entity_type))
            .await
            .unwrap_or_default();
        for hit in hits {
            let other = hit.payload_str("entity_name");
            if !other.is_empty() && other != name && hit.score >= 0.40 {
                return Ok(other.to_string());
            }
        }
        Ok(name.to_string())
    }

    /// Marks matching reminders done/snoozed/cancelled or deletes them.
    pub async fn update_reminder_status(
        &self,
        title: &str,
        action: &str,
        snooze_until: Option<&str>,
    ) -> Result<Value, RafiqError> {
        let matches = self.find_matching_reminders(title, &[]).await?;
        if matches.is_empty() {
            return Ok(json!({"error": format!("No reminder found matching '{title}'")}));
        }

        for r_title in &matches {
            let params = vec![
                ("title", Value::String(r_title.clone())),
                ("now", Value::String(self.now())),
                (
                    "snooze_until",
                    Value::String(snooze_until.unwrap_or_default().into()),
                ),
            ];
            let cypher = match action {
                "done" => {
                    "MATCH (r:Reminder) WHERE r.title = $title
                     SET r.status = 'done', r.completed_at = $now"
                }
                "snooze" => {
                    "MATCH (r:Reminder) WHERE r.title = $title
                     SET r.status = 'snoozed',
                         r.snooze_count = coalesce(r.snooze_count, 0) + 1,
                         r.snoozed_until = $snooze_until"
                }
                "cancel" => {
                    "MATCH (r:Reminder) WHERE r.title = $title
                     SET r.status = 'cancelled', r.cancelled_at = $now"
                }
                "delete" => {
                    "MATCH (r:Reminder) WHERE r.title = $title
                     DETACH DELETE r"
                }
                _ => return Ok(json!({"error": format!("Unknown action: {action}")})),
            };
            self.client.run(build_query(cypher, &params)).await?;
        }

        let status = if action == "delete" { "deleted" } else { action };
        Ok(json!({"title": matches[0], "status": status, "matched": matches.len()}))
    }

    /// Moves a recurring reminder's due date forward until it is in the
    /// future, clearing the notified flag.
    pub async fn advance_recurring_reminder(
        &self,
        title: &str,
        recurrence: Recurrence,
    ) -> Result<Value, RafiqError> {
        let find = "MATCH (r:Reminder)
                    WHERE toLower(r.title) CONTAINS toLower($title) AND r.status = 'pending'
                    RETURN r.title AS title, r.due_date AS due_date
                    LIMIT 1";
        let row = self
            .client
            .fetch_one(build_query(find, &[("title", Value::String(title.into()))]))
            .await?;
        let Some(row) = row else {
            return Ok(json!({"error": format!("No pending reminder found matching '{title}'")}));
        };
        let r_title: String = row.get("title").unwrap_or_default();
        let due_date: String = row.get("due_date").unwrap_or_default();
        if due_date.is_empty() {
            return Ok(json!({"error": format!("Reminder '{r_title}' has no due_date to advance")}));
        }
        let Some(current) = parse_due_date(&due_date) else {
            return Ok(json!({"error": format!("Reminder '{r_title}' has unparseable due_date '{due_date}'")}));
        };

        let now = rafiq_core::time::now_local(self.tz()).naive_local();
        let next = next_occurrence(current, recurrence, now);
        let next_str = next.format("%Y-%m-%dT%H:%M:%S").to_string();

        let update = "MATCH (r:Reminder)
                      WHERE toLower(r.title) CONTAINS toLower($title) AND r.status = 'pending'
                      SET r.due_date = $next_due, r.updated_at = $now, r.notified_at = NULL";
        self.client
            .run(build_query(
                update,
                &[
                    ("title", Value::String(title.into())),
                    ("next_due", Value::String(next_str.clone())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;

        Ok(json!({"title": r_title, "next_due": next_str, "recurrence": recurrence.to_string()}))
    }

    /// Updates reminder fields by fuzzy title match.
    pub async fn update_reminder(
        &self,
        title: &str,
        updates: Map<String, Value>,
    ) -> Result<Value, RafiqError> {
        let allowed = ["new_title", "due_date", "priority", "description", "recurrence"];
        let updates: Map<String, Value> = sanitize_props(&updates)
            .into_iter()
            .filter(|(k, _)| allowed.contains(&k.as_str()))
            .collect();
        if updates.is_empty() {
            return Ok(json!({"error": "No fields to update"}));
        }

        let mut sets = vec!["r.updated_at = $now".to_string()];
        for k in updates.keys() {
            if k == "new_title" {
                sets.push("r.title = $new_title".to_string());
            } else {
                sets.push(format!("r.{k} = ${k}"));
            }
        }
        let cypher = format!(
            "MATCH (r:Reminder) WHERE toLower(r.title) CONTAINS toLower($title)
             SET {}
             RETURN r.title AS title, r.status AS status, r.due_date AS due_date",
            sets.join(", ")
        );
        let mut params = vec![
            ("title", Value::String(title.into())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &updates {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("No reminder found matching '{title}'")}));
        }
        let t: String = rows[0].get("title").unwrap_or_default();
        let s: String = rows[0].get("status").unwrap_or_default();
        let d: String = rows[0].get("due_date").unwrap_or_default();
        Ok(json!({"title": t, "status": s, "due_date": d}))
    }

    /// Deletes reminders by fuzzy title match.
    pub async fn delete_reminder(&self, title: &str) -> Result<Value, RafiqError> {
        let cypher = "MATCH (r:Reminder) WHERE toLower(r.title) CONTAINS toLower($title)
                      WITH r, r.title AS t
                      DETACH DELETE r
                      RETURN t";
        let rows = self
            .client
            .fetch_all(build_query(cypher, &[("title", Value::String(title.into()))]))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("No reminder found matching '{title}'")}));
        }
        let deleted: Vec<String> = rows.iter().filter_map(|r| r.get("t").ok()).collect();
        Ok(json!({"deleted": deleted, "count": deleted.len()}))
    }

    /// Deletes all reminders, optionally restricted to one status.
    pub async fn delete_all_reminders(&self, status: Option<&str>) -> Result<Value, RafiqError> {
        let (cypher, params): (&str, Vec<(&str, Value)>) = match status {
            Some(s) => (
                "MATCH (r:Reminder {status: $status}) WITH r, r.title AS t DETACH DELETE r RETURN t",
                vec![("status", Value::String(s.into()))],
            ),
            None => (
                "MATCH (r:Reminder) WITH r, r.title AS t DETACH DELETE r RETURN t",
                vec![],
            ),
        };
        let rows = self.client.fetch_all(build_query(cypher, &params)).await?;
        let titles: Vec<String> = rows.iter().filter_map(|r| r.get("t").ok()).collect();
        Ok(json!({"deleted_count": titles.len(), "titles": titles}))
    }

    /// Merges duplicate pending/snoozed reminders grouped by normalised
    /// title. Keeper preference: pending over snoozed, earliest due date,
    /// lowest id; best priority/recurrence/description are merged in.
    pub async fn merge_duplicate_reminders(&self) -> Result<Value, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder)
                 WHERE r.status IN ['pending', 'snoozed']
                 RETURN id(r) AS id, r.title AS title, r.due_date AS due_date,
                        r.priority AS priority, r.recurrence AS recurrence,
                        r.status AS status, r.description AS description
                 ORDER BY r.title",
                &[],
            ))
            .await?;

        #[derive(Clone)]
        struct Entry {
            id: i64,
            title: String,
            due_date: String,
            priority: i64,
            recurrence: String,
            status: String,
            description: String,
        }

        let mut groups: std::collections::BTreeMap<String, Vec<Entry>> = Default::default();
        for row in &rows {
            let entry = Entry {
                id: row.get("id").unwrap_or_default(),
                title: row.get("title").unwrap_or_default(),
                due_date: row.get("due_date").unwrap_or_default(),
                priority: row.get("priority").unwrap_or_default(),
                recurrence: row.get("recurrence").unwrap_or_default(),
                status: row.get("status").unwrap_or_default(),
                description: row.get("description").unwrap_or_default(),
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
                let rank = |e: &Entry| (if e.status == "pending" { 0 } else { 1 });
                let due = |e: &Entry| {
                    if e.due_date.is_empty() {
                        "9999".to_string()
                    } else {
                        e.due_date.clone()
                    }
                };
                (rank(a), due(a), a.id).cmp(&(rank(b), due(b), b.id))
            });
            let keep = items[0].clone();
            let remove = &items[1..];

            let best_priority = remove
                .iter()
                .map(|e| e.priority)
                .chain([keep.priority])
                .max()
                .unwrap_or(0);
            let best_recurrence = if keep.recurrence.is_empty() {
                remove
                    .iter()
                    .find(|e| !e.recurrence.is_empty())
                    .map(|e| e.recurrence.clone())
            } else {
                None
            };
            let best_description = if keep.description.is_empty() {
                remove
                    .iter()
                    .find(|e| !e.description.is_empty())
                    .map(|e| e.description.clone())
            } else {
                None
            };

            let mut sets = vec!["r.updated_at = $now".to_string()];
            let mut params = vec![
                ("kid", Value::from(keep.id)),
                ("now", Value::String(self.now())),
            ];
            if best_priority > keep.priority {
                sets.push("r.priority = $priority".into());
                params.push(("priority", Value::from(best_priority)));
            }
            if let Some(ref rec) = best_recurrence {
                sets.push("r.recurrence = $recurrence".into());
                params.push(("recurrence", Value::String(rec.clone())));
            }
            if let Some(ref desc) = best_description {
                sets.push("r.description = $description".into());
                params.push(("description", Value::String(desc.clone())));
            }
            let update = format!("MATCH (r:Reminder) WHERE id(r) = $kid SET {}", sets.join(", "));
            self.client.run(build_query(&update, &params)).await?;

            let remove_ids: Vec<i64> = remove.iter().map(|e| e.id).collect();
            self.client
                .run(build_query(
                    "MATCH (r:Reminder) WHERE id(r) IN $ids DETACH DELETE r",
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

    /// Grouped reminder view: overdue, then upcoming/snoozed, with
    /// type/priority/snooze tags.
    pub async fn query_reminders(
        &self,
        status: Option<&str>,
        include_overdue: bool,
    ) -> Result<String, RafiqError> {
        let now = self.now();
        let mut parts: Vec<String> = Vec::new();

        if include_overdue {
            let rows = self
                .client
                .fetch_all(build_query(
                    "MATCH (r:Reminder)
                     WHERE r.status = 'pending' AND r.due_date IS NOT NULL AND r.due_date < $now
                     RETURN r.title AS title, r.due_date AS due, r.reminder_type AS rtype,
                            r.priority AS priority, r.snooze_count AS snoozes
                     ORDER BY r.due_date
                     LIMIT 20",
                    &[("now", Value::String(now.clone()))],
                ))
                .await?;
            if !rows.is_empty() {
                parts.push("⚠ Overdue reminders:".into());
                for row in &rows {
                    let title: String = row.get("title").unwrap_or_default();
                    let due: String = row.get("due").unwrap_or_default();
                    let tags = format_reminder_tags(
                        &row.get::<String>("rtype").unwrap_or_default(),
                        row.get("priority").unwrap_or_default(),
                        row.get("snoozes").unwrap_or_default(),
                    );
                    parts.push(format!("  - {title} (due: {due}){tags}"));
                }
            }
        }

        let filter_status = status.unwrap_or("pending");
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (r:Reminder {status: $status})
                 WHERE r.due_date IS NULL OR r.due_date >= $now
                 RETURN r.title AS title, r.due_date AS due, r.reminder_type AS rtype,
                        r.priority AS priority, r.snooze_count AS snoozes
                 ORDER BY r.due_date
                 LIMIT 20",
                &[
                    ("status", Value::String(filter_status.into())),
                    ("now", Value::String(now)),
                ],
            ))
            .await?;
        if !rows.is_empty() {
            parts.push(if filter_status == "snoozed" {
                "Snoozed reminders:".into()
            } else {
                "Upcoming reminders:".into()
            });
            for row in &rows {
                let title: String = row.get("title").unwrap_or_default();
                let due: String = row.get("due").unwrap_or_default();
                let due = if due.is_empty() {
                    String::new()
                } else {
                    format!(" (due: {due})")
                };
                let tags = format_reminder_tags(
                    &row.get::<String>("rtype").unwrap_or_default(),
                    row.get("priority").unwrap_or_default(),
                    row.get("snoozes").unwrap_or_default(),
                );
                parts.push(format!("  - {title}{due}{tags}"));
            }
        }

        Ok(if parts.is_empty() {
            "No reminders found.".into()
        } else {
            parts.join("\n")
        })
    }

    /// Marks pending reminders matching a completed task title as done.
    /// Returns the dismissed titles.
    pub async fn auto_dismiss_reminders(&self, task_title: &str) -> Result<Vec<String>, RafiqError> {
        let matches = self.find_matching_reminders(task_title, &["pending"]).await?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        for title in &matches {
            self.client
                .run(build_query(
                    "MATCH (r:Reminder) WHERE r.title = $title AND r.status = 'pending'
                     SET r.status = 'done', r.completed_at = $now",
                    &[
                        ("title", Value::String(title.clone())),
                        ("now", Value::String(self.now())),
                    ],
                ))
                .await?;
        }
        info!(task = task_title, dismissed = matches.len(), "auto-dismissed reminders for completed task");
        Ok(matches)
    }

    /// Marks a reminder as notified (idempotent under duplicate delivery).
    pub async fn mark_reminder_notified(&self, title: &str) -> Result<(), RafiqError> {
        self.client
            .run(build_query(
                "MATCH (r:Reminder) WHERE r.title = $title
                 SET r.notified_at = $now",
                &[
                    ("title", Value::String(title.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await
    }
}

fn format_reminder_tags(reminder_type: &str, priority: i64, snooze_count: i64) -> String {
    let mut tags = Vec::new();
    if !reminder_type.is_empty() && reminder_type != "one_time" {
        tags.push(reminder_type.to_string());
    }
    if priority >= 3 {
        tags.push(format!("priority:{priority}"));
    }
    if snooze_count > 0 {
        tags.push(format!("snoozed:{snooze_count}x"));
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn parse_due_date_formats() {
        assert!(parse_due_date("2026-02-11").is_some());
        assert!(parse_due_date("2026-02-11T09:30:00").is_some());
        assert!(parse_due_date("2026-02-11T09:30:00+03:00").is_some());
        assert!(parse_due_date("garbage").is_none());
    }

    #[test]
    fn monthly_advance_lands_on_same_day() {
        // Due 2026-02-11, advanced on 2026-02-12 → 2026-03-11.
        let next = next_occurrence(dt("2026-02-11"), Recurrence::Monthly, dt("2026-02-12"));
        assert_eq!(next.format("%Y-%m-%d").to_string(), "2026-03-11");
    }

    #[test]
    fn advance_skips_until_future() {
        // A weekly reminder three weeks stale jumps past every elapsed week.
        let next = next_occurrence(dt("2026-01-01"), Recurrence::Weekly, dt("2026-01-20"));
        assert_eq!(next.format("%Y-%m-%d").to_string(), "2026-01-22");
        assert!(next > dt("2026-01-20"));
    }

    #[test]
    fn daily_and_yearly_advance() {
        let daily = next_occurrence(dt("2026-02-11"), Recurrence::Daily, dt("2026-02-11"));
        assert_eq!(daily.format("%Y-%m-%d").to_string(), "2026-02-12");

        let yearly = next_occurrence(dt("2026-02-11"), Recurrence::Yearly, dt("2026-06-01"));
        assert_eq!(yearly.format("%Y-%m-%d").to_string(), "2027-02-11");
    }

    #[test]
    fn month_end_clamps() {
        // Jan 31 + 1 month clamps to Feb 28/29 rather than overflowing.
        let next = next_occurrence(dt("2026-01-31"), Recurrence::Monthly, dt("2026-02-01"));
        assert_eq!(next.format("%Y-%m").to_string(), "2026-02");
    }

    #[test]
    fn reminder_tags_formatting() {
        assert_eq!(format_reminder_tags("one_time", 0, 0), "");
        assert_eq!(format_reminder_tags("recurring", 0, 0), " [recurring]");
        assert_eq!(
            format_reminder_tags("persistent", 5, 2),
            " [persistent, priority:5, snoozed:2x]"
        );
        assert_eq!(format_reminder_tags("", 2, 0), "");
    }
}
