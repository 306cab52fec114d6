// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder tools.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

/// Strips parenthetical decoration the model adds, e.g. "(متأخرة)".
pub fn clean_query(query: &str) -> String {
    static PAREN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*").expect("valid paren regex"));
    PAREN.replace_all(query, " ").trim().to_string()
}

pub struct SearchReminders(pub Arc<Services>);

#[async_trait]
impl Tool for SearchReminders {
    fn name(&self) -> &'static str {
        "search_reminders"
    }
    fn description(&self) -> &'static str {
        "ابحث عن التذكيرات. استخدمها لما المستخدم يسأل عن تذكيراته أو مواعيده."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pending", "done", "snoozed", "all"],
                    "description": "فلتر حسب الحالة. الافتراضي: pending"
                },
                "query": {"type": "string", "description": "بحث بالعنوان (اختياري)"}
            },
            "required": []
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let status = str_arg(&args, "status").unwrap_or("pending");
        if let Some(query) = str_arg(&args, "query") {
            let statuses: Vec<&str> = if status == "all" { vec![] } else { vec![status] };
            let matches = self.0.graph.find_matching_reminders(query, &statuses).await?;
            if matches.is_empty() {
                return Ok(json!({"reminders": format!("لا توجد تذكيرات تطابق '{query}'")}));
            }
            let lines: Vec<String> = matches.iter().map(|t| format!("  - {t}")).collect();
            return Ok(json!({"reminders": lines.join("\n")}));
        }
        let status_filter = (status != "all").then_some(status);
        let text = self.0.graph.query_reminders(status_filter, true).await?;
        Ok(json!({"reminders": text}))
    }
}

pub struct CreateReminder(pub Arc<Services>);

#[async_trait]
impl Tool for CreateReminder {
    fn name(&self) -> &'static str {
        "create_reminder"
    }
    fn description(&self) -> &'static str {
        "أنشئ تذكير جديد."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "عنوان التذكير بالعربي"},
                "due_date": {"type": "string", "description": "تاريخ الاستحقاق YYYY-MM-DD"},
                "time": {"type": "string", "description": "الوقت HH:MM (24h)"},
                "recurrence": {"type": "string", "enum": ["daily", "weekly", "monthly", "yearly"]},
                "priority": {"type": "integer", "minimum": 1, "maximum": 5}
            },
            "required": ["title"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let title = match required_str(&args, "title", "عنوان التذكير مطلوب") {
            Ok(t) => t,
            Err(e) => return Ok(e),
        };
        let mut props = Map::new();
        if let Some(date) = str_arg(&args, "due_date") {
            let due = match str_arg(&args, "time") {
                Some(time) => format!("{date}T{time}:00"),
                None => date.to_string(),
            };
            props.insert("due_date".into(), json!(due));
        }
        if let Some(rec) = str_arg(&args, "recurrence") {
            props.insert("recurrence".into(), json!(rec));
            props.insert("reminder_type".into(), json!("recurring"));
        }
        if let Some(p) = i64_arg(&args, "priority") {
            props.insert("priority".into(), json!(p));
        }
        let echo: Value = Value::Object(props.clone());
        self.0.graph.create_reminder(title, props).await?;
        let mut result = json!({"status": "created", "title": title});
        if let (Some(out), Some(extra)) = (result.as_object_mut(), echo.as_object()) {
            for (k, v) in extra {
                out.insert(k.clone(), v.clone());
            }
        }
        Ok(result)
    }
}

pub struct UpdateReminder(pub Arc<Services>);

#[async_trait]
impl Tool for UpdateReminder {
    fn name(&self) -> &'static str {
        "update_reminder"
    }
    fn description(&self) -> &'static str {
        "عدّل أو أنجز أو أجّل أو ألغِ تذكير موجود. استخدمها لما المستخدم يقول خلصت/أنجزت/أجّل/ألغي/عدّل تذكير."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "وصف التذكير المراد تعديله — اكتب أكثر تفاصيل ممكنة"},
                "action": {
                    "type": "string",
                    "enum": ["update", "done", "snooze", "cancel"],
                    "description": "نوع الإجراء: update=تعديل، done=إنجاز، snooze=تأجيل، cancel=إلغاء"
                },
                "due_date": {"type": "string", "description": "تاريخ جديد YYYY-MM-DD"},
                "time": {"type": "string", "description": "وقت جديد HH:MM (24h)"},
                "priority": {"type": "integer", "minimum": 1, "maximum": 5}
            },
            "required": ["query", "action"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let query = match required_str(&args, "query", "وصف التذكير مطلوب") {
            Ok(q) => q,
            Err(e) => return Ok(e),
        };
        let action = str_arg(&args, "action").unwrap_or("update");
        let cleaned = clean_query(query);

        if matches!(action, "done" | "snooze" | "cancel") {
            let snooze_until = (action == "snooze")
                .then(|| str_arg(&args, "due_date"))
                .flatten();
            return self
                .0
                .graph
                .update_reminder_status(&cleaned, action, snooze_until)
                .await;
        }

        let mut updates = Map::new();
        if let Some(date) = str_arg(&args, "due_date") {
            let due = match str_arg(&args, "time") {
                Some(time) => format!("{date}T{time}:00"),
                None => date.to_string(),
            };
            updates.insert("due_date".into(), json!(due));
        }
        if let Some(p) = i64_arg(&args, "priority") {
            updates.insert("priority".into(), json!(p));
        }
        if updates.is_empty() {
            return Ok(json!({"error": "لا توجد حقول للتعديل"}));
        }
        self.0.graph.update_reminder(&cleaned, updates).await
    }
}

pub struct DeleteReminder(pub Arc<Services>);

#[async_trait]
impl Tool for DeleteReminder {
    fn name(&self) -> &'static str {
        "delete_reminder"
    }
    fn description(&self) -> &'static str {
        "احذف تذكير. يبحث بطريقة ذكية (مو لازم العنوان بالضبط). اكتب وصف واضح ومفصل للتذكير عشان يلقاه."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "وصف التذكير المراد حذفه"}
            },
            "required": ["query"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let query = match required_str(&args, "query", "وصف التذكير مطلوب") {
            Ok(q) => q,
            Err(e) => return Ok(e),
        };
        let cleaned = clean_query(query);
        let result = self
            .0
            .graph
            .update_reminder_status(&cleaned, "delete", None)
            .await?;
        if result.get("error").is_none() {
            return Ok(result);
        }
        // Retry with the undecorated original when cleaning changed it.
        if cleaned != query {
            let retry = self.0.graph.update_reminder_status(query, "delete", None).await?;
            if retry.get("error").is_none() {
                return Ok(retry);
            }
        }
        Ok(json!({"error": format!("No reminder found matching '{query}'")}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_query_strips_parentheticals() {
        assert_eq!(clean_query("دفع الإيجار (متأخرة)"), "دفع الإيجار");
        assert_eq!(clean_query("renew passport (overdue) today"), "renew passport today");
        assert_eq!(clean_query("no decoration"), "no decoration");
    }
}
