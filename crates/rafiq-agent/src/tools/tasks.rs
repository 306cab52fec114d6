// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task management tool.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct ManageTasks(pub Arc<Services>);

#[async_trait]
impl Tool for ManageTasks {
    fn name(&self) -> &'static str {
        "manage_tasks"
    }
    fn description(&self) -> &'static str {
        "إدارة المهام: عرض، إنشاء، تعديل، أو حذف مهمة."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "create", "update", "delete"],
                    "description": "list=عرض، create=إنشاء، update=تعديل، delete=حذف"
                },
                "title": {"type": "string", "description": "عنوان المهمة"},
                "status": {"type": "string", "enum": ["todo", "in_progress", "done"], "description": "حالة المهمة"},
                "priority": {"type": "integer", "minimum": 1, "maximum": 5},
                "project": {"type": "string", "description": "المشروع المرتبط"},
                "due_date": {"type": "string", "description": "تاريخ الاستحقاق YYYY-MM-DD"}
            },
            "required": ["action"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let action = str_arg(&args, "action").unwrap_or_default();
        match action {
            "list" => {
                let text = self
                    .0
                    .graph
                    .query_active_tasks(str_arg(&args, "status"))
                    .await?;
                Ok(json!({"tasks": text}))
            }
            "create" => {
                let title = match required_str(&args, "title", "عنوان المهمة مطلوب") {
                    Ok(t) => t,
                    Err(e) => return Ok(e),
                };
                let mut props = Map::new();
                if let Some(s) = str_arg(&args, "status") {
                    props.insert("status".into(), json!(s));
                }
                if let Some(p) = i64_arg(&args, "priority") {
                    props.insert("priority".into(), json!(p));
                }
                if let Some(d) = str_arg(&args, "due_date") {
                    props.insert("due_date".into(), json!(d));
                }
                self.0.graph.upsert_task(title, props).await?;
                let project = str_arg(&args, "project");
                if let Some(project) = project {
                    let project = self.0.graph.upsert_project(project, Map::new()).await?;
                    if let Err(e) = self
                        .0
                        .graph
                        .create_relationship("Task", title, "BELONGS_TO", "Project", &project)
                        .await
                    {
                        debug!(error = %e, "task-project link skipped");
                    }
                }
                Ok(json!({"status": "created", "title": title, "project": project}))
            }
            "update" => {
                let title = match required_str(&args, "title", "عنوان المهمة مطلوب") {
                    Ok(t) => t,
                    Err(e) => return Ok(e),
                };
                self.0
                    .graph
                    .update_task(
                        title,
                        str_arg(&args, "status"),
                        i64_arg(&args, "priority"),
                        str_arg(&args, "due_date"),
                        str_arg(&args, "project"),
                    )
                    .await
            }
            "delete" => {
                let title = match required_str(&args, "title", "عنوان المهمة مطلوب") {
                    Ok(t) => t,
                    Err(e) => return Ok(e),
                };
                self.0.graph.delete_task(title).await
            }
            other => Ok(json!({"error": format!("Unknown action: {other}")})),
        }
    }
}
