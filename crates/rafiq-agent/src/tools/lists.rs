// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! List management tool.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use serde_json::{json, Value};

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct ManageLists(pub Arc<Services>);

#[async_trait]
impl Tool for ManageLists {
    fn name(&self) -> &'static str {
        "manage_lists"
    }
    fn description(&self) -> &'static str {
        "إدارة القوائم: قائمة بقالة، مشتريات، أفكار، إلخ. إنشاء، إضافة عناصر، تعليم كمنجز، حذف."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "get", "create", "add_entry", "check_entry", "uncheck_entry", "remove_entry", "delete"],
                    "description": "list=عرض كل القوائم، get=تفاصيل قائمة، create=إنشاء، add_entry=إضافة عنصر، check_entry=تعليم كمنجز، uncheck_entry=إلغاء التعليم، remove_entry=حذف عنصر، delete=حذف القائمة"
                },
                "name": {"type": "string", "description": "اسم القائمة"},
                "list_type": {"type": "string", "enum": ["shopping", "ideas", "checklist", "reference"], "description": "نوع القائمة"},
                "entry": {"type": "string", "description": "محتوى العنصر"},
                "entries": {"type": "array", "items": {"type": "string"}, "description": "عناصر متعددة للإضافة دفعة وحدة"},
                "project": {"type": "string", "description": "ربط القائمة بمشروع (اختياري)"}
            },
            "required": ["action"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let action = str_arg(&args, "action").unwrap_or_default();
        let name = str_arg(&args, "name");
        let entry = str_arg(&args, "entry");
        let missing_name = json!({"error": "اسم القائمة مطلوب"});
        let missing_entry = json!({"error": "اسم القائمة والعنصر مطلوبين"});

        match action {
            "list" => {
                let text = self
                    .0
                    .graph
                    .query_lists_overview(str_arg(&args, "project"))
                    .await?;
                Ok(json!({"lists": text}))
            }
            "get" => {
                let Some(name) = name else { return Ok(missing_name) };
                let text = self.0.graph.query_list(name).await?;
                Ok(json!({"list": text}))
            }
            "create" => {
                let Some(name) = name else { return Ok(missing_name) };
                let list_type = str_arg(&args, "list_type").unwrap_or("checklist");
                self.0
                    .graph
                    .create_list(name, list_type, str_arg(&args, "project"), None)
                    .await
            }
            "add_entry" => {
                let Some(name) = name else { return Ok(missing_name) };
                let entries = string_list(&args, "entries");
                if !entries.is_empty() {
                    for e in &entries {
                        self.0.graph.add_list_entry(name, e).await?;
                    }
                    return Ok(json!({"status": "added", "list": name, "entries_added": entries.len()}));
                }
                let Some(entry) = entry else {
                    return Ok(json!({"error": "محتوى العنصر مطلوب"}));
                };
                self.0.graph.add_list_entry(name, entry).await
            }
            "check_entry" | "uncheck_entry" => {
                let (Some(name), Some(entry)) = (name, entry) else {
                    return Ok(missing_entry);
                };
                self.0
                    .graph
                    .check_list_entry(name, entry, action == "check_entry")
                    .await
            }
            "remove_entry" => {
                let (Some(name), Some(entry)) = (name, entry) else {
                    return Ok(missing_entry);
                };
                self.0.graph.remove_list_entry(name, entry).await
            }
            "delete" => {
                let Some(name) = name else { return Ok(missing_name) };
                self.0.graph.delete_list(name).await
            }
            other => Ok(json!({"error": format!("Unknown action: {other}")})),
        }
    }
}
