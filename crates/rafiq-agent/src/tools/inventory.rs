// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory management tool.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct ManageInventory(pub Arc<Services>);

#[async_trait]
impl Tool for ManageInventory {
    fn name(&self) -> &'static str {
        "manage_inventory"
    }
    fn description(&self) -> &'static str {
        "إدارة المخزون: بحث، إضافة، نقل، استخدام أغراض أو تقرير عام."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["search", "add", "move", "use", "report"],
                    "description": "search=بحث، add=إضافة، move=نقل، use=استخدام (إنقاص الكمية)، report=تقرير"
                },
                "name": {"type": "string", "description": "اسم الغرض"},
                "quantity": {"type": "integer", "description": "الكمية"},
                "location": {"type": "string", "description": "الموقع (مكان التخزين أو النقل إليه)"},
                "category": {"type": "string", "description": "التصنيف"}
            },
            "required": ["action"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let action = str_arg(&args, "action").unwrap_or_default();
        match action {
            "search" => {
                let text = self
                    .0
                    .graph
                    .query_inventory(str_arg(&args, "name"), str_arg(&args, "category"))
                    .await?;
                Ok(json!({"results": text}))
            }
            "report" => self.0.graph.query_inventory_report().await,
            "add" => {
                let name = match required_str(&args, "name", "اسم الغرض مطلوب") {
                    Ok(n) => n,
                    Err(e) => return Ok(e),
                };
                let mut props = Map::new();
                if let Some(q) = i64_arg(&args, "quantity") {
                    props.insert("quantity".into(), json!(q));
                }
                for key in ["location", "category"] {
                    if let Some(v) = str_arg(&args, key) {
                        props.insert(key.into(), json!(v));
                    }
                }
                self.0.graph.upsert_item(name, "set", props).await
            }
            "move" => {
                let name = match required_str(&args, "name", "اسم الغرض والموقع الجديد مطلوبين") {
                    Ok(n) => n,
                    Err(e) => return Ok(e),
                };
                let Some(location) = str_arg(&args, "location") else {
                    return Ok(json!({"error": "اسم الغرض والموقع الجديد مطلوبين"}));
                };
                self.0.graph.move_item(name, location, None).await
            }
            "use" => {
                let name = match required_str(&args, "name", "اسم الغرض مطلوب") {
                    Ok(n) => n,
                    Err(e) => return Ok(e),
                };
                let delta = -i64_arg(&args, "quantity").unwrap_or(1).abs();
                self.0.graph.adjust_item_quantity(name, delta).await
            }
            other => Ok(json!({"error": format!("Unknown action: {other}")})),
        }
    }
}
