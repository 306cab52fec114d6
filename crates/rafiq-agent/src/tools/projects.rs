// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project management and merging tools.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct ManageProjects(pub Arc<Services>);

impl ManageProjects {
    fn collect_props(args: &Value) -> Map<String, Value> {
        let mut props = Map::new();
        if let Some(s) = str_arg(args, "status") {
            props.insert("status".into(), json!(s));
        }
        if let Some(d) = str_arg(args, "description") {
            props.insert("description".into(), json!(d));
        }
        if let Some(p) = i64_arg(args, "priority") {
            props.insert("priority".into(), json!(p));
        }
        props
    }
}

#[async_trait]
impl Tool for ManageProjects {
    fn name(&self) -> &'static str {
        "manage_projects"
    }
    fn description(&self) -> &'static str {
        "إدارة المشاريع: عرض، تفاصيل، إنشاء (مع مراحل)، تعديل، حذف، تركيز، أقسام ومراحل. لا تستخدمها للدمج — استخدم merge_projects."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "get", "create", "update", "delete", "focus", "unfocus",
                             "add_section", "update_section", "delete_section", "assign_section", "set_phase"],
                    "description": "list=عرض الكل، get=تفاصيل، create=إنشاء، update=تعديل، delete=حذف، focus=تركيز، unfocus=إلغاء التركيز، add_section=إضافة قسم، update_section=تعديل قسم، delete_section=حذف قسم، assign_section=ربط عنصر بقسم، set_phase=تحديد المرحلة النشطة"
                },
                "name": {"type": "string", "description": "اسم المشروع"},
                "status": {"type": "string", "description": "حالة المشروع (active, completed, on_hold, cancelled)"},
                "description": {"type": "string", "description": "وصف المشروع"},
                "priority": {"type": "integer", "minimum": 1, "maximum": 5},
                "aliases": {"type": "array", "items": {"type": "string"}, "description": "أسماء بديلة للمشروع"},
                "section_name": {"type": "string", "description": "اسم القسم أو المرحلة"},
                "section_type": {"type": "string", "enum": ["topic", "phase"], "description": "نوع القسم"},
                "order": {"type": "integer", "description": "ترتيب القسم (للمراحل)"},
                "entity_type": {"type": "string", "description": "نوع العنصر المراد ربطه بالقسم (Task, Knowledge, ...)"},
                "entity_name": {"type": "string", "description": "اسم العنصر المراد ربطه بالقسم"},
                "with_phases": {"type": "boolean", "description": "إنشاء المشروع مع مراحل افتراضية"}
            },
            "required": ["action"]
        })
    }
    async fn invoke(&self, args: Value, session_id: &str) -> Result<Value, RafiqError> {
        let action = str_arg(&args, "action").unwrap_or_default();
        let name = str_arg(&args, "name");
        let missing_name = json!({"error": "اسم المشروع مطلوب"});

        match action {
            "list" => {
                let text = self
                    .0
                    .graph
                    .query_projects_overview(str_arg(&args, "status"))
                    .await?;
                Ok(json!({"projects": text}))
            }
            "get" => {
                let Some(name) = name else { return Ok(missing_name) };
                let text = self.0.graph.query_project_details(name).await?;
                Ok(json!({"projects": text}))
            }
            "create" => {
                let Some(name) = name else { return Ok(missing_name) };
                let props = Self::collect_props(&args);
                let aliases = string_list(&args, "aliases");
                let result = if bool_arg(&args, "with_phases") {
                    self.0.graph.create_project_with_phases(name, props).await?
                } else {
                    let canonical = self.0.graph.upsert_project(name, props).await?;
                    json!({"status": "created", "name": canonical})
                };
                if !aliases.is_empty() {
                    self.0.graph.set_project_aliases(name, &aliases).await?;
                }
                let mut result = result;
                result["aliases"] = json!(aliases);
                Ok(result)
            }
            "update" => {
                let Some(name) = name else { return Ok(missing_name) };
                let props = Self::collect_props(&args);
                let aliases = string_list(&args, "aliases");
                if props.is_empty() && aliases.is_empty() {
                    return Ok(json!({"error": "لا توجد حقول للتعديل"}));
                }
                if !aliases.is_empty() {
                    self.0.graph.set_project_aliases(name, &aliases).await?;
                }
                if !props.is_empty() {
                    self.0.graph.upsert_project(name, props).await?;
                }
                Ok(json!({"status": "updated", "name": name, "aliases": aliases}))
            }
            "delete" => {
                let Some(name) = name else { return Ok(missing_name) };
                self.0.graph.delete_project(name).await
            }
            "focus" => {
                let Some(name) = name else { return Ok(missing_name) };
                let resolved = self.0.graph.resolve_entity_name(name, "Project").await?;
                let details = self.0.graph.query_project_details(&resolved).await?;
                if details.starts_with("No project found") {
                    return Ok(json!({"error": format!("ما لقيت مشروع باسم '{name}'")}));
                }
                self.0
                    .memory
                    .store()
                    .set_active_project(session_id, &resolved)
                    .await?;
                Ok(json!({"status": "focused", "name": resolved}))
            }
            "unfocus" => {
                self.0.memory.store().clear_active_project(session_id).await?;
                Ok(json!({"status": "unfocused"}))
            }
            "add_section" => {
                let (Some(name), Some(section)) = (name, str_arg(&args, "section_name")) else {
                    return Ok(json!({"error": "اسم المشروع والقسم مطلوبين"}));
                };
                let mut props = Map::new();
                if let Some(t) = str_arg(&args, "section_type") {
                    props.insert("section_type".into(), json!(t));
                }
                if let Some(o) = i64_arg(&args, "order") {
                    props.insert("order".into(), json!(o));
                }
                self.0.graph.create_section(name, section, props).await
            }
            "update_section" => {
                let (Some(name), Some(section)) = (name, str_arg(&args, "section_name")) else {
                    return Ok(json!({"error": "اسم المشروع والقسم مطلوبين"}));
                };
                let mut props = Map::new();
                if let Some(d) = str_arg(&args, "description") {
                    props.insert("description".into(), json!(d));
                }
                if let Some(s) = str_arg(&args, "status") {
                    props.insert("status".into(), json!(s));
                }
                if let Some(o) = i64_arg(&args, "order") {
                    props.insert("order".into(), json!(o));
                }
                self.0.graph.update_section(name, section, props).await
            }
            "delete_section" => {
                let (Some(name), Some(section)) = (name, str_arg(&args, "section_name")) else {
                    return Ok(json!({"error": "اسم المشروع والقسم مطلوبين"}));
                };
                self.0.graph.delete_section(name, section).await
            }
            "assign_section" => {
                let (Some(name), Some(section), Some(etype), Some(ename)) = (
                    name,
                    str_arg(&args, "section_name"),
                    str_arg(&args, "entity_type"),
                    str_arg(&args, "entity_name"),
                ) else {
                    return Ok(json!({"error": "اسم المشروع والقسم ونوع واسم العنصر مطلوبين"}));
                };
                self.0.graph.assign_to_section(name, section, etype, ename).await
            }
            "set_phase" => {
                let (Some(name), Some(section)) = (name, str_arg(&args, "section_name")) else {
                    return Ok(json!({"error": "اسم المشروع والمرحلة مطلوبين"}));
                };
                self.0.graph.set_active_phase(name, section).await
            }
            other => Ok(json!({"error": format!("Unknown action: {other}")})),
        }
    }
}

pub struct MergeProjects(pub Arc<Services>);

#[async_trait]
impl Tool for MergeProjects {
    fn name(&self) -> &'static str {
        "merge_projects"
    }
    fn description(&self) -> &'static str {
        "ادمج مشاريع مكررة في مشروع واحد. ينقل كل المهام للمشروع الهدف ويحذف المشاريع القديمة."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "target_name": {"type": "string", "description": "اسم المشروع الهدف اللي تبي تدمج فيه"},
                "source_names": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "أسماء المشاريع المراد دمجها وحذفها"
                }
            },
            "required": ["target_name", "source_names"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let target = match required_str(&args, "target_name", "اسم المشروع الهدف مطلوب") {
            Ok(t) => t,
            Err(e) => return Ok(e),
        };
        let sources = string_list(&args, "source_names");
        if sources.is_empty() {
            return Ok(json!({"error": "أسماء المشاريع المصدر مطلوبة"}));
        }
        self.0.graph.merge_projects(&sources, target).await
    }
}
