// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Productivity statistics tool.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use serde_json::{json, Value};

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct GetProductivityStats(pub Arc<Services>);

#[async_trait]
impl Tool for GetProductivityStats {
    fn name(&self) -> &'static str {
        "get_productivity_stats"
    }
    fn description(&self) -> &'static str {
        "إحصائيات الإنتاجية: جلسات التركيز، السبرنتات، أو نظرة عامة."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["focus", "sprint", "overview"],
                    "description": "focus=جلسات التركيز، sprint=السبرنتات، overview=نظرة عامة (الافتراضي)"
                }
            },
            "required": []
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        match str_arg(&args, "type").unwrap_or("overview") {
            "focus" => self.0.graph.query_focus_stats().await,
            "sprint" => {
                let sprints = self.0.graph.query_sprints(None).await?;
                Ok(json!({"sprints": sprints}))
            }
            _ => {
                let (focus, tasks, projects) = tokio::join!(
                    self.0.graph.query_focus_stats(),
                    self.0.graph.query_active_tasks(None),
                    self.0.graph.query_projects_overview(None),
                );
                Ok(json!({
                    "focus": focus?,
                    "active_tasks": tasks?,
                    "projects": projects?,
                }))
            }
        }
    }
}
