// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge tools: hybrid search, explicit note storage, person lookup.

use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use rafiq_vector::{PointPayload, SearchFilters};
use serde_json::{json, Value};
use tracing::warn;

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct SearchKnowledge(pub Arc<Services>);

#[async_trait]
impl Tool for SearchKnowledge {
    fn name(&self) -> &'static str {
        "search_knowledge"
    }
    fn description(&self) -> &'static str {
        "ابحث في الذاكرة والمعرفة المخزنة. استخدمها لما المستخدم يسأل عن معلومات أو أشخاص أو مواضيع."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "سؤال البحث"}
            },
            "required": ["query"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let query = match required_str(&args, "query", "سؤال البحث مطلوب") {
            Ok(q) => q,
            Err(e) => return Ok(e),
        };

        // Sections, graph nodes, and vector chunks are searched together.
        let default_filters = SearchFilters::default();
        let (sections, nodes, hits) = tokio::join!(
            self.0.graph.search_sections(query, 15),
            self.0.graph.search_nodes(query, 10),
            self.0.vector.search(query, 5, &default_filters),
        );

        let mut parts: Vec<String> = Vec::new();
        if let Ok(sections) = sections {
            if !sections.is_empty() {
                parts.push(sections);
            }
        }
        if let Ok(nodes) = nodes {
            if !nodes.is_empty() {
                parts.push(nodes);
            }
        }
        if let Ok(hits) = hits {
            for hit in hits {
                if !hit.text.is_empty() {
                    parts.push(hit.text);
                }
            }
        }

        Ok(json!({
            "results": if parts.is_empty() { "لا توجد نتائج.".to_string() } else { parts.join("\n\n") }
        }))
    }
}

pub struct StoreNote(pub Arc<Services>);

#[async_trait]
impl Tool for StoreNote {
    fn name(&self) -> &'static str {
        "store_note"
    }
    fn description(&self) -> &'static str {
        "احفظ معلومة أو ملاحظة في الذاكرة. استخدمها لما المستخدم يطلب صراحةً تخزين شيء معيّن."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "النص المراد حفظه"},
                "topic": {"type": "string", "description": "الموضوع (اختياري)"}
            },
            "required": ["text"]
        })
    }
    async fn invoke(&self, args: Value, session_id: &str) -> Result<Value, RafiqError> {
        let text = match required_str(&args, "text", "النص المراد حفظه مطلوب") {
            Ok(t) => t,
            Err(e) => return Ok(e),
        };
        let topic = str_arg(&args, "topic").unwrap_or("general").to_string();

        // Facts into the graph through the full pipeline path.
        let ner_hints = self.0.pipeline.ner().hints_for(text).await;
        let text_en = self.0.llm.translate_to_english(text).await?;
        let facts = self.0.llm.extract_facts(&text_en, &ner_hints).await?;
        let active_project = self.0.memory.store().get_active_project(session_id).await?;
        let upserted = if facts.entities.is_empty() {
            0
        } else {
            self.0
                .graph
                .upsert_from_facts(&facts, None, active_project.as_deref())
                .await?
        };

        // The raw note also lands in the vector store.
        let payload = PointPayload {
            source_type: Some("note".into()),
            topic: Some(topic),
            session_id: Some(session_id.to_string()),
            ..Default::default()
        };
        if let Err(e) = self
            .0
            .vector
            .upsert_chunks(&[text.to_string()], vec![payload])
            .await
        {
            warn!(error = %e, "note vector upsert failed");
        }

        Ok(json!({
            "status": "stored",
            "entities_saved": upserted,
            "text_preview": text.chars().take(100).collect::<String>(),
        }))
    }
}

pub struct GetPersonInfo(pub Arc<Services>);

#[async_trait]
impl Tool for GetPersonInfo {
    fn name(&self) -> &'static str {
        "get_person_info"
    }
    fn description(&self) -> &'static str {
        "اعرض معلومات شخص معيّن. استخدمها لما يسأل عن شخص بالاسم."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "اسم الشخص"}
            },
            "required": ["name"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let name = match required_str(&args, "name", "اسم الشخص مطلوب") {
            Ok(n) => n,
            Err(e) => return Ok(e),
        };
        let context = self.0.graph.query_person_context(name).await?;
        Ok(json!({
            "info": if context.is_empty() {
                format!("لا توجد معلومات عن '{name}'.")
            } else {
                context
            }
        }))
    }
}
