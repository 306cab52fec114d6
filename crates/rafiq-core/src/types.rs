// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the Rafiq workspace.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Reminder lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Snoozed,
    Done,
    Cancelled,
}

/// Recurrence intervals for recurring reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Canonical debt directions. Any LLM variant is normalised into one of
/// these two before a Debt node is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DebtDirection {
    IOwe,
    OwedToMe,
}

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

/// A relationship attached to an extracted entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    /// Relationship type (e.g. WORKS_AT, BELONGS_TO). Defaults upstream to RELATED_TO.
    #[serde(rename = "type", default)]
    pub rel_type: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub target_name: String,
}

/// One entity produced by LLM fact extraction.
///
/// `properties` is a duck-typed bag; the graph layer constrains it at the
/// ingestion boundary (scalars and scalar arrays only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub entity_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
}

/// The full extraction result for one text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFacts {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
}

/// Result of one tool invocation, as appended to the LLM context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: String,
}

/// Non-streaming chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub sources: Vec<String>,
    pub route: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolOutcome>,
    #[serde(default)]
    pub trace: Vec<String>,
}

/// One NDJSON line of the streaming chat contract.
///
/// Consumers must tolerate unknown `type` values; the enum is additive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamLine {
    Meta { route: String },
    Token { content: String },
    ToolCall { name: String },
    Done,
}

impl StreamLine {
    /// Serialises the line followed by a newline, per the NDJSON contract.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        line
    }
}

/// Result of one ingestion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    pub chunks_stored: usize,
    pub facts_extracted: usize,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enums_round_trip_snake_case() {
        assert_eq!(DebtDirection::IOwe.to_string(), "i_owe");
        assert_eq!(DebtDirection::from_str("owed_to_me").unwrap(), DebtDirection::OwedToMe);
        assert_eq!(ReminderStatus::Pending.to_string(), "pending");
        assert_eq!(Recurrence::from_str("monthly").unwrap(), Recurrence::Monthly);
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn stream_line_ndjson_shape() {
        let line = StreamLine::Token { content: "مرحبا".into() }.to_ndjson();
        assert!(line.ends_with('\n'));
        let v: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(v["type"], "token");
        assert_eq!(v["content"], "مرحبا");

        let done = StreamLine::Done.to_ndjson();
        let v: Value = serde_json::from_str(done.trim()).unwrap();
        assert_eq!(v["type"], "done");
    }

    #[test]
    fn extracted_facts_tolerate_missing_fields() {
        let facts: ExtractedFacts = serde_json::from_str(
            r#"{"entities": [{"entity_type": "Person", "entity_name": "Ahmad"}]}"#,
        )
        .unwrap();
        assert_eq!(facts.entities.len(), 1);
        assert!(facts.entities[0].properties.is_empty());
        assert!(facts.entities[0].relationships.is_empty());
    }

    #[test]
    fn tool_outcome_omits_empty_fields() {
        let outcome = ToolOutcome {
            tool: "create_reminder".into(),
            success: true,
            data: Some(serde_json::json!({"title": "دفع الإيجار"})),
            error: None,
            executed_at: "2026-02-11 09:00:00".into(),
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v["data"]["title"], "دفع الإيجار");
    }
}
