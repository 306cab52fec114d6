// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory context assembly and working-memory compression.

use rafiq_core::RafiqError;
use rafiq_llm::LlmGateway;
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::MemoryStore;

/// Renders a turn list as `User: ... / Assistant: ...` lines, skipping raw
/// tool traffic.
pub fn turns_to_text(turns: &[Value], truncate_to: usize) -> String {
    let mut lines = Vec::new();
    for turn in turns {
        let role = turn["role"].as_str().unwrap_or_default();
        let content = turn["content"].as_str().unwrap_or_default();
        if content.is_empty() {
            continue;
        }
        let label = match role {
            "user" => "User",
            "assistant" => "Assistant",
            _ => continue,
        };
        let content: String = content.chars().take(truncate_to).collect();
        lines.push(format!("{label}: {content}"));
    }
    lines.join("\n")
}

/// Memory layers composed for prompts and compression.
#[derive(Clone)]
pub struct MemoryService {
    store: MemoryStore,
    llm: LlmGateway,
    compress_threshold: usize,
    compress_keep_recent: usize,
}

impl MemoryService {
    pub fn new(
        store: MemoryStore,
        llm: LlmGateway,
        compress_threshold: usize,
        compress_keep_recent: usize,
    ) -> Self {
        Self {
            store,
            llm,
            compress_threshold,
            compress_keep_recent,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Core memory + today's summary + compressed-conversation summary --
    /// the excerpt that goes into the system prompt. Conversation history
    /// itself is passed as separate message turns.
    pub async fn build_system_memory_context(&self, session_id: &str) -> Result<String, RafiqError> {
        let mut parts = Vec::new();

        let core = self.store.get_all_core_memory().await?;
        if !core.is_empty() {
            parts.push("=== Core Memory (Preferences) ===".to_string());
            let mut entries: Vec<_> = core.into_iter().collect();
            entries.sort();
            for (k, v) in entries {
                parts.push(format!("- {k}: {v}"));
            }
        }

        if let Some(summary) = self.store.get_daily_summary().await? {
            parts.push("\n=== Today's Summary ===".to_string());
            parts.push(summary);
        }

        if let Some(summary) = self.store.get_conversation_summary(session_id).await? {
            parts.push("\n=== Earlier In This Conversation ===".to_string());
            parts.push(summary);
        }

        Ok(parts.join("\n"))
    }

    /// Compresses working memory when it exceeds the threshold: the older
    /// turns are summarised into Arabic and the list keeps only the most
    /// recent ones. A summarisation failure leaves the list untouched.
    pub async fn maybe_compress_working_memory(&self, session_id: &str) -> Result<(), RafiqError> {
        let len = self.store.working_len(session_id).await?;
        if len <= self.compress_threshold {
            return Ok(());
        }

        let turns = self.store.get_working_memory(session_id).await?;
        let keep = self.compress_keep_recent.min(turns.len());
        let older = &turns[..turns.len() - keep];
        let text = turns_to_text(older, 400);
        if text.is_empty() {
            self.store.trim_working_memory(session_id, keep).await?;
            return Ok(());
        }

        match self.llm.summarize_conversation_ar(&text).await {
            Ok(summary) if !summary.is_empty() => {
                self.store
                    .set_conversation_summary(session_id, &summary)
                    .await?;
                self.store.trim_working_memory(session_id, keep).await?;
                debug!(session_id, compressed = older.len(), "working memory compressed");
            }
            Ok(_) => {}
            Err(e) => warn!(session_id, error = %e, "working-memory compression failed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_to_text_skips_tool_traffic() {
        let turns = vec![
            serde_json::json!({"role": "user", "content": "وش عندي اليوم؟"}),
            serde_json::json!({"role": "assistant", "content": null, "tool_calls": [{"id": "c1"}]}),
            serde_json::json!({"role": "tool", "tool_call_id": "c1", "content": "{\"plan\": \"...\"}"}),
            serde_json::json!({"role": "assistant", "content": "عندك اجتماع الساعة ٣"}),
        ];
        let text = turns_to_text(&turns, 400);
        assert_eq!(text, "User: وش عندي اليوم؟\nAssistant: عندك اجتماع الساعة ٣");
    }

    #[test]
    fn turns_to_text_truncates_long_content() {
        let turns = vec![serde_json::json!({"role": "user", "content": "x".repeat(1000)})];
        let text = turns_to_text(&turns, 300);
        assert_eq!(text.len(), "User: ".len() + 300);
    }
}
