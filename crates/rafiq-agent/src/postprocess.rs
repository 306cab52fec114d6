// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background post-processing, scheduled strictly after the client has
//! received the reply: memory append, conversation embedding, gated
//! auto-extraction, periodic summaries, and reminder auto-dismissal.

use rafiq_core::{RafiqError, ToolOutcome};
use rafiq_memory::turns_to_text;
use rafiq_vector::PointPayload;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

use crate::services::Services;
use crate::tool::WRITE_TOOLS;

/// Entity types safe for auto-extraction from conversational messages.
/// Projects, tasks, ideas, and the rest need explicit user intent.
const AUTO_EXTRACT_SAFE_TYPES: [&str; 4] = ["Person", "Company", "Knowledge", "Location"];

/// Arabic + English cues for storable content.
static STORABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(يعمل|يشتغل|يدرس|عمره|ساكن|متزوج|عنده|تخرج|يحب|works at|lives in|married|born|age|graduated|likes|شركة|جامعة|مدرسة|company|university|school)",
    )
    .expect("valid storable regex")
});

/// Injected tool-listing blocks from chat front-ends. These must never
/// reach working memory; polluted memory poisons future searches.
static TOOLS_AVAILABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<details[^>]*tool[^>]*>.*?</details>|(?i)available tools?:.*?(?:\n\n|\z)")
        .expect("valid tools-available regex")
});

/// Keyword lines from retrieval-context injection.
const INTERNAL_KEYWORDS: [&str; 4] = [
    "tool_calls:",
    "#### task:",
    "<context>",
    "knowledge cutoff:",
];

/// Strips injected front-end context before memory insertion.
pub fn strip_injected_context(message: &str) -> String {
    let stripped = TOOLS_AVAILABLE_RE.replace_all(message, "");
    stripped
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            !INTERNAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// True when the message carries a storable personal fact.
pub fn is_storable(message: &str) -> bool {
    STORABLE_RE.is_match(message)
}

/// One chat turn's inputs to post-processing.
pub struct PostProcessInput {
    pub user_message: String,
    pub reply: String,
    pub session_id: String,
    pub tool_calls: Vec<ToolOutcome>,
    /// Raw assistant/tool turns produced during the loop, in order.
    pub new_turns: Vec<Value>,
}

/// Runs the full post-processing sequence. Errors are logged, never
/// surfaced; the user already has the reply.
pub async fn post_process(services: Services, input: PostProcessInput) {
    if let Err(e) = run(&services, &input).await {
        error!(session_id = %input.session_id, error = %e, "post-processing failed");
    }
}

async fn run(services: &Services, input: &PostProcessInput) -> Result<(), RafiqError> {
    let session_id = &input.session_id;
    let memory = services.memory.store();

    // 1. Working memory gets the full tool-calling shape (user →
    //    tool_calls → tool results → reply) so the model keeps seeing the
    //    correct pattern and never hallucinates confirmations.
    let clean_user = strip_injected_context(&input.user_message);
    memory.push_message(session_id, "user", &clean_user).await?;
    for turn in &input.new_turns {
        memory.push_raw(session_id, turn).await?;
    }
    memory
        .push_message(session_id, "assistant", &input.reply)
        .await?;

    // 2. The exchange lands in the vector store (the embedding model is
    //    multilingual; Arabic embeds as-is).
    let combined = format!("User: {clean_user}\nAssistant: {}", input.reply);
    let payload = PointPayload {
        source_type: Some("conversation".into()),
        topic: Some("chat".into()),
        session_id: Some(session_id.clone()),
        ..Default::default()
    };
    if let Err(e) = services.vector.upsert_chunks(&[combined], vec![payload]).await {
        warn!(error = %e, "conversation embedding failed");
    }

    // 3. Auto-extraction, unless a write tool already captured the fact.
    let wrote = input
        .tool_calls
        .iter()
        .any(|outcome| WRITE_TOOLS.contains(&outcome.tool.as_str()));
    if !wrote && is_storable(&clean_user) {
        auto_extract(services, &clean_user, session_id).await;
    }

    // 4. Task completion already auto-dismissed matching reminders inside
    //    the graph layer; log the titles the turn surfaced.
    for outcome in &input.tool_calls {
        if outcome.tool == "manage_tasks" && outcome.success {
            if let Some(dismissed) = outcome
                .data
                .as_ref()
                .and_then(|d| d.get("dismissed_reminders"))
                .and_then(Value::as_array)
            {
                if !dismissed.is_empty() {
                    info!(count = dismissed.len(), "reminders auto-dismissed with completed task");
                }
            }
        }
    }

    // 5. Periodic summaries.
    let count = memory.increment_message_count(session_id).await?;
    if count % services.config.chat.daily_summary_interval == 0 {
        trigger_daily_summary(services, session_id).await;
    }
    if count % services.config.chat.core_memory_interval == 0 {
        trigger_core_memory(services, session_id).await;
    }

    // 6. Compression when working memory has grown past the threshold.
    services.memory.maybe_compress_working_memory(session_id).await?;

    Ok(())
}

/// NER → translate → restricted extraction → resolved upsert.
async fn auto_extract(services: &Services, message: &str, session_id: &str) {
    let result: Result<(), RafiqError> = async {
        let ner_hints = services.pipeline.ner().hints_for(message).await;
        let text_en = services.llm.translate_to_english(message).await?;
        let mut facts = services.llm.extract_facts(&text_en, &ner_hints).await?;
        facts
            .entities
            .retain(|e| AUTO_EXTRACT_SAFE_TYPES.contains(&e.entity_type.as_str()));
        if facts.entities.is_empty() {
            return Ok(());
        }
        let active_project = services
            .memory
            .store()
            .get_active_project(session_id)
            .await?;
        let count = services
            .graph
            .upsert_from_facts(&facts, None, active_project.as_deref())
            .await?;
        if count > 0 {
            info!(count, "auto-extracted entities from conversational message");
        }
        Ok(())
    }
    .await;
    if let Err(e) = result {
        warn!(error = %e, "auto-extraction failed");
    }
}

async fn trigger_daily_summary(services: &Services, session_id: &str) {
    let result: Result<(), RafiqError> = async {
        let turns = services.memory.store().get_working_memory(session_id).await?;
        if turns.is_empty() {
            return Ok(());
        }
        let text = turns_to_text(&turns, 1000);
        let summary = services.llm.summarize_daily(&text).await?;
        services.memory.store().set_daily_summary(&summary).await
    }
    .await;
    if let Err(e) = result {
        warn!(error = %e, "daily summary generation failed");
    } else {
        debug!(session_id, "daily summary refreshed");
    }
}

async fn trigger_core_memory(services: &Services, session_id: &str) {
    let result: Result<(), RafiqError> = async {
        let turns = services.memory.store().get_working_memory(session_id).await?;
        if turns.is_empty() {
            return Ok(());
        }
        let text = turns_to_text(&turns, 1000);
        let prefs = services.llm.extract_core_preferences(&text).await?;
        for (key, value) in prefs {
            services.memory.store().set_core_memory(&key, &value).await?;
        }
        Ok(())
    }
    .await;
    if let Err(e) = result {
        warn!(error = %e, "core memory extraction failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storable_cues_match_both_languages() {
        assert!(is_storable("محمد يعمل في أرامكو"));
        assert!(is_storable("Sarah works at the hospital"));
        assert!(is_storable("أخوي تخرج من الجامعة"));
        assert!(!is_storable("وش الأخبار؟"));
    }

    #[test]
    fn injected_tool_listing_is_stripped() {
        let polluted = "Available tools: search, create, delete\n\nذكرني أشتري حليب";
        let cleaned = strip_injected_context(polluted);
        assert_eq!(cleaned, "ذكرني أشتري حليب");
    }

    #[test]
    fn internal_keyword_lines_are_stripped() {
        let polluted = "tool_calls: [...]\nوش عندي اليوم؟\n<context> injected stuff";
        let cleaned = strip_injected_context(polluted);
        assert_eq!(cleaned, "وش عندي اليوم؟");
    }

    #[test]
    fn clean_messages_pass_through_unchanged() {
        let clean = "ذكرني أدفع الإيجار يوم ٢٥";
        assert_eq!(strip_injected_context(clean), clean);
    }

    #[test]
    fn details_block_is_stripped() {
        let polluted = "<details type=\"tool_calls\">big injected blob</details>صباح الخير";
        assert_eq!(strip_injected_context(polluted), "صباح الخير");
    }
}
