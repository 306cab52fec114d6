// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM gateway for the Rafiq assistant.
//!
//! One pooled async client to an OpenAI-compatible generative server, plus
//! the bilingual prompt library: translation, fact extraction, contextual
//! enrichment, classification, vision analysis, summaries, and tool-calling
//! chat (one-shot and streaming with mid-stream tool detection).

pub mod client;
pub mod gateway;
pub mod prompts;
pub mod sse;
pub mod types;

pub use client::LlmClient;
pub use gateway::{is_mostly_english, parse_json_object, LlmGateway, ToolChatTurn, ToolStreamEvent};
pub use types::{ChatMessage, ChatRequest, FunctionCall, ToolCall, ToolSpec};

use rafiq_config::RafiqConfig;
use rafiq_core::RafiqError;

/// Builds the gateway from configuration.
pub fn build_gateway(config: &RafiqConfig) -> Result<LlmGateway, RafiqError> {
    let client = LlmClient::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.timeout_seconds,
    )?;
    Ok(LlmGateway::new(client, config.server.timezone_offset_hours))
}
