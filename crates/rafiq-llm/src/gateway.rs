// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! High-level LLM gateway: the domain operations the rest of the system
//! calls (translate, classify, extract, vision, summarise, tool chat).

use std::collections::BTreeMap;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use rafiq_core::{time, ExtractedFacts, RafiqError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::LlmClient;
use crate::prompts;
use crate::sse::StreamEvent;
use crate::types::{
    ChatMessage, ChatRequest, FunctionCall, StreamChunk, ToolCall, ToolSpec,
};

/// Outcome of one tool-mode LLM call.
#[derive(Debug, Clone, Default)]
pub struct ToolChatTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Events from a streaming tool-mode call.
#[derive(Debug, Clone)]
pub enum ToolStreamEvent {
    Token(String),
    ToolCalls(Vec<ToolCall>),
}

/// Single pooled gateway to the generative model.
#[derive(Debug, Clone)]
pub struct LlmGateway {
    client: LlmClient,
    tz_offset_hours: i32,
}

impl LlmGateway {
    pub fn new(client: LlmClient, tz_offset_hours: i32) -> Self {
        Self {
            client,
            tz_offset_hours,
        }
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    async fn chat_text(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
        json_mode: bool,
    ) -> Result<String, RafiqError> {
        let mut request = ChatRequest::new(self.client.default_model(), messages)
            .with_max_tokens(max_tokens)
            .with_temperature(temperature);
        if json_mode {
            request = request.json_mode();
        }
        Ok(self.client.complete(&request).await?.text())
    }

    /// AR→EN translation for the storage language. Mostly-English input is
    /// returned untouched to skip the round-trip.
    pub async fn translate_to_english(&self, text: &str) -> Result<String, RafiqError> {
        if is_mostly_english(text) {
            return Ok(text.to_string());
        }
        self.chat_text(prompts::build_translate_ar_to_en(text), 1024, 0.1, false)
            .await
    }

    pub async fn translate_to_arabic(&self, text: &str) -> Result<String, RafiqError> {
        self.chat_text(prompts::build_translate_en_to_ar(text), 1024, 0.1, false)
            .await
    }

    /// Structured fact extraction. A parse failure is logged and returned as
    /// an empty set, never an error (`facts_extracted = 0` upstream).
    pub async fn extract_facts(&self, text: &str, ner_hints: &str) -> Result<ExtractedFacts, RafiqError> {
        let today = time::today(self.tz_offset_hours);
        let tomorrow = time::tomorrow(self.tz_offset_hours);
        let raw = self
            .chat_text(
                prompts::build_extract(text, &today, &tomorrow, ner_hints),
                2048,
                0.1,
                true,
            )
            .await?;
        match parse_json_object::<ExtractedFacts>(&raw) {
            Some(facts) => Ok(facts),
            None => {
                warn!(head = %raw.chars().take(200).collect::<String>(), "failed to parse extraction JSON");
                Ok(ExtractedFacts::default())
            }
        }
    }

    /// Message classification for the router fallback.
    pub async fn classify_input(&self, text: &str) -> Result<(String, f32), RafiqError> {
        let raw = self
            .chat_text(prompts::build_classify(text), 128, 0.1, true)
            .await?;
        let v = parse_json_object::<Value>(&raw).unwrap_or_default();
        let category = v["category"].as_str().unwrap_or("general").to_string();
        let confidence = v["confidence"].as_f64().unwrap_or(0.0) as f32;
        Ok((category, confidence))
    }

    /// One-sentence contextual prefix for an ingestion chunk.
    pub async fn add_context_to_chunk(
        &self,
        chunk: &str,
        full_document: &str,
    ) -> Result<String, RafiqError> {
        self.chat_text(
            prompts::build_context_enrichment(chunk, full_document),
            512,
            0.1,
            false,
        )
        .await
    }

    /// Image classification into the file-processor classes.
    pub async fn classify_file(&self, image_b64: &str, mime_type: &str) -> Result<Value, RafiqError> {
        let raw = self
            .chat_text(prompts::build_file_classify(image_b64, mime_type), 256, 0.1, true)
            .await?;
        Ok(parse_json_object::<Value>(&raw).unwrap_or_else(|| {
            warn!("failed to parse classify_file JSON");
            serde_json::json!({"file_type": "info_image", "confidence": 0.0, "brief_description": ""})
        }))
    }

    /// Type-specific vision analysis of an image.
    pub async fn analyze_image(
        &self,
        image_b64: &str,
        file_type: &str,
        mime_type: &str,
        user_context: &str,
    ) -> Result<Value, RafiqError> {
        let raw = self
            .chat_text(
                prompts::build_vision_analysis(image_b64, file_type, mime_type, user_context),
                2048,
                0.1,
                true,
            )
            .await?;
        Ok(parse_json_object::<Value>(&raw).unwrap_or_else(|| {
            warn!("failed to parse vision analysis JSON");
            serde_json::json!({"error": "unparseable analysis"})
        }))
    }

    /// English daily summary over concatenated turns.
    pub async fn summarize_daily(&self, messages_text: &str) -> Result<String, RafiqError> {
        self.chat_text(
            vec![
                ChatMessage::system(prompts::DAILY_SUMMARY_SYSTEM),
                ChatMessage::user(messages_text),
            ],
            1024,
            0.3,
            false,
        )
        .await
    }

    /// Arabic compression summary for working-memory overflow.
    pub async fn summarize_conversation_ar(&self, messages_text: &str) -> Result<String, RafiqError> {
        self.chat_text(
            vec![
                ChatMessage::system(prompts::CONVERSATION_COMPRESS_SYSTEM),
                ChatMessage::user(messages_text),
            ],
            512,
            0.3,
            false,
        )
        .await
    }

    /// Stable user preferences for core memory.
    pub async fn extract_core_preferences(
        &self,
        messages_text: &str,
    ) -> Result<BTreeMap<String, String>, RafiqError> {
        let raw = self
            .chat_text(
                vec![
                    ChatMessage::system(prompts::CORE_MEMORY_SYSTEM),
                    ChatMessage::user(messages_text),
                ],
                512,
                0.1,
                true,
            )
            .await?;
        let v = parse_json_object::<Value>(&raw).unwrap_or_default();
        let mut prefs = BTreeMap::new();
        if let Some(map) = v["preferences"].as_object() {
            for (k, val) in map {
                if let Some(s) = val.as_str() {
                    if !k.is_empty() && !s.is_empty() {
                        prefs.insert(k.clone(), s.to_string());
                    }
                }
            }
        }
        Ok(prefs)
    }

    /// One tool-mode call: returns text or tool invocations. An empty
    /// catalog degrades to a plain completion (forcing a text reply).
    pub async fn chat_with_tools(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSpec>,
    ) -> Result<ToolChatTurn, RafiqError> {
        let mut request = ChatRequest::new(self.client.default_model(), messages)
            .with_max_tokens(2048)
            .with_temperature(0.7);
        if !tools.is_empty() {
            request = request.with_tools(tools);
        }
        let response = self.client.complete(&request).await?;
        Ok(ToolChatTurn {
            content: response.text(),
            tool_calls: response.tool_calls(),
        })
    }

    /// Streaming tool-mode call. Text deltas are yielded as
    /// [`ToolStreamEvent::Token`]; tool-call fragments are accumulated by
    /// index and emitted once as [`ToolStreamEvent::ToolCalls`] when the
    /// stream ends or reports `finish_reason = tool_calls`.
    pub async fn stream_with_tool_detection(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSpec>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ToolStreamEvent, RafiqError>> + Send>>, RafiqError>
    {
        let mut request = ChatRequest::new(self.client.default_model(), messages)
            .with_max_tokens(2048)
            .with_temperature(0.7);
        if !tools.is_empty() {
            request = request.with_tools(tools);
        }
        let inner = self.client.stream(&request).await?;

        let stream = async_stream(inner);
        Ok(stream)
    }
}

/// Accumulates a raw SSE stream into tool-aware events.
fn async_stream(
    mut inner: Pin<Box<dyn Stream<Item = Result<StreamEvent, RafiqError>> + Send>>,
) -> Pin<Box<dyn Stream<Item = Result<ToolStreamEvent, RafiqError>> + Send>> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<ToolStreamEvent, RafiqError>>(32);

    tokio::spawn(async move {
        let mut accumulator = ToolCallAccumulator::default();

        while let Some(item) = inner.next().await {
            match item {
                Ok(StreamEvent::Chunk(chunk)) => {
                    for event in accumulator.feed(&chunk) {
                        if tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(StreamEvent::Done) => break,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }

        if let Some(calls) = accumulator.finish() {
            let _ = tx.send(Ok(ToolStreamEvent::ToolCalls(calls))).await;
        }
    });

    Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx))
}

/// Accumulates streamed tool-call fragments keyed by index.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    partial: Vec<(Option<String>, String, String)>,
    emitted: bool,
}

impl ToolCallAccumulator {
    /// Feeds one chunk; returns token events to forward immediately.
    fn feed(&mut self, chunk: &StreamChunk) -> Vec<ToolStreamEvent> {
        let mut out = Vec::new();
        for choice in &chunk.choices {
            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    out.push(ToolStreamEvent::Token(content.clone()));
                }
            }
            if let Some(deltas) = &choice.delta.tool_calls {
                for delta in deltas {
                    while self.partial.len() <= delta.index {
                        self.partial.push((None, String::new(), String::new()));
                    }
                    let slot = &mut self.partial[delta.index];
                    if let Some(id) = &delta.id {
                        slot.0 = Some(id.clone());
                    }
                    if let Some(f) = &delta.function {
                        if let Some(name) = &f.name {
                            slot.1.push_str(name);
                        }
                        if let Some(args) = &f.arguments {
                            slot.2.push_str(args);
                        }
                    }
                }
            }
            if choice.finish_reason.as_deref() == Some("tool_calls") {
                if let Some(calls) = self.take_calls() {
                    out.push(ToolStreamEvent::ToolCalls(calls));
                }
            }
        }
        out
    }

    /// Emits any remaining accumulated calls at end of stream.
    fn finish(&mut self) -> Option<Vec<ToolCall>> {
        self.take_calls()
    }

    fn take_calls(&mut self) -> Option<Vec<ToolCall>> {
        if self.emitted || self.partial.iter().all(|(_, name, _)| name.is_empty()) {
            return None;
        }
        self.emitted = true;
        let calls = self
            .partial
            .drain(..)
            .enumerate()
            .filter(|(_, (_, name, _))| !name.is_empty())
            .map(|(i, (id, name, arguments))| ToolCall {
                id: id.unwrap_or_else(|| format!("call_{i}")),
                call_type: "function".into(),
                function: FunctionCall { name, arguments },
            })
            .collect();
        Some(calls)
    }
}

/// Salvages a JSON object from model output: strips code fences and any
/// prose around the outermost braces. Returns `None` on failure so callers
/// can degrade without failing the whole operation.
pub fn parse_json_object<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return Some(v);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<T>(&trimmed[start..=end]) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("JSON salvage failed: {e}");
            None
        }
    }
}

/// True when the sample contains almost no Arabic script; translation is
/// skipped for such documents.
pub fn is_mostly_english(text: &str) -> bool {
    let sample: Vec<char> = text.chars().take(500).collect();
    if sample.is_empty() {
        return true;
    }
    let arabic = sample
        .iter()
        .filter(|c| ('\u{0600}'..='\u{06FF}').contains(*c))
        .count();
    (arabic as f32) / (sample.len() as f32) < 0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StreamChoice, StreamDelta, ToolCallDelta, FunctionCallDelta};

    #[test]
    fn mostly_english_detection() {
        assert!(is_mostly_english("How much did I spend on food?"));
        assert!(is_mostly_english(""));
        assert!(!is_mostly_english("وش صرفت هالشهر على الأكل؟"));
        // Mixed but mostly English with one Arabic word.
        assert!(is_mostly_english(
            "Meeting notes about the farm project with محمد and the irrigation vendor list"
        ));
    }

    #[test]
    fn json_salvage_handles_fences_and_prose() {
        let fenced = "```json\n{\"category\": \"financial\", \"confidence\": 0.9}\n```";
        let v: Value = parse_json_object(fenced).unwrap();
        assert_eq!(v["category"], "financial");

        let prose = "Here is the result:\n{\"entities\": []}\nDone.";
        let facts: ExtractedFacts = parse_json_object(prose).unwrap();
        assert!(facts.entities.is_empty());

        assert!(parse_json_object::<Value>("no json here").is_none());
    }

    fn delta_chunk(content: Option<&str>, tool: Option<(usize, Option<&str>, Option<&str>, Option<&str>)>, finish: Option<&str>) -> StreamChunk {
        StreamChunk {
            choices: vec![StreamChoice {
                delta: StreamDelta {
                    content: content.map(str::to_string),
                    tool_calls: tool.map(|(index, id, name, args)| {
                        vec![ToolCallDelta {
                            index,
                            id: id.map(str::to_string),
                            function: Some(FunctionCallDelta {
                                name: name.map(str::to_string),
                                arguments: args.map(str::to_string),
                            }),
                        }]
                    }),
                },
                finish_reason: finish.map(str::to_string),
            }],
        }
    }

    #[test]
    fn accumulator_joins_argument_fragments() {
        let mut acc = ToolCallAccumulator::default();
        acc.feed(&delta_chunk(None, Some((0, Some("call_1"), Some("add_expense"), Some("{\"amo"))), None));
        acc.feed(&delta_chunk(None, Some((0, None, None, Some("unt\": 25}"))), None));
        let events = acc.feed(&delta_chunk(None, None, Some("tool_calls")));

        assert_eq!(events.len(), 1);
        match &events[0] {
            ToolStreamEvent::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].function.name, "add_expense");
                assert_eq!(calls[0].parsed_arguments()["amount"], 25);
            }
            other => panic!("expected ToolCalls, got {other:?}"),
        }
        // Calls are emitted only once.
        assert!(acc.finish().is_none());
    }

    #[test]
    fn accumulator_handles_parallel_calls() {
        let mut acc = ToolCallAccumulator::default();
        acc.feed(&delta_chunk(None, Some((0, Some("a"), Some("add_expense"), Some("{}"))), None));
        acc.feed(&delta_chunk(None, Some((1, Some("b"), Some("create_reminder"), Some("{}"))), None));
        let calls = acc.finish().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.name, "add_expense");
        assert_eq!(calls[1].function.name, "create_reminder");
    }

    #[test]
    fn accumulator_forwards_tokens() {
        let mut acc = ToolCallAccumulator::default();
        let events = acc.feed(&delta_chunk(Some("مر"), None, None));
        assert!(matches!(&events[0], ToolStreamEvent::Token(t) if t == "مر"));
        assert!(acc.finish().is_none());
    }
}
