// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tool-calling chat core.
//!
//! One turn walks an explicit state machine: AwaitLlm → DispatchTools →
//! AwaitTools → Stream → Done, with Fallback on LLM failure. The loop is capped at
//! three LLM iterations. Tool calls within one iteration execute
//! concurrently, but results are appended to the context in stable catalog
//! order so the follow-up prompt is deterministic. Post-processing is
//! spawned strictly after the reply is complete.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use rafiq_core::{ChatReply, RafiqError, StreamLine, ToolOutcome};
use rafiq_llm::{ChatMessage, ToolCall, ToolStreamEvent};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::confirm::{self, ConfirmOutcome};
use crate::postprocess::{self, PostProcessInput};
use crate::services::Services;
use crate::tool::ToolRegistry;

/// Hard cap on LLM iterations per turn; the last one runs without tools so
/// a text reply is forced.
const MAX_ITERATIONS: usize = 3;

/// Replies the model emits when it has nothing useful after tool results.
const JUNK_REPLIES: [&str; 3] = ["{}", "[]", "{{}}"];

/// States of the chat-turn machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitLlm,
    DispatchTools,
    AwaitTools,
    Stream,
    Done,
    Fallback,
}

/// The orchestrator singleton.
#[derive(Clone)]
pub struct Orchestrator {
    services: Arc<Services>,
    registry: Arc<ToolRegistry>,
}

impl Orchestrator {
    pub fn new(services: Arc<Services>, registry: Arc<ToolRegistry>) -> Self {
        Self { services, registry }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// System prompt + working-memory turns + the user message.
    async fn build_messages(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<Vec<ChatMessage>, RafiqError> {
        let memory_context = self
            .services
            .memory
            .build_system_memory_context(session_id)
            .await?;
        let active_project = self
            .services
            .memory
            .store()
            .get_active_project(session_id)
            .await?;
        let now = rafiq_core::time::now_local(self.services.tz());
        let system = rafiq_llm::prompts::build_tool_system_prompt(
            now,
            &memory_context,
            active_project.as_deref(),
        );

        let mut messages = vec![ChatMessage::system(system)];
        for turn in self
            .services
            .memory
            .store()
            .get_working_memory(session_id)
            .await?
        {
            if let Ok(msg) = serde_json::from_value::<ChatMessage>(turn) {
                messages.push(msg);
            }
        }
        messages.push(ChatMessage::user(message));
        Ok(messages)
    }

    /// Executes one iteration's tool calls concurrently and returns
    /// (outcomes, context turns) in stable catalog order.
    async fn dispatch_tools(
        &self,
        calls: &[ToolCall],
        session_id: &str,
    ) -> (Vec<ToolOutcome>, Vec<ChatMessage>) {
        let mut ordered: Vec<&ToolCall> = calls.iter().collect();
        ordered.sort_by_key(|call| self.registry.catalog_index(&call.function.name));

        let executions = ordered.iter().map(|call| {
            let name = call.function.name.clone();
            let args = call.parsed_arguments();
            let registry = self.registry.clone();
            let stamp = self.services.now_stamp();
            async move {
                match registry.get(&name) {
                    Some(tool) => match tool.invoke(args, session_id).await {
                        Ok(data) => {
                            let success = data.get("error").is_none();
                            ToolOutcome {
                                tool: name,
                                success,
                                error: (!success).then(|| {
                                    data["error"].as_str().unwrap_or("unknown error").to_string()
                                }),
                                data: Some(data),
                                executed_at: stamp,
                            }
                        }
                        Err(e) => {
                            error!(tool = %name, error = %e, "tool execution failed");
                            ToolOutcome {
                                tool: name,
                                success: false,
                                data: None,
                                error: Some(e.to_string()),
                                executed_at: stamp,
                            }
                        }
                    },
                    None => ToolOutcome {
                        tool: name.clone(),
                        success: false,
                        data: None,
                        error: Some(format!("Unknown tool: {name}")),
                        executed_at: stamp,
                    },
                }
            }
        });
        let outcomes: Vec<ToolOutcome> = futures::future::join_all(executions).await;

        let mut turns = vec![ChatMessage::assistant_tool_calls(
            ordered.iter().map(|c| (*c).clone()).collect(),
        )];
        for (call, outcome) in ordered.iter().zip(&outcomes) {
            let content = serde_json::to_string(outcome).unwrap_or_else(|_| "{}".into());
            turns.push(ChatMessage::tool_result(call.id.clone(), content));
        }
        (outcomes, turns)
    }

    /// Deterministic Arabic reply from raw tool results, used when the LLM
    /// times out or returns junk. Never fabricates success.
    pub fn fallback_reply(tool_results: &[ToolOutcome]) -> String {
        let mut parts = Vec::new();
        for outcome in tool_results {
            let data = outcome.data.clone().unwrap_or(Value::Null);
            if !outcome.success {
                let reason = outcome
                    .error
                    .clone()
                    .or_else(|| data["error"].as_str().map(str::to_string))
                    .unwrap_or_default();
                parts.push(format!("فشل {}: {reason}", outcome.tool));
                continue;
            }
            let text = match outcome.tool.as_str() {
                "create_reminder" => format!("تم إنشاء تذكير: {}", data["title"].as_str().unwrap_or("")),
                "delete_reminder" => format!("تم حذف تذكير: {}", data["title"].as_str().unwrap_or("")),
                "update_reminder" => format!("تم تحديث تذكير: {}", data["title"].as_str().unwrap_or("")),
                "add_expense" => format!(
                    "تم تسجيل مصروف: {} ({} ريال)",
                    data["description"].as_str().unwrap_or(""),
                    data["amount"]
                ),
                "search_reminders" => data["reminders"].as_str().unwrap_or("").to_string(),
                "get_daily_plan" => data["plan"].as_str().unwrap_or("").to_string(),
                "search_knowledge" => data["results"].as_str().unwrap_or("").to_string(),
                "get_expense_report" => format!(
                    "إجمالي المصاريف: {:.0} ريال",
                    data["total"].as_f64().unwrap_or(0.0)
                ),
                "get_debt_summary" => format!(
                    "عليك: {:.0} ريال | لك: {:.0} ريال",
                    data["total_i_owe"].as_f64().unwrap_or(0.0),
                    data["total_owed_to_me"].as_f64().unwrap_or(0.0)
                ),
                "record_debt" => format!(
                    "تم تسجيل دين: {} ({} ريال)",
                    data["person"].as_str().unwrap_or(""),
                    data["amount"]
                ),
                "pay_debt" => format!("تم تسجيل سداد: {}", data["person"].as_str().unwrap_or("")),
                "store_note" => format!(
                    "تم حفظ الملاحظة ({} عنصر)",
                    data["entities_saved"].as_i64().unwrap_or(0)
                ),
                "get_person_info" => data["info"].as_str().unwrap_or("").to_string(),
                "manage_inventory" => data["results"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string()),
                "manage_tasks" => data["tasks"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string()),
                "manage_projects" => match data["status"].as_str() {
                    Some("focused") => {
                        format!("تم التركيز على مشروع: {}", data["name"].as_str().unwrap_or(""))
                    }
                    Some("unfocused") => "تم إلغاء التركيز على المشروع".to_string(),
                    _ => data["projects"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| data.to_string()),
                },
                "manage_lists" => data["list"]
                    .as_str()
                    .or_else(|| data["lists"].as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string()),
                "merge_projects" => format!(
                    "تم دمج {} مشاريع ونقل {} مهام إلى {}",
                    data["sources_deleted"],
                    data["tasks_moved"],
                    data["target"].as_str().unwrap_or("")
                ),
                other => format!("تم تنفيذ {other}"),
            };
            if !text.is_empty() {
                parts.push(text);
            }
        }
        if parts.is_empty() {
            "تم تنفيذ الطلب.".to_string()
        } else {
            parts.join("\n")
        }
    }

    fn is_junk(reply: &str) -> bool {
        let trimmed = reply.trim();
        trimmed.is_empty() || JUNK_REPLIES.contains(&trimmed)
    }

    fn spawn_post_process(
        &self,
        message: &str,
        reply: &str,
        session_id: &str,
        tool_results: Vec<ToolOutcome>,
        new_turns: Vec<Value>,
    ) {
        let services = (*self.services).clone();
        let input = PostProcessInput {
            user_message: message.to_string(),
            reply: reply.to_string(),
            session_id: session_id.to_string(),
            tool_calls: tool_results,
            new_turns,
        };
        tokio::spawn(postprocess::post_process(services, input));
    }

    /// Non-streaming chat turn.
    pub async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply, RafiqError> {
        // Confirmation pre-pass: destructive intents and pending answers
        // short-circuit the loop.
        match confirm::preprocess(&self.services, message, session_id).await? {
            ConfirmOutcome::Ask(question) => {
                self.spawn_post_process(message, &question, session_id, vec![], vec![]);
                return Ok(ChatReply {
                    reply: question,
                    sources: vec![],
                    route: "confirmation".into(),
                    tool_calls: vec![],
                    trace: vec!["pending_action_stored".into()],
                });
            }
            ConfirmOutcome::Executed(result, reply) => {
                let outcome = ToolOutcome {
                    tool: "delete_reminder".into(),
                    success: result.get("error").is_none(),
                    data: Some(result),
                    error: None,
                    executed_at: self.services.now_stamp(),
                };
                self.spawn_post_process(message, &reply, session_id, vec![outcome.clone()], vec![]);
                return Ok(ChatReply {
                    reply,
                    sources: vec![],
                    route: "confirmation".into(),
                    tool_calls: vec![outcome],
                    trace: vec!["pending_action_executed".into()],
                });
            }
            ConfirmOutcome::Declined(reply) => {
                self.spawn_post_process(message, &reply, session_id, vec![], vec![]);
                return Ok(ChatReply {
                    reply,
                    sources: vec![],
                    route: "confirmation".into(),
                    tool_calls: vec![],
                    trace: vec!["pending_action_declined".into()],
                });
            }
            ConfirmOutcome::PassThrough => {}
        }

        let mut messages = self.build_messages(message, session_id).await?;
        let mut tool_results: Vec<ToolOutcome> = Vec::new();
        let mut new_turns: Vec<Value> = Vec::new();
        let mut trace = Vec::new();
        let mut reply = String::new();
        let mut state = TurnState::AwaitLlm;

        for iteration in 0..MAX_ITERATIONS {
            state = TurnState::AwaitLlm;
            // The final iteration carries no tools: a text reply is forced.
            let tools = if iteration + 1 < MAX_ITERATIONS {
                self.registry.tool_specs()
            } else {
                Vec::new()
            };
            let turn = match self.services.llm.chat_with_tools(messages.clone(), tools).await {
                Ok(turn) => turn,
                Err(e) => {
                    error!(iteration, error = %e, "LLM call failed");
                    state = TurnState::Fallback;
                    reply = if tool_results.is_empty() {
                        "عذراً، حصل خطأ في المعالجة. حاول مرة ثانية.".to_string()
                    } else {
                        Self::fallback_reply(&tool_results)
                    };
                    trace.push(format!("iteration_{iteration}:llm_error"));
                    break;
                }
            };

            if turn.tool_calls.is_empty() {
                reply = turn.content;
                state = TurnState::Done;
                trace.push(format!("iteration_{iteration}:text"));
                break;
            }

            state = TurnState::DispatchTools;
            trace.push(format!(
                "iteration_{iteration}:tools:{}",
                turn.tool_calls
                    .iter()
                    .map(|c| c.function.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            ));
            state = TurnState::AwaitTools;
            let (outcomes, turns) = self.dispatch_tools(&turn.tool_calls, session_id).await;
            tool_results.extend(outcomes);
            for t in &turns {
                if let Ok(v) = serde_json::to_value(t) {
                    new_turns.push(v);
                }
            }
            messages.extend(turns);
        }

        if !tool_results.is_empty() && Self::is_junk(&reply) {
            reply = Self::fallback_reply(&tool_results);
            state = TurnState::Fallback;
        }
        trace.push(format!("final_state:{state:?}"));

        if !reply.is_empty() {
            self.spawn_post_process(message, &reply, session_id, tool_results.clone(), new_turns);
        }

        let route = crate::router::route_message(message)
            .map(|r| r.label().to_string())
            .unwrap_or_else(|| "tool_calling".into());
        Ok(ChatReply {
            reply,
            sources: vec![],
            route,
            tool_calls: tool_results,
            trace,
        })
    }

    /// Streaming chat turn: NDJSON lines (`meta`, `token`, `tool_call`,
    /// `done`). A tool call detected mid-stream terminates that LLM call;
    /// tools execute; a fresh streaming call continues with the full
    /// conversation (not a delta).
    pub async fn chat_stream(
        &self,
        message: &str,
        session_id: &str,
    ) -> Pin<Box<dyn Stream<Item = StreamLine> + Send>> {
        let (tx, rx) = tokio::sync::mpsc::channel::<StreamLine>(64);
        let this = self.clone();
        let message = message.to_string();
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            let send = |line: StreamLine| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(line).await;
                }
            };

            let route = crate::router::route_message(&message)
                .map(|r| r.label().to_string())
                .unwrap_or_else(|| "tool_calling".into());
            send(StreamLine::Meta { route }).await;

            // Confirmation pre-pass mirrors the non-streaming path.
            match confirm::preprocess(&this.services, &message, &session_id).await {
                Ok(ConfirmOutcome::Ask(question)) => {
                    send(StreamLine::Token { content: question.clone() }).await;
                    send(StreamLine::Done).await;
                    this.spawn_post_process(&message, &question, &session_id, vec![], vec![]);
                    return;
                }
                Ok(ConfirmOutcome::Executed(result, reply)) => {
                    let outcome = ToolOutcome {
                        tool: "delete_reminder".into(),
                        success: result.get("error").is_none(),
                        data: Some(result),
                        error: None,
                        executed_at: this.services.now_stamp(),
                    };
                    send(StreamLine::Token { content: reply.clone() }).await;
                    send(StreamLine::Done).await;
                    this.spawn_post_process(&message, &reply, &session_id, vec![outcome], vec![]);
                    return;
                }
                Ok(ConfirmOutcome::Declined(reply)) => {
                    send(StreamLine::Token { content: reply.clone() }).await;
                    send(StreamLine::Done).await;
                    this.spawn_post_process(&message, &reply, &session_id, vec![], vec![]);
                    return;
                }
                Ok(ConfirmOutcome::PassThrough) => {}
                Err(e) => {
                    warn!(error = %e, "confirmation pre-pass failed");
                }
            }

            let mut messages = match this.build_messages(&message, &session_id).await {
                Ok(m) => m,
                Err(e) => {
                    error!(error = %e, "failed to build stream context");
                    send(StreamLine::Token {
                        content: "عذراً، حصل خطأ. حاول مرة ثانية.".into(),
                    })
                    .await;
                    send(StreamLine::Done).await;
                    return;
                }
            };

            let mut tool_results: Vec<ToolOutcome> = Vec::new();
            let mut new_turns: Vec<Value> = Vec::new();
            let mut reply_text = String::new();

            'iterations: for iteration in 0..MAX_ITERATIONS {
                let tools = if iteration + 1 < MAX_ITERATIONS {
                    this.registry.tool_specs()
                } else {
                    Vec::new()
                };
                // After tools ran, the reply is buffered so junk can be
                // swapped for the deterministic fallback before the client
                // sees anything.
                let buffer_mode = !tool_results.is_empty();

                let mut stream = match this
                    .services
                    .llm
                    .stream_with_tool_detection(messages.clone(), tools)
                    .await
                {
                    Ok(s) => s,
                    Err(e) => {
                        error!(iteration, error = %e, "stream failed");
                        let fallback = if tool_results.is_empty() {
                            "عذراً، حصل خطأ. حاول مرة ثانية.".to_string()
                        } else {
                            Orchestrator::fallback_reply(&tool_results)
                        };
                        send(StreamLine::Token { content: fallback.clone() }).await;
                        reply_text = fallback;
                        break 'iterations;
                    }
                };

                let mut streamed = String::new();
                let mut calls_found: Option<Vec<ToolCall>> = None;

                while let Some(event) = stream.next().await {
                    match event {
                        Ok(ToolStreamEvent::Token(token)) => {
                            streamed.push_str(&token);
                            if !buffer_mode {
                                send(StreamLine::Token { content: token }).await;
                            }
                        }
                        Ok(ToolStreamEvent::ToolCalls(calls)) => {
                            info!(
                                iteration,
                                tools = ?calls.iter().map(|c| c.function.name.as_str()).collect::<Vec<_>>(),
                                "tool calls detected mid-stream"
                            );
                            calls_found = Some(calls);
                        }
                        Err(e) => {
                            error!(iteration, error = %e, "stream error");
                            let fallback = if tool_results.is_empty() {
                                "عذراً، حصل خطأ. حاول مرة ثانية.".to_string()
                            } else {
                                Orchestrator::fallback_reply(&tool_results)
                            };
                            send(StreamLine::Token { content: fallback.clone() }).await;
                            reply_text = fallback;
                            break 'iterations;
                        }
                    }
                }

                if !streamed.is_empty() {
                    reply_text = streamed;
                    if buffer_mode {
                        if Orchestrator::is_junk(&reply_text) {
                            warn!(iteration, "junk post-tool reply, using fallback");
                            reply_text = Orchestrator::fallback_reply(&tool_results);
                        }
                        send(StreamLine::Token { content: reply_text.clone() }).await;
                    }
                    break 'iterations;
                }

                if let Some(calls) = calls_found {
                    for call in &calls {
                        send(StreamLine::ToolCall {
                            name: call.function.name.clone(),
                        })
                        .await;
                    }
                    let (outcomes, turns) = this.dispatch_tools(&calls, &session_id).await;
                    tool_results.extend(outcomes);
                    for t in &turns {
                        if let Ok(v) = serde_json::to_value(t) {
                            new_turns.push(v);
                        }
                    }
                    messages.extend(turns);
                    continue 'iterations;
                }

                // Neither text nor tool calls: stop.
                break 'iterations;
            }

            if !tool_results.is_empty() && Orchestrator::is_junk(&reply_text) {
                reply_text = Orchestrator::fallback_reply(&tool_results);
                send(StreamLine::Token { content: reply_text.clone() }).await;
            }

            send(StreamLine::Done).await;

            // Post-processing runs only after the client saw `done`.
            if !reply_text.is_empty() {
                this.spawn_post_process(&message, &reply_text, &session_id, tool_results, new_turns);
            }
        });

        Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(tool: &str, success: bool, data: Value) -> ToolOutcome {
        ToolOutcome {
            tool: tool.into(),
            success,
            data: Some(data),
            error: (!success).then(|| "boom".into()),
            executed_at: "2026-02-11 09:00:00".into(),
        }
    }

    #[test]
    fn fallback_reply_summarises_writes_in_arabic() {
        let results = vec![
            outcome("add_expense", true, json!({"description": "قهوة", "amount": 25})),
            outcome("create_reminder", true, json!({"title": "أشتري حليب"})),
        ];
        let reply = Orchestrator::fallback_reply(&results);
        assert!(reply.contains("تم تسجيل مصروف: قهوة (25 ريال)"));
        assert!(reply.contains("تم إنشاء تذكير: أشتري حليب"));
    }

    #[test]
    fn fallback_reply_reports_failures_truthfully() {
        let results = vec![outcome("pay_debt", false, json!({"error": "no open debt"}))];
        let reply = Orchestrator::fallback_reply(&results);
        assert!(reply.contains("فشل pay_debt"));
        assert!(!reply.contains("تم"));
    }

    #[test]
    fn fallback_reply_handles_empty_results() {
        assert_eq!(Orchestrator::fallback_reply(&[]), "تم تنفيذ الطلب.");
    }

    #[test]
    fn junk_detection() {
        assert!(Orchestrator::is_junk(""));
        assert!(Orchestrator::is_junk("  {} "));
        assert!(Orchestrator::is_junk("[]"));
        assert!(!Orchestrator::is_junk("تم إنشاء التذكير"));
    }

    #[test]
    fn debt_summary_fallback_shape() {
        let results = vec![outcome(
            "get_debt_summary",
            true,
            json!({"total_i_owe": 800.0, "total_owed_to_me": 500.0}),
        )];
        assert_eq!(
            Orchestrator::fallback_reply(&results),
            "عليك: 800 ريال | لك: 500 ريال"
        );
    }
}
