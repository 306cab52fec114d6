// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for streaming chat completions.
//!
//! Converts a reqwest byte stream into typed [`StreamEvent`]s using the
//! `eventsource-stream` crate. The completions stream is data-only SSE:
//! each `data:` line carries a [`StreamChunk`], and the literal `[DONE]`
//! sentinel terminates the stream.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use rafiq_core::RafiqError;

use crate::types::StreamChunk;

/// Typed events from a streaming completion.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// One parsed chunk (token delta or tool-call fragment).
    Chunk(StreamChunk),
    /// The `[DONE]` sentinel.
    Done,
}

/// Parses a streaming response into [`StreamEvent`]s.
///
/// Unparseable data lines are surfaced as errors; empty keep-alive events
/// are skipped.
pub fn parse_completion_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, RafiqError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = event.data.trim().to_string();
                if data.is_empty() {
                    return None;
                }
                if data == "[DONE]" {
                    return Some(Ok(StreamEvent::Done));
                }
                Some(
                    serde_json::from_str::<StreamChunk>(&data)
                        .map(StreamEvent::Chunk)
                        .map_err(|e| {
                            RafiqError::LlmMalformed(format!("bad stream chunk: {e}"))
                        }),
                )
            }
            Err(e) => Some(Err(RafiqError::backend_msg(
                "llm",
                format!("SSE stream error: {e}"),
            ))),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_token_chunks_and_done() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"مر\"},\"finish_reason\":null}]}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"حبا\"},\"finish_reason\":null}]}\n\n\
                   data: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_completion_stream(response);

        let mut tokens = String::new();
        let mut saw_done = false;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                StreamEvent::Chunk(chunk) => {
                    if let Some(c) = &chunk.choices[0].delta.content {
                        tokens.push_str(c);
                    }
                }
                StreamEvent::Done => saw_done = true,
            }
        }
        assert_eq!(tokens, "مرحبا");
        assert!(saw_done);
    }

    #[tokio::test]
    async fn malformed_chunk_is_an_error() {
        let sse = "data: {not json}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_completion_stream(response);

        let event = stream.next().await.unwrap();
        assert!(matches!(event, Err(RafiqError::LlmMalformed(_))));
    }

    #[tokio::test]
    async fn finish_reason_tool_calls_survives_parsing() {
        let sse = "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\ndata: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_completion_stream(response);

        match stream.next().await.unwrap().unwrap() {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("tool_calls"));
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
    }
}
