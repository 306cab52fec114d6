// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat-completions server.
//!
//! Provides [`LlmClient`] which handles request construction, transient
//! error retry, per-call deadlines, and streaming SSE responses.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use rafiq_core::RafiqError;
use tracing::{debug, warn};

use crate::sse::{self, StreamEvent};
use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// Pooled async client for the generative model server.
///
/// Retries once on transient statuses (429, 5xx) after a short delay;
/// non-streaming calls are bounded by the configured per-call deadline.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    default_model: String,
    timeout: Duration,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(base_url: String, model: String, timeout_seconds: u64) -> Result<Self, RafiqError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RafiqError::Config(format!("failed to build LLM HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: model,
            timeout: Duration::from_secs(timeout_seconds),
            max_retries: 1,
        })
    }

    /// Returns the default model identifier.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Sends a non-streaming request and returns the parsed response.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, RafiqError> {
        let mut req = request.clone();
        req.stream = false;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            let send = self.client.post(self.completions_url()).json(&req).send();
            let response = match tokio::time::timeout(self.timeout, send).await {
                Err(_) => {
                    return Err(RafiqError::LlmTimeout {
                        seconds: self.timeout.as_secs(),
                    })
                }
                Ok(Err(e)) => return Err(RafiqError::backend("llm", e)),
                Ok(Ok(resp)) => resp,
            };

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response
                    .text()
                    .await
                    .map_err(|e| RafiqError::backend("llm", e))?;
                return serde_json::from_str::<ChatResponse>(&body)
                    .map_err(|e| RafiqError::LlmMalformed(format!("bad completion body: {e}")));
            }

            if is_transient_status(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient LLM error, will retry");
                last_error = Some(RafiqError::backend_msg(
                    "llm",
                    format!("API returned {status}: {body}"),
                ));
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(api_error("llm", status, &body));
        }

        Err(last_error
            .unwrap_or_else(|| RafiqError::backend_msg("llm", "completion failed after retries")))
    }

    /// Sends a streaming request and returns a stream of SSE events.
    pub async fn stream(
        &self,
        request: &ChatRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, RafiqError>> + Send>>, RafiqError>
    {
        let mut req = request.clone();
        req.stream = true;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            let response = self
                .client
                .post(self.completions_url())
                .json(&req)
                .send()
                .await
                .map_err(|e| RafiqError::backend("llm", e))?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_completion_stream(response));
            }

            if is_transient_status(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient LLM error, will retry");
                last_error = Some(RafiqError::backend_msg(
                    "llm",
                    format!("API returned {status}: {body}"),
                ));
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(api_error("llm", status, &body));
        }

        Err(last_error
            .unwrap_or_else(|| RafiqError::backend_msg("llm", "stream failed after retries")))
    }
}

/// Builds the surfaced error for a non-transient API status.
fn api_error(service: &'static str, status: reqwest::StatusCode, body: &str) -> RafiqError {
    let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!("API error ({}): {}", api_err.error.type_, api_err.error.message)
    } else {
        format!("API returned {status}: {body}")
    };
    RafiqError::backend_msg(service, message)
}

/// True for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> LlmClient {
        LlmClient::new(format!("{base_url}/v1"), "qwen-test".into(), 5).unwrap()
    }

    fn test_request() -> ChatRequest {
        ChatRequest::new("qwen-test", vec![ChatMessage::user("مرحبا")])
    }

    fn ok_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"content": text}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 3}
        })
    }

    #[tokio::test]
    async fn complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("أهلاً")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let resp = client.complete(&test_request()).await.unwrap();
        assert_eq!(resp.text(), "أهلاً");
    }

    #[tokio::test]
    async fn complete_retries_on_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("after retry")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let resp = client.complete(&test_request()).await.unwrap();
        assert_eq!(resp.text(), "after retry");
    }

    #[tokio::test]
    async fn complete_fails_on_400_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.complete(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn complete_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("slow"))
                    .set_delay(Duration::from_secs(8)),
            )
            .mount(&server)
            .await;

        let client = LlmClient::new(format!("{}/v1", server.uri()), "qwen-test".into(), 1).unwrap();
        let err = client.complete(&test_request()).await.unwrap_err();
        assert!(matches!(err, RafiqError::LlmTimeout { .. }));
    }

    #[tokio::test]
    async fn stream_yields_tokens() {
        use futures::StreamExt;

        let server = MockServer::start().await;
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"},\"finish_reason\":null}]}\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let mut stream = client.stream(&test_request()).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        match first {
            StreamEvent::Chunk(chunk) => {
                assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("hi"));
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
    }
}
