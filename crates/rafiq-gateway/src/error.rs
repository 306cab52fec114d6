// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-response mapping for the REST edge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rafiq_core::RafiqError;
use serde_json::json;
use tracing::error;

/// Wrapper so handlers can return `Result<_, ApiError>` with `?`.
pub struct ApiError(pub RafiqError);

impl From<RafiqError> for ApiError {
    fn from(e: RafiqError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, expose_message) = match &self.0 {
            RafiqError::Validation(_) => (StatusCode::BAD_REQUEST, true),
            RafiqError::NotFound(_) => (StatusCode::NOT_FOUND, true),
            RafiqError::ConflictDuplicate => (StatusCode::OK, true),
            RafiqError::BackendUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, false),
            RafiqError::LlmTimeout { .. } | RafiqError::LlmMalformed(_) => {
                (StatusCode::BAD_GATEWAY, false)
            }
            RafiqError::Fatal(_)
            | RafiqError::Config(_)
            | RafiqError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, false),
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let message = if expose_message {
            self.0.to_string()
        } else {
            "internal error".to_string()
        };
        (status, Json(json!({"detail": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        let cases = [
            (RafiqError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (RafiqError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                RafiqError::backend_msg("graph", "down"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (RafiqError::LlmTimeout { seconds: 60 }, StatusCode::BAD_GATEWAY),
            (RafiqError::Fatal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn backend_details_are_not_exposed() {
        let response = ApiError(RafiqError::backend_msg("graph", "password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
