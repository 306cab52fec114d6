// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the Rafiq services.

use thiserror::Error;

/// The primary error type used across all Rafiq services.
///
/// Variants follow the caller-facing taxonomy: validation problems surface
/// as 4xx, backend outages retry once and surface as 503, LLM failures are
/// replaced by deterministic fallback replies upstream, and `Fatal` aborts
/// the containing operation.
#[derive(Debug, Error)]
pub enum RafiqError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller-visible input problem; never retried.
    #[error("{0}")]
    Validation(String),

    /// Transient network/storage outage on a backing service.
    #[error("{service} unavailable: {message}")]
    BackendUnavailable {
        service: &'static str,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The LLM did not answer within the per-call deadline.
    #[error("LLM call timed out after {seconds}s")]
    LlmTimeout { seconds: u64 },

    /// The LLM answered with output the caller could not use.
    #[error("malformed LLM output: {0}")]
    LlmMalformed(String),

    /// A lookup missed; resolved as empty result or 404 at the REST edge.
    #[error("not found: {0}")]
    NotFound(String),

    /// Re-upload of identical content. Not a failure for the caller.
    #[error("duplicate content")]
    ConflictDuplicate,

    /// An invariant was violated mid-operation; abort and surface 500.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RafiqError {
    /// Wraps a backend client error with the owning service name.
    pub fn backend(
        service: &'static str,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RafiqError::BackendUnavailable {
            service,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Backend failure without an underlying error value.
    pub fn backend_msg(service: &'static str, message: impl Into<String>) -> Self {
        RafiqError::BackendUnavailable {
            service,
            message: message.into(),
            source: None,
        }
    }

    /// True when a single retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RafiqError::BackendUnavailable { .. } | RafiqError::LlmTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_wraps_source() {
        let err = RafiqError::backend("graph", std::io::Error::other("connection refused"));
        assert!(err.to_string().contains("graph unavailable"));
        assert!(err.is_transient());
    }

    #[test]
    fn validation_displays_bare_message() {
        let err = RafiqError::Validation("اسم المشروع مطلوب".into());
        assert_eq!(err.to_string(), "اسم المشروع مطلوب");
        assert!(!err.is_transient());
    }

    #[test]
    fn timeout_is_transient() {
        assert!(RafiqError::LlmTimeout { seconds: 60 }.is_transient());
        assert!(!RafiqError::NotFound("x".into()).is_transient());
    }
}
