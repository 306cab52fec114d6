// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delete/cancel confirmation flow.
//!
//! Destructive intents never execute directly from a chat message: a
//! pending action is stored (300s TTL) and an Arabic yes/no question is
//! returned. Only an affirmative follow-up executes the stored action;
//! expiry is resolved lazily by the TTL.

use rafiq_core::RafiqError;
use serde_json::{json, Value};
use tracing::info;

use crate::router;
use crate::services::Services;

/// Outcome of the confirmation pre-pass.
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// Not a confirmation matter; run the normal chat loop.
    PassThrough,
    /// A question (with yes/no semantics) to return instead of the loop.
    Ask(String),
    /// The stored action was executed; this is the reply.
    Executed(Value, String),
    /// The stored action was dropped.
    Declined(String),
}

/// Runs before the tool loop. Handles pending-action answers, then new
/// destructive intents.
pub async fn preprocess(
    services: &Services,
    message: &str,
    session_id: &str,
) -> Result<ConfirmOutcome, RafiqError> {
    let memory = services.memory.store();

    if let Some(pending) = memory.get_pending_action(session_id).await? {
        if router::is_affirmative(message) {
            memory.clear_pending_action(session_id).await?;
            let result = execute_pending(services, &pending).await?;
            let reply = if result.get("error").is_some() {
                format!(
                    "ما قدرت أنفذ العملية: {}",
                    result["error"].as_str().unwrap_or("خطأ غير معروف")
                )
            } else {
                "تم، حذفته لك.".to_string()
            };
            return Ok(ConfirmOutcome::Executed(result, reply));
        }
        if router::is_negative(message) {
            memory.clear_pending_action(session_id).await?;
            return Ok(ConfirmOutcome::Declined("خلاص، ما حذفت شي.".to_string()));
        }
        // Any other message abandons the pending action implicitly; it
        // expires by TTL. Fall through to the normal loop.
        return Ok(ConfirmOutcome::PassThrough);
    }

    if router::is_destructive_intent(message) {
        let action = json!({
            "action": "delete_reminder",
            "query": message,
        });
        memory.set_pending_action(session_id, &action).await?;
        info!(session_id, "stored pending delete action");
        return Ok(ConfirmOutcome::Ask(
            "متأكد تبي تحذف التذكير؟ رد بـ «نعم» للتأكيد أو «لا» للإلغاء.".to_string(),
        ));
    }

    Ok(ConfirmOutcome::PassThrough)
}

/// Strips the delete/cancel verbs so only the reminder description remains
/// for matching.
fn strip_intent_words(message: &str) -> String {
    use regex::Regex;
    use std::sync::LazyLock;
    static INTENT: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(احذف|امسح|شيل|ألغِ|ألغ|الغ|delete|remove|cancel)\s*(تذكير|التذكير|reminder)?")
            .expect("valid intent regex")
    });
    INTENT.replace_all(message, " ").trim().to_string()
}

async fn execute_pending(services: &Services, pending: &Value) -> Result<Value, RafiqError> {
    match pending["action"].as_str() {
        Some("delete_reminder") => {
            let query = pending["query"].as_str().unwrap_or_default();
            let cleaned =
                crate::tools::reminders::clean_query(&strip_intent_words(query));
            services
                .graph
                .update_reminder_status(&cleaned, "delete", None)
                .await
        }
        other => Ok(json!({"error": format!("unknown pending action: {other:?}")})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_words_are_stripped() {
        assert_eq!(strip_intent_words("احذف تذكير دفع الإيجار"), "دفع الإيجار");
        assert_eq!(strip_intent_words("delete reminder pay rent"), "pay rent");
        assert_eq!(strip_intent_words("دفع الإيجار"), "دفع الإيجار");
    }
}
