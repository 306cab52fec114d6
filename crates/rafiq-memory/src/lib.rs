// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Three-layer memory for the Rafiq assistant: per-session working queue,
//! daily summaries, permanent core preferences, plus short-lived pending
//! actions, active-project markers, and compression summaries.

pub mod context;
pub mod store;

pub use context::{turns_to_text, MemoryService};
pub use store::{DumpedKey, MemoryStore};

use rafiq_config::RafiqConfig;
use rafiq_core::RafiqError;
use rafiq_llm::LlmGateway;

/// Connects the store and wraps it into the service.
pub async fn build_service(
    config: &RafiqConfig,
    llm: LlmGateway,
) -> Result<MemoryService, RafiqError> {
    let store = MemoryStore::connect(
        &config.memory.redis_url,
        config.memory.working_memory_size,
        config.memory.daily_summary_ttl_days,
        config.memory.confirmation_ttl_seconds,
        config.server.timezone_offset_hours,
    )
    .await?;
    Ok(MemoryService::new(
        store,
        llm,
        config.memory.compress_threshold,
        config.memory.compress_keep_recent,
    ))
}
