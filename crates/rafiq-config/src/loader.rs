// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Hierarchy: compiled defaults < `/etc/rafiq/rafiq.toml` <
//! `~/.config/rafiq/rafiq.toml` < `./rafiq.toml` < `RAFIQ_*` env vars.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RafiqConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<RafiqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RafiqConfig::default()))
        .merge(Toml::file("/etc/rafiq/rafiq.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("rafiq/rafiq.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("rafiq.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string (tests, embedding).
pub fn load_config_from_str(toml_content: &str) -> Result<RafiqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RafiqConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RafiqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RafiqConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment variable provider using explicit `map()` for section-to-dot
/// mapping. `Env::split("_")` would misparse keys that themselves contain
/// underscores: `RAFIQ_MEMORY_REDIS_URL` must become `memory.redis_url`,
/// not `memory.redis.url`.
fn env_provider() -> Env {
    Env::prefixed("RAFIQ_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("llm_", "llm.", 1)
            .replacen("embedding_", "embedding.", 1)
            .replacen("vector_", "vector.", 1)
            .replacen("graph_", "graph.", 1)
            .replacen("memory_", "memory.", 1)
            .replacen("chat_", "chat.", 1)
            .replacen("resolution_", "resolution.", 1)
            .replacen("ingest_", "ingest.", 1)
            .replacen("ner_", "ner.", 1)
            .replacen("asr_", "asr.", 1)
            .replacen("pdf_", "pdf.", 1)
            .replacen("proactive_", "proactive.", 1)
            .replacen("productivity_", "productivity.", 1)
            .replacen("inventory_", "inventory.", 1)
            .replacen("prayer_", "prayer.", 1)
            .replacen("backup_", "backup.", 1);
        mapped.into()
    })
}
