// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Rafiq workspace.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::RafiqConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = RafiqConfig::default();
        assert_eq!(config.server.port, 8500);
        assert_eq!(config.server.timezone_offset_hours, 3);
        assert_eq!(config.embedding.dimension, 1024);
        assert_eq!(config.resolution.person_threshold, 0.85);
        assert_eq!(config.resolution.default_threshold, 0.80);
        assert_eq!(config.resolution.graph_max_hops, 3);
        assert_eq!(config.chat.self_rag_threshold, 0.3);
        assert_eq!(config.memory.confirmation_ttl_seconds, 300);
        assert_eq!(config.ingest.chunk_max_tokens, 1500);
        assert_eq!(config.ingest.chunk_overlap_tokens, 150);
        assert_eq!(config.backup.retention_days, 30);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [server]
            port = 9000

            [memory]
            redis_url = "redis://redis-host:6380/1"
            working_memory_size = 8

            [resolution]
            person_threshold = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.memory.redis_url, "redis://redis-host:6380/1");
        assert_eq!(config.memory.working_memory_size, 8);
        assert_eq!(config.resolution.person_threshold, 0.9);
        // Untouched sections keep defaults.
        assert_eq!(config.vector.collection, "personal_life");
    }

    #[test]
    fn empty_toml_is_valid() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.llm.timeout_seconds, 60);
    }

    #[test]
    fn partial_section_merges_with_defaults() {
        let config = load_config_from_str(
            r#"
            [proactive]
            morning_hour = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.proactive.morning_hour, 6);
        assert_eq!(config.proactive.noon_hour, 13);
        assert_eq!(config.proactive.evening_hour, 21);
    }
}
