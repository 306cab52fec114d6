// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared service handle passed to every tool handler.

use std::sync::Arc;

use rafiq_config::RafiqConfig;
use rafiq_graph::GraphService;
use rafiq_ingest::IngestionPipeline;
use rafiq_llm::LlmGateway;
use rafiq_memory::MemoryService;
use rafiq_vector::VectorStore;

/// The process-wide service singletons, constructed once at startup and
/// passed through this context object (never reached from module scope).
#[derive(Clone)]
pub struct Services {
    pub llm: LlmGateway,
    pub graph: GraphService,
    pub vector: VectorStore,
    pub memory: MemoryService,
    pub pipeline: IngestionPipeline,
    pub config: Arc<RafiqConfig>,
}

impl Services {
    pub fn tz(&self) -> i32 {
        self.config.server.timezone_offset_hours
    }

    /// `YYYY-MM-DD HH:MM:SS` stamp placed on tool outcomes.
    pub fn now_stamp(&self) -> String {
        rafiq_core::time::now_local(self.tz())
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}
