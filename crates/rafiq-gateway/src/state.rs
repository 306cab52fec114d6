// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state for axum request handlers.

use std::sync::Arc;

use rafiq_agent::{Orchestrator, Services};
use rafiq_config::RafiqConfig;
use rafiq_ingest::{FileProcessor, IngestionPipeline};
use rafiq_scheduler::BackupService;

/// Cloneable handler state; every field is an `Arc` or internally pooled.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub pipeline: IngestionPipeline,
    pub files: Arc<FileProcessor>,
    pub backup: Arc<BackupService>,
    pub config: Arc<RafiqConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    /// The service bundle behind the orchestrator.
    pub fn services(&self) -> &Arc<Services> {
        self.orchestrator.services()
    }
}
