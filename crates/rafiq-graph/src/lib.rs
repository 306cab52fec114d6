// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge-graph service for the Rafiq assistant.
//!
//! Entity-typed store over a Cypher graph: typed upserts with entity
//! resolution, domain queries (financial, reminders, projects, tasks,
//! knowledge, inventory, lists, sections, sprints, focus), multi-hop
//! context retrieval, and file-provenance bookkeeping with bit-exact
//! re-upload semantics.

pub mod client;
pub mod context;
pub mod cypher;
pub mod entities;
pub mod facts;
pub mod financial;
pub mod inventory;
pub mod lists;
pub mod normalize;
pub mod productivity;
pub mod projects;
pub mod provenance;
pub mod queries;
pub mod reminders;
pub mod resolve;
pub mod tasks;

use std::sync::Arc;

use dashmap::DashMap;
use rafiq_config::RafiqConfig;
use rafiq_core::RafiqError;
use rafiq_vector::VectorStore;
use tokio::sync::Mutex;

pub use client::GraphClient;
pub use cypher::{clean_props, display_name, key_field};

/// The graph service singleton. Safe to call concurrently; entity
/// resolution serialises per normalised name internally.
#[derive(Clone)]
pub struct GraphService {
    pub(crate) client: GraphClient,
    pub(crate) vector: VectorStore,
    pub(crate) config: Arc<RafiqConfig>,
    /// Per-normalised-name locks for concurrent resolution of the same name.
    pub(crate) resolution_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl GraphService {
    pub fn new(client: GraphClient, vector: VectorStore, config: Arc<RafiqConfig>) -> Self {
        Self {
            client,
            vector,
            config,
            resolution_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    pub(crate) fn tz(&self) -> i32 {
        self.config.server.timezone_offset_hours
    }

    pub(crate) fn now(&self) -> String {
        rafiq_core::time::now_iso(self.tz())
    }

    pub(crate) fn today(&self) -> String {
        rafiq_core::time::today(self.tz())
    }
}

/// Connects the Bolt client and builds the service.
pub async fn build_service(
    config: Arc<RafiqConfig>,
    vector: VectorStore,
) -> Result<GraphService, RafiqError> {
    let client = GraphClient::connect(
        &config.graph.uri,
        &config.graph.user,
        &config.graph.password,
    )
    .await?;
    Ok(GraphService::new(client, vector, config))
}
