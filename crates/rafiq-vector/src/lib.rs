// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store for the Rafiq assistant: an embeddings endpoint client plus
//! a typed Qdrant REST client, combined behind [`VectorStore`].

pub mod client;
pub mod embedder;
pub mod store;
pub mod types;

pub use client::QdrantClient;
pub use embedder::Embedder;
pub use store::VectorStore;
pub use types::{cosine_similarity, PointPayload, ScrolledPoint, SearchFilters, SearchHit};

use rafiq_config::RafiqConfig;
use rafiq_core::RafiqError;

/// Builds the vector store from configuration.
pub fn build_store(config: &RafiqConfig) -> Result<VectorStore, RafiqError> {
    let client = QdrantClient::new(
        config.vector.base_url.clone(),
        config.vector.collection.clone(),
    )?;
    let embedder = Embedder::new(
        config.embedding.base_url.clone(),
        config.embedding.model.clone(),
        config.embedding.dimension,
    )?;
    Ok(VectorStore::new(
        client,
        embedder,
        config.server.timezone_offset_hours,
    ))
}
