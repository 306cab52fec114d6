// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion pipeline: translate → chunk → contextual enrichment →
//! parallel embed + fact extraction → serialised graph upserts, plus the
//! re-upload flow with section-link snapshot/restore.

use std::collections::HashSet;
use std::sync::Arc;

use rafiq_config::RafiqConfig;
use rafiq_core::{ExtractedFacts, IngestSummary, RafiqError};
use rafiq_graph::GraphService;
use rafiq_llm::LlmGateway;
use rafiq_vector::{PointPayload, VectorStore};
use tracing::{info, warn};

use crate::chunker::{chunk_text, count_tokens};
use crate::ner::NerService;

/// Inputs to one ingestion call.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub text: String,
    pub source_type: String,
    pub tags: Vec<String>,
    pub topic: Option<String>,
    pub session_id: Option<String>,
    pub file_hash: Option<String>,
    /// Active project for auto-linking extracted entities.
    pub active_project: Option<String>,
}

/// The ingestion pipeline singleton.
#[derive(Clone)]
pub struct IngestionPipeline {
    llm: LlmGateway,
    vector: VectorStore,
    graph: GraphService,
    ner: Arc<NerService>,
    config: Arc<RafiqConfig>,
}

impl IngestionPipeline {
    pub fn new(
        llm: LlmGateway,
        vector: VectorStore,
        graph: GraphService,
        ner: Arc<NerService>,
        config: Arc<RafiqConfig>,
    ) -> Self {
        Self {
            llm,
            vector,
            graph,
            ner,
            config,
        }
    }

    pub fn graph(&self) -> &GraphService {
        &self.graph
    }

    pub fn vector(&self) -> &VectorStore {
        &self.vector
    }

    pub fn llm(&self) -> &LlmGateway {
        &self.llm
    }

    pub fn ner(&self) -> &NerService {
        &self.ner
    }

    /// Full contextual-retrieval ingestion. Chunk enrichment runs in
    /// parallel across chunks; embedding and fact extraction run in
    /// parallel with each other; fact upserts are serialised so entity
    /// resolution stays consistent.
    pub async fn ingest_text(&self, request: IngestRequest) -> Result<IngestSummary, RafiqError> {
        // 1. Translate to the storage language; NER reads the original.
        let ner_hints = self.ner.hints_for(&request.text).await;
        let text_en = self.llm.translate_to_english(&request.text).await?;

        // 2. Chunk for embedding.
        let chunks = chunk_text(
            &text_en,
            self.config.ingest.chunk_max_tokens,
            self.config.ingest.chunk_overlap_tokens,
        );
        if chunks.is_empty() {
            return Ok(IngestSummary::default());
        }

        // 3 + 4. Enrich + embed concurrently with fact extraction.
        let embed_branch = self.enrich_and_store_chunks(&chunks, &text_en, &request);
        let extract_branch = self.extract_and_store_facts(&text_en, &ner_hints, &request);
        let (chunks_stored, extraction) = tokio::join!(embed_branch, extract_branch);
        let chunks_stored = chunks_stored?;
        let (facts_extracted, entities) = extraction?;

        Ok(IngestSummary {
            chunks_stored,
            facts_extracted,
            entities,
        })
    }

    /// Contextual enrichment (parallel per chunk, falling back to the raw
    /// chunk on failure) followed by one batch embed + upsert.
    async fn enrich_and_store_chunks(
        &self,
        chunks: &[String],
        full_doc: &str,
        request: &IngestRequest,
    ) -> Result<usize, RafiqError> {
        let enrichments = chunks.iter().map(|chunk| async move {
            match self.llm.add_context_to_chunk(chunk, full_doc).await {
                Ok(enriched) if !enriched.is_empty() => enriched,
                Ok(_) => chunk.clone(),
                Err(e) => {
                    warn!(error = %e, "chunk enrichment failed, using raw chunk");
                    chunk.clone()
                }
            }
        });
        let enriched: Vec<String> = futures::future::join_all(enrichments).await;

        let original_ar: String = request.text.chars().take(500).collect();
        let payloads: Vec<PointPayload> = enriched
            .iter()
            .map(|_| PointPayload {
                source_type: Some(request.source_type.clone()),
                topic: request.topic.clone(),
                tags: request.tags.clone(),
                session_id: request.session_id.clone(),
                file_hash: request.file_hash.clone(),
                original_text_ar: Some(original_ar.clone()),
                ..Default::default()
            })
            .collect();

        self.vector.upsert_chunks(&enriched, payloads).await
    }

    /// Fact extraction over the larger extraction window. Large documents
    /// extract per chunk in parallel, then merge with (type, name) dedup.
    async fn extract_and_store_facts(
        &self,
        text_en: &str,
        ner_hints: &str,
        request: &IngestRequest,
    ) -> Result<(usize, Vec<rafiq_core::ExtractedEntity>), RafiqError> {
        let extract_window = self.config.ingest.extract_chunk_tokens;
        let facts = if count_tokens(text_en) <= extract_window {
            self.llm.extract_facts(text_en, ner_hints).await?
        } else {
            let chunks = chunk_text(text_en, extract_window, 200);
            info!(chunks = chunks.len(), "large text split for extraction");
            let extractions = chunks
                .iter()
                .map(|chunk| self.llm.extract_facts(chunk, ner_hints));
            let results = futures::future::join_all(extractions).await;

            let mut seen: HashSet<(String, String)> = HashSet::new();
            let mut merged = ExtractedFacts::default();
            for result in results {
                for entity in result?.entities {
                    let key = (entity.entity_type.clone(), entity.entity_name.clone());
                    if seen.insert(key) {
                        merged.entities.push(entity);
                    }
                }
            }
            merged
        };

        if facts.entities.is_empty() {
            info!("extraction produced no entities");
            return Ok((0, Vec::new()));
        }

        let count = self
            .graph
            .upsert_from_facts(
                &facts,
                request.file_hash.as_deref(),
                request.active_project.as_deref(),
            )
            .await?;
        Ok((count, facts.entities))
    }

    /// Re-upload of a known filename with different content:
    /// snapshot section links → delete old vector points → delete
    /// sole-provenance entities → ingest the new text → SUPERSEDES edge →
    /// restore section links by normalised name.
    pub async fn reingest_superseding(
        &self,
        old_hash: &str,
        request: IngestRequest,
    ) -> Result<IngestSummary, RafiqError> {
        let new_hash = request
            .file_hash
            .clone()
            .ok_or_else(|| RafiqError::Internal("reingest requires a file hash".into()))?;

        let section_map = self.graph.get_file_section_map(old_hash).await?;
        info!(
            old = &old_hash[..old_hash.len().min(12)],
            sections = section_map.len(),
            "snapshotted section links before re-upload"
        );

        self.vector.delete_by_file_hash(old_hash).await?;
        self.graph.cleanup_file_entities(old_hash).await?;

        let summary = self.ingest_text(request).await?;

        self.graph.supersede_file(&new_hash, old_hash).await?;
        self.graph
            .restore_section_links(&new_hash, &section_map)
            .await?;

        Ok(summary)
    }
}
