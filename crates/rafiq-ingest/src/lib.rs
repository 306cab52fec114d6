// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion for the Rafiq assistant: the contextual-retrieval pipeline,
//! the file processor, URL ingestion, NER hints, and barcode scanning.

pub mod barcode;
pub mod chunker;
pub mod files;
pub mod ner;
pub mod pipeline;
pub mod url;

pub use files::{AsrClient, FileProcessor, PdfClient};
pub use ner::NerService;
pub use pipeline::{IngestRequest, IngestionPipeline};

use std::sync::Arc;

use rafiq_config::RafiqConfig;
use rafiq_graph::GraphService;
use rafiq_llm::LlmGateway;
use rafiq_vector::VectorStore;

/// Builds the pipeline and file processor from configuration.
pub fn build_ingestion(
    config: Arc<RafiqConfig>,
    llm: LlmGateway,
    vector: VectorStore,
    graph: GraphService,
) -> (IngestionPipeline, Arc<FileProcessor>) {
    let ner = Arc::new(NerService::new(
        config.ner.enabled,
        config.ner.base_url.clone(),
        config.ner.min_confidence,
    ));
    let pipeline = IngestionPipeline::new(llm, vector, graph, ner, config.clone());
    let processor = Arc::new(FileProcessor::new(
        pipeline.clone(),
        AsrClient::new(config.asr.base_url.clone(), config.asr.language.clone()),
        PdfClient::new(config.pdf.base_url.clone()),
        config,
    ));
    (pipeline, processor)
}
