// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The file processor: classify an uploaded artefact, extract its text
//! (vision for images, markdown/vision for PDFs, ASR for audio), and feed
//! the result into the ingestion pipeline with provenance and re-upload
//! handling.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use rafiq_core::RafiqError;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::barcode::scan_barcodes;
use crate::pipeline::{IngestRequest, IngestionPipeline};

const IMAGE_MIMES: [&str; 5] = ["image/jpeg", "image/png", "image/webp", "image/gif", "image/bmp"];
const AUDIO_MIMES: [&str; 10] = [
    "audio/mpeg", "audio/mp3", "audio/wav", "audio/x-wav", "audio/ogg",
    "audio/flac", "audio/m4a", "audio/mp4", "audio/x-m4a", "audio/aac",
];
const AUDIO_EXTS: [&str; 6] = [".mp3", ".wav", ".ogg", ".flac", ".m4a", ".aac"];

/// Minimum extracted PDF text before the vision fallback kicks in.
const MIN_PDF_TEXT_CHARS: usize = 200;

/// sha256 hex digest of raw file bytes.
pub fn file_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Extension guessed from a MIME type when the filename has none.
pub fn guess_ext(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "application/pdf" => ".pdf",
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/ogg" => ".ogg",
        "audio/flac" => ".flac",
        "audio/m4a" | "audio/mp4" | "audio/x-m4a" => ".m4a",
        "audio/aac" => ".aac",
        _ => ".bin",
    }
}

/// Decodes text bytes: utf-8, then cp1256 (Arabic Windows), then latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1256.decode(bytes);
    if !had_errors {
        return decoded.into_owned();
    }
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}

/// Renders a vision analysis JSON into bilingual readable text for
/// ingestion. Arabic names and reference numbers are carried verbatim.
pub fn analysis_to_text(analysis: &Value, file_type: &str, filename: &str) -> String {
    let mut parts = vec![format!("File: {filename} (type: {file_type})")];
    let s = |key: &str| analysis[key].as_str().unwrap_or("").to_string();

    match file_type {
        "invoice" | "price_list" => {
            let vendor = analysis["vendor"].as_str().unwrap_or("Unknown");
            let total = &analysis["total_amount"];
            let currency = analysis["currency"].as_str().unwrap_or("SAR");
            let date = analysis["date"].as_str().unwrap_or("N/A");
            parts.push(format!("Invoice from {vendor}, date: {date}, total: {total} {currency}"));
            if let Some(items) = analysis["items"].as_array() {
                if !items.is_empty() {
                    parts.push("Items:".into());
                    for item in items {
                        parts.push(format!(
                            "  - {}: {} {currency}",
                            item["name"].as_str().unwrap_or("?"),
                            item["price"]
                        ));
                    }
                }
            }
        }
        "business_card" => {
            parts.push(format!(
                "Business card: {}, {} at {}",
                s("name"),
                s("title"),
                s("company")
            ));
            let name_ar = s("name_ar");
            if !name_ar.is_empty() {
                parts.push(format!("name_ar: {name_ar}"));
            }
            for key in ["phone", "email"] {
                let v = s(key);
                if !v.is_empty() {
                    parts.push(format!("{key}: {v}"));
                }
            }
        }
        "personal_photo" => {
            parts.push(format!("Photo description: {}", s("description")));
            if let Some(tags) = analysis["tags"].as_array() {
                let tags: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
                if !tags.is_empty() {
                    parts.push(format!("Tags: {}", tags.join(", ")));
                }
            }
        }
        "inventory_item" => {
            parts.push(format!("Inventory item: {}", s("item_name")));
            for key in ["brand", "category", "condition", "description"] {
                let v = s(key);
                if !v.is_empty() {
                    parts.push(format!("{}: {v}", capitalise(key)));
                }
            }
            if let Some(qty) = analysis["quantity_visible"].as_i64() {
                if qty > 1 {
                    parts.push(format!("Quantity: {qty}"));
                }
            }
            if let Some(specs) = analysis["specifications"].as_array() {
                let specs: Vec<String> = specs.iter().map(render_scalar).collect();
                if !specs.is_empty() {
                    parts.push(format!("Specs: {}", specs.join(", ")));
                }
            }
        }
        "official_document" => {
            parts.push(format!(
                "Document type: {}, title: {}",
                s("document_type"),
                s("title")
            ));
            for key in ["summary", "text_content"] {
                let v = s(key);
                if !v.is_empty() {
                    parts.push(format!("{}: {v}", capitalise(key)));
                }
            }
            for key in ["dates", "reference_numbers"] {
                if let Some(map) = analysis[key].as_object() {
                    let entries: Vec<String> = map
                        .iter()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, v)| format!("{k}: {}", render_scalar(v)))
                        .collect();
                    if !entries.is_empty() {
                        parts.push(format!("{}: {}", capitalise(key), entries.join(", ")));
                    }
                }
            }
            if let Some(parties) = analysis["parties"].as_array() {
                let parties: Vec<String> = parties.iter().map(render_scalar).collect();
                if !parties.is_empty() {
                    parts.push(format!("Parties: {}", parties.join(", ")));
                }
            }
            if let Some(members) = analysis["members"].as_array() {
                for member in members {
                    let mut fields = Vec::new();
                    // Vision reads Arabic names off documents; keep the
                    // surface form under name_ar so extraction stores both.
                    let name = member["name"].as_str().unwrap_or("");
                    if !name.is_empty() {
                        fields.push(format!("name_ar: {name}"));
                    }
                    if let Some(role) = member["role"].as_str() {
                        if !role.is_empty() {
                            fields.push(format!("role: {role}"));
                        }
                    }
                    if let Some(dob) = member["date_of_birth"].as_str() {
                        if !dob.is_empty() {
                            fields.push(format!("born: {dob}"));
                        }
                    }
                    if let Some(id) = member["id_number"].as_str() {
                        if !id.is_empty() {
                            fields.push(format!("ID: {id}"));
                        }
                    }
                    if !fields.is_empty() {
                        parts.push(format!("Member: {}", fields.join(", ")));
                    }
                }
            }
        }
        _ => {
            if let Some(map) = analysis.as_object() {
                for (k, v) in map {
                    if v.is_null() || k == "error" || k == "raw" {
                        continue;
                    }
                    match v {
                        Value::Array(items) => {
                            let items: Vec<String> = items.iter().map(render_scalar).collect();
                            if !items.is_empty() {
                                parts.push(format!("{k}: {}", items.join(", ")));
                            }
                        }
                        other => {
                            let rendered = render_scalar(other);
                            if !rendered.is_empty() {
                                parts.push(format!("{k}: {rendered}"));
                            }
                        }
                    }
                }
            }
        }
    }

    parts.join("\n")
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn render_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Client for the ASR transcription endpoint; calls are serialised through
/// a single-flight lock (the backend is GPU-bound).
pub struct AsrClient {
    client: reqwest::Client,
    base_url: String,
    language: String,
    flight: Mutex<()>,
}

impl AsrClient {
    pub fn new(base_url: String, language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            language,
            flight: Mutex::new(()),
        }
    }

    pub async fn transcribe(&self, bytes: Vec<u8>, filename: &str) -> Result<String, RafiqError> {
        let _guard = self.flight.lock().await;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", self.language.clone());
        let response = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RafiqError::backend("asr", e))?;
        if !response.status().is_success() {
            return Err(RafiqError::backend_msg(
                "asr",
                format!("ASR returned {}", response.status()),
            ));
        }
        let body: Value = response.json().await.map_err(|e| RafiqError::backend("asr", e))?;
        Ok(body["text"].as_str().unwrap_or_default().trim().to_string())
    }
}

/// Client for the PDF converter endpoint: markdown extraction plus page
/// rendering for the vision fallback.
pub struct PdfClient {
    client: reqwest::Client,
    base_url: String,
}

impl PdfClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn to_markdown(&self, bytes: Vec<u8>, filename: &str) -> Result<String, RafiqError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(format!("{}/convert", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RafiqError::backend("pdf", e))?;
        if !response.status().is_success() {
            return Err(RafiqError::backend_msg(
                "pdf",
                format!("converter returned {}", response.status()),
            ));
        }
        response.text().await.map_err(|e| RafiqError::backend("pdf", e))
    }

    /// Renders up to `max_pages` pages as base64 PNGs.
    pub async fn render_pages(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        dpi: u32,
        max_pages: usize,
    ) -> Result<Vec<String>, RafiqError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(format!(
                "{}/render?dpi={dpi}&max_pages={max_pages}",
                self.base_url
            ))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RafiqError::backend("pdf", e))?;
        if !response.status().is_success() {
            return Err(RafiqError::backend_msg(
                "pdf",
                format!("renderer returned {}", response.status()),
            ));
        }
        let body: Value = response.json().await.map_err(|e| RafiqError::backend("pdf", e))?;
        Ok(body["pages"]
            .as_array()
            .map(|pages| {
                pages
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Routes an uploaded artefact to its processor and into ingestion.
pub struct FileProcessor {
    pipeline: IngestionPipeline,
    asr: AsrClient,
    pdf: PdfClient,
    config: Arc<rafiq_config::RafiqConfig>,
}

impl FileProcessor {
    pub fn new(
        pipeline: IngestionPipeline,
        asr: AsrClient,
        pdf: PdfClient,
        config: Arc<rafiq_config::RafiqConfig>,
    ) -> Self {
        Self {
            pipeline,
            asr,
            pdf,
            config,
        }
    }

    /// Path for stored file bytes: `data/files/{hash[:2]}/{hash}{ext}`.
    pub fn storage_path(&self, hash: &str, ext: &str) -> PathBuf {
        PathBuf::from(&self.config.ingest.file_storage_path)
            .join(&hash[..2])
            .join(format!("{hash}{ext}"))
    }

    async fn save_file(&self, bytes: &[u8], hash: &str, ext: &str) -> Result<PathBuf, RafiqError> {
        let path = self.storage_path(hash, ext);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RafiqError::backend("fs", e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| RafiqError::backend("fs", e))?;
        Ok(path)
    }

    /// Reads stored bytes back by hash (download endpoint).
    pub async fn load_file(&self, hash: &str) -> Result<Vec<u8>, RafiqError> {
        let dir = PathBuf::from(&self.config.ingest.file_storage_path).join(&hash[..2.min(hash.len())]);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|_| RafiqError::NotFound(format!("file {hash} not stored")))?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(hash) {
                return tokio::fs::read(entry.path())
                    .await
                    .map_err(|e| RafiqError::backend("fs", e));
            }
        }
        Err(RafiqError::NotFound(format!("file {hash} not stored")))
    }

    /// Processes an upload end to end. Identical bytes return
    /// `{status: "duplicate"}` without any work; a same-name upload with a
    /// different hash goes through the supersede flow.
    pub async fn process_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        user_context: &str,
        tags: Vec<String>,
        topic: Option<String>,
    ) -> Result<Value, RafiqError> {
        let hash = file_hash(&bytes);
        let ext = std::path::Path::new(filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_else(|| guess_ext(content_type).to_string());

        // Bit-exact duplicate: no work.
        if let Some(existing) = self.pipeline.graph().find_file_by_hash(&hash).await? {
            info!(filename, hash = &hash[..12], "duplicate upload skipped");
            return Ok(json!({
                "status": "duplicate",
                "filename": filename,
                "file_type": existing["file_type"],
                "file_hash": hash,
                "chunks_stored": 0,
                "facts_extracted": 0,
                "processing_steps": ["duplicate_skipped"],
            }));
        }

        // Same filename, different content: remember the old hash for the
        // supersede flow after the new text is known.
        let old_hash = self
            .pipeline
            .graph()
            .find_file_by_filename(filename)
            .await?
            .and_then(|f| f["file_hash"].as_str().map(str::to_string))
            .filter(|old| old != &hash);

        let path = self.save_file(&bytes, &hash, &ext).await?;
        let mut steps = vec![format!("saved:{}", path.display())];

        let size = bytes.len() as i64;
        let is_image = IMAGE_MIMES.contains(&content_type);
        let is_pdf = content_type == "application/pdf" || ext == ".pdf";
        let is_audio =
            AUDIO_MIMES.contains(&content_type) || AUDIO_EXTS.contains(&ext.as_str());

        if is_image {
            self.process_image(
                bytes, filename, content_type, &hash, old_hash, user_context, tags, topic, size,
                &mut steps,
            )
            .await
        } else if is_pdf {
            self.process_pdf(bytes, filename, &hash, old_hash, user_context, tags, topic, size, &mut steps)
                .await
        } else if is_audio {
            self.process_audio(bytes, filename, &hash, size, &mut steps).await
        } else if content_type.starts_with("text/") || ext == ".txt" || ext == ".md" {
            let text = decode_text(&bytes);
            steps.push(format!("text_decoded:{}chars", text.chars().count()));
            self.ingest_extracted(
                text, filename, "file_note", &hash, old_hash, "note", "", content_type, size, tags,
                topic, steps,
            )
            .await
        } else {
            Ok(json!({
                "status": "error",
                "filename": filename,
                "file_hash": hash,
                "chunks_stored": 0,
                "facts_extracted": 0,
                "processing_steps": ([steps, vec!["unsupported_content_type".to_string()]].concat()),
            }))
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        hash: &str,
        old_hash: Option<String>,
        user_context: &str,
        tags: Vec<String>,
        topic: Option<String>,
        size: i64,
        steps: &mut Vec<String>,
    ) -> Result<Value, RafiqError> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
        steps.push("base64_encoded".into());

        let classification = self.pipeline.llm().classify_file(&image_b64, content_type).await?;
        let file_type = classification["file_type"]
            .as_str()
            .unwrap_or("info_image")
            .to_string();
        steps.push(format!("classified:{file_type}"));

        let analysis = self
            .pipeline
            .llm()
            .analyze_image(&image_b64, &file_type, content_type, user_context)
            .await?;
        steps.push("analyzed".into());

        let text = analysis_to_text(&analysis, &file_type, filename);
        let description = classification["brief_description"].as_str().unwrap_or("");
        let mut result = self
            .ingest_extracted(
                text,
                filename,
                &format!("file_{file_type}"),
                hash,
                old_hash,
                &file_type,
                description,
                content_type,
                size,
                tags,
                topic,
                steps.clone(),
            )
            .await?;
        result["analysis"] = analysis.clone();

        // Invoice: auto-create the expense when a positive total parsed.
        if file_type == "invoice" {
            let total = analysis["total_amount"]
                .as_f64()
                .or_else(|| analysis["total_amount"].as_str().and_then(|s| s.parse().ok()))
                .unwrap_or(0.0);
            if total > 0.0 {
                match self
                    .pipeline
                    .graph()
                    .create_expense_from_invoice(&analysis, hash)
                    .await
                {
                    Ok(expense) => {
                        result["auto_expense"] = expense;
                        push_step(&mut result, &format!("auto_expense:{total}SAR"));
                    }
                    Err(e) => warn!(error = %e, "auto-expense creation failed"),
                }
            }
        }

        // Inventory photo: barcode scan, auto-item, similar-item warning.
        if file_type == "inventory_item" {
            let barcodes = scan_barcodes(&bytes);
            let barcode = barcodes.first();
            if let Some(code) = barcode {
                push_step(&mut result, &format!("barcode:{}:{}", code.format, code.data));
            }

            let item_name = analysis["item_name"].as_str().unwrap_or("").to_string();
            if !item_name.is_empty() {
                let mut props = serde_json::Map::new();
                for key in ["brand", "description", "category", "condition"] {
                    if let Some(v) = analysis[key].as_str() {
                        if !v.is_empty() {
                            props.insert(key.into(), json!(v));
                        }
                    }
                }
                props.insert(
                    "quantity".into(),
                    json!(analysis["quantity_visible"].as_i64().unwrap_or(1)),
                );
                props.insert("file_hash".into(), json!(hash));
                // The caption is the storage location by convention.
                if !user_context.trim().is_empty() {
                    props.insert("location".into(), json!(user_context.trim()));
                }
                if let Some(code) = barcode {
                    props.insert("barcode".into(), json!(code.data));
                    props.insert("barcode_type".into(), json!(code.format));
                }
                match self.pipeline.graph().upsert_item(&item_name, "set", props).await {
                    Ok(item) => {
                        result["auto_item"] = item;
                        push_step(&mut result, &format!("auto_item:{item_name}"));
                    }
                    Err(e) => warn!(error = %e, "auto-item creation failed"),
                }
            }

            // Similar-inventory warning via vector search.
            let description = analysis["description"].as_str().unwrap_or("");
            let item_desc = format!("{item_name} {description}").trim().to_string();
            if !item_desc.is_empty() {
                match self
                    .pipeline
                    .vector()
                    .search(
                        &item_desc,
                        5,
                        &rafiq_vector::SearchFilters::source("file_inventory_item"),
                    )
                    .await
                {
                    Ok(hits) => {
                        let current = item_name.to_lowercase();
                        let similar: Vec<Value> = hits
                            .iter()
                            .filter(|h| {
                                let head: String =
                                    h.text.to_lowercase().chars().take(100).collect();
                                h.score >= 0.5 && !head.contains(&current)
                            })
                            .take(3)
                            .map(|h| {
                                json!({
                                    "text": h.text.chars().take(200).collect::<String>(),
                                    "score": (h.score * 100.0).round() / 100.0,
                                })
                            })
                            .collect();
                        if !similar.is_empty() {
                            result["similar_items"] = json!(similar);
                        }
                    }
                    Err(e) => debug!(error = %e, "similar item search failed"),
                }
            }
        }

        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_pdf(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        hash: &str,
        old_hash: Option<String>,
        user_context: &str,
        tags: Vec<String>,
        topic: Option<String>,
        size: i64,
        steps: &mut Vec<String>,
    ) -> Result<Value, RafiqError> {
        let mut text = match self.pdf.to_markdown(bytes.clone(), filename).await {
            Ok(md) => {
                steps.push(format!("pdf_extracted:{}chars", md.chars().count()));
                md
            }
            Err(e) => {
                warn!(filename, error = %e, "PDF extraction failed");
                String::new()
            }
        };

        // Scanned PDFs: render pages and read them with vision, in parallel.
        if text.trim().chars().count() < MIN_PDF_TEXT_CHARS {
            steps.push(format!("pdf_text_short:{}chars", text.trim().chars().count()));
            let pages = self
                .pdf
                .render_pages(
                    bytes,
                    filename,
                    self.config.pdf.vision_dpi,
                    self.config.pdf.vision_max_pages,
                )
                .await
                .unwrap_or_default();
            if !pages.is_empty() {
                let analyses = pages.iter().enumerate().map(|(i, page_b64)| async move {
                    let analysis = self
                        .pipeline
                        .llm()
                        .analyze_image(page_b64, "official_document", "image/png", user_context)
                        .await
                        .unwrap_or_else(|_| json!({}));
                    let page_text = analysis_to_text(&analysis, "official_document", filename);
                    (i, page_text)
                });
                let mut results: Vec<(usize, String)> =
                    futures::future::join_all(analyses).await;
                results.sort_by_key(|(i, _)| *i);
                let combined: Vec<String> = results
                    .into_iter()
                    .filter(|(_, t)| !t.is_empty())
                    .map(|(i, t)| format!("[Page {}]\n{t}", i + 1))
                    .collect();
                if !combined.is_empty() {
                    steps.push(format!("vision_fallback:{}pages", combined.len()));
                    text = combined.join("\n\n");
                }
            }
        }

        if text.trim().is_empty() {
            return Ok(json!({
                "status": "error",
                "filename": filename,
                "file_type": "pdf_document",
                "file_hash": hash,
                "chunks_stored": 0,
                "facts_extracted": 0,
                "processing_steps": ([steps.clone(), vec!["pdf_empty".to_string()]].concat()),
            }));
        }

        if !user_context.is_empty() {
            text = format!("[User context: {user_context}]\n\n{text}");
        }

        self.ingest_extracted(
            text,
            filename,
            "file_pdf_document",
            hash,
            old_hash,
            "pdf_document",
            &format!("PDF document: {filename}"),
            "application/pdf",
            size,
            tags,
            topic,
            steps.clone(),
        )
        .await
    }

    async fn process_audio(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        hash: &str,
        size: i64,
        steps: &mut Vec<String>,
    ) -> Result<Value, RafiqError> {
        let transcript = self.asr.transcribe(bytes, filename).await?;
        if transcript.is_empty() {
            return Ok(json!({
                "status": "error",
                "filename": filename,
                "file_type": "audio_recording",
                "file_hash": hash,
                "chunks_stored": 0,
                "facts_extracted": 0,
                "processing_steps": ([steps.clone(), vec!["audio_empty".to_string()]].concat()),
            }));
        }
        steps.push(format!("transcribed:{}chars", transcript.chars().count()));

        // Transcription only: the caller routes the transcript through chat
        // so storage and extraction happen in post-processing.
        self.pipeline
            .graph()
            .upsert_file_node(hash, filename, "audio_recording", "", "audio", size)
            .await?;
        steps.push("transcription_only".into());

        Ok(json!({
            "status": "ok",
            "filename": filename,
            "file_type": "audio_recording",
            "file_hash": hash,
            "analysis": {"text_length": transcript.chars().count(), "preview": transcript},
            "chunks_stored": 0,
            "facts_extracted": 0,
            "processing_steps": steps.clone(),
        }))
    }

    /// Shared tail for extracted text: stub the File node, run ingestion
    /// (superseding an older version when needed), store the full node.
    #[allow(clippy::too_many_arguments)]
    async fn ingest_extracted(
        &self,
        text: String,
        filename: &str,
        source_type: &str,
        hash: &str,
        old_hash: Option<String>,
        file_type: &str,
        description: &str,
        mime: &str,
        size: i64,
        tags: Vec<String>,
        topic: Option<String>,
        mut steps: Vec<String>,
    ) -> Result<Value, RafiqError> {
        // Provenance edges MATCH, not MERGE, on the File node: the stub
        // must exist before any entity links to it.
        self.pipeline.graph().ensure_file_stub(hash, filename).await?;

        let request = IngestRequest {
            text,
            source_type: source_type.to_string(),
            tags,
            topic,
            session_id: None,
            file_hash: Some(hash.to_string()),
            active_project: None,
        };
        let summary = match old_hash {
            Some(ref old) => {
                steps.push(format!("superseding:{}", &old[..old.len().min(12)]));
                self.pipeline.reingest_superseding(old, request).await?
            }
            None => self.pipeline.ingest_text(request).await?,
        };
        steps.push(format!("ingested:{}chunks", summary.chunks_stored));

        self.pipeline
            .graph()
            .upsert_file_node(hash, filename, file_type, description, mime, size)
            .await?;
        steps.push("graph_node_created".into());

        Ok(json!({
            "status": "ok",
            "filename": filename,
            "file_type": file_type,
            "file_hash": hash,
            "analysis": {},
            "chunks_stored": summary.chunks_stored,
            "facts_extracted": summary.facts_extracted,
            "entities": summary.entities,
            "processing_steps": steps,
        }))
    }
}

fn push_step(result: &mut Value, step: &str) {
    if let Some(steps) = result["processing_steps"].as_array_mut() {
        steps.push(json!(step));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_sha256() {
        let h = file_hash(b"hello");
        assert_eq!(h, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
        assert_eq!(file_hash(b"hello"), h);
        assert_ne!(file_hash(b"hello!"), h);
    }

    #[test]
    fn ext_guessing() {
        assert_eq!(guess_ext("image/jpeg"), ".jpg");
        assert_eq!(guess_ext("application/pdf"), ".pdf");
        assert_eq!(guess_ext("application/unknown"), ".bin");
    }

    #[test]
    fn text_decoding_falls_back_from_utf8() {
        assert_eq!(decode_text("نص عربي".as_bytes()), "نص عربي");
        // cp1256-encoded Arabic letter (0xC7 = ا).
        let decoded = decode_text(&[0xC7, 0xE1]);
        assert!(!decoded.is_empty());
        assert!(decoded.chars().all(|c| c != '\u{FFFD}'));
    }

    #[test]
    fn invoice_analysis_renders_items() {
        let analysis = json!({
            "vendor": "Tamimi",
            "date": "2026-02-11",
            "total_amount": 145.5,
            "currency": "SAR",
            "items": [{"name": "rice", "price": 45}, {"name": "chicken", "price": 100.5}]
        });
        let text = analysis_to_text(&analysis, "invoice", "receipt.jpg");
        assert!(text.contains("File: receipt.jpg (type: invoice)"));
        assert!(text.contains("Invoice from Tamimi, date: 2026-02-11, total: 145.5 SAR"));
        assert!(text.contains("  - rice: 45 SAR"));
    }

    #[test]
    fn official_document_preserves_arabic_names_and_refs() {
        let analysis = json!({
            "document_type": "family card",
            "title": "سجل الأسرة",
            "summary": "Family registry document",
            "reference_numbers": {"registry": "1044553321"},
            "members": [
                {"name": "محمد عبدالله", "role": "head", "date_of_birth": "1405-07-15", "id_number": "1088" }
            ]
        });
        let text = analysis_to_text(&analysis, "official_document", "family.jpg");
        assert!(text.contains("name_ar: محمد عبدالله"));
        assert!(text.contains("registry: 1044553321"));
        assert!(text.contains("born: 1405-07-15"));
    }

    #[test]
    fn generic_analysis_dumps_fields() {
        let analysis = json!({"description": "whiteboard sketch", "tags": ["planning"], "error": "x"});
        let text = analysis_to_text(&analysis, "info_image", "board.png");
        assert!(text.contains("description: whiteboard sketch"));
        assert!(text.contains("tags: planning"));
        assert!(!text.contains("error"));
    }
}
