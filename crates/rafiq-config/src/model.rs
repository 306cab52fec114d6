// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model for all Rafiq services.
//!
//! Every field has a compiled default so a bare `rafiq serve` works against
//! local backends; TOML files and `RAFIQ_*` environment variables override.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RafiqConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector: VectorConfig,
    pub graph: GraphConfig,
    pub memory: MemoryConfig,
    pub chat: ChatConfig,
    pub resolution: ResolutionConfig,
    pub ingest: IngestConfig,
    pub ner: NerConfig,
    pub asr: AsrConfig,
    pub pdf: PdfConfig,
    pub proactive: ProactiveConfig,
    pub productivity: ProductivityConfig,
    pub inventory: InventoryConfig,
    pub prayer: PrayerConfig,
    pub backup: BackupConfig,
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Fixed user timezone as whole hours east of UTC (3 = Asia/Riyadh).
    pub timezone_offset_hours: i32,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8500,
            timezone_offset_hours: 3,
            log_level: "info".into(),
        }
    }
}

/// OpenAI-compatible generative model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".into(),
            model: "Qwen/Qwen3-32B".into(),
            timeout_seconds: 60,
        }
    }
}

/// OpenAI-compatible embeddings endpoint (BGE-M3 class model).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".into(),
            model: "BAAI/bge-m3".into(),
            dimension: 1024,
        }
    }
}

/// Qdrant REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub base_url: String,
    pub collection: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".into(),
            collection: "personal_life".into(),
        }
    }
}

/// Bolt graph database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "neo4j".into(),
        }
    }
}

/// Redis-backed memory layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub redis_url: String,
    /// Number of turns kept in working memory (pairs, so the list holds 2x).
    pub working_memory_size: usize,
    pub daily_summary_ttl_days: u64,
    /// Working-memory length that triggers compression.
    pub compress_threshold: usize,
    /// Turns kept verbatim after compression.
    pub compress_keep_recent: usize,
    /// TTL for delete/cancel confirmations.
    pub confirmation_ttl_seconds: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6380/0".into(),
            working_memory_size: 4,
            daily_summary_ttl_days: 7,
            compress_threshold: 15,
            compress_keep_recent: 4,
            confirmation_ttl_seconds: 300,
        }
    }
}

/// Chat-loop cadence knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Every N messages, refresh the daily summary.
    pub daily_summary_interval: u64,
    /// Every M messages, refresh core memory.
    pub core_memory_interval: u64,
    pub self_rag_threshold: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            daily_summary_interval: 10,
            core_memory_interval: 20,
            self_rag_threshold: 0.3,
        }
    }
}

/// Entity-resolution thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub enabled: bool,
    pub person_threshold: f32,
    pub default_threshold: f32,
    pub graph_max_hops: u8,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            person_threshold: 0.85,
            default_threshold: 0.80,
            graph_max_hops: 3,
        }
    }
}

/// Ingestion pipeline sizing and file storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_max_tokens: usize,
    pub chunk_overlap_tokens: usize,
    /// Larger window used for fact extraction.
    pub extract_chunk_tokens: usize,
    pub file_storage_path: String,
    pub max_file_size_mb: u64,
    pub file_timeout_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_max_tokens: 1500,
            chunk_overlap_tokens: 150,
            extract_chunk_tokens: 3000,
            file_storage_path: "data/files".into(),
            max_file_size_mb: 50,
            file_timeout_seconds: 120,
        }
    }
}

/// Arabic NER inference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    pub enabled: bool,
    pub base_url: String,
    pub min_confidence: f32,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:8090".into(),
            min_confidence: 0.7,
        }
    }
}

/// ASR transcription endpoint (GPU-bound; calls are serialised).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    pub base_url: String,
    pub language: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".into(),
            language: "ar".into(),
        }
    }
}

/// PDF → markdown converter endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub base_url: String,
    /// Pages rendered for the vision fallback.
    pub vision_max_pages: usize,
    pub vision_dpi: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9100".into(),
            vision_max_pages: 5,
            vision_dpi: 200,
        }
    }
}

/// Proactive scheduler cadence. Hours are local wall-clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProactiveConfig {
    pub enabled: bool,
    pub api_base_url: String,
    pub morning_hour: u32,
    pub noon_hour: u32,
    pub evening_hour: u32,
    pub reminder_check_minutes: u64,
    pub alert_check_hours: u64,
    pub stalled_days: i64,
    pub old_debt_days: i64,
    /// Wall-clock budget per job run.
    pub job_timeout_seconds: u64,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base_url: "http://127.0.0.1:8500".into(),
            morning_hour: 7,
            noon_hour: 13,
            evening_hour: 21,
            reminder_check_minutes: 30,
            alert_check_hours: 6,
            stalled_days: 14,
            old_debt_days: 30,
            job_timeout_seconds: 120,
        }
    }
}

/// Energy-aware time-blocking and sprint defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductivityConfig {
    pub energy_peak_hours: String,
    pub energy_low_hours: String,
    pub work_day_start: u32,
    pub work_day_end: u32,
    pub default_energy_profile: String,
    pub pomodoro_default_minutes: i64,
    pub time_block_slot_minutes: i64,
    pub sprint_default_weeks: i64,
}

impl Default for ProductivityConfig {
    fn default() -> Self {
        Self {
            energy_peak_hours: "7-12".into(),
            energy_low_hours: "14-16".into(),
            work_day_start: 7,
            work_day_end: 22,
            default_energy_profile: "normal".into(),
            pomodoro_default_minutes: 25,
            time_block_slot_minutes: 30,
            sprint_default_weeks: 2,
        }
    }
}

/// Inventory reporting knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub unused_days: i64,
    pub report_top_n: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            unused_days: 90,
            report_top_n: 10,
        }
    }
}

/// Prayer-time settings carried on reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrayerConfig {
    pub city: String,
    pub country: String,
    pub method: u8,
    pub offset_minutes: i64,
}

impl Default for PrayerConfig {
    fn default() -> Self {
        Self {
            city: "Riyadh".into(),
            country: "Saudi Arabia".into(),
            method: 4,
            offset_minutes: 0,
        }
    }
}

/// Daily backup schedule and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    pub hour: u32,
    pub retention_days: i64,
    pub dir: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 3,
            retention_days: 30,
            dir: "data/backups".into(),
        }
    }
}
