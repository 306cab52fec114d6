// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backup service: snapshot graph, vector, and memory stores to
//! `data/backups/{timestamp}/` and restore them idempotently.

use std::path::{Path, PathBuf};

use rafiq_core::{time, RafiqError};
use rafiq_graph::GraphService;
use rafiq_memory::MemoryStore;
use rafiq_vector::{ScrolledPoint, VectorStore};
use serde_json::{json, Value};
use tracing::{error, info};

/// Backup directory names are `YYYYMMDD_HHMMSS` in local time.
const TIMESTAMP_LEN: usize = 15;

pub struct BackupService {
    graph: GraphService,
    vector: VectorStore,
    memory: MemoryStore,
    backup_dir: PathBuf,
    retention_days: i64,
    tz_offset_hours: i32,
}

impl BackupService {
    pub fn new(
        graph: GraphService,
        vector: VectorStore,
        memory: MemoryStore,
        backup_dir: impl Into<PathBuf>,
        retention_days: i64,
        tz_offset_hours: i32,
    ) -> Self {
        Self {
            graph,
            vector,
            memory,
            backup_dir: backup_dir.into(),
            retention_days,
            tz_offset_hours,
        }
    }

    fn timestamp(&self) -> String {
        time::now_local(self.tz_offset_hours)
            .format("%Y%m%d_%H%M%S")
            .to_string()
    }

    /// Creates a full backup. A failing store is logged and recorded as
    /// zero bytes; the others still land.
    pub async fn create_backup(&self) -> Result<Value, RafiqError> {
        let timestamp = self.timestamp();
        let path = self.backup_dir.join(&timestamp);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| RafiqError::backend("fs", e))?;

        let mut sizes = json!({});

        sizes["graph"] = match self.backup_graph(&path).await {
            Ok(size) => json!(size),
            Err(e) => {
                error!(error = %e, "graph backup failed");
                json!(0)
            }
        };
        sizes["vector"] = match self.backup_vector(&path).await {
            Ok(size) => json!(size),
            Err(e) => {
                error!(error = %e, "vector backup failed");
                json!(0)
            }
        };
        sizes["memory"] = match self.backup_memory(&path).await {
            Ok(size) => json!(size),
            Err(e) => {
                error!(error = %e, "memory backup failed");
                json!(0)
            }
        };

        info!(timestamp = %timestamp, "backup created");
        Ok(json!({
            "timestamp": timestamp,
            "path": path.display().to_string(),
            "sizes": sizes,
        }))
    }

    async fn backup_graph(&self, path: &Path) -> Result<u64, RafiqError> {
        let data = self.graph.export_graph().await?;
        let file = path.join("graph.json");
        let body = serde_json::to_string(&data)
            .map_err(|e| RafiqError::Internal(format!("graph serialisation failed: {e}")))?;
        tokio::fs::write(&file, body)
            .await
            .map_err(|e| RafiqError::backend("fs", e))?;
        Ok(file_size(&file).await)
    }

    async fn backup_vector(&self, path: &Path) -> Result<u64, RafiqError> {
        let points = self.vector.scroll_all().await?;
        info!(points = points.len(), "vector backup scrolled");
        let file = path.join("vector.json");
        let body = serde_json::to_string(&points)
            .map_err(|e| RafiqError::Internal(format!("vector serialisation failed: {e}")))?;
        tokio::fs::write(&file, body)
            .await
            .map_err(|e| RafiqError::backend("fs", e))?;
        Ok(file_size(&file).await)
    }

    async fn backup_memory(&self, path: &Path) -> Result<u64, RafiqError> {
        let dump = self.memory.dump_all().await?;
        info!(keys = dump.len(), "memory backup scanned");
        let file = path.join("memory.json");
        let body = serde_json::to_string(&dump)
            .map_err(|e| RafiqError::Internal(format!("memory serialisation failed: {e}")))?;
        tokio::fs::write(&file, body)
            .await
            .map_err(|e| RafiqError::backend("fs", e))?;
        Ok(file_size(&file).await)
    }

    /// Lists available backups newest-first.
    pub async fn list_backups(&self) -> Result<Vec<Value>, RafiqError> {
        let mut backups = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.backup_dir).await else {
            return Ok(backups);
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.len() != TIMESTAMP_LEN || !entry.path().is_dir() {
                continue;
            }
            let mut total_size = 0u64;
            let mut files = Vec::new();
            if let Ok(mut inner) = tokio::fs::read_dir(entry.path()).await {
                while let Ok(Some(file)) = inner.next_entry().await {
                    if let Ok(meta) = file.metadata().await {
                        total_size += meta.len();
                    }
                    files.push(file.file_name().to_string_lossy().to_string());
                }
            }
            backups.push(json!({
                "timestamp": name,
                "size_bytes": total_size,
                "files": files,
            }));
        }
        backups.sort_by(|a, b| b["timestamp"].as_str().cmp(&a["timestamp"].as_str()));
        Ok(backups)
    }

    /// Restores one backup: MERGE the graph, upsert vector points,
    /// re-apply memory keys with TTLs.
    pub async fn restore_backup(&self, timestamp: &str) -> Result<Value, RafiqError> {
        let path = self.backup_dir.join(timestamp);
        if !path.exists() {
            return Err(RafiqError::NotFound(format!("backup {timestamp} not found")));
        }

        let mut restored = json!({});

        let graph_file = path.join("graph.json");
        if graph_file.exists() {
            let body = tokio::fs::read_to_string(&graph_file)
                .await
                .map_err(|e| RafiqError::backend("fs", e))?;
            let data: Value = serde_json::from_str(&body)
                .map_err(|e| RafiqError::Internal(format!("bad graph backup: {e}")))?;
            restored["graph"] = self.graph.restore_graph(&data).await?;
        }

        let vector_file = path.join("vector.json");
        if vector_file.exists() {
            let body = tokio::fs::read_to_string(&vector_file)
                .await
                .map_err(|e| RafiqError::backend("fs", e))?;
            let points: Vec<ScrolledPoint> = serde_json::from_str(&body)
                .map_err(|e| RafiqError::Internal(format!("bad vector backup: {e}")))?;
            let count = self.vector.restore_points(points).await?;
            restored["vector"] = json!({"points_restored": count});
        }

        let memory_file = path.join("memory.json");
        if memory_file.exists() {
            let body = tokio::fs::read_to_string(&memory_file)
                .await
                .map_err(|e| RafiqError::backend("fs", e))?;
            let dump = serde_json::from_str(&body)
                .map_err(|e| RafiqError::Internal(format!("bad memory backup: {e}")))?;
            let count = self.memory.restore_all(dump).await?;
            restored["memory"] = json!({"keys_restored": count});
        }

        info!(timestamp, "backup restored");
        Ok(json!({"timestamp": timestamp, "restored": restored}))
    }

    /// Removes backups older than the retention window. Returns how many.
    pub async fn cleanup_old_backups(&self) -> Result<usize, RafiqError> {
        let cutoff = (time::now_local(self.tz_offset_hours)
            - chrono::Duration::days(self.retention_days))
        .format("%Y%m%d_%H%M%S")
        .to_string();

        let mut removed = 0;
        let Ok(mut entries) = tokio::fs::read_dir(&self.backup_dir).await else {
            return Ok(0);
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.len() == TIMESTAMP_LEN && entry.path().is_dir() && name < cutoff {
                if tokio::fs::remove_dir_all(entry.path()).await.is_ok() {
                    removed += 1;
                    info!(backup = %name, "removed old backup");
                }
            }
        }
        Ok(removed)
    }
}

async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}
