// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File provenance: stub/upsert File nodes, supersession lineage, orphan
//! cleanup, and the section-link snapshot/restore used by re-uploads.

use std::collections::HashMap;

use rafiq_core::RafiqError;
use serde_json::{json, Value};
use tracing::info;

use crate::client::build_query;
use crate::GraphService;

impl GraphService {
    /// Creates a minimal File node so EXTRACTED_FROM links can MATCH it
    /// during ingestion. Must run before `upsert_from_facts` with a hash.
    pub async fn ensure_file_stub(&self, file_hash: &str, filename: &str) -> Result<(), RafiqError> {
        self.client
            .run(build_query(
                "MERGE (f:File {file_hash: $fhash})
                 ON CREATE SET f.filename = $fn, f.created_at = $now",
                &[
                    ("fhash", Value::String(file_hash.into())),
                    ("fn", Value::String(filename.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await
    }

    /// Full File node with classification metadata.
    pub async fn upsert_file_node(
        &self,
        file_hash: &str,
        filename: &str,
        file_type: &str,
        description: &str,
        mime: &str,
        size: i64,
    ) -> Result<(), RafiqError> {
        let description: String = description.chars().take(500).collect();
        self.client
            .run(build_query(
                "MERGE (f:File {file_hash: $file_hash})
                 ON CREATE SET f.filename = $filename, f.file_type = $file_type,
                               f.description = $description, f.mime = $mime,
                               f.size = $size, f.ingested_at = $now, f.created_at = $now
                 ON MATCH SET f.filename = $filename, f.file_type = $file_type,
                              f.description = $description, f.mime = $mime,
                              f.size = $size, f.updated_at = $now",
                &[
                    ("file_hash", Value::String(file_hash.into())),
                    ("filename", Value::String(filename.into())),
                    ("file_type", Value::String(file_type.into())),
                    ("description", Value::String(description)),
                    ("mime", Value::String(mime.into())),
                    ("size", Value::from(size)),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await
    }

    /// Returns the File node's properties for a hash, if present.
    pub async fn find_file_by_hash(&self, file_hash: &str) -> Result<Option<Value>, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (f:File {file_hash: $hash}) RETURN f AS file",
                &[("hash", Value::String(file_hash.into()))],
            ))
            .await?;
        Ok(row.and_then(|r| {
            r.get::<neo4rs::Node>("file")
                .ok()
                .map(|node| Value::Object(crate::context::node_props(&node)))
        }))
    }

    /// Most recent File node for a filename (re-upload detection).
    pub async fn find_file_by_filename(&self, filename: &str) -> Result<Option<Value>, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (f:File)
                 WHERE f.filename = $filename
                 RETURN f AS file
                 ORDER BY f.updated_at DESC, f.created_at DESC
                 LIMIT 1",
                &[("filename", Value::String(filename.into()))],
            ))
            .await?;
        Ok(row.and_then(|r| {
            r.get::<neo4rs::Node>("file")
                .ok()
                .map(|node| Value::Object(crate::context::node_props(&node)))
        }))
    }

    /// Records file-version lineage: `new -[SUPERSEDES]-> old`.
    pub async fn supersede_file(&self, new_hash: &str, old_hash: &str) -> Result<(), RafiqError> {
        self.client
            .run(build_query(
                "MATCH (old:File {file_hash: $old_hash})
                 MATCH (new:File {file_hash: $new_hash})
                 SET old.superseded_by = $new_hash, old.updated_at = $now
                 MERGE (new)-[:SUPERSEDES]->(old)",
                &[
                    ("old_hash", Value::String(old_hash.into())),
                    ("new_hash", Value::String(new_hash.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await
    }

    /// Deletes entities whose ONLY provenance is the old file. Entities
    /// shared with other files survive. Returns the number deleted.
    pub async fn cleanup_file_entities(&self, old_file_hash: &str) -> Result<i64, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (e)-[:EXTRACTED_FROM]->(old:File {file_hash: $old_hash})
                 OPTIONAL MATCH (e)-[:EXTRACTED_FROM]->(other:File)
                 WHERE other.file_hash <> $old_hash
                 WITH e, other
                 WHERE other IS NULL
                 DETACH DELETE e
                 RETURN count(e) AS deleted",
                &[("old_hash", Value::String(old_file_hash.into()))],
            ))
            .await?;
        let deleted = row.map(|r| r.get::<i64>("deleted").unwrap_or_default()).unwrap_or(0);
        if deleted > 0 {
            info!(
                deleted,
                file_hash = &old_file_hash[..old_file_hash.len().min(12)],
                "cleaned up orphaned file entities"
            );
        }
        Ok(deleted)
    }

    /// EXTRACTED_FROM edge from an entity to its source file. Uses MATCH,
    /// not MERGE, on the File node: the stub must already exist.
    pub async fn link_entity_to_file(
        &self,
        entity_type: &str,
        entity_name: &str,
        file_hash: &str,
    ) -> Result<(), RafiqError> {
        if !crate::cypher::is_safe_identifier(entity_type) {
            return Err(RafiqError::Validation(format!("invalid label: {entity_type}")));
        }
        let key = crate::cypher::key_field(entity_type);
        let cypher = format!(
            "MATCH (e:{entity_type} {{{key}: $ename}})
             MATCH (f:File {{file_hash: $fhash}})
             MERGE (e)-[:EXTRACTED_FROM]->(f)"
        );
        self.client
            .run(build_query(
                &cypher,
                &[
                    ("ename", Value::String(entity_name.into())),
                    ("fhash", Value::String(file_hash.into())),
                ],
            ))
            .await
    }

    /// Snapshot of `{entity name (lowercased) → section name}` for every
    /// entity linked to a file. Taken before re-upload cleanup.
    pub async fn get_file_section_map(
        &self,
        file_hash: &str,
    ) -> Result<HashMap<String, String>, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (e)-[:EXTRACTED_FROM]->(f:File {file_hash: $fhash})
                 MATCH (e)-[:IN_SECTION]->(s:Section)
                 RETURN coalesce(e.name, e.title) AS name, s.name AS section",
                &[("fhash", Value::String(file_hash.into()))],
            ))
            .await?;
        let mut map = HashMap::new();
        for row in &rows {
            let name: String = row.get("name").unwrap_or_default();
            let section: String = row.get("section").unwrap_or_default();
            if !name.is_empty() && !section.is_empty() {
                map.insert(name.to_lowercase(), section);
            }
        }
        Ok(map)
    }

    /// Restores IN_SECTION edges after re-extraction by matching the
    /// replacement entities' normalised names against the snapshot.
    pub async fn restore_section_links(
        &self,
        file_hash: &str,
        section_map: &HashMap<String, String>,
    ) -> Result<usize, RafiqError> {
        if section_map.is_empty() {
            return Ok(0);
        }
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (e)-[:EXTRACTED_FROM]->(f:File {file_hash: $fhash})
                 RETURN labels(e)[0] AS label, coalesce(e.name, e.title) AS name",
                &[("fhash", Value::String(file_hash.into()))],
            ))
            .await?;

        let mut restored = 0;
        for row in &rows {
            let label: String = row.get("label").unwrap_or_default();
            let name: String = row.get("name").unwrap_or_default();
            if name.is_empty() || !crate::cypher::is_safe_identifier(&label) {
                continue;
            }
            if let Some(section) = section_map.get(&name.to_lowercase()) {
                let key = crate::cypher::key_field(&label);
                let cypher = format!(
                    "MATCH (e:{label} {{{key}: $ename}})
                     MATCH (s:Section {{name: $sname}})
                     MERGE (e)-[:IN_SECTION]->(s)"
                );
                self.client
                    .run(build_query(
                        &cypher,
                        &[
                            ("ename", Value::String(name.clone())),
                            ("sname", Value::String(section.clone())),
                        ],
                    ))
                    .await?;
                restored += 1;
            }
        }
        if restored > 0 {
            info!(restored, "restored section links after re-upload");
        }
        Ok(restored)
    }

    /// Deletes a file's graph footprint entirely: orphan entities, the
    /// provenance edges, then the File node itself.
    pub async fn delete_file(&self, file_hash: &str) -> Result<Value, RafiqError> {
        let deleted = self.cleanup_file_entities(file_hash).await?;
        self.client
            .run(build_query(
                "MATCH (e)-[r:EXTRACTED_FROM]->(f:File {file_hash: $fhash}) DELETE r",
                &[("fhash", Value::String(file_hash.into()))],
            ))
            .await?;
        self.client
            .run(build_query(
                "MATCH (f:File {file_hash: $fhash}) DETACH DELETE f",
                &[("fhash", Value::String(file_hash.into()))],
            ))
            .await?;
        Ok(json!({"file_hash": file_hash, "entities_deleted": deleted}))
    }
}
