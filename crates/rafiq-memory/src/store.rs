// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed memory store.
//!
//! Three namespaces per session plus short-lived auxiliaries:
//! - Working memory: `working_memory:{session}` -- FIFO list of turn JSON,
//!   trimmed to the configured cap, 24h TTL refreshed on write.
//! - Daily summary: `daily_summary:{YYYY-MM-DD}` -- 7d TTL per entry.
//! - Core memory: `core_memory` -- permanent hash of user preferences.
//! - Pending action: `pending_action:{session}` -- 300s TTL JSON blob.
//! - Active project: `active_project:{session}`.
//! - Message counter: `msg_count:{session}` -- 24h TTL.
//! - Conversation summary: `conversation_summary:{session}` -- 24h TTL.

use std::collections::HashMap;

use rafiq_core::{time, RafiqError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, info};

const DAY_SECONDS: i64 = 86_400;
const CORE_KEY: &str = "core_memory";

fn working_key(session_id: &str) -> String {
    format!("working_memory:{session_id}")
}

fn daily_key(day: &str) -> String {
    format!("daily_summary:{day}")
}

fn pending_key(session_id: &str) -> String {
    format!("pending_action:{session_id}")
}

fn active_project_key(session_id: &str) -> String {
    format!("active_project:{session_id}")
}

fn msg_count_key(session_id: &str) -> String {
    format!("msg_count:{session_id}")
}

fn conversation_summary_key(session_id: &str) -> String {
    format!("conversation_summary:{session_id}")
}

fn mem_err(e: redis::RedisError) -> RafiqError {
    RafiqError::backend("memory", e)
}

/// One key dumped for backup, preserving its Redis type and TTL.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DumpedKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// Low-level memory store over one Redis connection pool.
#[derive(Clone)]
pub struct MemoryStore {
    conn: ConnectionManager,
    working_memory_size: usize,
    daily_summary_ttl_days: u64,
    confirmation_ttl_seconds: u64,
    tz_offset_hours: i32,
}

impl MemoryStore {
    pub async fn connect(
        redis_url: &str,
        working_memory_size: usize,
        daily_summary_ttl_days: u64,
        confirmation_ttl_seconds: u64,
        tz_offset_hours: i32,
    ) -> Result<Self, RafiqError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| RafiqError::Config(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(mem_err)?;
        info!("memory store connected");
        Ok(Self {
            conn,
            working_memory_size,
            daily_summary_ttl_days,
            confirmation_ttl_seconds,
            tz_offset_hours,
        })
    }

    // --- Layer 1: working memory ---

    /// Appends one `{role, content, ts}` turn.
    pub async fn push_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), RafiqError> {
        let turn = serde_json::json!({
            "role": role,
            "content": content,
            "ts": time::now_iso(self.tz_offset_hours),
        });
        self.push_raw(session_id, &turn).await
    }

    /// Appends a raw turn (assistant tool_calls / tool results keep their
    /// full shape so the model sees the correct pattern next turn).
    pub async fn push_raw(&self, session_id: &str, turn: &Value) -> Result<(), RafiqError> {
        let key = working_key(session_id);
        let encoded = turn.to_string();
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(&key, encoded).await.map_err(mem_err)?;
        let cap = -(self.working_memory_size as isize * 2);
        let _: () = conn.ltrim(&key, cap, -1).await.map_err(mem_err)?;
        let _: bool = conn.expire(&key, DAY_SECONDS).await.map_err(mem_err)?;
        Ok(())
    }

    /// All working-memory turns, oldest first.
    pub async fn get_working_memory(&self, session_id: &str) -> Result<Vec<Value>, RafiqError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(working_key(session_id), 0, -1)
            .await
            .map_err(mem_err)?;
        Ok(raw
            .iter()
            .filter_map(|m| serde_json::from_str(m).ok())
            .collect())
    }

    /// Current working-memory length.
    pub async fn working_len(&self, session_id: &str) -> Result<usize, RafiqError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(working_key(session_id)).await.map_err(mem_err)?;
        Ok(len)
    }

    /// Trims working memory down to the newest `keep` turns. Readers during
    /// the window observe either state but never a torn one (LTRIM is
    /// atomic server-side).
    pub async fn trim_working_memory(&self, session_id: &str, keep: usize) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .ltrim(working_key(session_id), -(keep as isize), -1)
            .await
            .map_err(mem_err)?;
        Ok(())
    }

    // --- Layer 2: daily summary ---

    pub async fn set_daily_summary(&self, summary: &str) -> Result<(), RafiqError> {
        let key = daily_key(&time::today(self.tz_offset_hours));
        let ttl = self.daily_summary_ttl_days as i64 * DAY_SECONDS;
        let mut conn = self.conn.clone();
        let _: () = conn.set(&key, summary).await.map_err(mem_err)?;
        let _: bool = conn.expire(&key, ttl).await.map_err(mem_err)?;
        Ok(())
    }

    pub async fn get_daily_summary(&self) -> Result<Option<String>, RafiqError> {
        let mut conn = self.conn.clone();
        conn.get(daily_key(&time::today(self.tz_offset_hours)))
            .await
            .map_err(mem_err)
    }

    // --- Layer 3: core memory ---

    pub async fn set_core_memory(&self, field: &str, value: &str) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hset(CORE_KEY, field, value).await.map_err(mem_err)?;
        Ok(())
    }

    pub async fn get_all_core_memory(&self) -> Result<HashMap<String, String>, RafiqError> {
        let mut conn = self.conn.clone();
        conn.hgetall(CORE_KEY).await.map_err(mem_err)
    }

    // --- Pending actions (delete/cancel confirmation) ---

    pub async fn set_pending_action(&self, session_id: &str, action: &Value) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(
                pending_key(session_id),
                action.to_string(),
                self.confirmation_ttl_seconds,
            )
            .await
            .map_err(mem_err)?;
        debug!(session_id, "pending action stored");
        Ok(())
    }

    pub async fn get_pending_action(&self, session_id: &str) -> Result<Option<Value>, RafiqError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(pending_key(session_id)).await.map_err(mem_err)?;
        Ok(raw.and_then(|r| serde_json::from_str(&r).ok()))
    }

    pub async fn clear_pending_action(&self, session_id: &str) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(pending_key(session_id)).await.map_err(mem_err)?;
        Ok(())
    }

    // --- Active project ---

    pub async fn set_active_project(&self, session_id: &str, name: &str) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(active_project_key(session_id), name)
            .await
            .map_err(mem_err)?;
        Ok(())
    }

    pub async fn get_active_project(&self, session_id: &str) -> Result<Option<String>, RafiqError> {
        let mut conn = self.conn.clone();
        conn.get(active_project_key(session_id)).await.map_err(mem_err)
    }

    pub async fn clear_active_project(&self, session_id: &str) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(active_project_key(session_id)).await.map_err(mem_err)?;
        Ok(())
    }

    // --- Message counter ---

    pub async fn increment_message_count(&self, session_id: &str) -> Result<u64, RafiqError> {
        let key = msg_count_key(session_id);
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(&key, 1).await.map_err(mem_err)?;
        let _: bool = conn.expire(&key, DAY_SECONDS).await.map_err(mem_err)?;
        Ok(count)
    }

    // --- Conversation summary (compression output) ---

    pub async fn set_conversation_summary(
        &self,
        session_id: &str,
        summary: &str,
    ) -> Result<(), RafiqError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(
                conversation_summary_key(session_id),
                summary,
                DAY_SECONDS as u64,
            )
            .await
            .map_err(mem_err)?;
        Ok(())
    }

    pub async fn get_conversation_summary(
        &self,
        session_id: &str,
    ) -> Result<Option<String>, RafiqError> {
        let mut conn = self.conn.clone();
        conn.get(conversation_summary_key(session_id))
            .await
            .map_err(mem_err)
    }

    // --- Backup ---

    /// Dumps every key with its type-specific value and remaining TTL.
    pub async fn dump_all(&self) -> Result<HashMap<String, DumpedKey>, RafiqError> {
        let mut conn = self.conn.clone();
        let mut dump = HashMap::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(mem_err)?;
            for key in keys {
                let key_type: String = redis::cmd("TYPE")
                    .arg(&key)
                    .query_async(&mut conn)
                    .await
                    .map_err(mem_err)?;
                let value = match key_type.as_str() {
                    "string" => {
                        let v: Option<String> = conn.get(&key).await.map_err(mem_err)?;
                        Value::String(v.unwrap_or_default())
                    }
                    "list" => {
                        let v: Vec<String> = conn.lrange(&key, 0, -1).await.map_err(mem_err)?;
                        serde_json::to_value(v).unwrap_or(Value::Null)
                    }
                    "hash" => {
                        let v: HashMap<String, String> =
                            conn.hgetall(&key).await.map_err(mem_err)?;
                        serde_json::to_value(v).unwrap_or(Value::Null)
                    }
                    "set" => {
                        let v: Vec<String> = conn.smembers(&key).await.map_err(mem_err)?;
                        serde_json::to_value(v).unwrap_or(Value::Null)
                    }
                    _ => continue,
                };
                let ttl: i64 = conn.ttl(&key).await.map_err(mem_err)?;
                dump.insert(
                    key,
                    DumpedKey {
                        key_type,
                        value,
                        ttl: (ttl > 0).then_some(ttl),
                    },
                );
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(dump)
    }

    /// Re-applies a dump: SET/RPUSH/HSET/SADD with TTLs.
    pub async fn restore_all(&self, dump: HashMap<String, DumpedKey>) -> Result<usize, RafiqError> {
        let mut conn = self.conn.clone();
        let mut restored = 0;
        for (key, entry) in dump {
            match entry.key_type.as_str() {
                "string" => {
                    if let Some(v) = entry.value.as_str() {
                        let _: () = conn.set(&key, v).await.map_err(mem_err)?;
                    }
                }
                "list" => {
                    let _: i64 = conn.del(&key).await.map_err(mem_err)?;
                    if let Some(items) = entry.value.as_array() {
                        for item in items {
                            if let Some(s) = item.as_str() {
                                let _: i64 = conn.rpush(&key, s).await.map_err(mem_err)?;
                            }
                        }
                    }
                }
                "hash" => {
                    let _: i64 = conn.del(&key).await.map_err(mem_err)?;
                    if let Some(map) = entry.value.as_object() {
                        for (field, v) in map {
                            if let Some(s) = v.as_str() {
                                let _: i64 = conn.hset(&key, field, s).await.map_err(mem_err)?;
                            }
                        }
                    }
                }
                "set" => {
                    let _: i64 = conn.del(&key).await.map_err(mem_err)?;
                    if let Some(items) = entry.value.as_array() {
                        for item in items {
                            if let Some(s) = item.as_str() {
                                let _: i64 = conn.sadd(&key, s).await.map_err(mem_err)?;
                            }
                        }
                    }
                }
                _ => continue,
            }
            if let Some(ttl) = entry.ttl {
                let _: bool = conn.expire(&key, ttl).await.map_err(mem_err)?;
            }
            restored += 1;
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats_are_stable() {
        assert_eq!(working_key("default"), "working_memory:default");
        assert_eq!(daily_key("2026-02-11"), "daily_summary:2026-02-11");
        assert_eq!(pending_key("s1"), "pending_action:s1");
        assert_eq!(active_project_key("s1"), "active_project:s1");
        assert_eq!(msg_count_key("s1"), "msg_count:s1");
        assert_eq!(conversation_summary_key("s1"), "conversation_summary:s1");
    }

    #[test]
    fn dumped_key_round_trips() {
        let entry = DumpedKey {
            key_type: "list".into(),
            value: serde_json::json!(["a", "b"]),
            ttl: Some(3600),
        };
        let encoded = serde_json::to_string(&entry).unwrap();
        let decoded: DumpedKey = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.key_type, "list");
        assert_eq!(decoded.ttl, Some(3600));

        let no_ttl = DumpedKey {
            key_type: "string".into(),
            value: Value::String("v".into()),
            ttl: None,
        };
        let v = serde_json::to_value(&no_ttl).unwrap();
        assert!(v.get("ttl").is_none());
    }
}
