// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proactive job runner: daily cron jobs (morning/noon/evening, backup)
//! and interval jobs (reminder check, smart alerts), all calling the
//! engine's REST surface. Jobs log and skip on timeout; they never retry
//! synchronously.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use rafiq_config::RafiqConfig;
use rafiq_core::time::local_hour_to_utc;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// REST client for the proactive endpoints.
#[derive(Clone)]
struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    fn new(base_url: &str, timeout_seconds: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    async fn get(&self, path: &str) -> Option<Value> {
        let url = format!("{}{path}", self.base_url);
        let fut = async {
            let response = self.client.get(&url).send().await.ok()?;
            response.json::<Value>().await.ok()
        };
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(path, "job request timed out, skipping");
                None
            }
        }
    }

    async fn post(&self, path: &str, body: Value) -> Option<Value> {
        let url = format!("{}{path}", self.base_url);
        let fut = async {
            let response = self.client.post(&url).json(&body).send().await.ok()?;
            response.json::<Value>().await.ok()
        };
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(path, "job request timed out, skipping");
                None
            }
        }
    }
}

/// Sleeps until the next occurrence of `utc_hour:00`.
async fn sleep_until_utc_hour(utc_hour: u32) {
    let now = chrono::Utc::now();
    let mut next = now
        .date_naive()
        .and_hms_opt(utc_hour, 0, 0)
        .unwrap_or_else(|| now.naive_utc());
    if next <= now.naive_utc() {
        next += chrono::Duration::days(1);
    }
    let wait = (next - now.naive_utc()).num_seconds().max(1) as u64;
    debug!(utc_hour, wait_seconds = wait, "sleeping until next cron slot");
    tokio::time::sleep(Duration::from_secs(wait)).await;
}

/// Spawns all proactive jobs. Returns the task handles so the caller can
/// abort them on shutdown.
pub fn spawn_jobs(config: Arc<RafiqConfig>) -> Vec<JoinHandle<()>> {
    if !config.proactive.enabled {
        info!("proactive scheduler disabled");
        return Vec::new();
    }

    let tz = config.server.timezone_offset_hours;
    let api = ApiClient::new(&config.proactive.api_base_url, config.proactive.job_timeout_seconds);
    let mut handles = Vec::new();

    // Morning summary.
    {
        let api = api.clone();
        let hour = local_hour_to_utc(config.proactive.morning_hour, tz);
        handles.push(tokio::spawn(async move {
            loop {
                sleep_until_utc_hour(hour).await;
                if let Some(summary) = api.get("/proactive/morning-summary").await {
                    info!(plan = %summary["daily_plan"].as_str().unwrap_or(""), "morning summary");
                }
            }
        }));
    }

    // Noon check-in: skipped when nothing is overdue.
    {
        let api = api.clone();
        let hour = local_hour_to_utc(config.proactive.noon_hour, tz);
        handles.push(tokio::spawn(async move {
            loop {
                sleep_until_utc_hour(hour).await;
                if let Some(checkin) = api.get("/proactive/noon-checkin").await {
                    let overdue = checkin["overdue_reminders"]
                        .as_array()
                        .map(|a| a.len())
                        .unwrap_or(0);
                    if overdue == 0 {
                        debug!("noon check-in: nothing overdue, skipping");
                    } else {
                        info!(overdue, "noon check-in");
                    }
                }
            }
        }));
    }

    // Evening summary.
    {
        let api = api.clone();
        let hour = local_hour_to_utc(config.proactive.evening_hour, tz);
        handles.push(tokio::spawn(async move {
            loop {
                sleep_until_utc_hour(hour).await;
                if let Some(summary) = api.get("/proactive/evening-summary").await {
                    let completed = summary["completed_today"]
                        .as_array()
                        .map(|a| a.len())
                        .unwrap_or(0);
                    info!(completed, "evening summary");
                }
            }
        }));
    }

    // Reminder check: notify, then advance recurring or mark notified;
    // persistent reminders re-enter the nag cycle.
    {
        let api = api.clone();
        let minutes = config.proactive.reminder_check_minutes;
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(due) = api.get("/proactive/due-reminders").await else {
                    continue;
                };
                let reminders = due["due_reminders"].as_array().cloned().unwrap_or_default();
                for reminder in reminders {
                    let title = reminder["title"].as_str().unwrap_or_default().to_string();
                    if title.is_empty() {
                        continue;
                    }
                    // Delivery point for client adapters; the engine logs it.
                    info!(title = %title, due = %reminder["due_date"].as_str().unwrap_or(""), "reminder due");

                    let recurrence = reminder["recurrence"].as_str().unwrap_or_default();
                    if !recurrence.is_empty() {
                        api.post(
                            "/proactive/advance-reminder",
                            json!({"title": title, "recurrence": recurrence}),
                        )
                        .await;
                    } else {
                        // mark-notified is a set operation: duplicate
                        // delivery is harmless.
                        api.post("/proactive/mark-notified", json!({"title": title})).await;
                    }
                }
                api.post("/proactive/reschedule-persistent", json!({})).await;
            }
        }));
    }

    // Smart alerts: stalled projects + old debts, skipped when empty.
    {
        let api = api.clone();
        let hours = config.proactive.alert_check_hours;
        let stalled_days = config.proactive.stalled_days;
        let debt_days = config.proactive.old_debt_days;
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(hours * 3600));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Some(stalled) = api
                    .get(&format!("/proactive/stalled-projects?days={stalled_days}"))
                    .await
                {
                    let count = stalled["stalled_projects"]
                        .as_array()
                        .map(|a| a.len())
                        .unwrap_or(0);
                    if count > 0 {
                        info!(count, "stalled projects alert");
                    }
                }
                if let Some(debts) = api
                    .get(&format!("/proactive/old-debts?days={debt_days}"))
                    .await
                {
                    let count = debts["old_debts"].as_array().map(|a| a.len()).unwrap_or(0);
                    if count > 0 {
                        info!(count, "old debts alert");
                    }
                }
            }
        }));
    }

    // Daily backup with retention cleanup.
    if config.backup.enabled {
        let api = api.clone();
        let hour = local_hour_to_utc(config.backup.hour, tz);
        handles.push(tokio::spawn(async move {
            loop {
                sleep_until_utc_hour(hour).await;
                if let Some(result) = api.post("/backup/", json!({})).await {
                    info!(timestamp = %result["timestamp"].as_str().unwrap_or(""), "daily backup created");
                }
            }
        }));
    }

    info!(jobs = handles.len(), "proactive scheduler started");
    handles
}

/// Local clock hour right now (exposed for tests of cron placement).
pub fn current_local_hour(tz_offset_hours: i32) -> u32 {
    rafiq_core::time::now_local(tz_offset_hours).hour()
}
