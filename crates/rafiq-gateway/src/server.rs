// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum: route tree, CORS, body limits.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use rafiq_core::RafiqError;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Builds the full route tree.
pub fn build_router(state: AppState) -> Router {
    let max_body = (state.config.ingest.max_file_size_mb * 1024 * 1024 + 1024 * 1024) as usize;

    Router::new()
        // Chat
        .route("/chat/", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::chat_stream))
        .route("/chat/summary", get(handlers::chat::chat_summary))
        // Ingest
        .route("/ingest/text", post(handlers::ingest::ingest_text))
        .route("/ingest/file", post(handlers::ingest::ingest_file))
        .route("/ingest/url", post(handlers::ingest::ingest_url))
        .route("/ingest/file/:hash", get(handlers::ingest::download_file))
        // Search
        .route("/search/", post(handlers::search::search))
        // Financial
        .route("/financial/report", get(handlers::financial::report))
        .route("/financial/debts", get(handlers::financial::debts))
        .route("/financial/debts/payment", post(handlers::financial::record_payment))
        .route("/financial/alerts", get(handlers::financial::alerts))
        // Reminders
        .route("/reminders/", get(handlers::reminders::list))
        .route("/reminders/action", post(handlers::reminders::action))
        .route("/reminders/update", post(handlers::reminders::update))
        .route("/reminders/delete", post(handlers::reminders::delete))
        .route("/reminders/delete-all", post(handlers::reminders::delete_all))
        .route("/reminders/merge-duplicates", post(handlers::reminders::merge_duplicates))
        // Tasks / projects / knowledge
        .route("/tasks/", get(handlers::workspace::list_tasks))
        .route("/tasks/update", post(handlers::workspace::update_task))
        .route("/tasks/merge-duplicates", post(handlers::workspace::merge_duplicate_tasks))
        .route("/projects/", get(handlers::workspace::list_projects))
        .route("/projects/details", get(handlers::workspace::project_details))
        .route("/projects/delete", post(handlers::workspace::delete_project))
        .route("/projects/merge", post(handlers::workspace::merge_projects))
        .route("/knowledge/", get(handlers::workspace::list_knowledge))
        // Inventory
        .route("/inventory/", get(handlers::inventory::list))
        .route("/inventory/summary", get(handlers::inventory::summary))
        .route("/inventory/report", get(handlers::inventory::report))
        .route("/inventory/item", post(handlers::inventory::upsert_item))
        .route("/inventory/location", post(handlers::inventory::move_item))
        .route("/inventory/quantity", post(handlers::inventory::adjust_quantity))
        .route("/inventory/by-file/:hash", get(handlers::inventory::by_file))
        .route("/inventory/by-barcode/:code", get(handlers::inventory::by_barcode))
        .route("/inventory/unused", get(handlers::inventory::unused))
        .route("/inventory/duplicates", get(handlers::inventory::duplicates))
        .route("/inventory/search-similar", post(handlers::inventory::search_similar))
        // Productivity
        .route(
            "/productivity/sprints",
            get(handlers::productivity::list_sprints).post(handlers::productivity::create_sprint),
        )
        .route("/productivity/sprints/assign", post(handlers::productivity::assign_task))
        .route("/productivity/sprints/:name", get(handlers::productivity::sprint_details))
        .route(
            "/productivity/sprints/:name/burndown",
            get(handlers::productivity::sprint_burndown),
        )
        .route(
            "/productivity/sprints/:name/complete",
            post(handlers::productivity::complete_sprint),
        )
        .route("/productivity/velocity", get(handlers::productivity::velocity))
        .route("/productivity/focus/start", post(handlers::productivity::start_focus))
        .route("/productivity/focus/complete", post(handlers::productivity::complete_focus))
        .route("/productivity/focus/stats", get(handlers::productivity::focus_stats))
        .route(
            "/productivity/timeblock/suggest",
            post(handlers::productivity::suggest_timeblocks),
        )
        .route(
            "/productivity/timeblock/apply",
            post(handlers::productivity::apply_timeblocks),
        )
        // Proactive
        .route("/proactive/morning-summary", get(handlers::proactive::morning_summary))
        .route("/proactive/noon-checkin", get(handlers::proactive::noon_checkin))
        .route("/proactive/evening-summary", get(handlers::proactive::evening_summary))
        .route("/proactive/due-reminders", get(handlers::proactive::due_reminders))
        .route("/proactive/advance-reminder", post(handlers::proactive::advance_reminder))
        .route("/proactive/mark-notified", post(handlers::proactive::mark_notified))
        .route(
            "/proactive/reschedule-persistent",
            post(handlers::proactive::reschedule_persistent),
        )
        .route("/proactive/stalled-projects", get(handlers::proactive::stalled_projects))
        .route("/proactive/old-debts", get(handlers::proactive::old_debts))
        // Backup
        .route("/backup/", get(handlers::backup::list).post(handlers::backup::create))
        .route("/backup/restore/:timestamp", post(handlers::backup::restore))
        // Graph viz
        .route("/graph/export", get(handlers::graph_viz::export))
        .route("/graph/schema", get(handlers::graph_viz::schema))
        .route("/graph/stats", get(handlers::graph_viz::stats))
        .route("/graph/image", get(handlers::graph_viz::image))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the process is stopped.
pub async fn serve(state: AppState) -> Result<(), RafiqError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RafiqError::Fatal(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "gateway listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| RafiqError::Fatal(format!("server error: {e}")))
}
