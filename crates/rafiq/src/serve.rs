// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rafiq serve`: construct the service singletons, start the scheduler,
//! and run the gateway until shutdown.

use std::sync::Arc;

use rafiq_agent::Services;
use rafiq_config::RafiqConfig;
use rafiq_core::RafiqError;
use rafiq_gateway::AppState;
use rafiq_scheduler::BackupService;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialises the tracing subscriber once.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rafiq={log_level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Runs the full service. Returns the process exit code on failure paths:
/// 1 for startup failures, 2 for unrecoverable storage errors.
pub async fn run_serve(config: RafiqConfig) -> Result<(), (i32, RafiqError)> {
    init_tracing(&config.server.log_level);
    info!("starting rafiq serve");
    let config = Arc::new(config);

    // LLM gateway.
    let llm = rafiq_llm::build_gateway(&config).map_err(|e| (1, e))?;
    info!("LLM gateway ready");

    // Vector store (collection is created when absent).
    let vector = rafiq_vector::build_store(&config).map_err(|e| (1, e))?;
    if let Err(e) = vector.start().await {
        error!(error = %e, "vector store initialisation failed");
        return Err((2, e));
    }
    info!("vector store ready");

    // Graph store.
    let graph = match rafiq_graph::build_service(config.clone(), vector.clone()).await {
        Ok(g) => g,
        Err(e) => {
            error!(error = %e, "graph store connection failed");
            return Err((2, e));
        }
    };
    info!("graph store ready");

    // Memory store.
    let memory = match rafiq_memory::build_service(&config, llm.clone()).await {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "memory store connection failed");
            return Err((2, e));
        }
    };
    info!("memory store ready");

    // Ingestion pipeline + file processor (NER inside, lazy).
    let (pipeline, files) =
        rafiq_ingest::build_ingestion(config.clone(), llm.clone(), vector.clone(), graph.clone());
    info!("ingestion pipeline ready");

    // Orchestrator with the full tool catalog.
    let services = Services {
        llm,
        graph: graph.clone(),
        vector: vector.clone(),
        memory: memory.clone(),
        pipeline: pipeline.clone(),
        config: config.clone(),
    };
    let orchestrator = rafiq_agent::build_orchestrator(services);

    // Backup service.
    let backup = Arc::new(BackupService::new(
        graph,
        vector,
        memory.store().clone(),
        config.backup.dir.clone(),
        config.backup.retention_days,
        config.server.timezone_offset_hours,
    ));

    // Proactive jobs run in-process against the REST surface.
    let job_handles = rafiq_scheduler::spawn_jobs(config.clone());

    let state = AppState {
        orchestrator,
        pipeline,
        files,
        backup,
        config: config.clone(),
        http: reqwest::Client::new(),
    };

    let result = tokio::select! {
        served = rafiq_gateway::serve(state) => served,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    for handle in job_handles {
        handle.abort();
    }

    result.map_err(|e| (1, e))
}
