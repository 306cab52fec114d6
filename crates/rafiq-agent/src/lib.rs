// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The agentic chat core for the Rafiq assistant: tool catalog + registry,
//! the tool-calling orchestrator (one-shot and NDJSON streaming), the smart
//! router, the delete-confirmation flow, and background post-processing.

pub mod confirm;
pub mod orchestrator;
pub mod postprocess;
pub mod router;
pub mod services;
pub mod tool;
pub mod tools;

pub use orchestrator::Orchestrator;
pub use services::Services;
pub use tool::{Tool, ToolRegistry, WRITE_TOOLS};

use std::sync::Arc;

/// Builds the orchestrator with the full tool catalog registered.
pub fn build_orchestrator(services: Services) -> Orchestrator {
    let services = Arc::new(services);
    let mut registry = ToolRegistry::new();
    tools::register_all(&mut registry, services.clone());
    tracing::info!(tools = registry.len(), "tool registry initialised");
    Orchestrator::new(services, Arc::new(registry))
}
