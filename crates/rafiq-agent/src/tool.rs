// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! Each tool is a record of name, Arabic description, JSON schema, and an
//! async handler. The orchestrator looks handlers up by name from the
//! LLM's tool calls; no reflection involved. Catalog order is stable and
//! drives the deterministic append order of parallel results.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rafiq_core::RafiqError;
use rafiq_llm::ToolSpec;
use serde_json::Value;

/// Names of tools that mutate application state. A chat turn that executed
/// one of these skips auto-extraction: the write already captured the fact.
pub const WRITE_TOOLS: [&str; 12] = [
    "create_reminder",
    "delete_reminder",
    "update_reminder",
    "add_expense",
    "record_debt",
    "pay_debt",
    "store_note",
    "manage_inventory",
    "manage_tasks",
    "manage_projects",
    "merge_projects",
    "manage_lists",
];

/// Unified interface for all chat tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable tool name; both clients and the LLM depend on it.
    fn name(&self) -> &'static str;

    /// Arabic description shown to the model.
    fn description(&self) -> &'static str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Executes the tool. Read tools return compact structured data; write
    /// tools return `{status, ...}` or `{error}`.
    async fn invoke(&self, args: Value, session_id: &str) -> Result<Value, RafiqError>;
}

/// Registry of available tools in catalog order.
pub struct ToolRegistry {
    order: Vec<&'static str>,
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        if !self.tools.contains_key(name) {
            self.order.push(name);
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Position in the catalog; unknown tools sort last.
    pub fn catalog_index(&self, name: &str) -> usize {
        self.order
            .iter()
            .position(|n| *n == name)
            .unwrap_or(usize::MAX)
    }

    /// OpenAI-format tool definitions in catalog order.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                ToolSpec::function(tool.name(), tool.description(), tool.parameters_schema())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn description(&self) -> &'static str {
            "يرجع النص كما هو"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            })
        }
        async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
            Ok(serde_json::json!({"echo": args["message"]}))
        }
    }

    struct SecondTool;

    #[async_trait]
    impl Tool for SecondTool {
        fn name(&self) -> &'static str {
            "second"
        }
        fn description(&self) -> &'static str {
            "أداة ثانية"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}, "required": []})
        }
        async fn invoke(&self, _args: Value, _session_id: &str) -> Result<Value, RafiqError> {
            Ok(serde_json::json!({}))
        }
    }

    #[test]
    fn registry_preserves_catalog_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(SecondTool));

        let specs = registry.tool_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].function.name, "echo");
        assert_eq!(specs[1].function.name, "second");
        assert_eq!(registry.catalog_index("echo"), 0);
        assert_eq!(registry.catalog_index("second"), 1);
        assert_eq!(registry.catalog_index("unknown"), usize::MAX);
    }

    #[tokio::test]
    async fn tool_invocation_round_trip() {
        let tool = EchoTool;
        let result = tool
            .invoke(serde_json::json!({"message": "مرحبا"}), "default")
            .await
            .unwrap();
        assert_eq!(result["echo"], "مرحبا");
    }

    #[test]
    fn write_tools_cover_side_effecting_catalog() {
        assert!(WRITE_TOOLS.contains(&"create_reminder"));
        assert!(WRITE_TOOLS.contains(&"manage_lists"));
        assert!(!WRITE_TOOLS.contains(&"search_knowledge"));
        assert!(!WRITE_TOOLS.contains(&"get_daily_plan"));
    }
}
