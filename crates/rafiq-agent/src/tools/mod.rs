// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tool catalog. One module per domain; `register_all` wires the
//! catalog in its stable order.

mod financial;
mod inventory;
mod knowledge;
mod lists;
mod productivity;
mod projects;
pub(crate) mod reminders;
mod tasks;

use std::sync::Arc;

use crate::services::Services;
use crate::tool::ToolRegistry;

/// Registers the full catalog. The order here is the stable catalog order
/// used when appending parallel tool results to the LLM context.
pub fn register_all(registry: &mut ToolRegistry, services: Arc<Services>) {
    registry.register(Arc::new(knowledge::SearchKnowledge(services.clone())));
    registry.register(Arc::new(reminders::SearchReminders(services.clone())));
    registry.register(Arc::new(reminders::CreateReminder(services.clone())));
    registry.register(Arc::new(reminders::UpdateReminder(services.clone())));
    registry.register(Arc::new(reminders::DeleteReminder(services.clone())));
    registry.register(Arc::new(financial::AddExpense(services.clone())));
    registry.register(Arc::new(financial::GetExpenseReport(services.clone())));
    registry.register(Arc::new(financial::GetDebtSummary(services.clone())));
    registry.register(Arc::new(financial::RecordDebt(services.clone())));
    registry.register(Arc::new(financial::PayDebt(services.clone())));
    registry.register(Arc::new(financial::GetDailyPlan(services.clone())));
    registry.register(Arc::new(knowledge::StoreNote(services.clone())));
    registry.register(Arc::new(knowledge::GetPersonInfo(services.clone())));
    registry.register(Arc::new(inventory::ManageInventory(services.clone())));
    registry.register(Arc::new(tasks::ManageTasks(services.clone())));
    registry.register(Arc::new(projects::ManageProjects(services.clone())));
    registry.register(Arc::new(projects::MergeProjects(services.clone())));
    registry.register(Arc::new(lists::ManageLists(services.clone())));
    registry.register(Arc::new(productivity::GetProductivityStats(services)));
}

/// Argument helpers shared by the handlers.
pub(crate) mod args {
    use serde_json::Value;

    pub fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
        args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn required_str<'a>(args: &'a Value, key: &str, error_ar: &str) -> Result<&'a str, Value> {
        str_arg(args, key).ok_or_else(|| serde_json::json!({"error": error_ar}))
    }

    pub fn i64_arg(args: &Value, key: &str) -> Option<i64> {
        args.get(key).and_then(Value::as_i64)
    }

    pub fn f64_arg(args: &Value, key: &str) -> Option<f64> {
        args.get(key).and_then(Value::as_f64)
    }

    pub fn bool_arg(args: &Value, key: &str) -> bool {
        args.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn string_list(args: &Value, key: &str) -> Vec<String> {
        args.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::args::*;

    #[test]
    fn argument_extraction() {
        let v = serde_json::json!({
            "title": "حليب", "empty": "", "priority": 3, "amount": 25.5,
            "compare": true, "names": ["a", "b"]
        });
        assert_eq!(str_arg(&v, "title"), Some("حليب"));
        assert_eq!(str_arg(&v, "empty"), None);
        assert_eq!(str_arg(&v, "missing"), None);
        assert_eq!(i64_arg(&v, "priority"), Some(3));
        assert_eq!(f64_arg(&v, "amount"), Some(25.5));
        assert!(bool_arg(&v, "compare"));
        assert!(!bool_arg(&v, "missing"));
        assert_eq!(string_list(&v, "names"), vec!["a", "b"]);
    }

    #[test]
    fn required_str_produces_arabic_error() {
        let v = serde_json::json!({});
        let err = required_str(&v, "name", "اسم الغرض مطلوب").unwrap_err();
        assert_eq!(err["error"], "اسم الغرض مطلوب");
    }
}
