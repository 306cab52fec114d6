// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Financial tools: expenses, debts, and the daily plan.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use rafiq_core::RafiqError;
use serde_json::{json, Map, Value};

use super::args::*;
use crate::services::Services;
use crate::tool::Tool;

pub struct AddExpense(pub Arc<Services>);

#[async_trait]
impl Tool for AddExpense {
    fn name(&self) -> &'static str {
        "add_expense"
    }
    fn description(&self) -> &'static str {
        "سجّل مصروف جديد."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {"type": "string", "description": "وصف المصروف"},
                "amount": {"type": "number", "description": "المبلغ بالريال"},
                "category": {"type": "string", "description": "التصنيف (طعام، مواصلات، ترفيه، إلخ)"},
                "date": {"type": "string", "description": "التاريخ YYYY-MM-DD (الافتراضي: اليوم)"},
                "vendor": {"type": "string", "description": "المتجر أو الجهة"}
            },
            "required": ["description", "amount"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let description = match required_str(&args, "description", "وصف المصروف مطلوب") {
            Ok(d) => d,
            Err(e) => return Ok(e),
        };
        let Some(amount) = f64_arg(&args, "amount") else {
            return Ok(json!({"error": "المبلغ مطلوب"}));
        };
        let mut props = Map::new();
        for key in ["category", "date", "vendor"] {
            if let Some(v) = str_arg(&args, key) {
                props.insert(key.into(), json!(v));
            }
        }
        let echo = props.clone();
        self.0.graph.create_expense(description, amount, props).await?;
        let mut result = json!({"status": "created", "description": description, "amount": amount});
        if let Some(out) = result.as_object_mut() {
            for (k, v) in echo {
                out.insert(k, v);
            }
        }
        Ok(result)
    }
}

pub struct GetExpenseReport(pub Arc<Services>);

#[async_trait]
impl Tool for GetExpenseReport {
    fn name(&self) -> &'static str {
        "get_expense_report"
    }
    fn description(&self) -> &'static str {
        "تقرير المصاريف الشهري مع تفصيل حسب الفئة. استخدمها لما يسأل عن مصاريفه أو كم صرف."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "month": {"type": "integer", "minimum": 1, "maximum": 12, "description": "رقم الشهر (الافتراضي: الشهر الحالي)"},
                "year": {"type": "integer", "description": "السنة (الافتراضي: السنة الحالية)"},
                "compare": {"type": "boolean", "description": "قارن مع الشهر السابق"}
            },
            "required": []
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let now = rafiq_core::time::now_local(self.0.tz());
        let month = i64_arg(&args, "month").map(|m| m as u32).unwrap_or(now.month());
        let year = i64_arg(&args, "year").map(|y| y as i32).unwrap_or(now.year());
        if bool_arg(&args, "compare") {
            self.0.graph.query_month_comparison(month, year).await
        } else {
            self.0.graph.query_monthly_report(month, year).await
        }
    }
}

pub struct GetDebtSummary(pub Arc<Services>);

#[async_trait]
impl Tool for GetDebtSummary {
    fn name(&self) -> &'static str {
        "get_debt_summary"
    }
    fn description(&self) -> &'static str {
        "ملخص الديون: كم تطلب وكم عليك. استخدمها لما يسأل عن الديون."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }
    async fn invoke(&self, _args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        self.0.graph.query_debt_summary().await
    }
}

pub struct RecordDebt(pub Arc<Services>);

#[async_trait]
impl Tool for RecordDebt {
    fn name(&self) -> &'static str {
        "record_debt"
    }
    fn description(&self) -> &'static str {
        "سجّل دين جديد (لك أو عليك)."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "person": {"type": "string", "description": "اسم الشخص"},
                "amount": {"type": "number", "description": "المبلغ بالريال"},
                "direction": {
                    "type": "string",
                    "enum": ["i_owe", "owed_to_me"],
                    "description": "i_owe=عليّ، owed_to_me=لي عنده"
                },
                "reason": {"type": "string", "description": "سبب الدين"}
            },
            "required": ["person", "amount", "direction"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let person = match required_str(&args, "person", "اسم الشخص مطلوب") {
            Ok(p) => p,
            Err(e) => return Ok(e),
        };
        let Some(amount) = f64_arg(&args, "amount") else {
            return Ok(json!({"error": "المبلغ مطلوب"}));
        };
        let direction = str_arg(&args, "direction").unwrap_or("i_owe");
        let mut props = Map::new();
        if let Some(reason) = str_arg(&args, "reason") {
            props.insert("reason".into(), json!(reason));
        }
        self.0.graph.upsert_debt(person, amount, direction, props).await?;
        Ok(json!({
            "status": "created",
            "person": person,
            "amount": amount,
            "direction": rafiq_graph::normalize::normalize_direction(direction).to_string(),
        }))
    }
}

pub struct PayDebt(pub Arc<Services>);

#[async_trait]
impl Tool for PayDebt {
    fn name(&self) -> &'static str {
        "pay_debt"
    }
    fn description(&self) -> &'static str {
        "سجّل سداد دين (كلي أو جزئي)."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "person": {"type": "string", "description": "اسم الشخص"},
                "amount": {"type": "number", "description": "المبلغ المسدد بالريال"},
                "direction": {
                    "type": "string",
                    "enum": ["i_owe", "owed_to_me"],
                    "description": "اتجاه الدين (اختياري — يُحدد تلقائياً لو في دين واحد)"
                }
            },
            "required": ["person", "amount"]
        })
    }
    async fn invoke(&self, args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let person = match required_str(&args, "person", "اسم الشخص مطلوب") {
            Ok(p) => p,
            Err(e) => return Ok(e),
        };
        let Some(amount) = f64_arg(&args, "amount") else {
            return Ok(json!({"error": "المبلغ مطلوب"}));
        };
        self.0
            .graph
            .record_debt_payment(person, amount, str_arg(&args, "direction"))
            .await
    }
}

pub struct GetDailyPlan(pub Arc<Services>);

#[async_trait]
impl Tool for GetDailyPlan {
    fn name(&self) -> &'static str {
        "get_daily_plan"
    }
    fn description(&self) -> &'static str {
        "اعرض خطة اليوم: التذكيرات والمهام والديون."
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }
    async fn invoke(&self, _args: Value, _session_id: &str) -> Result<Value, RafiqError> {
        let plan = self.0.graph.query_daily_plan().await?;
        Ok(json!({"plan": plan}))
    }
}
