// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expenses and debts: creation, payments with disambiguation, monthly
//! reports, comparisons, and spending alerts.

use chrono::Datelike;
use rafiq_core::{DebtDirection, RafiqError};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::client::build_query;
use crate::cypher::sanitize_props;
use crate::normalize;
use crate::GraphService;

/// Last day of a month.
fn month_end(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

impl GraphService {
    /// Creates an Expense node. The date defaults to today.
    pub async fn create_expense(
        &self,
        description: &str,
        amount: f64,
        props: Map<String, Value>,
    ) -> Result<(), RafiqError> {
        let mut props = sanitize_props(&props);
        props
            .entry("date".to_string())
            .or_insert_with(|| Value::String(self.today()));
        props
            .entry("currency".to_string())
            .or_insert_with(|| Value::String("SAR".into()));

        let sets: Vec<String> = props.keys().map(|k| format!("e.{k} = ${k}")).collect();
        let set_clause = if sets.is_empty() {
            String::new()
        } else {
            format!(" SET {}", sets.join(", "))
        };
        let cypher = format!(
            "CREATE (e:Expense {{id: $id, description: $description, amount: $amount, created_at: $now}}){set_clause}"
        );
        let mut params = vec![
            ("id", Value::String(Uuid::new_v4().to_string())),
            ("description", Value::String(description.into())),
            ("amount", json!(amount)),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        self.client.run(build_query(&cypher, &params)).await
    }

    /// Records a debt against a person. The direction is normalised to one
    /// of the two canonical values before the node is written.
    pub async fn upsert_debt(
        &self,
        person_name: &str,
        amount: f64,
        direction: &str,
        props: Map<String, Value>,
    ) -> Result<(), RafiqError> {
        let direction = normalize::normalize_direction(direction);
        let props = sanitize_props(&props);
        let sets: Vec<String> = props.keys().map(|k| format!("d.{k} = ${k}")).collect();
        let set_clause = if sets.is_empty() {
            String::new()
        } else {
            format!(" SET {}", sets.join(", "))
        };
        let cypher = format!(
            "MERGE (p:Person {{name: $person_name}})
             ON CREATE SET p.created_at = $now
             CREATE (d:Debt {{id: $id, amount: $amount, direction: $direction, status: 'open', created_at: $now}}){set_clause}
             MERGE (d)-[:INVOLVES]->(p)"
        );
        let mut params = vec![
            ("person_name", Value::String(person_name.into())),
            ("id", Value::String(Uuid::new_v4().to_string())),
            ("amount", json!(amount)),
            ("direction", Value::String(direction.to_string())),
            ("now", Value::String(self.now())),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        self.client.run(build_query(&cypher, &params)).await
    }

    /// All open/partial debts with totals and net position.
    pub async fn query_debt_summary(&self) -> Result<Value, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (d:Debt)-[:INVOLVES]->(p:Person)
                 WHERE d.status IN ['open', 'partial']
                 RETURN p.name AS person, d.amount AS amount, d.direction AS direction,
                        d.status AS status, d.original_amount AS original, d.reason AS reason",
                &[],
            ))
            .await?;

        let mut total_i_owe = 0.0;
        let mut total_owed_to_me = 0.0;
        let mut debts = Vec::new();
        for row in &rows {
            let person: String = row.get("person").unwrap_or_default();
            let amount: f64 = row.get("amount").unwrap_or_default();
            let direction: String = row.get("direction").unwrap_or_default();
            let status: String = row.get("status").unwrap_or_default();
            let original: f64 = row.get("original").unwrap_or_default();
            let reason: String = row.get("reason").unwrap_or_default();
            if direction == DebtDirection::IOwe.to_string() {
                total_i_owe += amount;
            } else {
                total_owed_to_me += amount;
            }
            debts.push(json!({
                "person": person,
                "amount": amount,
                "direction": direction,
                "status": status,
                "original_amount": original,
                "reason": reason,
            }));
        }

        Ok(json!({
            "total_i_owe": total_i_owe,
            "total_owed_to_me": total_owed_to_me,
            "net_position": total_owed_to_me - total_i_owe,
            "debts": debts,
        }))
    }

    /// Records a payment against a person's open/partial debt. More than
    /// one match returns `disambiguation_needed` with the options.
    pub async fn record_debt_payment(
        &self,
        person: &str,
        amount: f64,
        direction: Option<&str>,
    ) -> Result<Value, RafiqError> {
        let direction = direction.map(normalize::normalize_direction);
        let direction_clause = if direction.is_some() {
            "AND d.direction = $direction"
        } else {
            ""
        };
        let cypher = format!(
            "MATCH (d:Debt)-[:INVOLVES]->(p:Person)
             WHERE toLower(p.name) CONTAINS toLower($person)
               AND d.status IN ['open', 'partial']
               {direction_clause}
             RETURN id(d) AS debt_id, d.amount AS amount, d.direction AS direction,
                    p.name AS person, d.original_amount AS original, d.reason AS reason
             ORDER BY d.amount DESC"
        );
        let mut params = vec![("person", Value::String(person.into()))];
        if let Some(d) = direction {
            params.push(("direction", Value::String(d.to_string())));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;

        if rows.is_empty() {
            return Ok(json!({"error": format!("No open debt found for '{person}'")}));
        }
        if rows.len() > 1 {
            let options: Vec<Value> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    json!({
                        "index": i + 1,
                        "debt_id": row.get::<i64>("debt_id").unwrap_or_default(),
                        "current_amount": row.get::<f64>("amount").unwrap_or_default(),
                        "direction": row.get::<String>("direction").unwrap_or_default(),
                        "person": row.get::<String>("person").unwrap_or_default(),
                        "original_amount": row.get::<f64>("original").unwrap_or_default(),
                        "reason": row.get::<String>("reason").unwrap_or_default(),
                    })
                })
                .collect();
            return Ok(json!({"disambiguation_needed": true, "options": options}));
        }

        self.apply_debt_payment(&rows[0], amount).await
    }

    /// Applies a payment to a specific debt by node id.
    pub async fn apply_debt_payment_by_id(&self, debt_id: i64, amount: f64) -> Result<Value, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (d:Debt)-[:INVOLVES]->(p:Person)
                 WHERE id(d) = $debt_id
                 RETURN id(d) AS debt_id, d.amount AS amount, d.direction AS direction,
                        p.name AS person, d.original_amount AS original, d.reason AS reason",
                &[("debt_id", Value::from(debt_id))],
            ))
            .await?;
        match row {
            Some(row) => self.apply_debt_payment(&row, amount).await,
            None => Ok(json!({"error": "Debt not found"})),
        }
    }

    /// Reduces the debt and transitions open → partial → paid at zero.
    async fn apply_debt_payment(&self, row: &neo4rs::Row, amount: f64) -> Result<Value, RafiqError> {
        let debt_id: i64 = row.get("debt_id").unwrap_or_default();
        let current: f64 = row.get("amount").unwrap_or_default();
        let direction: String = row.get("direction").unwrap_or_default();
        let person: String = row.get("person").unwrap_or_default();
        let mut original: f64 = row.get("original").unwrap_or_default();
        if original == 0.0 {
            original = current;
        }

        // DebtPayment record preserves the payment history on the debt.
        let payment = "MATCH (d:Debt) WHERE id(d) = $debt_id
                       CREATE (dp:DebtPayment {id: $pid, amount: $amount, date: $today})
                       CREATE (dp)-[:RELATED_TO]->(d)";
        if let Err(e) = self
            .client
            .run(build_query(
                payment,
                &[
                    ("debt_id", Value::from(debt_id)),
                    ("pid", Value::String(Uuid::new_v4().to_string())),
                    ("amount", json!(amount)),
                    ("today", Value::String(self.today())),
                ],
            ))
            .await
        {
            debug!(error = %e, "debt payment record skipped");
        }

        let remaining = current - amount;
        if remaining <= 0.0 {
            self.client
                .run(build_query(
                    "MATCH (d:Debt) WHERE id(d) = $debt_id
                     SET d.amount = 0, d.status = 'paid', d.paid_at = $now, d.original_amount = $orig",
                    &[
                        ("debt_id", Value::from(debt_id)),
                        ("now", Value::String(self.now())),
                        ("orig", json!(original)),
                    ],
                ))
                .await?;
            Ok(json!({
                "person": person, "paid": amount, "remaining": 0,
                "status": "paid", "direction": direction,
            }))
        } else {
            self.client
                .run(build_query(
                    "MATCH (d:Debt) WHERE id(d) = $debt_id
                     SET d.amount = $remaining, d.status = 'partial', d.original_amount = $orig",
                    &[
                        ("debt_id", Value::from(debt_id)),
                        ("remaining", json!(remaining)),
                        ("orig", json!(original)),
                    ],
                ))
                .await?;
            Ok(json!({
                "person": person, "paid": amount, "remaining": remaining,
                "status": "partial", "direction": direction,
            }))
        }
    }

    /// Monthly spending report with category breakdown.
    pub async fn query_monthly_report(&self, month: u32, year: i32) -> Result<Value, RafiqError> {
        let start = format!("{year}-{month:02}-01");
        let end = format!("{year}-{month:02}-{:02}", month_end(year, month));
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (e:Expense)
                 WHERE e.date >= $start AND e.date <= $end
                 RETURN e.category AS category, sum(e.amount) AS total, count(e) AS cnt
                 ORDER BY total DESC",
                &[
                    ("start", Value::String(start)),
                    ("end", Value::String(end)),
                ],
            ))
            .await?;

        let mut grand_total = 0.0;
        let mut raw = Vec::new();
        for row in &rows {
            let category: String = row.get("category").unwrap_or_default();
            let total: f64 = row.get("total").unwrap_or_default();
            let cnt: i64 = row.get("cnt").unwrap_or_default();
            grand_total += total;
            raw.push((category, total, cnt));
        }

        let categories: Vec<Value> = raw
            .into_iter()
            .map(|(category, total, cnt)| {
                let pct = if grand_total > 0.0 {
                    (total / grand_total * 1000.0).round() / 10.0
                } else {
                    0.0
                };
                json!({
                    "category": if category.is_empty() { "uncategorized".into() } else { category },
                    "total": total,
                    "count": cnt,
                    "percentage": pct,
                })
            })
            .collect();

        Ok(json!({
            "month": month,
            "year": year,
            "total": grand_total,
            "currency": "SAR",
            "by_category": categories,
        }))
    }

    /// Current month vs previous month comparison.
    pub async fn query_month_comparison(&self, month: u32, year: i32) -> Result<Value, RafiqError> {
        let mut current = self.query_monthly_report(month, year).await?;
        let (prev_month, prev_year) = if month > 1 {
            (month - 1, year)
        } else {
            (12, year - 1)
        };
        let previous = self.query_monthly_report(prev_month, prev_year).await?;

        let cur_total = current["total"].as_f64().unwrap_or(0.0);
        let prev_total = previous["total"].as_f64().unwrap_or(0.0);
        let diff = cur_total - prev_total;
        let pct_change = if prev_total > 0.0 {
            (diff / prev_total * 1000.0).round() / 10.0
        } else {
            0.0
        };

        current["comparison"] = json!({
            "previous_month": prev_month,
            "previous_year": prev_year,
            "previous_total": prev_total,
            "difference": (diff * 100.0).round() / 100.0,
            "percentage_change": pct_change,
        });
        Ok(current)
    }

    /// Flags categories where the current month exceeds 1.4x of the
    /// trailing 3-month average. Empty string when nothing is flagged.
    pub async fn query_spending_alerts(&self) -> Result<String, RafiqError> {
        let now = rafiq_core::time::now_local(self.tz());
        let (year, month) = (now.year(), now.month());
        let cur_start = format!("{year}-{month:02}-01");
        let cur_end = format!("{year}-{month:02}-{:02}", month_end(year, month));

        let (mut avg_month, mut avg_year) = (month as i32 - 3, year);
        if avg_month <= 0 {
            avg_month += 12;
            avg_year -= 1;
        }
        let avg_start = format!("{avg_year}-{avg_month:02}-01");
        let (prev_month, prev_year) = if month > 1 {
            (month - 1, year)
        } else {
            (12, year - 1)
        };
        let avg_end = format!(
            "{prev_year}-{prev_month:02}-{:02}",
            month_end(prev_year, prev_month)
        );

        let avg_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (e:Expense)
                 WHERE e.date >= $start AND e.date <= $end
                 RETURN e.category AS category, sum(e.amount) / 3.0 AS monthly_avg",
                &[
                    ("start", Value::String(avg_start)),
                    ("end", Value::String(avg_end)),
                ],
            ))
            .await?;
        let mut avg_map = std::collections::HashMap::new();
        for row in &avg_rows {
            let category: String = row.get("category").unwrap_or_default();
            let avg: f64 = row.get("monthly_avg").unwrap_or_default();
            let key = if category.is_empty() {
                "uncategorized".to_string()
            } else {
                category
            };
            avg_map.insert(key, avg);
        }

        let cur_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (e:Expense)
                 WHERE e.date >= $start AND e.date <= $end
                 RETURN e.category AS category, sum(e.amount) AS total",
                &[
                    ("start", Value::String(cur_start)),
                    ("end", Value::String(cur_end)),
                ],
            ))
            .await?;

        let mut alerts = Vec::new();
        for row in &cur_rows {
            let category: String = row.get("category").unwrap_or_default();
            let total: f64 = row.get("total").unwrap_or_default();
            let key = if category.is_empty() {
                "uncategorized".to_string()
            } else {
                category
            };
            if let Some(&avg) = avg_map.get(&key) {
                if avg > 0.0 && total > avg * 1.4 {
                    let pct_over = (total - avg) / avg * 100.0;
                    alerts.push(format!(
                        "  ⚠ {key}: {total:.0} SAR (+{pct_over:.0}% above 3-month avg of {avg:.0})"
                    ));
                }
            }
        }

        Ok(if alerts.is_empty() {
            String::new()
        } else {
            format!("Spending alerts:\n{}", alerts.join("\n"))
        })
    }

    /// Auto-creates an Expense from an invoice vision analysis and links it
    /// to the File and vendor Company.
    pub async fn create_expense_from_invoice(
        &self,
        analysis: &Value,
        file_hash: &str,
    ) -> Result<Value, RafiqError> {
        let vendor = analysis["vendor"].as_str().unwrap_or("Unknown").to_string();
        let total = analysis["total_amount"].as_f64().unwrap_or(0.0);
        let currency = analysis["currency"].as_str().unwrap_or("SAR").to_string();
        let date = analysis["date"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| self.today());
        let items = analysis["items"].as_array().cloned().unwrap_or_default();
        let item_names: String = items
            .iter()
            .filter_map(|i| i["name"].as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let category = normalize::guess_expense_category(&vendor, &item_names);

        let mut description = format!("Invoice from {vendor}");
        if !items.is_empty() {
            description.push_str(&format!(" ({} items)", items.len()));
        }

        self.client
            .run(build_query(
                "CREATE (e:Expense {
                     id: $id, description: $desc, amount: $amount, currency: $currency,
                     category: $category, date: $date, vendor: $vendor,
                     source: 'invoice', file_hash: $file_hash, created_at: $now
                 })",
                &[
                    ("id", Value::String(Uuid::new_v4().to_string())),
                    ("desc", Value::String(description.clone())),
                    ("amount", json!(total)),
                    ("currency", Value::String(currency.clone())),
                    ("category", Value::String(category.into())),
                    ("date", Value::String(date.clone())),
                    ("vendor", Value::String(vendor.clone())),
                    ("file_hash", Value::String(file_hash.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;

        let link_file = "MATCH (e:Expense {file_hash: $fh})
                         MATCH (f:File {file_hash: $fh})
                         MERGE (e)-[:FROM_INVOICE]->(f)";
        if let Err(e) = self
            .client
            .run(build_query(link_file, &[("fh", Value::String(file_hash.into()))]))
            .await
        {
            debug!(error = %e, "invoice-expense link skipped");
        }

        self.upsert_company(&vendor, Map::new()).await?;
        let link_vendor = "MATCH (e:Expense {file_hash: $fh})
                           MATCH (c:Company {name: $vendor})
                           MERGE (e)-[:PAID_AT]->(c)";
        if let Err(e) = self
            .client
            .run(build_query(
                link_vendor,
                &[
                    ("fh", Value::String(file_hash.into())),
                    ("vendor", Value::String(vendor.clone())),
                ],
            ))
            .await
        {
            debug!(error = %e, "expense-vendor link skipped");
        }

        Ok(json!({
            "description": description,
            "amount": total,
            "currency": currency,
            "category": normalize::guess_expense_category(&vendor, &item_names),
            "vendor": vendor,
            "date": date,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_end_handles_leap_years() {
        assert_eq!(month_end(2026, 1), 31);
        assert_eq!(month_end(2026, 2), 28);
        assert_eq!(month_end(2028, 2), 29);
        assert_eq!(month_end(2100, 2), 28);
        assert_eq!(month_end(2000, 2), 29);
        assert_eq!(month_end(2026, 4), 30);
    }
}
