// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory items: upserts with location links, quantity adjustment,
//! moves, usage tracking, duplicate detection, and reports.

use rafiq_core::RafiqError;
use rafiq_vector::SearchFilters;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::build_query;
use crate::cypher::sanitize_props;
use crate::normalize;
use crate::GraphService;

impl GraphService {
    /// Creates or updates an Item. `quantity_mode` is "set" (replace) or
    /// "add" (increment on match). Returns the item state.
    pub async fn upsert_item(
        &self,
        name: &str,
        quantity_mode: &str,
        mut props: Map<String, Value>,
    ) -> Result<Value, RafiqError> {
        let name = self.resolve_entity_name(name, "Item").await?;

        let location = props
            .remove("location")
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|l| normalize::normalize_location(&l));
        if let Some(cat) = props.get("category").and_then(Value::as_str) {
            let normalized = normalize::normalize_category(cat);
            props.insert("category".into(), Value::String(normalized));
        }
        let file_hash = props
            .remove("file_hash")
            .and_then(|v| v.as_str().map(str::to_string));
        let quantity = props
            .remove("quantity")
            .and_then(|v| v.as_i64())
            .unwrap_or(1);

        let props = sanitize_props(&props);
        let extra_sets: Vec<String> = props.keys().map(|k| format!("i.{k} = ${k}")).collect();
        let extra = if extra_sets.is_empty() {
            String::new()
        } else {
            format!(", {}", extra_sets.join(", "))
        };
        let qty_expr = if quantity_mode == "add" {
            "i.quantity + $quantity"
        } else {
            "$quantity"
        };
        let cypher = format!(
            "MERGE (i:Item {{name: $name}})
             ON CREATE SET i.created_at = $now, i.quantity = $quantity, i.status = 'active'{extra}
             ON MATCH SET i.updated_at = $now, i.quantity = {qty_expr}{extra}
             RETURN i.name AS name, i.quantity AS quantity, i.status AS status"
        );
        let mut params = vec![
            ("name", Value::String(name.clone())),
            ("now", Value::String(self.now())),
            ("quantity", Value::from(quantity)),
        ];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;

        let mut result = match rows.first() {
            Some(row) => json!({
                "name": row.get::<String>("name").unwrap_or_default(),
                "quantity": row.get::<i64>("quantity").unwrap_or(quantity),
                "status": row.get::<String>("status").unwrap_or_else(|_| "active".into()),
            }),
            None => json!({"name": name, "quantity": quantity, "status": "active"}),
        };

        if let Some(location) = location {
            self.upsert_location(&location).await?;
            self.client
                .run(build_query(
                    "MATCH (i:Item {name: $name})
                     MATCH (l:Location {path: $location})
                     MERGE (i)-[:STORED_IN]->(l)",
                    &[
                        ("name", Value::String(name.clone())),
                        ("location", Value::String(location.clone())),
                    ],
                ))
                .await?;
            result["location"] = json!(location);
        } else if let Some(row) = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item {name: $name})-[:STORED_IN]->(l:Location)
                 RETURN l.path AS path LIMIT 1",
                &[("name", Value::String(name.clone()))],
            ))
            .await?
        {
            let path: String = row.get("path").unwrap_or_default();
            if !path.is_empty() {
                result["location"] = json!(path);
            }
        }

        if let Some(fh) = file_hash {
            let link = "MATCH (i:Item {name: $name})
                        MATCH (f:File {file_hash: $fh})
                        MERGE (i)-[:FROM_PHOTO]->(f)";
            if let Err(e) = self
                .client
                .run(build_query(
                    link,
                    &[
                        ("name", Value::String(name.clone())),
                        ("fh", Value::String(fh)),
                    ],
                ))
                .await
            {
                debug!(error = %e, "item-file link skipped");
            }
        }

        Ok(result)
    }

    pub async fn upsert_location(&self, path: &str) -> Result<(), RafiqError> {
        self.client
            .run(build_query(
                "MERGE (l:Location {path: $path}) ON CREATE SET l.created_at = $now",
                &[
                    ("path", Value::String(path.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await
    }

    /// Updates item fields; a location change re-links STORED_IN.
    pub async fn update_item(&self, name: &str, mut props: Map<String, Value>) -> Result<Value, RafiqError> {
        let location = props
            .remove("location")
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|l| normalize::normalize_location(&l));
        if let Some(cat) = props.get("category").and_then(Value::as_str) {
            let normalized = normalize::normalize_category(cat);
            props.insert("category".into(), Value::String(normalized));
        }
        let mut props = sanitize_props(&props);
        props.insert("updated_at".into(), Value::String(self.now()));

        let sets: Vec<String> = props.keys().map(|k| format!("i.{k} = ${k}")).collect();
        let cypher = format!(
            "MATCH (i:Item {{name: $name}})
             SET {}
             RETURN i.name AS name, i.quantity AS quantity, i.status AS status",
            sets.join(", ")
        );
        let mut params = vec![("name", Value::String(name.into()))];
        for (k, v) in &props {
            params.push((k.as_str(), v.clone()));
        }
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Item '{name}' not found")}));
        }
        let mut result = json!({
            "name": rows[0].get::<String>("name").unwrap_or_default(),
            "quantity": rows[0].get::<i64>("quantity").unwrap_or_default(),
            "status": rows[0].get::<String>("status").unwrap_or_default(),
        });

        if let Some(location) = location {
            self.client
                .run(build_query(
                    "MATCH (i:Item {name: $name})-[r:STORED_IN]->() DELETE r",
                    &[("name", Value::String(name.into()))],
                ))
                .await?;
            self.upsert_location(&location).await?;
            self.client
                .run(build_query(
                    "MATCH (i:Item {name: $name})
                     MATCH (l:Location {path: $location})
                     MERGE (i)-[:STORED_IN]->(l)",
                    &[
                        ("name", Value::String(name.into())),
                        ("location", Value::String(location.clone())),
                    ],
                ))
                .await?;
            result["location"] = json!(location);
        }
        Ok(result)
    }

    /// Adjusts quantity by delta (negative reduces), clamping at 0, and
    /// touches `last_used_at`.
    pub async fn adjust_item_quantity(&self, name: &str, delta: i64) -> Result<Value, RafiqError> {
        let cypher = "MATCH (i:Item)
                      WHERE toLower(i.name) CONTAINS toLower($name)
                      SET i.quantity = CASE
                          WHEN i.quantity + $delta < 0 THEN 0
                          ELSE i.quantity + $delta
                      END,
                      i.updated_at = $now
                      RETURN i.name AS name, i.quantity AS quantity, i.status AS status";
        let rows = self
            .client
            .fetch_all(build_query(
                cypher,
                &[
                    ("name", Value::String(name.into())),
                    ("delta", Value::from(delta)),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;
        if rows.is_empty() {
            return Ok(json!({"error": format!("Item '{name}' not found")}));
        }
        let item_name: String = rows[0].get("name").unwrap_or_default();
        self.touch_item_last_used(&item_name).await;
        Ok(json!({
            "name": item_name,
            "quantity": rows[0].get::<i64>("quantity").unwrap_or_default(),
            "status": rows[0].get::<String>("status").unwrap_or_default(),
        }))
    }

    /// Moves an item to a new location, re-linking STORED_IN.
    pub async fn move_item(
        &self,
        name: &str,
        to_location: &str,
        _from_location: Option<&str>,
    ) -> Result<Value, RafiqError> {
        let to_location =
            normalize::normalize_location(to_location).unwrap_or_else(|| to_location.to_string());
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item)
                 WHERE toLower(i.name) CONTAINS toLower($name)
                 OPTIONAL MATCH (i)-[:STORED_IN]->(l:Location)
                 RETURN i.name AS name, l.path AS old_location
                 LIMIT 1",
                &[("name", Value::String(name.into()))],
            ))
            .await?;
        let Some(row) = row else {
            return Ok(json!({"error": format!("Item '{name}' not found")}));
        };
        let item_name: String = row.get("name").unwrap_or_default();
        let old_location: String = row.get("old_location").unwrap_or_default();

        self.client
            .run(build_query(
                "MATCH (i:Item {name: $name})-[r:STORED_IN]->() DELETE r",
                &[("name", Value::String(item_name.clone()))],
            ))
            .await?;
        self.upsert_location(&to_location).await?;
        self.client
            .run(build_query(
                "MATCH (i:Item {name: $name})
                 MATCH (l:Location {path: $loc})
                 MERGE (i)-[:STORED_IN]->(l)",
                &[
                    ("name", Value::String(item_name.clone())),
                    ("loc", Value::String(to_location.clone())),
                ],
            ))
            .await?;
        self.client
            .run(build_query(
                "MATCH (i:Item {name: $name}) SET i.updated_at = $now",
                &[
                    ("name", Value::String(item_name.clone())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await?;
        self.touch_item_last_used(&item_name).await;

        Ok(json!({
            "name": item_name,
            "from_location": if old_location.is_empty() { Value::Null } else { json!(old_location) },
            "to_location": to_location,
        }))
    }

    async fn touch_item_last_used(&self, name: &str) {
        let result = self
            .client
            .run(build_query(
                "MATCH (i:Item)
                 WHERE toLower(i.name) CONTAINS toLower($name)
                 SET i.last_used_at = $now",
                &[
                    ("name", Value::String(name.into())),
                    ("now", Value::String(self.now())),
                ],
            ))
            .await;
        if let Err(e) = result {
            debug!(error = %e, "last_used_at touch skipped");
        }
    }

    /// Item lookup by barcode value.
    pub async fn find_item_by_barcode(&self, barcode: &str) -> Result<Option<Value>, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item)
                 WHERE i.barcode = $barcode AND i.status = 'active'
                 OPTIONAL MATCH (i)-[:STORED_IN]->(l:Location)
                 RETURN i.name AS name, i.quantity AS quantity, i.category AS category,
                        i.barcode_type AS barcode_type, l.path AS location
                 LIMIT 1",
                &[("barcode", Value::String(barcode.into()))],
            ))
            .await?;
        Ok(row.map(|r| {
            json!({
                "name": r.get::<String>("name").unwrap_or_default(),
                "quantity": r.get::<i64>("quantity").unwrap_or_default(),
                "category": r.get::<String>("category").unwrap_or_default(),
                "barcode_type": r.get::<String>("barcode_type").unwrap_or_default(),
                "location": r.get::<String>("location").unwrap_or_default(),
            })
        }))
    }

    /// Item created from a photo, looked up via its FROM_PHOTO file.
    pub async fn find_item_by_file_hash(&self, file_hash: &str) -> Result<Option<Value>, RafiqError> {
        let row = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item)-[:FROM_PHOTO]->(f:File {file_hash: $fh})
                 OPTIONAL MATCH (i)-[:STORED_IN]->(l:Location)
                 RETURN i.name AS name, i.quantity AS quantity, i.status AS status, l.path AS location
                 LIMIT 1",
                &[("fh", Value::String(file_hash.into()))],
            ))
            .await?;
        Ok(row.map(|r| {
            json!({
                "name": r.get::<String>("name").unwrap_or_default(),
                "quantity": r.get::<i64>("quantity").unwrap_or_default(),
                "status": r.get::<String>("status").unwrap_or_default(),
                "location": r.get::<String>("location").unwrap_or_default(),
            })
        }))
    }

    /// Items whose name fuzzy-matches the given text, with locations.
    pub async fn find_similar_items(&self, name: &str) -> Result<Vec<Value>, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (i:Item)
                 WHERE coalesce(i.status, 'active') = 'active'
                   AND toLower(i.name) CONTAINS toLower($name)
                 OPTIONAL MATCH (i)-[:STORED_IN]->(l:Location)
                 RETURN i.name AS name, i.quantity AS quantity, l.path AS location
                 LIMIT 5",
                &[("name", Value::String(name.into()))],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.get::<String>("name").unwrap_or_default(),
                    "quantity": r.get::<i64>("quantity").unwrap_or_default(),
                    "location": r.get::<String>("location").unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Inventory listing filtered by search text or category.
    pub async fn query_inventory(
        &self,
        search: Option<&str>,
        category: Option<&str>,
    ) -> Result<String, RafiqError> {
        let mut conditions = vec!["coalesce(i.status, 'active') = 'active'".to_string()];
        let mut params: Vec<(&str, Value)> = Vec::new();
        if let Some(s) = search {
            conditions.push(
                "(toLower(i.name) CONTAINS $search OR toLower(i.description) CONTAINS $search)"
                    .into(),
            );
            params.push(("search", Value::String(s.to_lowercase())));
        }
        if let Some(c) = category {
            conditions.push("toLower(i.category) = $category".into());
            params.push(("category", Value::String(c.to_lowercase())));
        }
        let cypher = format!(
            "MATCH (i:Item)
             WHERE {}
             OPTIONAL MATCH (i)-[:STORED_IN]->(l:Location)
             RETURN i.name AS name, i.quantity AS quantity, i.category AS category,
                    i.condition AS condition, i.brand AS brand, l.path AS location
             ORDER BY i.name
             LIMIT 50",
            conditions.join(" AND ")
        );
        let rows = self.client.fetch_all(build_query(&cypher, &params)).await?;
        if rows.is_empty() {
            let label = search.map(|s| format!(" matching '{s}'")).unwrap_or_default();
            return Ok(format!("No inventory items found{label}."));
        }

        let mut parts = vec!["Inventory items:".to_string()];
        for row in &rows {
            let name: String = row.get("name").unwrap_or_default();
            let qty: i64 = row.get("quantity").unwrap_or_default();
            let brand: String = row.get("brand").unwrap_or_default();
            let category: String = row.get("category").unwrap_or_default();
            let condition: String = row.get("condition").unwrap_or_default();
            let location: String = row.get("location").unwrap_or_default();

            let mut line = format!("  - {name}");
            if qty > 1 {
                line.push_str(&format!(" (x{qty})"));
            }
            if !brand.is_empty() {
                line.push_str(&format!(" [{brand}]"));
            }
            if !category.is_empty() {
                line.push_str(&format!(" ({category})"));
            }
            if !condition.is_empty() && condition != "unknown" {
                line.push_str(&format!(" — {condition}"));
            }
            if !location.is_empty() {
                line.push_str(&format!(" @ {location}"));
            }
            parts.push(line);
        }
        Ok(parts.join("\n"))
    }

    /// Totals by category and location.
    pub async fn query_inventory_summary(&self) -> Result<Value, RafiqError> {
        let totals = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item)
                 WHERE coalesce(i.status, 'active') = 'active'
                 RETURN count(i) AS items, sum(i.quantity) AS quantity",
                &[],
            ))
            .await?;
        let (total_items, total_quantity) = totals
            .map(|r| {
                (
                    r.get::<i64>("items").unwrap_or_default(),
                    r.get::<i64>("quantity").unwrap_or_default(),
                )
            })
            .unwrap_or((0, 0));

        let cat_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (i:Item)
                 WHERE coalesce(i.status, 'active') = 'active'
                 RETURN coalesce(i.category, 'uncategorized') AS cat, count(i) AS cnt, sum(i.quantity) AS qty
                 ORDER BY qty DESC",
                &[],
            ))
            .await?;
        let by_category: Vec<Value> = cat_rows
            .iter()
            .map(|r| {
                json!({
                    "category": r.get::<String>("cat").unwrap_or_default(),
                    "count": r.get::<i64>("cnt").unwrap_or_default(),
                    "quantity": r.get::<i64>("qty").unwrap_or_default(),
                })
            })
            .collect();

        let loc_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (i:Item)-[:STORED_IN]->(l:Location)
                 WHERE coalesce(i.status, 'active') = 'active'
                 RETURN l.path AS path, count(i) AS cnt
                 ORDER BY cnt DESC",
                &[],
            ))
            .await?;
        let by_location: Vec<Value> = loc_rows
            .iter()
            .map(|r| {
                json!({
                    "location": r.get::<String>("path").unwrap_or_default(),
                    "count": r.get::<i64>("cnt").unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({
            "total_items": total_items,
            "total_quantity": total_quantity,
            "by_category": by_category,
            "by_location": by_location,
        }))
    }

    /// Comprehensive report: totals, by category/location/condition,
    /// unplaced items, unused items, and the top quantities.
    pub async fn query_inventory_report(&self) -> Result<Value, RafiqError> {
        let top_n = self.config.inventory.report_top_n;
        let mut summary = self.query_inventory_summary().await?;

        let cond_rows = self
            .client
            .fetch_all(build_query(
                "MATCH (i:Item)
                 WHERE i.status = 'active' AND i.condition IS NOT NULL
                 RETURN i.condition AS condition, count(i) AS cnt
                 ORDER BY cnt DESC",
                &[],
            ))
            .await?;
        summary["by_condition"] = Value::Array(
            cond_rows
                .iter()
                .map(|r| {
                    json!({
                        "condition": r.get::<String>("condition").unwrap_or_default(),
                        "count": r.get::<i64>("cnt").unwrap_or_default(),
                    })
                })
                .collect(),
        );

        let no_loc = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item)
                 WHERE i.status = 'active' AND NOT (i)-[:STORED_IN]->()
                 RETURN count(i) AS cnt",
                &[],
            ))
            .await?;
        summary["without_location"] =
            json!(no_loc.map(|r| r.get::<i64>("cnt").unwrap_or_default()).unwrap_or(0));

        let cutoff = (rafiq_core::time::now_local(self.tz())
            - chrono::Duration::days(self.config.inventory.unused_days))
        .to_rfc3339();
        let unused = self
            .client
            .fetch_one(build_query(
                "MATCH (i:Item)
                 WHERE i.status = 'active'
                   AND (i.last_used_at IS NULL OR i.last_used_at < $cutoff)
                 RETURN count(i) AS cnt",
                &[("cutoff", Value::String(cutoff))],
            ))
            .await?;
        summary["unused_count"] =
            json!(unused.map(|r| r.get::<i64>("cnt").unwrap_or_default()).unwrap_or(0));

        let top_rows = self
            .client
            .fetch_all(build_query(
                &format!(
                    "MATCH (i:Item) WHERE i.status = 'active'
                     RETURN i.name AS name, i.quantity AS quantity, i.category AS category
                     ORDER BY i.quantity DESC
                     LIMIT {top_n}"
                ),
                &[],
            ))
            .await?;
        summary["top_by_quantity"] = Value::Array(
            top_rows
                .iter()
                .map(|r| {
                    json!({
                        "name": r.get::<String>("name").unwrap_or_default(),
                        "quantity": r.get::<i64>("quantity").unwrap_or_default(),
                        "category": r.get::<String>("category").unwrap_or_default(),
                    })
                })
                .collect(),
        );

        Ok(summary)
    }

    /// Items with no recorded use for the given number of days.
    pub async fn query_unused_items(&self, days: Option<i64>) -> Result<Vec<Value>, RafiqError> {
        let days = days.unwrap_or(self.config.inventory.unused_days);
        let cutoff =
            (rafiq_core::time::now_local(self.tz()) - chrono::Duration::days(days)).to_rfc3339();
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (i:Item)
                 WHERE i.status = 'active'
                   AND (i.last_used_at IS NULL OR i.last_used_at < $cutoff)
                 OPTIONAL MATCH (i)-[:STORED_IN]->(l:Location)
                 RETURN i.name AS name, i.quantity AS quantity, i.category AS category,
                        i.last_used_at AS last_used_at, l.path AS location
                 ORDER BY i.last_used_at
                 LIMIT 20",
                &[("cutoff", Value::String(cutoff))],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.get::<String>("name").unwrap_or_default(),
                    "quantity": r.get::<i64>("quantity").unwrap_or_default(),
                    "category": r.get::<String>("category").unwrap_or_default(),
                    "last_used_at": r.get::<String>("last_used_at").unwrap_or_default(),
                    "location": r.get::<String>("location").unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Duplicate candidates by mutual name containment.
    pub async fn detect_duplicate_items(&self) -> Result<Vec<Value>, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (a:Item), (b:Item)
                 WHERE a.status = 'active' AND b.status = 'active'
                   AND id(a) < id(b)
                   AND (toLower(a.name) CONTAINS toLower(b.name)
                        OR toLower(b.name) CONTAINS toLower(a.name))
                 OPTIONAL MATCH (a)-[:STORED_IN]->(la:Location)
                 OPTIONAL MATCH (b)-[:STORED_IN]->(lb:Location)
                 RETURN a.name AS a_name, a.quantity AS a_qty, la.path AS a_loc,
                        b.name AS b_name, b.quantity AS b_qty, lb.path AS b_loc
                 LIMIT 20",
                &[],
            ))
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                json!({
                    "item_a": {
                        "name": r.get::<String>("a_name").unwrap_or_default(),
                        "quantity": r.get::<i64>("a_qty").unwrap_or_default(),
                        "location": r.get::<String>("a_loc").unwrap_or_default(),
                    },
                    "item_b": {
                        "name": r.get::<String>("b_name").unwrap_or_default(),
                        "quantity": r.get::<i64>("b_qty").unwrap_or_default(),
                        "location": r.get::<String>("b_loc").unwrap_or_default(),
                    },
                })
            })
            .collect())
    }

    /// Duplicate candidates by vector similarity over item photos
    /// (threshold 0.8, capped at 20 pairs).
    pub async fn detect_duplicate_items_vector(&self) -> Result<Vec<Value>, RafiqError> {
        let rows = self
            .client
            .fetch_all(build_query(
                "MATCH (i:Item) WHERE i.status = 'active' RETURN i.name AS name",
                &[],
            ))
            .await?;
        let names: Vec<String> = rows.iter().filter_map(|r| r.get("name").ok()).collect();
        if names.len() < 2 {
            return Ok(Vec::new());
        }

        let mut duplicates = Vec::new();
        let mut checked: std::collections::HashSet<(String, String)> = Default::default();
        for name in &names {
            let hits = match self
                .vector
                .search(name, 3, &SearchFilters::source("file_inventory_item"))
                .await
            {
                Ok(h) => h,
                Err(_) => continue,
            };
            for hit in hits {
                let other = hit.text.clone();
                if !other.is_empty()
                    && &other != name
                    && hit.score >= 0.8
                    && !checked.contains(&(name.clone(), other.clone()))
                {
                    duplicates.push(json!({
                        "item_a": name,
                        "item_b": other,
                        "similarity": (hit.score * 100.0).round() / 100.0,
                    }));
                    checked.insert((name.clone(), other.clone()));
                    checked.insert((other, name.clone()));
                }
            }
            if duplicates.len() >= 20 {
                break;
            }
        }
        Ok(duplicates)
    }
}
