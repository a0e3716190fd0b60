use crate::schema::{normalize, MappingTable, Statement};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Keywords that mark a category as expense-type. Localized spellings are
/// kept as alternates because source workbooks mix languages.
const COST_KEYWORDS: &[&str] = &["cost", "costs", "expense", "opex", "costo", "costi", "spesa"];

/// The single sign-convention oracle. Every component that needs the
/// cost/revenue sign must go through this function.
pub fn is_cost_category(category: &str) -> bool {
    let lowered = normalize(category);
    COST_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// A statement row after classification: joined with its mapping entry,
/// deduplicated, and tagged with the cost/revenue sign convention.
/// Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub category: Option<String>,
    pub is_cost: bool,
    pub values: BTreeMap<String, f64>,
}

impl LineItem {
    pub fn value(&self, period: &str) -> f64 {
        self.values.get(period).copied().unwrap_or(0.0)
    }
}

/// Joins the raw statement with the optional mapping table and classifies
/// each line item.
///
/// - Join is by trimmed label; a mapping category wins over the sheet's own
///   `category` column.
/// - Duplicate labels keep the first source occurrence only, so the dropped
///   row's values never reach a total.
/// - A missing or keyword-unmatched category defaults to non-cost.
pub fn classify(statement: &Statement, mapping: Option<&MappingTable>) -> Vec<LineItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::with_capacity(statement.rows.len());

    for row in &statement.rows {
        let key = normalize(&row.label);
        if !seen.insert(key) {
            debug!(
                "Dropping duplicate line item '{}' in '{}' (first occurrence kept)",
                row.label, statement.name
            );
            continue;
        }

        let category = mapping
            .and_then(|m| m.lookup(&row.label))
            .map(|e| e.category.trim().to_string())
            .or_else(|| row.category.as_ref().map(|c| c.trim().to_string()))
            .filter(|c| !c.is_empty());

        let is_cost = category.as_deref().map(is_cost_category).unwrap_or(false);

        items.push(LineItem {
            label: row.label.trim().to_string(),
            category,
            is_cost,
            values: row.values.clone(),
        });
    }

    items
}
