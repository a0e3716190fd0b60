use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single line of a loaded statement sheet. `values` is keyed by period
/// column label (e.g. "Accum. 2023", "Budget 2024"); missing cells load as 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRow {
    pub label: String,
    pub category: Option<String>,
    pub order: Option<u32>,
    pub values: BTreeMap<String, f64>,
}

/// A financial statement sheet normalized into a canonical row table.
/// Row order and period column order are preserved from the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub name: String,
    pub periods: Vec<String>,
    pub rows: Vec<StatementRow>,
}

impl Statement {
    /// Build a statement from in-memory rows, for callers that already have
    /// tabular data (and for tests). Rows with an empty label are dropped,
    /// matching loader behavior.
    pub fn from_rows(
        name: impl Into<String>,
        periods: Vec<String>,
        rows: Vec<StatementRow>,
    ) -> Self {
        Self {
            name: name.into(),
            periods,
            rows: rows
                .into_iter()
                .filter(|r| !r.label.trim().is_empty())
                .collect(),
        }
    }

    /// Sum of all rows whose category equals `category`
    /// (case/whitespace-insensitive). `None` when no row matches; an absent
    /// aggregate must stay undefined rather than collapse to zero.
    pub fn sum_by_category(&self, category: &str, period: &str) -> Option<f64> {
        let target = normalize(category);
        let mut total = 0.0;
        let mut matched = false;
        for row in &self.rows {
            if row.category.as_deref().map(normalize).as_deref() == Some(target.as_str()) {
                total += row.values.get(period).copied().unwrap_or(0.0);
                matched = true;
            }
        }
        matched.then_some(total)
    }

    /// First row whose label equals `label` (case/whitespace-insensitive
    /// exact match). `None` when no row matches.
    pub fn value_by_label(&self, label: &str, period: &str) -> Option<f64> {
        let target = normalize(label);
        self.rows
            .iter()
            .find(|row| normalize(&row.label) == target)
            .map(|row| row.values.get(period).copied().unwrap_or(0.0))
    }

    /// Explicit order keys for every row that carries one in the sheet's
    /// own order column. First occurrence wins on duplicate labels,
    /// matching classification.
    pub fn order_keys(&self) -> std::collections::HashMap<String, u32> {
        let mut keys = std::collections::HashMap::new();
        for row in &self.rows {
            if let Some(order) = row.order {
                keys.entry(row.label.trim().to_string()).or_insert(order);
            }
        }
        keys
    }
}

/// One entry of the external mapping workbook: `label -> category[, order]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub label: String,
    pub category: String,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    pub entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    /// First mapping entry for `label`, trimmed-label match.
    pub fn lookup(&self, label: &str) -> Option<&MappingEntry> {
        let target = normalize(label);
        self.entries.iter().find(|e| normalize(&e.label) == target)
    }

    /// Explicit order keys for every mapped label that carries one.
    pub fn order_keys(&self) -> std::collections::HashMap<String, u32> {
        self.entries
            .iter()
            .filter_map(|e| e.order.map(|o| (e.label.trim().to_string(), o)))
            .collect()
    }
}

/// The two comparison endpoints selected by the caller. No ordering is
/// assumed between them: `baseline` is period A, `comparison` is period B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPair {
    pub baseline: String,
    pub comparison: String,
}

impl PeriodPair {
    pub fn new(baseline: impl Into<String>, comparison: impl Into<String>) -> Self {
        Self {
            baseline: baseline.into(),
            comparison: comparison.into(),
        }
    }
}

pub(crate) fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
