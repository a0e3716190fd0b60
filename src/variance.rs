use crate::classifier::LineItem;
use crate::schema::{normalize, PeriodPair};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// Aggregate over every line item sharing a category.
    CategoryTotal,
    /// A single line item, emitted under its category total in detail mode.
    Detail,
    /// A fixed named result row (EBITDA etc.), always surfaced when present.
    Headline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceRow {
    pub kind: RowKind,
    pub category: Option<String>,
    pub label: Option<String>,
    pub value_a: f64,
    pub value_b: f64,
    /// Sign-corrected so that positive always means favorable movement:
    /// `b - a` for cost rows, `a - b` otherwise.
    pub delta: f64,
    /// `delta / |value_b|`, undefined when the comparison value is zero.
    pub delta_pct: Option<f64>,
    pub is_cost: bool,
}

impl VarianceRow {
    /// The label used to resolve this row's presentation order key.
    pub fn sort_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.category.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceReport {
    pub period_a: String,
    pub period_b: String,
    pub rows: Vec<VarianceRow>,
    /// Soft data-quality findings (e.g. a category mixing cost and
    /// non-cost items). Never fatal.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceOptions {
    /// Emit per-item detail rows under eligible category totals.
    pub show_details: bool,
    /// Categories eligible for detail expansion; anything else stays
    /// collapsed to its total regardless of `show_details`.
    pub detail_categories: Vec<String>,
    /// Named result rows appended whenever present in the source.
    pub headline_labels: Vec<String>,
}

impl Default for VarianceOptions {
    fn default() -> Self {
        Self {
            show_details: false,
            detail_categories: Vec::new(),
            headline_labels: vec![
                "Gross Margin".to_string(),
                "EBITDA".to_string(),
                "EBIT".to_string(),
                "EBT".to_string(),
                "Net Result".to_string(),
            ],
        }
    }
}

fn delta_for(value_a: f64, value_b: f64, is_cost: bool) -> f64 {
    if is_cost {
        value_b - value_a
    } else {
        value_a - value_b
    }
}

fn pct_of(delta: f64, value_b: f64) -> Option<f64> {
    (value_b != 0.0).then(|| delta / value_b.abs())
}

/// Computes the period-over-period variance view: one total row per
/// category (in first-appearance order), optional detail rows, and the
/// headline rows.
///
/// The category delta is the sum of member deltas, an exact identity.
pub fn variance_report(
    items: &[LineItem],
    periods: &PeriodPair,
    options: &VarianceOptions,
) -> VarianceReport {
    let mut rows: Vec<VarianceRow> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let detail_set: Vec<String> = options.detail_categories.iter().map(|c| normalize(c)).collect();

    // Categories in first-appearance order.
    let mut categories: Vec<String> = Vec::new();
    for item in items {
        if let Some(cat) = &item.category {
            if !categories.iter().any(|c| c == cat) {
                categories.push(cat.clone());
            }
        }
    }
    debug!(
        "Computing variances for {} line items across {} categories",
        items.len(),
        categories.len()
    );

    for category in &categories {
        let members: Vec<&LineItem> = items
            .iter()
            .filter(|i| i.category.as_deref() == Some(category.as_str()))
            .collect();

        let total_is_cost = members.iter().all(|m| m.is_cost);
        if !total_is_cost && members.iter().any(|m| m.is_cost) {
            warn!(
                "Category '{}' mixes cost and non-cost items; using non-cost convention",
                category
            );
            warnings.push(format!(
                "Category '{}' mixes cost and non-cost items; totals use the non-cost sign convention",
                category
            ));
        }

        let mut total_a = 0.0;
        let mut total_b = 0.0;
        let mut total_delta = 0.0;
        let mut details = Vec::new();

        for item in &members {
            let a = item.value(&periods.baseline);
            let b = item.value(&periods.comparison);
            let delta = delta_for(a, b, item.is_cost);
            total_a += a;
            total_b += b;
            total_delta += delta;

            details.push(VarianceRow {
                kind: RowKind::Detail,
                category: Some(category.clone()),
                label: Some(item.label.clone()),
                value_a: a,
                value_b: b,
                delta,
                delta_pct: pct_of(delta, b),
                is_cost: item.is_cost,
            });
        }

        rows.push(VarianceRow {
            kind: RowKind::CategoryTotal,
            category: Some(category.clone()),
            label: None,
            value_a: total_a,
            value_b: total_b,
            delta: total_delta,
            delta_pct: pct_of(total_delta, total_b),
            is_cost: total_is_cost,
        });

        if options.show_details && detail_set.contains(&normalize(category)) {
            rows.extend(details);
        }
    }

    append_headlines(items, periods, options, &mut rows);

    VarianceReport {
        period_a: periods.baseline.clone(),
        period_b: periods.comparison.clone(),
        rows,
        warnings,
    }
}

/// Appends the fixed headline rows, skipping any already emitted as a
/// detail label or category total.
fn append_headlines(
    items: &[LineItem],
    periods: &PeriodPair,
    options: &VarianceOptions,
    rows: &mut Vec<VarianceRow>,
) {
    let emitted: Vec<String> = rows
        .iter()
        .map(|r| normalize(r.sort_label()))
        .collect();

    for headline in &options.headline_labels {
        let target = normalize(headline);
        if emitted.contains(&target) {
            continue;
        }
        let Some(item) = items.iter().find(|i| normalize(&i.label) == target) else {
            continue;
        };

        let a = item.value(&periods.baseline);
        let b = item.value(&periods.comparison);
        let delta = delta_for(a, b, item.is_cost);
        rows.push(VarianceRow {
            kind: RowKind::Headline,
            category: item.category.clone(),
            label: Some(item.label.clone()),
            value_a: a,
            value_b: b,
            delta,
            delta_pct: pct_of(delta, b),
            is_cost: item.is_cost,
        });
    }
}
