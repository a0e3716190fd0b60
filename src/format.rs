use crate::ratios::{RatioReport, RatioRow, Rating};
use crate::variance::{RowKind, VarianceReport, VarianceRow};
use serde::{Deserialize, Serialize};

/// Placeholder for undefined values so they are never rendered as numbers.
pub const UNDEFINED: &str = "n/d";

/// Qualitative visual encoding of a movement. Positive deltas on cost rows
/// are unfavorable; on non-cost rows, favorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Favorable,
    Unfavorable,
}

impl Marker {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Favorable => "\u{1F7E2}",
            Self::Unfavorable => "\u{1F534}",
        }
    }
}

/// Marker for a movement value. Operates on the raw numeric, never on a
/// formatted string.
pub fn color_mark(value: f64, is_cost: bool) -> Marker {
    let positive = value > 0.0;
    match (is_cost, positive) {
        (true, true) => Marker::Unfavorable,
        (true, false) => Marker::Favorable,
        (false, true) => Marker::Favorable,
        (false, false) => Marker::Unfavorable,
    }
}

pub fn rating_symbol(rating: Rating) -> &'static str {
    match rating {
        Rating::Good => "\u{1F7E2}",
        Rating::Warning => "\u{1F7E1}",
        Rating::Critical => "\u{1F534}",
        Rating::Unknown => "\u{26AA}",
    }
}

/// Integer-grouped amount with the source locale's `.` group separator:
/// 1234567.8 -> "1.234.568". Non-finite input renders as the undefined
/// placeholder, never as a number.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return UNDEFINED.to_string();
    }
    let negative = value < 0.0;
    let rounded = value.abs().round() as u64;
    let digits = rounded.to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative && rounded > 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// One-decimal percentage with `,` decimal separator: 0.126 -> "12,6%".
pub fn format_percent(ratio: f64) -> String {
    if !ratio.is_finite() {
        return UNDEFINED.to_string();
    }
    format!("{:.1}%", ratio * 100.0).replace('.', ",")
}

pub fn format_thousands_opt(value: Option<f64>) -> String {
    value.map(format_thousands).unwrap_or_else(|| UNDEFINED.to_string())
}

pub fn format_percent_opt(ratio: Option<f64>) -> String {
    value_or_undefined(ratio.map(format_percent))
}

fn value_or_undefined(text: Option<String>) -> String {
    text.unwrap_or_else(|| UNDEFINED.to_string())
}

/// Inverse of the two formatters, for callers that only hold the formatted
/// string. The render path never needs this: `RenderedCell` keeps the raw
/// numeric next to the text.
pub fn parse_formatted(text: &str) -> Option<f64> {
    let cleaned = text.trim();
    if cleaned == UNDEFINED {
        return None;
    }
    let is_percent = cleaned.ends_with('%');
    let normalized = cleaned
        .trim_end_matches('%')
        .replace('.', "")
        .replace(',', ".");
    let number: f64 = normalized.trim().parse().ok()?;
    Some(if is_percent { number / 100.0 } else { number })
}

/// A display cell that carries the raw numeric alongside its text, so sign
/// classification never round-trips through string parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedCell {
    pub raw: Option<f64>,
    pub text: String,
    pub marker: Option<Marker>,
}

impl RenderedCell {
    fn plain(raw: f64, text: String) -> Self {
        Self {
            raw: Some(raw),
            text,
            marker: None,
        }
    }

    fn marked(raw: Option<f64>, text: String, is_cost: bool) -> Self {
        Self {
            raw,
            marker: raw.map(|v| color_mark(v, is_cost)),
            text,
        }
    }
}

/// Variance view row in presentation column order: category, label
/// (detail mode only), value A, value B, delta, delta %.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedVarianceRow {
    pub category: String,
    pub label: Option<String>,
    pub value_a: RenderedCell,
    pub value_b: RenderedCell,
    pub delta: RenderedCell,
    pub delta_pct: RenderedCell,
}

pub fn render_variance_row(row: &VarianceRow, detail_mode: bool) -> RenderedVarianceRow {
    let label = if detail_mode {
        row.label.clone()
    } else {
        // Headline rows keep their label even in collapsed mode; they have
        // no category total to stand in for them.
        (row.kind == RowKind::Headline).then(|| row.label.clone()).flatten()
    };
    RenderedVarianceRow {
        category: row.category.clone().unwrap_or_default(),
        label,
        value_a: RenderedCell::plain(row.value_a, format_thousands(row.value_a)),
        value_b: RenderedCell::plain(row.value_b, format_thousands(row.value_b)),
        delta: RenderedCell::marked(Some(row.delta), format_thousands(row.delta), row.is_cost),
        delta_pct: RenderedCell::marked(
            row.delta_pct,
            format_percent_opt(row.delta_pct),
            row.is_cost,
        ),
    }
}

pub fn render_variance_report(
    report: &VarianceReport,
    detail_mode: bool,
) -> Vec<RenderedVarianceRow> {
    report
        .rows
        .iter()
        .map(|row| render_variance_row(row, detail_mode))
        .collect()
}

/// Ratio view row: name, formula, value and rating marker per period,
/// threshold description.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedRatioRow {
    pub name: String,
    pub formula: String,
    pub value_a: RenderedCell,
    pub value_b: RenderedCell,
    pub threshold: String,
    pub rating_a: &'static str,
    pub rating_b: &'static str,
}

pub fn render_ratio_row(row: &RatioRow) -> RenderedRatioRow {
    let format_value = |value: Option<f64>| -> RenderedCell {
        let text = if row.percent {
            format_percent_opt(value)
        } else {
            value_or_undefined(value.map(|v| format!("{:.2}", v).replace('.', ",")))
        };
        RenderedCell {
            raw: value,
            text,
            marker: None,
        }
    };
    RenderedRatioRow {
        name: row.name.clone(),
        formula: row.formula.clone(),
        value_a: format_value(row.value_a),
        value_b: format_value(row.value_b),
        threshold: row.threshold.clone(),
        rating_a: rating_symbol(row.rating_a),
        rating_b: rating_symbol(row.rating_b),
    }
}

pub fn render_ratio_report(report: &RatioReport) -> Vec<RenderedRatioRow> {
    report.rows.iter().map(render_ratio_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands_formatting() {
        assert_eq!(format_thousands(1234567.8), "1.234.568");
        assert_eq!(format_thousands(-500.0), "-500");
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1.000");
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(format_percent(0.126), "12,6%");
        assert_eq!(format_percent(-0.05), "-5,0%");
        assert_eq!(format_percent_opt(None), UNDEFINED);
    }

    #[test]
    fn test_non_finite_input_renders_as_undefined() {
        assert_eq!(format_thousands(f64::NAN), UNDEFINED);
        assert_eq!(format_thousands(f64::INFINITY), UNDEFINED);
        assert_eq!(format_thousands(f64::NEG_INFINITY), UNDEFINED);
        assert_eq!(format_percent(f64::NAN), UNDEFINED);
        assert_eq!(parse_formatted(&format_thousands(f64::NAN)), None);
    }

    #[test]
    fn test_marker_convention() {
        // Cost increase is unfavorable; cost decrease favorable.
        assert_eq!(color_mark(15.0, true), Marker::Unfavorable);
        assert_eq!(color_mark(-20.0, true), Marker::Favorable);
        // Revenue increase favorable; zero or decrease unfavorable.
        assert_eq!(color_mark(15.0, false), Marker::Favorable);
        assert_eq!(color_mark(0.0, false), Marker::Unfavorable);
    }

    #[test]
    fn test_format_parse_round_trip_preserves_sign() {
        for value in [-1234.0, -1.0, 0.0, 17.0, 250000.0] {
            let parsed = parse_formatted(&format_thousands(value)).unwrap();
            assert_eq!(parsed > 0.0, value.round() > 0.0);
            assert_eq!(
                color_mark(parsed, true),
                color_mark(value.round(), true),
                "marker classification must survive the round trip for {value}"
            );
        }
        let parsed = parse_formatted(&format_percent(-0.126)).unwrap();
        assert!((parsed - -0.126).abs() < 1e-9);
        assert_eq!(parse_formatted(UNDEFINED), None);
    }

    #[test]
    fn test_rendered_cell_keeps_raw_numeric() {
        let row = VarianceRow {
            kind: RowKind::CategoryTotal,
            category: Some("Personnel Costs".to_string()),
            label: None,
            value_a: 100.0,
            value_b: 80.0,
            delta: -20.0,
            delta_pct: Some(-0.25),
            is_cost: true,
        };
        let rendered = render_variance_row(&row, false);
        assert_eq!(rendered.delta.raw, Some(-20.0));
        assert_eq!(rendered.delta.marker, Some(Marker::Favorable));
        assert_eq!(rendered.delta_pct.text, "-25,0%");
        assert_eq!(rendered.label, None);
    }
}
