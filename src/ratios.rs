use crate::schema::{PeriodPair, Statement};
use log::debug;
use serde::{Deserialize, Serialize};

const DAYS_PER_YEAR: f64 = 365.0;

/// Which statement an operand reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementSource {
    BalanceSheet,
    IncomeStatement,
}

/// A named figure lookup or arithmetic over lookups. Evaluation yields
/// `None` whenever any underlying lookup misses, so an absent aggregate is
/// never mistaken for zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operand {
    /// Sum of all rows with this category (case/whitespace-insensitive).
    Category(StatementSource, String),
    /// First row with this exact label (case/whitespace-insensitive).
    Label(StatementSource, String),
    Sub(Box<Operand>, Box<Operand>),
    /// Absolute value of the sum of the parts; all parts must resolve.
    AbsSum(Vec<Operand>),
}

impl Operand {
    pub fn category(source: StatementSource, name: &str) -> Self {
        Self::Category(source, name.to_string())
    }

    pub fn label(source: StatementSource, name: &str) -> Self {
        Self::Label(source, name.to_string())
    }

    pub fn eval(&self, ctx: &RatioContext, endpoint: Endpoint) -> Option<f64> {
        match self {
            Self::Category(source, name) => {
                let (statement, period) = ctx.resolve(*source, endpoint);
                statement.sum_by_category(name, period)
            }
            Self::Label(source, name) => {
                let (statement, period) = ctx.resolve(*source, endpoint);
                statement.value_by_label(name, period)
            }
            Self::Sub(a, b) => Some(a.eval(ctx, endpoint)? - b.eval(ctx, endpoint)?),
            Self::AbsSum(parts) => {
                let mut total = 0.0;
                for part in parts {
                    total += part.eval(ctx, endpoint)?;
                }
                Some(total.abs())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Baseline,
    Comparison,
}

/// Lookup context for ratio evaluation. Each statement keeps its own period
/// pair because sheets frequently label the same year differently
/// (e.g. "Accum. 2023" vs "2023").
pub struct RatioContext<'a> {
    pub balance_sheet: &'a Statement,
    pub income_statement: &'a Statement,
    pub bs_periods: PeriodPair,
    pub is_periods: PeriodPair,
}

impl<'a> RatioContext<'a> {
    pub fn new(
        balance_sheet: &'a Statement,
        income_statement: &'a Statement,
        bs_periods: PeriodPair,
        is_periods: PeriodPair,
    ) -> Self {
        Self {
            balance_sheet,
            income_statement,
            bs_periods,
            is_periods,
        }
    }

    fn resolve(&self, source: StatementSource, endpoint: Endpoint) -> (&Statement, &str) {
        let (statement, periods) = match source {
            StatementSource::BalanceSheet => (self.balance_sheet, &self.bs_periods),
            StatementSource::IncomeStatement => (self.income_statement, &self.is_periods),
        };
        let period = match endpoint {
            Endpoint::Baseline => &periods.baseline,
            Endpoint::Comparison => &periods.comparison,
        };
        (statement, period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    HigherBetter,
    LowerBetter,
}

/// Band count is configuration, not a second code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandPolicy {
    /// Good/critical against the favorable threshold only.
    Two,
    /// Critical below `low`, warning between, good at/above `high`
    /// (inverted for lower-better metrics).
    Three,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Good,
    Warning,
    Critical,
    /// An operand was missing or a denominator was zero. Never rendered as
    /// a numeric rating.
    Unknown,
}

/// One ratio of the battery, declared as data: operand lookups, a
/// descriptive formula, and the threshold policy. Adding a ratio is adding
/// an entry here, not new control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioSpec {
    pub name: String,
    pub formula: String,
    pub numerator: Operand,
    pub denominator: Operand,
    pub direction: Direction,
    pub thresholds: Thresholds,
    pub threshold_desc: String,
    /// Rendered as a percentage (thresholds stay in raw ratio units).
    pub percent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioRow {
    pub name: String,
    pub formula: String,
    pub threshold: String,
    pub percent: bool,
    pub value_a: Option<f64>,
    pub value_b: Option<f64>,
    pub rating_a: Rating,
    pub rating_b: Rating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioReport {
    pub rows: Vec<RatioRow>,
}

fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

pub fn rate(value: Option<f64>, spec: &RatioSpec, policy: BandPolicy) -> Rating {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return Rating::Unknown;
    };
    let t = spec.thresholds;
    match (policy, spec.direction) {
        (BandPolicy::Two, Direction::HigherBetter) => {
            if v >= t.high {
                Rating::Good
            } else {
                Rating::Critical
            }
        }
        (BandPolicy::Two, Direction::LowerBetter) => {
            if v <= t.low {
                Rating::Good
            } else {
                Rating::Critical
            }
        }
        (BandPolicy::Three, Direction::HigherBetter) => {
            if v >= t.high {
                Rating::Good
            } else if v >= t.low {
                Rating::Warning
            } else {
                Rating::Critical
            }
        }
        (BandPolicy::Three, Direction::LowerBetter) => {
            if v <= t.low {
                Rating::Good
            } else if v <= t.high {
                Rating::Warning
            } else {
                Rating::Critical
            }
        }
    }
}

/// Evaluates every spec against both endpoints with one generic pass.
/// Division by zero and lookup misses degrade to `None`/`Unknown`.
pub fn evaluate_ratios(
    ctx: &RatioContext,
    specs: &[RatioSpec],
    policy: BandPolicy,
) -> RatioReport {
    debug!("Evaluating {} ratio specs ({:?} band policy)", specs.len(), policy);
    let rows = specs
        .iter()
        .map(|spec| {
            let value_a = safe_div(
                spec.numerator.eval(ctx, Endpoint::Baseline),
                spec.denominator.eval(ctx, Endpoint::Baseline),
            );
            let value_b = safe_div(
                spec.numerator.eval(ctx, Endpoint::Comparison),
                spec.denominator.eval(ctx, Endpoint::Comparison),
            );
            RatioRow {
                name: spec.name.clone(),
                formula: spec.formula.clone(),
                threshold: spec.threshold_desc.clone(),
                percent: spec.percent,
                rating_a: rate(value_a, spec, policy),
                rating_b: rate(value_b, spec, policy),
                value_a,
                value_b,
            }
        })
        .collect();
    RatioReport { rows }
}

/// The default battery: liquidity, leverage and profitability ratios with
/// the conventional favorable thresholds.
pub fn default_ratio_specs() -> Vec<RatioSpec> {
    use StatementSource::{BalanceSheet as Bs, IncomeStatement as Is};

    let spec = |name: &str,
                formula: &str,
                numerator: Operand,
                denominator: Operand,
                direction: Direction,
                low: f64,
                high: f64,
                threshold_desc: &str,
                percent: bool| RatioSpec {
        name: name.to_string(),
        formula: formula.to_string(),
        numerator,
        denominator,
        direction,
        thresholds: Thresholds { low, high },
        threshold_desc: threshold_desc.to_string(),
        percent,
    };

    vec![
        spec(
            "Current Ratio",
            "Current Assets / Current Liabilities",
            Operand::category(Bs, "Current Assets"),
            Operand::category(Bs, "Current Liabilities"),
            Direction::HigherBetter,
            1.0,
            1.2,
            "> 1.2",
            false,
        ),
        spec(
            "Acid Test",
            "(Current Assets - Inventory) / Current Liabilities",
            Operand::Sub(
                Box::new(Operand::category(Bs, "Current Assets")),
                Box::new(Operand::label(Bs, "Inventory")),
            ),
            Operand::category(Bs, "Current Liabilities"),
            Direction::HigherBetter,
            0.8,
            1.0,
            "> 1.0",
            false,
        ),
        spec(
            "Debt to Equity",
            "Financial Debt / Equity",
            Operand::category(Bs, "Financial Debt"),
            Operand::category(Bs, "Equity"),
            Direction::LowerBetter,
            1.5,
            2.0,
            "< 1.5",
            false,
        ),
        spec(
            "Leverage",
            "Total Assets / Equity",
            Operand::category(Bs, "Total Assets"),
            Operand::category(Bs, "Equity"),
            Direction::LowerBetter,
            2.0,
            2.5,
            "< 2.0",
            false,
        ),
        spec(
            "ROA",
            "Net Result / Total Assets",
            Operand::category(Bs, "Net Result"),
            Operand::category(Bs, "Total Assets"),
            Direction::HigherBetter,
            0.0,
            0.05,
            "> 5%",
            true,
        ),
        spec(
            "ROE",
            "Net Result / Equity",
            Operand::category(Bs, "Net Result"),
            Operand::category(Bs, "Equity"),
            Direction::HigherBetter,
            0.0,
            0.10,
            "> 10%",
            true,
        ),
        spec(
            "Debt Coverage",
            "EBITDA / Financial Debt",
            Operand::label(Is, "EBITDA"),
            Operand::category(Bs, "Financial Debt"),
            Direction::HigherBetter,
            1.0,
            2.0,
            "> 2.0",
            false,
        ),
    ]
}

/// Labels driving the cash-conversion-cycle lookups, exact-label matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleLabels {
    pub inventory: String,
    pub receivables: String,
    pub payables: String,
    pub revenue: String,
    pub cost_of_goods: String,
    pub freight_out: String,
}

impl Default for CycleLabels {
    fn default() -> Self {
        Self {
            inventory: "Inventory".to_string(),
            receivables: "Trade Receivables".to_string(),
            payables: "Trade Payables".to_string(),
            revenue: "Total Revenue".to_string(),
            cost_of_goods: "Cost of Goods".to_string(),
            freight_out: "Freight Out".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashCycleRow {
    /// Balance-sheet period label this row describes.
    pub period: String,
    pub dio: Option<f64>,
    pub dso: Option<f64>,
    pub dpo: Option<f64>,
    /// DIO + DSO - DPO; undefined when any component is.
    pub cycle: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashCycleReport {
    pub rows: Vec<CashCycleRow>,
}

/// Computes DIO/DSO/DPO and the cycle per endpoint. COGS is the absolute
/// sum of the cost-of-goods and freight-out lines; both must resolve.
pub fn cash_conversion_cycle(ctx: &RatioContext, labels: &CycleLabels) -> CashCycleReport {
    let rows = [Endpoint::Baseline, Endpoint::Comparison]
        .into_iter()
        .map(|endpoint| {
            let bs_period = match endpoint {
                Endpoint::Baseline => ctx.bs_periods.baseline.clone(),
                Endpoint::Comparison => ctx.bs_periods.comparison.clone(),
            };

            let cogs = Operand::AbsSum(vec![
                Operand::label(StatementSource::IncomeStatement, &labels.cost_of_goods),
                Operand::label(StatementSource::IncomeStatement, &labels.freight_out),
            ])
            .eval(ctx, endpoint);
            let revenue =
                Operand::label(StatementSource::IncomeStatement, &labels.revenue).eval(ctx, endpoint);
            let inventory =
                Operand::label(StatementSource::BalanceSheet, &labels.inventory).eval(ctx, endpoint);
            let receivables = Operand::label(StatementSource::BalanceSheet, &labels.receivables)
                .eval(ctx, endpoint);
            let payables =
                Operand::label(StatementSource::BalanceSheet, &labels.payables).eval(ctx, endpoint);

            let dio = safe_div(inventory, cogs).map(|v| (v * DAYS_PER_YEAR).abs());
            let dso = safe_div(receivables, revenue).map(|v| v * DAYS_PER_YEAR);
            let dpo = safe_div(payables, cogs).map(|v| v * DAYS_PER_YEAR);
            let cycle = match (dio, dso, dpo) {
                (Some(dio), Some(dso), Some(dpo)) => Some(dio + dso - dpo),
                _ => None,
            };

            CashCycleRow {
                period: bs_period,
                dio,
                dso,
                dpo,
                cycle,
            }
        })
        .collect();

    CashCycleReport { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StatementRow;
    use std::collections::BTreeMap;

    fn row(label: &str, category: Option<&str>, values: &[(&str, f64)]) -> StatementRow {
        StatementRow {
            label: label.to_string(),
            category: category.map(|c| c.to_string()),
            order: None,
            values: values
                .iter()
                .map(|(p, v)| (p.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn balance_sheet() -> Statement {
        Statement::from_rows(
            "Balance Sheet",
            vec!["2023".to_string(), "2024".to_string()],
            vec![
                row("Cash", Some("Current Assets"), &[("2023", 50.0), ("2024", 70.0)]),
                row("Inventory", Some("Current Assets"), &[("2023", 100.0), ("2024", 200.0)]),
                row("Trade Receivables", Some("Current Assets"), &[("2023", 0.0), ("2024", 40.0)]),
                row("Trade Payables", Some("Current Liabilities"), &[("2023", 100.0), ("2024", 73.0)]),
                row("Bank Loans", Some("Financial Debt"), &[("2023", 90.0), ("2024", 80.0)]),
                row("Share Capital", Some("Equity"), &[("2023", 0.0), ("2024", 120.0)]),
                row("Fixed Assets", Some("Total Assets"), &[("2023", 300.0), ("2024", 320.0)]),
                row("Profit", Some("Net Result"), &[("2023", 12.0), ("2024", 20.0)]),
            ],
        )
    }

    fn income_statement() -> Statement {
        Statement::from_rows(
            "Income Statement",
            vec!["2023".to_string(), "2024".to_string()],
            vec![
                row("Total Revenue", None, &[("2023", 500.0), ("2024", 584.0)]),
                row("Cost of Goods", None, &[("2023", -600.0), ("2024", -700.0)]),
                row("Freight Out", None, &[("2023", -130.0), ("2024", -30.0)]),
                row("EBITDA", None, &[("2023", 60.0), ("2024", 180.0)]),
            ],
        )
    }

    fn ctx<'a>(bs: &'a Statement, is: &'a Statement) -> RatioContext<'a> {
        RatioContext::new(
            bs,
            is,
            PeriodPair::new("2023", "2024"),
            PeriodPair::new("2023", "2024"),
        )
    }

    #[test]
    fn test_current_ratio_good_under_default_thresholds() {
        let bs = Statement::from_rows(
            "Balance Sheet",
            vec!["2023".to_string(), "2024".to_string()],
            vec![
                row("Cash", Some("Current Assets"), &[("2024", 150.0)]),
                row("Trade Payables", Some("Current Liabilities"), &[("2024", 100.0)]),
            ],
        );
        let is = income_statement();
        let report = evaluate_ratios(&ctx(&bs, &is), &default_ratio_specs(), BandPolicy::Two);
        let cr = report.rows.iter().find(|r| r.name == "Current Ratio").unwrap();
        assert_eq!(cr.value_b, Some(1.5));
        assert_eq!(cr.rating_b, Rating::Good);
    }

    #[test]
    fn test_zero_equity_yields_unknown_not_critical() {
        let bs = balance_sheet();
        let is = income_statement();
        let report = evaluate_ratios(&ctx(&bs, &is), &default_ratio_specs(), BandPolicy::Two);
        let de = report.rows.iter().find(|r| r.name == "Debt to Equity").unwrap();
        // Equity sums to zero in 2023.
        assert_eq!(de.value_a, None);
        assert_eq!(de.rating_a, Rating::Unknown);
        assert_eq!(de.value_b, Some(80.0 / 120.0));
    }

    #[test]
    fn test_missing_category_operand_yields_unknown() {
        let bs = Statement::from_rows(
            "Balance Sheet",
            vec!["2024".to_string()],
            vec![row("Cash", Some("Current Assets"), &[("2024", 10.0)])],
        );
        let is = income_statement();
        let context = RatioContext::new(
            &bs,
            &is,
            PeriodPair::new("2024", "2024"),
            PeriodPair::new("2023", "2024"),
        );
        let report = evaluate_ratios(&context, &default_ratio_specs(), BandPolicy::Three);
        let roe = report.rows.iter().find(|r| r.name == "ROE").unwrap();
        assert_eq!(roe.rating_a, Rating::Unknown);
        assert_eq!(roe.rating_b, Rating::Unknown);
    }

    #[test]
    fn test_three_band_rating_lower_better() {
        let spec = &default_ratio_specs()[2]; // Debt to Equity, low 1.5 / high 2.0
        assert_eq!(rate(Some(1.2), spec, BandPolicy::Three), Rating::Good);
        assert_eq!(rate(Some(1.8), spec, BandPolicy::Three), Rating::Warning);
        assert_eq!(rate(Some(2.4), spec, BandPolicy::Three), Rating::Critical);
        assert_eq!(rate(None, spec, BandPolicy::Three), Rating::Unknown);
    }

    #[test]
    fn test_dio_exact_day_count() {
        let bs = balance_sheet();
        let is = income_statement();
        let report = cash_conversion_cycle(&ctx(&bs, &is), &CycleLabels::default());
        // 2023: COGS = |-600 + -130| = 730, inventory 200 in 2024 -> check both rows
        let row_2023 = &report.rows[0];
        assert_eq!(row_2023.dio, Some(100.0 / 730.0 * 365.0));
        let row_2024 = &report.rows[1];
        assert_eq!(row_2024.dio, Some(100.0)); // 200 / 730 * 365 exactly
        assert_eq!(row_2024.dso, Some(40.0 / 584.0 * 365.0)); // 25 days
        assert_eq!(row_2024.dpo, Some(36.5)); // 73 / 730 * 365
        let cycle = row_2024.cycle.unwrap();
        assert!((cycle - (100.0 + 25.0 - 36.5)).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_undefined_when_cogs_line_missing() {
        let bs = balance_sheet();
        let is = Statement::from_rows(
            "Income Statement",
            vec!["2023".to_string(), "2024".to_string()],
            vec![row("Total Revenue", None, &[("2023", 500.0), ("2024", 584.0)])],
        );
        let report = cash_conversion_cycle(&ctx(&bs, &is), &CycleLabels::default());
        assert_eq!(report.rows[1].dio, None);
        assert_eq!(report.rows[1].cycle, None);
        // DSO still resolves: its operands are all present.
        assert!(report.rows[1].dso.is_some());
    }

    #[test]
    fn test_dso_undefined_on_zero_revenue_denominator() {
        let bs = balance_sheet();
        let mut is = income_statement();
        is.rows[0].values.insert("2024".to_string(), 0.0);
        let report = cash_conversion_cycle(&ctx(&bs, &is), &CycleLabels::default());
        assert_eq!(report.rows[1].dso, None);
        assert_eq!(report.rows[1].cycle, None);
    }
}
