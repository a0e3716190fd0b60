//! # Statement Analyzer
//!
//! A library for reconciling financial statement spreadsheets (income
//! statement, balance sheet) into period-over-period comparison views:
//! sign-correct variances, category subtotals, a financial ratio battery,
//! the cash conversion cycle, and a serialized payload for an external
//! LLM commentary service.
//!
//! ## Core Concepts
//!
//! - **Statement**: a spreadsheet sheet normalized into an ordered row table
//! - **Classification**: line items tagged cost/non-cost by a keyword oracle,
//!   driving the variance sign convention (positive always means favorable)
//! - **Undefined propagation**: missing aggregates and zero denominators stay
//!   undefined (`None`/`Unknown`) instead of degrading to zero or `NaN`
//! - **View isolation**: a structural failure in one view never blocks the
//!   others
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_analyzer::*;
//!
//! let income = loader::load_statement("statements.xlsx", "Income Statement")?;
//! let balance = loader::load_statement("statements.xlsx", "Balance Sheet")?;
//!
//! let input = AnalysisInput {
//!     income_statement: Some(income),
//!     balance_sheet: Some(balance),
//!     mapping: None,
//! };
//! let options = AnalysisOptions::new(PeriodPair::new("Accum. 2023", "Accum. 2024"));
//! let report = StatementAnalyzer::analyze(&input, &options);
//! ```

pub mod classifier;
pub mod error;
pub mod format;
pub mod loader;
pub mod narrative;
pub mod ordering;
pub mod ratios;
pub mod schema;
pub mod variance;

#[cfg(feature = "commentary")]
pub mod llm;

pub use classifier::{classify, is_cost_category, LineItem};
pub use error::{AnalysisError, Result};
pub use format::*;
pub use narrative::{build_commentary_request, CommentaryRequest};
pub use ordering::{sort_rows, OrderingSource, UNMAPPED_SORT_KEY};
pub use ratios::*;
pub use schema::*;
pub use variance::*;

use log::{debug, info};

/// The statements of one analysis run. Each view validates the inputs it
/// needs, so a missing workbook disables only the dependent views.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub income_statement: Option<Statement>,
    pub balance_sheet: Option<Statement>,
    pub mapping: Option<MappingTable>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Comparison endpoints on the income statement.
    pub periods: PeriodPair,
    /// Endpoints on the balance sheet, when its columns are labeled
    /// differently (e.g. "2023" vs "Accum. 2023"). Defaults to `periods`.
    pub balance_sheet_periods: Option<PeriodPair>,
    pub variance: VarianceOptions,
    /// Presentation ordering. When `None`: explicit order keys from the
    /// statement's order column and the mapping (mapping wins per label) if
    /// any exist, else the income statement's own row sequence.
    pub ordering: Option<OrderingSource>,
    pub ratio_specs: Vec<RatioSpec>,
    pub band_policy: BandPolicy,
    pub cycle_labels: CycleLabels,
}

impl AnalysisOptions {
    pub fn new(periods: PeriodPair) -> Self {
        Self {
            periods,
            balance_sheet_periods: None,
            variance: VarianceOptions::default(),
            ordering: None,
            ratio_specs: default_ratio_specs(),
            band_policy: BandPolicy::Two,
            cycle_labels: CycleLabels::default(),
        }
    }
}

/// One result slot per view: errors are recovered at the view boundary and
/// reported alongside the views that did succeed.
#[derive(Debug)]
pub struct AnalysisReport {
    pub variance: Result<VarianceReport>,
    pub ratios: Result<RatioReport>,
    pub cash_cycle: Result<CashCycleReport>,
}

pub struct StatementAnalyzer;

impl StatementAnalyzer {
    pub fn analyze(input: &AnalysisInput, options: &AnalysisOptions) -> AnalysisReport {
        info!(
            "Analyzing '{}' vs '{}'",
            options.periods.baseline, options.periods.comparison
        );

        AnalysisReport {
            variance: Self::variance_view(input, options),
            ratios: Self::ratio_view(input, options),
            cash_cycle: Self::cash_cycle_view(input, options),
        }
    }

    fn variance_view(input: &AnalysisInput, options: &AnalysisOptions) -> Result<VarianceReport> {
        let statement = input
            .income_statement
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingInput("income statement".to_string()))?;

        let items = classify(statement, input.mapping.as_ref());
        debug!("Classified {} line items", items.len());

        let mut report = variance_report(&items, &options.periods, &options.variance);
        let ordering = Self::resolve_ordering(input, options, statement);
        sort_rows(&mut report.rows, &ordering);
        Ok(report)
    }

    fn ratio_view(input: &AnalysisInput, options: &AnalysisOptions) -> Result<RatioReport> {
        let ctx = Self::ratio_context(input, options)?;
        Ok(evaluate_ratios(&ctx, &options.ratio_specs, options.band_policy))
    }

    fn cash_cycle_view(input: &AnalysisInput, options: &AnalysisOptions) -> Result<CashCycleReport> {
        let ctx = Self::ratio_context(input, options)?;
        Ok(cash_conversion_cycle(&ctx, &options.cycle_labels))
    }

    fn ratio_context<'a>(
        input: &'a AnalysisInput,
        options: &AnalysisOptions,
    ) -> Result<RatioContext<'a>> {
        let balance_sheet = input
            .balance_sheet
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingInput("balance sheet".to_string()))?;
        let income_statement = input
            .income_statement
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingInput("income statement".to_string()))?;

        let bs_periods = options
            .balance_sheet_periods
            .clone()
            .unwrap_or_else(|| options.periods.clone());

        Ok(RatioContext::new(
            balance_sheet,
            income_statement,
            bs_periods,
            options.periods.clone(),
        ))
    }

    fn resolve_ordering(
        input: &AnalysisInput,
        options: &AnalysisOptions,
        statement: &Statement,
    ) -> OrderingSource {
        if let Some(ordering) = &options.ordering {
            return ordering.clone();
        }
        // Explicit keys from the sheet's own order column, overlaid by the
        // mapping workbook's keys where both name a label.
        let mut keys = statement.order_keys();
        if let Some(mapping) = &input.mapping {
            keys.extend(mapping.order_keys());
        }
        if !keys.is_empty() {
            return OrderingSource::ExplicitKeys(keys);
        }
        OrderingSource::StatementOrder(Self::presentation_sequence(
            statement,
            input.mapping.as_ref(),
        ))
    }

    /// The source visual sequence extended with category names: each
    /// category enters at its first member's position, so a regrouped
    /// total sorts where its items began in the statement.
    fn presentation_sequence(
        statement: &Statement,
        mapping: Option<&MappingTable>,
    ) -> Vec<String> {
        let mut sequence: Vec<String> = Vec::new();
        let push_unique = |sequence: &mut Vec<String>, entry: String| {
            let key = schema::normalize(&entry);
            if !sequence.iter().any(|s| schema::normalize(s) == key) {
                sequence.push(entry);
            }
        };
        for row in &statement.rows {
            let category = mapping
                .and_then(|m| m.lookup(&row.label))
                .map(|e| e.category.clone())
                .or_else(|| row.category.clone());
            if let Some(category) = category {
                push_unique(&mut sequence, category);
            }
            push_unique(&mut sequence, row.label.clone());
        }
        sequence
    }
}

/// Convenience wrapper mirroring the struct API.
pub fn analyze(input: &AnalysisInput, options: &AnalysisOptions) -> AnalysisReport {
    StatementAnalyzer::analyze(input, options)
}

/// Builds the commentary request and calls the external service. Requires
/// both numeric views; a failure here skips only the commentary section.
#[cfg(feature = "commentary")]
pub async fn generate_commentary(
    client: &llm::CommentaryClient,
    report: &AnalysisReport,
) -> Result<String> {
    let variance = report.variance.as_ref().map_err(|e| {
        AnalysisError::Commentary(format!("variance view unavailable: {e}"))
    })?;
    let ratios = report.ratios.as_ref().map_err(|e| {
        AnalysisError::Commentary(format!("ratio view unavailable: {e}"))
    })?;

    let request = build_commentary_request(variance, ratios)?;
    client.generate(&request).await
}
