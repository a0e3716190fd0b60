use crate::error::Result;
use crate::ratios::RatioReport;
use crate::variance::VarianceReport;
use serde::{Deserialize, Serialize};

/// System instruction sent with every commentary request.
pub const SYSTEM_PROMPT: &str =
    "You are an expert in management control and FP&A, acting as a senior financial analyst.";

/// The input contract of the external commentary service: one system
/// instruction plus one user message embedding the two JSON-serialized
/// tables. The response is free text rendered verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentaryRequest {
    pub system: String,
    pub user: String,
}

/// Serializes the variance and ratio tables into the fixed-shape text
/// payload for the commentary service. Pure; performs no I/O.
pub fn build_commentary_request(
    variance: &VarianceReport,
    ratios: &RatioReport,
) -> Result<CommentaryRequest> {
    let variance_json = serde_json::to_string(&variance.rows)?;
    let ratios_json = serde_json::to_string(&ratios.rows)?;

    let user = format!(
        "You are a senior financial analyst. Analyze the following income statement \
comparing '{period_b}' against '{period_a}'.\n\
Tasks:\n\
- Identify the most relevant variances.\n\
- Comment on positive and negative trends.\n\
- Flag any budget overruns or underperformance.\n\
- Analyze the computed financial ratios.\n\
- Suggest corrective actions or strategic interpretations.\n\
\n\
Income statement variances (JSON):\n{variance_json}\n\
\n\
Financial ratios (JSON):\n{ratios_json}\n",
        period_a = variance.period_a,
        period_b = variance.period_b,
    );

    Ok(CommentaryRequest {
        system: SYSTEM_PROMPT.to_string(),
        user,
    })
}
