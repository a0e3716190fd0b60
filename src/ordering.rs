use crate::schema::normalize;
use crate::variance::VarianceRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sort key for any row whose label is absent from the ordering source.
/// Larger than any real order number, so unmapped rows land last.
pub const UNMAPPED_SORT_KEY: u32 = u32::MAX;

/// Where the canonical presentation order comes from: the source
/// statement's own row sequence, or explicit per-label order numbers from
/// the mapping workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderingSource {
    StatementOrder(Vec<String>),
    ExplicitKeys(HashMap<String, u32>),
}

impl OrderingSource {
    pub fn key_for(&self, label: &str) -> u32 {
        let target = normalize(label);
        match self {
            Self::StatementOrder(labels) => labels
                .iter()
                .position(|l| normalize(l) == target)
                .map(|i| i as u32)
                .unwrap_or(UNMAPPED_SORT_KEY),
            Self::ExplicitKeys(keys) => keys
                .iter()
                .find(|(l, _)| normalize(l) == target)
                .map(|(_, k)| *k)
                .unwrap_or(UNMAPPED_SORT_KEY),
        }
    }
}

/// Sorts rows ascending by resolved order key. The sort is stable, so rows
/// sharing a key (including all unmapped rows) keep their insertion order.
pub fn sort_rows(rows: &mut [VarianceRow], ordering: &OrderingSource) {
    rows.sort_by_key(|row| ordering.key_for(row.sort_label()));
}
