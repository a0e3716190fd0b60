use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;

use crate::error::{AnalysisError, Result};
use crate::schema::{normalize, MappingEntry, MappingTable, Statement, StatementRow};

/// Substring that identifies the label column header, and with it the
/// header row itself. Localized alternates observed in source workbooks.
const LABEL_HEADERS: &[&str] = &["item", "voce", "label"];
const CATEGORY_HEADERS: &[&str] = &["category", "tipo"];
const ORDER_HEADERS: &[&str] = &["order", "ordine"];

/// Sheet names of an uploaded workbook, for pass-through inspection of
/// workbooks the core logic does not consume.
pub fn sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path)?;
    Ok(workbook.sheet_names())
}

/// Loads one statement sheet into the canonical row table.
///
/// The header row is not assumed to be first: rows are scanned top-down for
/// the first one containing a label cell ("Item" or an alternate,
/// case-insensitive substring). Missing numeric cells read as zero; rows
/// without a label are skipped.
pub fn load_statement<P: AsRef<Path>>(path: P, sheet: &str) -> Result<Statement> {
    let range = open_sheet(path, sheet)?;
    parse_sheet(sheet, range.rows())
}

/// Loads the optional mapping workbook sheet (`label, category[, order]`).
pub fn load_mapping<P: AsRef<Path>>(path: P, sheet: &str) -> Result<MappingTable> {
    let range = open_sheet(path, sheet)?;
    parse_mapping(sheet, range.rows())
}

fn open_sheet<P: AsRef<Path>>(path: P, sheet: &str) -> Result<calamine::Range<Data>> {
    let mut workbook = open_workbook_auto(path)?;
    let target = normalize(sheet);
    // Best-effort sheet match: exact (case/whitespace-insensitive) first,
    // then substring.
    let names = workbook.sheet_names();
    let actual = names
        .iter()
        .find(|name| normalize(name) == target)
        .or_else(|| names.iter().find(|name| normalize(name).contains(&target)))
        .cloned()
        .ok_or_else(|| AnalysisError::SheetNotFound {
            sheet: sheet.to_string(),
        })?;

    Ok(workbook.worksheet_range(&actual)?)
}

pub(crate) fn parse_sheet<'a, I>(sheet: &str, rows: I) -> Result<Statement>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let rows: Vec<&[Data]> = rows.into_iter().collect();
    let (header_idx, label_col) = find_header(&rows).ok_or_else(|| AnalysisError::HeaderNotFound {
        sheet: sheet.to_string(),
    })?;
    let header = rows[header_idx];

    let mut category_col = None;
    let mut order_col = None;
    let mut period_cols: Vec<(usize, String)> = Vec::new();

    for (idx, cell) in header.iter().enumerate() {
        if idx == label_col {
            continue;
        }
        let Some(name) = cell_text(cell) else { continue };
        let lowered = normalize(&name);
        if CATEGORY_HEADERS.contains(&lowered.as_str()) {
            category_col = Some(idx);
        } else if ORDER_HEADERS.contains(&lowered.as_str()) {
            order_col = Some(idx);
        } else {
            period_cols.push((idx, name));
        }
    }

    if period_cols.len() < 2 {
        return Err(AnalysisError::MissingColumn {
            sheet: sheet.to_string(),
            column: "a second period value column".to_string(),
        });
    }

    let mut statement_rows = Vec::new();
    for row in rows.iter().skip(header_idx + 1) {
        let Some(label) = row.get(label_col).and_then(cell_text) else {
            continue;
        };

        let category = category_col
            .and_then(|c| row.get(c))
            .and_then(cell_text);
        let order = order_col
            .and_then(|c| row.get(c))
            .and_then(cell_number)
            .map(|v| v as u32);

        let mut values = BTreeMap::new();
        for (idx, period) in &period_cols {
            let value = row.get(*idx).and_then(cell_number).unwrap_or(0.0);
            values.insert(period.clone(), value);
        }

        statement_rows.push(StatementRow {
            label,
            category,
            order,
            values,
        });
    }

    debug!(
        "Loaded sheet '{}': {} rows, {} period columns (header at row {})",
        sheet,
        statement_rows.len(),
        period_cols.len(),
        header_idx
    );

    Ok(Statement::from_rows(
        sheet,
        period_cols.into_iter().map(|(_, name)| name).collect(),
        statement_rows,
    ))
}

pub(crate) fn parse_mapping<'a, I>(sheet: &str, rows: I) -> Result<MappingTable>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let rows: Vec<&[Data]> = rows.into_iter().collect();
    let (header_idx, label_col) = find_header(&rows).ok_or_else(|| AnalysisError::HeaderNotFound {
        sheet: sheet.to_string(),
    })?;

    let header = rows[header_idx];
    let category_col = header
        .iter()
        .position(|c| {
            cell_text(c)
                .map(|n| CATEGORY_HEADERS.contains(&normalize(&n).as_str()))
                .unwrap_or(false)
        })
        .ok_or_else(|| AnalysisError::MissingColumn {
            sheet: sheet.to_string(),
            column: "category".to_string(),
        })?;
    let order_col = header.iter().position(|c| {
        cell_text(c)
            .map(|n| ORDER_HEADERS.contains(&normalize(&n).as_str()))
            .unwrap_or(false)
    });

    let mut entries = Vec::new();
    for row in rows.iter().skip(header_idx + 1) {
        let Some(label) = row.get(label_col).and_then(cell_text) else {
            continue;
        };
        let Some(category) = row.get(category_col).and_then(cell_text) else {
            continue;
        };
        let order = order_col
            .and_then(|c| row.get(c))
            .and_then(cell_number)
            .map(|v| v as u32);
        entries.push(MappingEntry {
            label,
            category,
            order,
        });
    }

    Ok(MappingTable::new(entries))
}

/// First row containing a label-column header cell; returns (row, column).
fn find_header(rows: &[&[Data]]) -> Option<(usize, usize)> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            if let Some(text) = cell_text(cell) {
                let lowered = normalize(&text);
                if LABEL_HEADERS.iter().any(|h| lowered.contains(h)) {
                    return Some((row_idx, col_idx));
                }
            }
        }
    }
    None
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn n(value: f64) -> Data {
        Data::Float(value)
    }

    fn grid_iter(grid: &[Vec<Data>]) -> impl Iterator<Item = &[Data]> {
        grid.iter().map(|r| r.as_slice())
    }

    #[test]
    fn test_header_on_first_row() {
        let grid = vec![
            vec![s("Item"), s("Category"), s("2023"), s("2024")],
            vec![s("Sales"), s("Revenue"), n(100.0), n(120.0)],
        ];
        let statement = parse_sheet("Income Statement", grid_iter(&grid)).unwrap();
        assert_eq!(statement.periods, vec!["2023", "2024"]);
        assert_eq!(statement.rows.len(), 1);
        assert_eq!(statement.rows[0].category.as_deref(), Some("Revenue"));
        assert_eq!(statement.rows[0].values["2023"], 100.0);
    }

    #[test]
    fn test_header_found_by_scanning_down() {
        let grid = vec![
            vec![s("Balance Sheet FY2024"), Data::Empty, Data::Empty],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![s("Item"), s("2023"), s("2024")],
            vec![s("Cash"), n(50.0), n(60.0)],
        ];
        let statement = parse_sheet("Balance Sheet", grid_iter(&grid)).unwrap();
        assert_eq!(statement.rows.len(), 1);
        assert_eq!(statement.rows[0].label, "Cash");
    }

    #[test]
    fn test_missing_header_is_a_recoverable_error() {
        let grid = vec![vec![s("Nothing"), s("Useful")], vec![n(1.0), n(2.0)]];
        let err = parse_sheet("Balance Sheet", grid_iter(&grid)).unwrap_err();
        assert!(matches!(err, AnalysisError::HeaderNotFound { .. }));
    }

    #[test]
    fn test_missing_cells_read_as_zero_and_blank_labels_skipped() {
        let grid = vec![
            vec![s("Item"), s("2023"), s("2024")],
            vec![s("Sales"), n(100.0)],
            vec![Data::Empty, n(5.0), n(6.0)],
            vec![s("Rent"), Data::Empty, n(12.0)],
        ];
        let statement = parse_sheet("Income Statement", grid_iter(&grid)).unwrap();
        assert_eq!(statement.rows.len(), 2);
        assert_eq!(statement.rows[0].values["2024"], 0.0);
        assert_eq!(statement.rows[1].values["2023"], 0.0);
    }

    #[test]
    fn test_single_period_column_is_a_structural_error() {
        let grid = vec![
            vec![s("Item"), s("2024")],
            vec![s("Sales"), n(100.0)],
        ];
        let err = parse_sheet("Income Statement", grid_iter(&grid)).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { .. }));
    }

    #[test]
    fn test_order_column_recognized() {
        let grid = vec![
            vec![s("Item"), s("Order"), s("2023"), s("2024")],
            vec![s("Sales"), n(10.0), n(100.0), n(120.0)],
        ];
        let statement = parse_sheet("Income Statement", grid_iter(&grid)).unwrap();
        assert_eq!(statement.rows[0].order, Some(10));
        assert_eq!(statement.periods.len(), 2);
    }

    #[test]
    fn test_mapping_parse() {
        let grid = vec![
            vec![s("Label"), s("Category"), s("Order")],
            vec![s("Sales IT"), s("Sales"), n(1.0)],
            vec![s("Rent"), s("Other Opex"), Data::Empty],
            vec![s("Orphan"), Data::Empty, n(3.0)],
        ];
        let mapping = parse_mapping("Mapping", grid_iter(&grid)).unwrap();
        assert_eq!(mapping.entries.len(), 2);
        assert_eq!(mapping.entries[0].order, Some(1));
        assert_eq!(mapping.entries[1].order, None);
    }
}
