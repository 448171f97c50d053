//! Workbook and JSON exports.
//!
//! Every per-file output is a small xlsx workbook:
//! - `Results`: the Metric/Value table
//! - `Significance`: coefficient estimates and p-values of the selected model
//!
//! The batch-level exports are:
//! - `Summary_Max_P_Values_<tag>.xlsx`: every processed dataset with its
//!   largest p-value and the count of terms above alpha
//! - `Summary_Insignificant_Terms_<tag>.xlsx`: only the datasets whose count is
//!   non-zero
//! - `Comparison_R_vs_MATLAB.xlsx`: both methods side by side plus a paired
//!   t-test on R-squared
//! - the optional JSON run report

use std::fs::File;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::domain::{BatchSummary, ComparisonRow, FittedModel, ResultRow, ResultValue};
use crate::error::AppError;
use crate::math::PairedTTest;

pub const RESULTS_SHEET: &str = "Results";
pub const SIGNIFICANCE_SHEET: &str = "Significance";
pub const SUMMARY_SHEET: &str = "Summary";
pub const COMPARISON_SHEET: &str = "Comparison";
pub const T_TEST_SHEET: &str = "Paired_t_test";

/// A cell in a generic table export.
#[derive(Debug, Clone, PartialEq)]
pub enum TableCell {
    Number(f64),
    Text(String),
    Blank,
}

impl From<&ResultValue> for TableCell {
    fn from(value: &ResultValue) -> Self {
        match value {
            ResultValue::Number(v) => TableCell::Number(*v),
            ResultValue::Text(s) => TableCell::Text(s.clone()),
        }
    }
}

/// One row of the batch significance summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceRow {
    pub dataset: String,
    pub p_max: f64,
    pub insignificant: usize,
}

fn xlsx_error(context: &str) -> impl Fn(XlsxError) -> AppError + '_ {
    move |e| AppError::new(2, format!("{context}: {e}"))
}

fn write_header(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, name) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    Ok(())
}

fn write_cells(sheet: &mut Worksheet, row: u32, cells: &[TableCell]) -> Result<(), XlsxError> {
    for (col, cell) in cells.iter().enumerate() {
        let col = col as u16;
        match cell {
            TableCell::Number(v) if v.is_finite() => {
                sheet.write_number(row, col, *v)?;
            }
            // Excel has no NaN/inf; leave the cell blank.
            TableCell::Number(_) | TableCell::Blank => {}
            TableCell::Text(s) => {
                sheet.write_string(row, col, s)?;
            }
        }
    }
    Ok(())
}

fn write_table(
    sheet: &mut Worksheet,
    name: &str,
    headers: &[&str],
    rows: &[Vec<TableCell>],
) -> Result<(), XlsxError> {
    sheet.set_name(name)?;
    write_header(sheet, headers)?;
    for (idx, cells) in rows.iter().enumerate() {
        write_cells(sheet, idx as u32 + 1, cells)?;
    }
    Ok(())
}

/// Write a single-sheet workbook with a bold header row.
pub fn write_table_workbook(
    path: &Path,
    sheet_name: &str,
    headers: &[&str],
    rows: &[Vec<TableCell>],
) -> Result<(), AppError> {
    let context = format!("Failed to write workbook '{}'", path.display());
    let mut workbook = Workbook::new();
    write_table(workbook.add_worksheet(), sheet_name, headers, rows).map_err(xlsx_error(&context))?;
    workbook.save(path).map_err(xlsx_error(&context))?;
    Ok(())
}

/// Write the per-file result workbook.
pub fn write_result_workbook(path: &Path, rows: &[ResultRow], model: &FittedModel) -> Result<(), AppError> {
    let context = format!("Failed to write result workbook '{}'", path.display());
    let mut workbook = Workbook::new();

    let result_rows: Vec<Vec<TableCell>> = rows
        .iter()
        .map(|r| vec![TableCell::Text(r.metric.clone()), TableCell::from(&r.value)])
        .collect();
    write_table(workbook.add_worksheet(), RESULTS_SHEET, &["Metric", "Value"], &result_rows)
        .map_err(xlsx_error(&context))?;

    let term_rows: Vec<Vec<TableCell>> = model
        .coefficients
        .iter()
        .map(|c| {
            vec![
                TableCell::Text(c.name.clone()),
                TableCell::Number(c.estimate),
                TableCell::Number(c.std_error),
                TableCell::Number(c.p_value),
            ]
        })
        .collect();
    write_table(
        workbook.add_worksheet(),
        SIGNIFICANCE_SHEET,
        &["Term", "Estimate", "Std_Error", "p_value"],
        &term_rows,
    )
    .map_err(xlsx_error(&context))?;

    workbook.save(path).map_err(xlsx_error(&context))?;
    Ok(())
}

fn count_header(alpha: f64) -> String {
    format!("Count_p_gt_{alpha}")
}

/// Write the batch significance summary (`Dataset`, `p_max`, insignificant count).
pub fn write_significance_summary(path: &Path, rows: &[SignificanceRow], alpha: f64) -> Result<(), AppError> {
    let cells: Vec<Vec<TableCell>> = rows
        .iter()
        .map(|r| {
            vec![
                TableCell::Text(r.dataset.clone()),
                TableCell::Number(r.p_max),
                TableCell::Number(r.insignificant as f64),
            ]
        })
        .collect();
    write_table_workbook(path, SUMMARY_SHEET, &["Dataset", "p_max", &count_header(alpha)], &cells)
}

/// Write the datasets that kept at least one term with p > alpha.
///
/// The workbook is written even when no dataset qualifies (header only).
pub fn write_insignificant_summary(path: &Path, rows: &[SignificanceRow], alpha: f64) -> Result<(), AppError> {
    let cells: Vec<Vec<TableCell>> = rows
        .iter()
        .filter(|r| r.insignificant > 0)
        .map(|r| {
            vec![
                TableCell::Text(r.dataset.clone()),
                TableCell::Number(r.insignificant as f64),
            ]
        })
        .collect();
    write_table_workbook(path, SUMMARY_SHEET, &["Dataset", &count_header(alpha)], &cells)
}

/// Write the cross-method comparison and the paired t-test on R-squared.
///
/// `test` is `None` when fewer than two datasets were compared; the test row
/// then carries only the pair count.
pub fn write_comparison_workbook(
    path: &Path,
    rows: &[ComparisonRow],
    test: Option<&PairedTTest>,
    alpha: f64,
) -> Result<(), AppError> {
    let context = format!("Failed to write comparison workbook '{}'", path.display());
    let mut workbook = Workbook::new();

    let cells: Vec<Vec<TableCell>> = rows
        .iter()
        .map(|r| {
            vec![
                TableCell::Text(r.dataset.clone()),
                TableCell::Number(r.r2_r),
                TableCell::Number(r.r2_matlab),
                TableCell::Number(r.p_max_r),
                TableCell::Number(r.p_max_matlab),
            ]
        })
        .collect();
    write_table(
        workbook.add_worksheet(),
        COMPARISON_SHEET,
        &["Dataset", "R2_R", "R2_MATLAB", "p_max_R", "p_max_MATLAB"],
        &cells,
    )
    .map_err(xlsx_error(&context))?;

    let pair = TableCell::Text("MATLAB vs R".to_string());
    let test_row = match test {
        Some(t) => {
            let significant = if t.p_value < alpha { "Yes" } else { "No" };
            vec![
                pair,
                TableCell::Number(t.n as f64),
                TableCell::Number(t.mean_diff),
                TableCell::Number(t.t_statistic),
                TableCell::Number(t.p_value),
                TableCell::Text(significant.to_string()),
            ]
        }
        None => vec![pair, TableCell::Number(rows.len() as f64)],
    };
    let significant_header = format!("Significant_at_{alpha}");
    write_table(
        workbook.add_worksheet(),
        T_TEST_SHEET,
        &["Comparison_Pair", "n", "mean_diff", "t_statistic", "p_value", &significant_header],
        &[test_row],
    )
    .map_err(xlsx_error(&context))?;

    workbook.save(path).map_err(xlsx_error(&context))?;
    Ok(())
}

/// Write the JSON run report.
pub fn write_summary_json(path: &Path, summary: &BatchSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}
