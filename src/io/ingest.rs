//! Worksheet ingest and normalization.
//!
//! This module turns one worksheet into a numeric `Dataset`:
//!
//! - first row: column headers (last column = response)
//! - remaining rows: numeric cells
//!
//! Design goals:
//! - **Strict schema** for headers (clear errors, exit code 2)
//! - **Listwise deletion** of rows with empty cells, counted and reported
//! - **No fitting logic here**

use std::collections::HashSet;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use nalgebra::{DMatrix, DVector};

use crate::domain::Dataset;
use crate::error::AppError;

/// Load `sheet` from the workbook at `path`.
///
/// Returns `Ok(None)` when the sheet has no data rows.
pub fn load_dataset(path: &Path, sheet: &str) -> Result<Option<Dataset>, AppError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::new(2, format!("Failed to open workbook '{}': {e}", path.display()))
    })?;

    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(AppError::new(
            2,
            format!("Worksheet '{sheet}' not found in '{}'.", path.display()),
        ));
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| AppError::new(2, format!("Failed to read worksheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(None);
    };
    let headers = parse_headers(header_row)?;

    let mut values: Vec<Vec<f64>> = Vec::new();
    let mut rows_read = 0usize;
    for (idx, row) in rows.enumerate() {
        // +2: 1-based sheet rows, header on row 1.
        let line = idx + 2;
        let cells = row
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                cell_value(cell).map_err(|msg| {
                    AppError::new(2, format!("Row {line}, column '{}': {msg}", headers[col]))
                })
            })
            .collect::<Result<Vec<Option<f64>>, AppError>>()?;

        if cells.iter().all(Option::is_none) {
            continue;
        }
        rows_read += 1;
        if let Some(complete) = cells.into_iter().collect::<Option<Vec<f64>>>() {
            values.push(complete);
        }
    }

    if rows_read == 0 {
        return Ok(None);
    }
    if values.is_empty() {
        return Err(AppError::new(
            3,
            format!("All {rows_read} rows have empty cells; nothing to fit."),
        ));
    }
    let dropped = rows_read - values.len();
    if dropped > 0 {
        log::warn!("Dropped {dropped} of {rows_read} rows with empty cells.");
    }

    Ok(Some(build_dataset(headers, &values, rows_read)))
}

fn parse_headers(row: &[Data]) -> Result<Vec<String>, AppError> {
    let mut headers = Vec::with_capacity(row.len());
    for (col, cell) in row.iter().enumerate() {
        let name = match cell {
            Data::String(s) => s.trim().trim_start_matches('\u{feff}').to_string(),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::Empty => String::new(),
            other => other.to_string(),
        };
        if name.is_empty() {
            return Err(AppError::new(2, format!("Blank header in column {}.", col + 1)));
        }
        headers.push(name);
    }

    if headers.len() < 2 {
        return Err(AppError::new(
            2,
            "Worksheet needs at least one predictor column and a response column.",
        ));
    }

    let mut seen = HashSet::new();
    for name in &headers {
        if !seen.insert(name.as_str()) {
            return Err(AppError::new(2, format!("Duplicate column header '{name}'.")));
        }
    }
    Ok(headers)
}

/// Numeric value of a cell; `None` for empty cells.
fn cell_value(cell: &Data) -> Result<Option<f64>, String> {
    match cell {
        Data::Float(f) => Ok(Some(*f)),
        Data::Int(i) => Ok(Some(*i as f64)),
        Data::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Data::Empty => Ok(None),
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| format!("non-numeric value '{s}'"))
        }
        Data::Error(e) => Err(format!("cell error {e:?}")),
        other => Err(format!("unsupported cell value '{other}'")),
    }
}

fn build_dataset(mut headers: Vec<String>, values: &[Vec<f64>], rows_read: usize) -> Dataset {
    let n = values.len();
    let p = headers.len() - 1;
    let response_name = headers.pop().unwrap_or_default();

    let predictors = DMatrix::from_fn(n, p, |i, j| values[i][j]);
    let response = DVector::from_iterator(n, values.iter().map(|row| row[p]));

    Dataset {
        predictor_names: headers,
        response_name,
        predictors,
        response,
        rows_read,
    }
}
