//! Reporting utilities: result rows, cross-method comparison and formatted
//! terminal output.

pub mod compare;
pub mod format;

pub use compare::*;
pub use format::*;

use crate::domain::{FittedModel, ResultRow, ResultValue};

/// Metric label of the first result row.
pub const R_SQUARED_METRIC: &str = "R-squared";

/// Metric label of each retained-name row.
pub const TERM_METRIC: &str = "Term";

/// Largest rounding precision; an f64 carries no more significant decimals.
pub const MAX_DECIMALS: u32 = 15;

/// Round to `decimals` places (half away from zero).
///
/// `decimals` above [`MAX_DECIMALS`] leaves the value unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals > MAX_DECIMALS {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Build the Result Row Set: R-squared first, then one row per reported name.
///
/// `decimals` rounds the R-squared value; `None` keeps full precision.
pub fn result_rows(model: &FittedModel, decimals: Option<u32>) -> Vec<ResultRow> {
    let r2 = match decimals {
        Some(d) => round_to(model.r_squared, d),
        None => model.r_squared,
    };

    let mut rows = vec![ResultRow {
        metric: R_SQUARED_METRIC.to_string(),
        value: ResultValue::Number(r2),
    }];
    rows.extend(model.reported_names().into_iter().map(|name| ResultRow {
        metric: TERM_METRIC.to_string(),
        value: ResultValue::Text(name),
    }));
    rows
}
