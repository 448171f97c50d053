//! Cross-method comparison of one batch.
//!
//! Pairs the AIC and F-test outcomes of each dataset processed by both methods
//! and tests whether R-squared differs between them.

use std::path::Path;

use crate::domain::{BatchSummary, ComparisonRow, OutcomeStatus, SelectionMethod};
use crate::io::file_stem;
use crate::math::{PairedTTest, paired_t_test};

/// `(r_squared, p_max)` of a processed (file, method) pair.
fn processed(summary: &BatchSummary, file: &str, method: SelectionMethod) -> Option<(f64, f64)> {
    summary.outcomes.iter().find_map(|o| match &o.status {
        OutcomeStatus::Processed { r_squared, p_max, .. } if o.file == file && o.method == method => {
            Some((*r_squared, *p_max))
        }
        _ => None,
    })
}

/// Datasets processed by both methods, in batch order.
pub fn comparison_rows(summary: &BatchSummary) -> Vec<ComparisonRow> {
    summary
        .outcomes
        .iter()
        .filter(|o| o.method == SelectionMethod::Aic)
        .filter_map(|o| {
            let (r2_r, p_max_r) = processed(summary, &o.file, SelectionMethod::Aic)?;
            let (r2_matlab, p_max_matlab) = processed(summary, &o.file, SelectionMethod::FTest)?;
            Some(ComparisonRow {
                dataset: file_stem(Path::new(&o.file)),
                r2_r,
                r2_matlab,
                p_max_r,
                p_max_matlab,
            })
        })
        .collect()
}

/// Paired t-test of F-test R-squared against AIC R-squared.
pub fn r_squared_t_test(rows: &[ComparisonRow]) -> Option<PairedTTest> {
    let matlab: Vec<f64> = rows.iter().map(|r| r.r2_matlab).collect();
    let r: Vec<f64> = rows.iter().map(|r| r.r2_r).collect();
    paired_t_test(&matlab, &r)
}
