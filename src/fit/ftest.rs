//! Stepwise selection by partial F-tests.
//!
//! Starting from the constant model, each step:
//!
//! 1. computes the p-value of adding every excluded predictor and adds the one
//!    with the smallest p-value if it is below `p_enter`;
//! 2. otherwise computes the p-value of removing every included predictor and
//!    removes the one with the largest p-value if it is above `p_remove`;
//! 3. otherwise stops.
//!
//! For a single term the partial F statistic compares the larger model `L` with
//! the smaller model `S`:
//!
//! ```text
//! F = (RSS_S - RSS_L) / (RSS_L / df_L),   F ~ F(1, df_L)
//! ```

use crate::domain::{Dataset, FTestThresholds, FittedModel, SelectionMethod, SelectionOptions, StepAction, StepRecord};
use crate::error::AppError;
use crate::fit::design::{Design, with_column, without_column};
use crate::math::{OlsFit, f_sf};

/// Validate entry/removal thresholds.
pub fn validate_thresholds(t: &FTestThresholds) -> Result<(), AppError> {
    let in_unit = |p: f64| p.is_finite() && p > 0.0 && p < 1.0;
    if !(in_unit(t.p_enter) && in_unit(t.p_remove)) {
        return Err(AppError::new(
            2,
            format!(
                "Invalid F-test thresholds: p_enter={}, p_remove={} (must lie in (0, 1)).",
                t.p_enter, t.p_remove
            ),
        ));
    }
    if t.p_enter >= t.p_remove {
        return Err(AppError::new(
            2,
            format!(
                "p_enter ({}) must be smaller than p_remove ({}) or the search can cycle.",
                t.p_enter, t.p_remove
            ),
        ));
    }
    Ok(())
}

/// p-value for the single extra term in `larger` relative to `smaller`.
///
/// `None` when the comparison is undefined (rank-deficient larger model or no
/// residual degrees of freedom).
fn partial_f_p(smaller: &OlsFit, larger: &OlsFit) -> Option<f64> {
    if !larger.is_full_rank() {
        return None;
    }
    let df = larger.df_resid();
    if df == 0 {
        return None;
    }
    if larger.rss <= 0.0 {
        return Some(0.0);
    }
    let f = ((smaller.rss - larger.rss).max(0.0)) / (larger.rss / df as f64);
    Some(f_sf(f, 1.0, df as f64))
}

/// Run the F-test search on a dataset.
pub fn select_ftest(dataset: &Dataset, opts: &SelectionOptions) -> Result<FittedModel, AppError> {
    validate_thresholds(&opts.thresholds)?;
    let design = Design::new(dataset)?;
    let p = design.n_predictors();
    if design.n() < 2 {
        return Err(AppError::new(3, "Need at least 2 rows for an F-test search."));
    }

    let all: Vec<usize> = (0..p).collect();
    let full = design.fit(&all)?;
    let full_r_squared = design.r_squared(&full)?;

    let mut current: Vec<usize> = Vec::new();
    let mut steps = Vec::new();

    for _ in 0..opts.max_steps {
        let current_fit = design.fit(&current)?;

        // Forward: smallest p-value among excluded terms.
        let mut best_add: Option<(usize, f64)> = None;
        for col in (0..p).filter(|c| !current.contains(c)) {
            let larger = design.fit(&with_column(&current, col))?;
            let Some(pv) = partial_f_p(&current_fit, &larger) else {
                continue;
            };
            if best_add.is_none_or(|(_, best)| pv < best) {
                best_add = Some((col, pv));
            }
        }
        if let Some((col, pv)) = best_add {
            if pv < opts.thresholds.p_enter {
                current = with_column(&current, col);
                log::debug!("F-test step: add {} (p = {pv:.4e})", design.predictor_name(col));
                steps.push(StepRecord {
                    action: StepAction::Add,
                    term: design.predictor_name(col).to_string(),
                    criterion: pv,
                });
                continue;
            }
        }

        // Backward: largest p-value among included terms.
        let mut worst: Option<(usize, f64)> = None;
        for &col in &current {
            let smaller = design.fit(&without_column(&current, col))?;
            let Some(pv) = partial_f_p(&smaller, &current_fit) else {
                continue;
            };
            if worst.is_none_or(|(_, w)| pv > w) {
                worst = Some((col, pv));
            }
        }
        if let Some((col, pv)) = worst {
            if pv > opts.thresholds.p_remove {
                current = without_column(&current, col);
                log::debug!("F-test step: remove {} (p = {pv:.4e})", design.predictor_name(col));
                steps.push(StepRecord {
                    action: StepAction::Remove,
                    term: design.predictor_name(col).to_string(),
                    criterion: pv,
                });
                continue;
            }
        }

        break;
    }

    design.finish(SelectionMethod::FTest, &current, full_r_squared, steps)
}
