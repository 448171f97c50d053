//! Bidirectional stepwise selection by AIC.
//!
//! For a Gaussian linear model with `k` coefficients the criterion is
//!
//! ```text
//! AIC = n * ln(RSS / n) + 2k
//! ```
//!
//! Starting from the full model, every step scores the current model (`<none>`),
//! each single-term drop and each single-term add, in that order, and moves to the
//! strictly smallest score. The first candidate wins ties, so the search stops as
//! soon as no move strictly improves on the current model.

use crate::domain::{Dataset, FittedModel, SelectionMethod, SelectionOptions, StepAction, StepRecord};
use crate::error::AppError;
use crate::fit::design::{Design, with_column, without_column};
use crate::math::OlsFit;

/// Minimum improvement for a move to count.
const AIC_TOL: f64 = 1e-7;

/// AIC of a fitted linear model.
pub fn aic(fit: &OlsFit) -> Result<f64, AppError> {
    let n = fit.n as f64;
    let value = n * (fit.rss / n).ln() + 2.0 * fit.k as f64;
    if !value.is_finite() {
        return Err(AppError::new(
            4,
            "AIC is -infinity for this model (perfect fit); stepwise search cannot proceed.",
        ));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Move {
    Drop(usize),
    Add(usize),
}

/// Strictly smallest candidate, first one on ties; `None` keeps the current model.
fn pick_move(current_aic: f64, candidates: &[(Move, f64)]) -> Option<(Move, f64)> {
    let mut best: Option<(Move, f64)> = None;
    let mut best_aic = current_aic;
    for &(mv, score) in candidates {
        if score < best_aic {
            best_aic = score;
            best = Some((mv, score));
        }
    }
    best.filter(|&(_, score)| score < current_aic - AIC_TOL)
}

/// Run the AIC search on a dataset.
pub fn select_aic(dataset: &Dataset, opts: &SelectionOptions) -> Result<FittedModel, AppError> {
    let design = Design::new(dataset)?;
    let p = design.n_predictors();

    let mut current: Vec<usize> = (0..p).collect();
    let full = design.fit(&current)?;
    if !full.is_full_rank() {
        return Err(AppError::new(
            4,
            format!(
                "Full model is rank deficient (rank {} < {} coefficients); predictors are collinear.",
                full.rank, full.k
            ),
        ));
    }
    if full.df_resid() == 0 {
        return Err(AppError::new(
            3,
            format!("Need more than {} rows to fit {} coefficients.", full.n, full.k),
        ));
    }
    let full_r_squared = design.r_squared(&full)?;
    let mut current_aic = aic(&full)?;
    let mut steps = Vec::new();

    for _ in 0..opts.max_steps {
        let mut candidates = Vec::with_capacity(p);
        for &col in &current {
            candidates.push((Move::Drop(col), aic(&design.fit(&without_column(&current, col))?)?));
        }
        for col in (0..p).filter(|c| !current.contains(c)) {
            candidates.push((Move::Add(col), aic(&design.fit(&with_column(&current, col))?)?));
        }

        let Some((mv, score)) = pick_move(current_aic, &candidates) else {
            break;
        };

        let (action, col) = match mv {
            Move::Drop(col) => {
                current = without_column(&current, col);
                (StepAction::Remove, col)
            }
            Move::Add(col) => {
                current = with_column(&current, col);
                (StepAction::Add, col)
            }
        };
        log::debug!(
            "AIC step: {:?} {} (AIC {:.4} -> {:.4})",
            action,
            design.predictor_name(col),
            current_aic,
            score
        );
        steps.push(StepRecord {
            action,
            term: design.predictor_name(col).to_string(),
            criterion: score,
        });
        current_aic = score;
    }

    design.finish(SelectionMethod::Aic, &current, full_r_squared, steps)
}
