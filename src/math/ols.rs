//! Ordinary least squares solver and fit statistics.
//!
//! Every candidate model visited by the stepwise searches is a small OLS problem:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - We solve via SVD so tall design matrices work and near-singular designs are
//!   detected instead of panicking (nalgebra's `QR::solve` expects square systems).
//! - Numerical rank is read off the singular values with a relative tolerance,
//!   the same order of magnitude R's `lm` uses for its pivoted QR.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::dist::t_two_sided_p;

/// Relative tolerance for deciding that a singular value is zero.
pub const RANK_TOL: f64 = 1e-7;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Numerical column rank of `x`.
pub fn column_rank(x: &DMatrix<f64>) -> usize {
    if x.ncols() == 0 || x.nrows() == 0 {
        return 0;
    }
    let singular = x.clone().svd(false, false).singular_values;
    let s_max = singular.iter().cloned().fold(0.0_f64, f64::max);
    if s_max <= 0.0 {
        return 0;
    }
    singular.iter().filter(|&&s| s > s_max * RANK_TOL).count()
}

/// Least-squares fit of `y` on the columns of `x`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    pub rss: f64,
    pub n: usize,
    /// Number of columns in the design (coefficients, intercept included).
    pub k: usize,
    pub rank: usize,
}

impl OlsFit {
    pub fn df_resid(&self) -> usize {
        self.n.saturating_sub(self.k)
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.k
    }
}

/// Fit `y` on `x` by OLS.
pub fn fit_ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, AppError> {
    if x.nrows() != y.len() {
        return Err(AppError::new(
            4,
            format!("Design has {} rows but response has {}.", x.nrows(), y.len()),
        ));
    }
    if x.nrows() == 0 {
        return Err(AppError::new(3, "No observations to fit."));
    }

    let beta = solve_least_squares(x, y)
        .ok_or_else(|| AppError::new(4, "Least squares system is too ill-conditioned to solve."))?;
    let residuals = y - x * &beta;
    let rss = residuals.norm_squared();
    if !rss.is_finite() {
        return Err(AppError::new(4, "Non-finite residual sum of squares."));
    }

    Ok(OlsFit {
        beta,
        rss,
        n: x.nrows(),
        k: x.ncols(),
        rank: column_rank(x),
    })
}

/// Centered total sum of squares of `y`.
pub fn total_sum_of_squares(y: &DVector<f64>) -> f64 {
    let n = y.len();
    if n == 0 {
        return 0.0;
    }
    let mean = y.sum() / n as f64;
    y.iter().map(|v| (v - mean) * (v - mean)).sum()
}

/// Ordinary R-squared for a model with intercept.
pub fn r_squared(rss: f64, tss: f64) -> Result<f64, AppError> {
    if !(tss.is_finite() && tss > 0.0) {
        return Err(AppError::new(3, "Response column is constant; R-squared is undefined."));
    }
    Ok((1.0 - rss / tss).clamp(0.0, 1.0))
}

/// Standard errors and two-sided t-test p-values for each coefficient.
///
/// Returns `(std_error, p_value)` pairs in coefficient order. When the residual
/// degrees of freedom are zero both values are `NaN`.
pub fn coefficient_tests(x: &DMatrix<f64>, fit: &OlsFit) -> Result<Vec<(f64, f64)>, AppError> {
    let df = fit.df_resid();
    if df == 0 {
        return Ok(vec![(f64::NAN, f64::NAN); fit.k]);
    }

    let xtx = x.tr_mul(x);
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| AppError::new(4, "Design matrix is singular; cannot compute standard errors."))?;
    let sigma2 = fit.rss / df as f64;

    let mut out = Vec::with_capacity(fit.k);
    for j in 0..fit.k {
        let var = sigma2 * xtx_inv[(j, j)];
        let se = var.max(0.0).sqrt();
        let p = if se > 0.0 {
            t_two_sided_p(fit.beta[j] / se, df as f64)
        } else if fit.beta[j] == 0.0 {
            1.0
        } else {
            0.0
        };
        out.push((se, p));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn rank_detects_duplicate_column() {
        let x = DMatrix::from_row_slice(4, 3, &[
            1.0, 1.0, 1.0, //
            1.0, 2.0, 2.0, //
            1.0, 3.0, 3.0, //
            1.0, 5.0, 5.0,
        ]);
        assert_eq!(column_rank(&x), 2);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        let fit = fit_ols(&x, &y).unwrap();
        assert!(!fit.is_full_rank());
    }

    #[test]
    fn r_squared_matches_hand_computation() {
        // y = [1, 2, 4], fit on intercept + x = [0, 1, 2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 4.0]);
        let fit = fit_ols(&x, &y).unwrap();
        // slope 1.5, intercept 5/6, residuals [1/6, -1/3, 1/6] -> rss 1/6
        assert!((fit.rss - 1.0 / 6.0).abs() < 1e-10);
        let tss = total_sum_of_squares(&y);
        assert!((tss - 14.0 / 3.0).abs() < 1e-10);
        let r2 = r_squared(fit.rss, tss).unwrap();
        assert!((r2 - (1.0 - (1.0 / 6.0) / (14.0 / 3.0))).abs() < 1e-10);
    }

    #[test]
    fn constant_response_is_rejected() {
        let y = DVector::from_row_slice(&[3.0, 3.0, 3.0]);
        let err = r_squared(0.0, total_sum_of_squares(&y)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn coefficient_tests_flag_irrelevant_slope() {
        // Response independent of the second column.
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let ys = [5.1, 4.9, 5.0, 5.2, 4.8, 5.1, 4.9, 5.0];
        let mut data = Vec::new();
        for &v in &xs {
            data.push(1.0);
            data.push(v);
        }
        let x = DMatrix::from_row_slice(8, 2, &data);
        let y = DVector::from_row_slice(&ys);
        let fit = fit_ols(&x, &y).unwrap();
        let tests = coefficient_tests(&x, &fit).unwrap();
        assert!(tests[0].1 < 1e-6, "intercept should be significant");
        assert!(tests[1].1 > 0.05, "slope p-value {} should be large", tests[1].1);
    }
}
