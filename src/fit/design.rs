//! Design matrices for candidate models.
//!
//! A candidate model is identified by the (sorted) indices of the predictor
//! columns it uses. The intercept is always the first design column and is never
//! a candidate for removal.

use nalgebra::DMatrix;

use crate::domain::{Dataset, FittedModel, INTERCEPT_NAME, SelectionMethod, StepRecord, TermSignificance};
use crate::error::AppError;
use crate::math::{OlsFit, coefficient_tests, fit_ols, r_squared, total_sum_of_squares};

/// Full-model data plus cached response statistics.
#[derive(Debug)]
pub struct Design<'a> {
    dataset: &'a Dataset,
    tss: f64,
}

impl<'a> Design<'a> {
    pub fn new(dataset: &'a Dataset) -> Result<Self, AppError> {
        if dataset.n_rows() == 0 {
            return Err(AppError::new(3, "Dataset has no complete rows."));
        }
        if dataset.predictors.nrows() != dataset.n_rows() {
            return Err(AppError::new(4, "Predictor and response row counts differ."));
        }
        let tss = total_sum_of_squares(&dataset.response);
        // Surfaces the constant-response error before any search starts.
        r_squared(0.0, tss)?;
        Ok(Self { dataset, tss })
    }

    pub fn n(&self) -> usize {
        self.dataset.n_rows()
    }

    pub fn n_predictors(&self) -> usize {
        self.dataset.n_predictors()
    }

    pub fn predictor_name(&self, col: usize) -> &str {
        &self.dataset.predictor_names[col]
    }

    /// Intercept column followed by the given predictor columns.
    pub fn matrix(&self, cols: &[usize]) -> DMatrix<f64> {
        let n = self.n();
        DMatrix::from_fn(n, cols.len() + 1, |i, j| {
            if j == 0 {
                1.0
            } else {
                self.dataset.predictors[(i, cols[j - 1])]
            }
        })
    }

    pub fn fit(&self, cols: &[usize]) -> Result<OlsFit, AppError> {
        fit_ols(&self.matrix(cols), &self.dataset.response)
    }

    pub fn r_squared(&self, fit: &OlsFit) -> Result<f64, AppError> {
        r_squared(fit.rss, self.tss)
    }

    /// Assemble the reported model for the selected columns.
    pub fn finish(
        &self,
        method: SelectionMethod,
        cols: &[usize],
        full_r_squared: f64,
        steps: Vec<StepRecord>,
    ) -> Result<FittedModel, AppError> {
        let x = self.matrix(cols);
        let fit = fit_ols(&x, &self.dataset.response)?;
        let tests = coefficient_tests(&x, &fit)?;

        let mut coefficients = Vec::with_capacity(fit.k);
        for (j, (std_error, p_value)) in tests.into_iter().enumerate() {
            let name = if j == 0 {
                INTERCEPT_NAME.to_string()
            } else {
                self.predictor_name(cols[j - 1]).to_string()
            };
            coefficients.push(TermSignificance {
                name,
                estimate: fit.beta[j],
                std_error,
                p_value,
            });
        }

        Ok(FittedModel {
            method,
            n: self.n(),
            r_squared: self.r_squared(&fit)?,
            full_r_squared,
            retained: cols.iter().map(|&c| self.predictor_name(c).to_string()).collect(),
            coefficients,
            steps,
        })
    }
}

/// `cols` with `col` inserted, keeping column order.
pub fn with_column(cols: &[usize], col: usize) -> Vec<usize> {
    let mut out = cols.to_vec();
    if let Err(pos) = out.binary_search(&col) {
        out.insert(pos, col);
    }
    out
}

/// `cols` with `col` removed.
pub fn without_column(cols: &[usize], col: usize) -> Vec<usize> {
    cols.iter().copied().filter(|&c| c != col).collect()
}
