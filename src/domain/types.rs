//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during selection
//! - turned into result rows for the xlsx export
//! - serialized into the JSON run report

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Worksheet that holds the encoded experimental data.
pub const DEFAULT_SHEET: &str = "After";

/// Prefix Excel uses for lock files of open workbooks.
pub const TEMP_FILE_PREFIX: &str = "~$";

/// Coefficient name used for the constant term.
pub const INTERCEPT_NAME: &str = "(Intercept)";

/// Stepwise selection procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    /// Bidirectional search minimizing AIC, starting from the full model.
    Aic,
    /// Forward/backward search driven by partial-F p-values, starting from the constant model.
    FTest,
}

impl SelectionMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            SelectionMethod::Aic => "AIC bidirectional",
            SelectionMethod::FTest => "F-test stepwise",
        }
    }

    /// Short tag identifying the pathway in output file names.
    pub fn tag(self) -> &'static str {
        match self {
            SelectionMethod::Aic => "R",
            SelectionMethod::FTest => "MATLAB",
        }
    }

    /// Output file name for an input file stem.
    pub fn output_file_name(self, stem: &str) -> String {
        match self {
            SelectionMethod::Aic => format!("{stem}_{}_stepwise.xlsx", self.tag()),
            SelectionMethod::FTest => format!("result_{}_{stem}.xlsx", self.tag()),
        }
    }

    /// Whether the reported names include the intercept coefficient.
    pub fn reports_intercept(self) -> bool {
        matches!(self, SelectionMethod::FTest)
    }
}

/// Which selection procedure(s) to run for every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MethodChoice {
    Aic,
    Ftest,
    Both,
}

impl MethodChoice {
    pub fn methods(self) -> Vec<SelectionMethod> {
        match self {
            MethodChoice::Aic => vec![SelectionMethod::Aic],
            MethodChoice::Ftest => vec![SelectionMethod::FTest],
            MethodChoice::Both => vec![SelectionMethod::Aic, SelectionMethod::FTest],
        }
    }
}

/// One worksheet's numeric content.
///
/// `predictors` is `n x p`, `response` has length `n`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub predictor_names: Vec<String>,
    pub response_name: String,
    pub predictors: DMatrix<f64>,
    pub response: DVector<f64>,
    /// Data rows present in the sheet (before dropping incomplete rows).
    pub rows_read: usize,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.response.len()
    }

    /// Rows dropped during listwise deletion.
    pub fn rows_dropped(&self) -> usize {
        self.rows_read.saturating_sub(self.n_rows())
    }

    pub fn n_predictors(&self) -> usize {
        self.predictor_names.len()
    }
}

/// Significance of one coefficient in the selected model.
#[derive(Debug, Clone, PartialEq)]
pub struct TermSignificance {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub p_value: f64,
}

/// Direction of one selection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Add,
    Remove,
}

/// One accepted move of a stepwise search.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub action: StepAction,
    pub term: String,
    /// AIC after the move (AIC search) or the p-value that triggered it (F-test search).
    pub criterion: f64,
}

/// Result of narrowing the full model for one dataset.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub method: SelectionMethod,
    pub n: usize,
    pub r_squared: f64,
    pub full_r_squared: f64,
    /// Retained predictor names in original column order.
    pub retained: Vec<String>,
    /// Coefficients of the selected model, intercept first.
    pub coefficients: Vec<TermSignificance>,
    pub steps: Vec<StepRecord>,
}

impl FittedModel {
    /// Names as reported for this model's pathway.
    pub fn reported_names(&self) -> Vec<String> {
        if self.method.reports_intercept() {
            self.coefficients.iter().map(|c| c.name.clone()).collect()
        } else {
            self.retained.clone()
        }
    }

    /// Largest coefficient p-value (`NaN` when no p-values are defined).
    pub fn p_max(&self) -> f64 {
        self.coefficients
            .iter()
            .map(|c| c.p_value)
            .filter(|p| p.is_finite())
            .fold(f64::NAN, f64::max)
    }

    /// Count of coefficients whose p-value exceeds `alpha`.
    pub fn insignificant_count(&self, alpha: f64) -> usize {
        self.coefficients.iter().filter(|c| c.p_value > alpha).count()
    }
}

/// Value cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Number(f64),
    Text(String),
}

/// One (Metric, Value) pair of the result table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub metric: String,
    pub value: ResultValue,
}

/// Thresholds for the F-test search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FTestThresholds {
    pub p_enter: f64,
    pub p_remove: f64,
}

impl Default for FTestThresholds {
    fn default() -> Self {
        Self {
            p_enter: 0.05,
            p_remove: 0.10,
        }
    }
}

/// Options shared by both selection procedures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionOptions {
    pub thresholds: FTestThresholds,
    pub max_steps: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            thresholds: FTestThresholds::default(),
            max_steps: 1000,
        }
    }
}

/// One dataset processed by both methods, side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub dataset: String,
    pub r2_r: f64,
    pub r2_matlab: f64,
    pub p_max_r: f64,
    pub p_max_matlab: f64,
}

/// Resolved configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub methods: Vec<SelectionMethod>,
    pub sheet: String,
    /// Decimal places for the AIC pathway's R-squared (`None` keeps full precision).
    pub decimals: Option<u32>,
    pub selection: SelectionOptions,
    /// Significance level for the insignificant-term count.
    pub alpha: f64,
    pub summary_json: Option<PathBuf>,
}

/// What happened to one (file, method) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Processed {
        output: PathBuf,
        response: String,
        /// Complete rows used for the fit.
        rows_used: usize,
        /// Rows dropped for empty cells.
        rows_dropped: usize,
        r_squared: f64,
        retained: Vec<String>,
        p_max: f64,
        insignificant: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub method: SelectionMethod,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub files_found: usize,
    pub outcomes: Vec<FileOutcome>,
    /// Batch-level workbooks written after the loop.
    pub summary_files: Vec<PathBuf>,
    /// Batch-level exports that failed; per-file outputs are unaffected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub report_errors: Vec<String>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Processed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_carry_pathway_tag() {
        assert_eq!(
            SelectionMethod::Aic.output_file_name("demo"),
            "demo_R_stepwise.xlsx"
        );
        assert_eq!(
            SelectionMethod::FTest.output_file_name("demo"),
            "result_MATLAB_demo.xlsx"
        );
    }

    #[test]
    fn p_max_ignores_undefined_p_values() {
        let model = FittedModel {
            method: SelectionMethod::Aic,
            n: 10,
            r_squared: 0.5,
            full_r_squared: 0.6,
            retained: vec!["x1".to_string()],
            coefficients: vec![
                TermSignificance {
                    name: INTERCEPT_NAME.to_string(),
                    estimate: 1.0,
                    std_error: 0.1,
                    p_value: 0.2,
                },
                TermSignificance {
                    name: "x1".to_string(),
                    estimate: 2.0,
                    std_error: f64::NAN,
                    p_value: f64::NAN,
                },
            ],
            steps: vec![],
        };
        assert_eq!(model.p_max(), 0.2);
        assert_eq!(model.insignificant_count(0.05), 1);
        assert_eq!(model.reported_names(), vec!["x1".to_string()]);
    }

    #[test]
    fn rows_dropped_counts_listwise_deletion() {
        let ds = Dataset {
            predictor_names: vec!["x1".to_string()],
            response_name: "y".to_string(),
            predictors: DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]),
            response: DVector::from_row_slice(&[1.0, 2.0, 4.0]),
            rows_read: 5,
        };
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.rows_dropped(), 2);
    }
}
