//! Stepwise model selection.
//!
//! Responsibilities:
//!
//! - build intercept-plus-subset design matrices (`design`)
//! - bidirectional AIC search from the full model (`aic`)
//! - partial-F forward/backward search from the constant model (`ftest`)

pub mod aic;
pub mod design;
pub mod ftest;

pub use aic::*;
pub use design::*;
pub use ftest::*;

use crate::domain::{Dataset, FittedModel, SelectionMethod, SelectionOptions};
use crate::error::AppError;

/// Fit the full model and narrow it with the requested procedure.
pub fn select(
    method: SelectionMethod,
    dataset: &Dataset,
    opts: &SelectionOptions,
) -> Result<FittedModel, AppError> {
    match method {
        SelectionMethod::Aic => select_aic(dataset, opts),
        SelectionMethod::FTest => select_ftest(dataset, opts),
    }
}
