//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - selection methods and their output naming (`SelectionMethod`, `MethodChoice`)
//! - the per-file dataset and fitted model (`Dataset`, `FittedModel`)
//! - result rows, batch configuration and batch outcomes

pub mod types;

pub use types::*;
