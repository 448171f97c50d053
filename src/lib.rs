//! `stepwise-batch` library crate.
//!
//! The binary (`stepwise`) is a thin wrapper around this library so that:
//!
//! - the batch runner and the selection procedures are testable without spawning processes
//! - the OLS / selection code can be reused outside the batch loop

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
