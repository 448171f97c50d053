//! Input/output helpers.
//!
//! - input directory scan (`scan`)
//! - worksheet ingest + validation (`ingest`)
//! - result workbook / summary exports (`export`)

pub mod export;
pub mod ingest;
pub mod scan;

pub use export::*;
pub use ingest::*;
pub use scan::*;
