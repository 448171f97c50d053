//! Synthetic demo dataset generation.
//!
//! Produces a small `After` worksheet where the response depends on `x1` only:
//!
//! `y = 2 + 3 * x1 + ε`,  `ε ~ N(0, noise²)`,  `x1, x2 ~ U(0, 10)`
//!
//! `x2` is pure noise. With the default seed both selection procedures retain
//! exactly `x1`; other seeds can let AIC keep `x2` by chance.

use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::DEFAULT_SHEET;
use crate::error::AppError;
use crate::io::export::{TableCell, write_table_workbook};

pub const DEMO_FILE_NAME: &str = "demo.xlsx";
pub const DEMO_COLUMNS: [&str; 3] = ["x1", "x2", "y"];

const INTERCEPT: f64 = 2.0;
const SLOPE: f64 = 3.0;
const X_MAX: f64 = 10.0;

/// Demo generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoSpec {
    pub rows: usize,
    pub seed: u64,
    pub noise: f64,
}

impl Default for DemoSpec {
    fn default() -> Self {
        Self {
            rows: 20,
            seed: 42,
            noise: 0.5,
        }
    }
}

/// Generate demo rows `[x1, x2, y]`.
pub fn generate_demo(spec: &DemoSpec) -> Result<Vec<[f64; 3]>, AppError> {
    // Full model has 3 coefficients; keep at least one residual degree of freedom.
    if spec.rows < 4 {
        return Err(AppError::new(2, "Demo needs at least 4 rows."));
    }
    if !(spec.noise.is_finite() && spec.noise > 0.0) {
        return Err(AppError::new(2, "Demo noise must be finite and > 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, spec.noise)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut rows = Vec::with_capacity(spec.rows);
    for _ in 0..spec.rows {
        let x1 = rng.gen_range(0.0..X_MAX);
        let x2 = rng.gen_range(0.0..X_MAX);
        let y = INTERCEPT + SLOPE * x1 + normal.sample(&mut rng);
        rows.push([x1, x2, y]);
    }
    Ok(rows)
}

/// Write `demo.xlsx` into `dir` and return its path.
pub fn write_demo_workbook(dir: &Path, spec: &DemoSpec) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AppError::new(2, format!("Failed to create directory '{}': {e}", dir.display()))
    })?;

    let rows: Vec<Vec<TableCell>> = generate_demo(spec)?
        .iter()
        .map(|r| r.iter().map(|&v| TableCell::Number(v)).collect())
        .collect();

    let path = dir.join(DEMO_FILE_NAME);
    write_table_workbook(&path, DEFAULT_SHEET, &DEMO_COLUMNS, &rows)?;
    Ok(path)
}
