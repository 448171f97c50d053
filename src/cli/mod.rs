//! Command-line parsing for the batch stepwise runner.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! selection and IO code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_SHEET, MethodChoice};
use crate::report::MAX_DECIMALS;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "stepwise", version, about = "Batch stepwise regression over Excel datasets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run stepwise selection on every workbook in a directory.
    Run(RunArgs),
    /// Write a synthetic `demo.xlsx` (y depends on x1 only).
    Demo(DemoArgs),
}

/// Options for a batch run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Directory of input workbooks (falls back to STEPWISE_INPUT_DIR).
    #[arg(short, long, value_name = "DIR")]
    pub input: Option<PathBuf>,

    /// Directory for result workbooks (falls back to STEPWISE_OUTPUT_DIR).
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Selection procedure(s) to run for each file.
    #[arg(short, long, value_enum, default_value_t = MethodChoice::Both)]
    pub method: MethodChoice,

    /// Worksheet holding the data.
    #[arg(long, default_value = DEFAULT_SHEET)]
    pub sheet: String,

    /// Decimal places for R-squared in the AIC results (0 to 15).
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(0..=MAX_DECIMALS as i64))]
    pub decimals: u32,

    /// Keep full R-squared precision in the AIC results.
    #[arg(long)]
    pub no_round: bool,

    /// Entry threshold for the F-test search.
    #[arg(long, default_value_t = 0.05)]
    pub p_enter: f64,

    /// Removal threshold for the F-test search.
    #[arg(long, default_value_t = 0.10)]
    pub p_remove: f64,

    /// Significance level for counting insignificant terms.
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    /// Maximum number of selection steps per search.
    #[arg(long, default_value_t = 1000)]
    pub max_steps: usize,

    /// Write a JSON run report.
    #[arg(long, value_name = "JSON")]
    pub summary_json: Option<PathBuf>,
}

/// Options for the demo dataset.
#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Directory to write `demo.xlsx` into.
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Number of rows.
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the response noise.
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["stepwise", "run", "-i", "in", "-o", "out"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.method, MethodChoice::Both);
        assert_eq!(args.sheet, "After");
        assert_eq!(args.decimals, 4);
        assert_eq!(args.input, Some(PathBuf::from("in")));
    }

    #[test]
    fn method_values_parse() {
        let cli = Cli::parse_from(["stepwise", "run", "--method", "ftest"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.method, MethodChoice::Ftest);
        assert!(args.input.is_none());
    }

    #[test]
    fn decimals_are_capped() {
        assert!(Cli::try_parse_from(["stepwise", "run", "--decimals", "400"]).is_err());
        let cli = Cli::try_parse_from(["stepwise", "run", "--decimals", "15"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.decimals, 15);
    }
}
