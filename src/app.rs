//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves directories (flags first, then `.env` / environment)
//! - runs the batch or writes the demo workbook

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Command, DemoArgs, RunArgs};
use crate::data::{DemoSpec, write_demo_workbook};
use crate::domain::{BatchConfig, FTestThresholds, SelectionOptions};
use crate::error::AppError;
use crate::report::format_batch_summary;

pub mod pipeline;

/// Environment fallback for `--input`.
pub const INPUT_DIR_ENV: &str = "STEPWISE_INPUT_DIR";
/// Environment fallback for `--output`.
pub const OUTPUT_DIR_ENV: &str = "STEPWISE_OUTPUT_DIR";

/// Entry point for the `stepwise` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let config = batch_config_from_args(&args, |key| std::env::var(key).ok())?;
    let summary = pipeline::run_batch(&config)?;

    for line in format_batch_summary(&summary).lines() {
        log::info!("{line}");
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let spec = DemoSpec {
        rows: args.rows,
        seed: args.seed,
        noise: args.noise,
    };
    let path = write_demo_workbook(&args.output, &spec)?;
    log::info!("Demo workbook written to {}", path.display());
    Ok(())
}

/// Build the batch configuration; `env` looks up directory fallbacks.
pub fn batch_config_from_args(
    args: &RunArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BatchConfig, AppError> {
    let input_dir = resolve_dir(args.input.as_ref(), INPUT_DIR_ENV, "--input", &env)?;
    let output_dir = resolve_dir(args.output.as_ref(), OUTPUT_DIR_ENV, "--output", &env)?;

    Ok(BatchConfig {
        input_dir,
        output_dir,
        methods: args.method.methods(),
        sheet: args.sheet.clone(),
        decimals: (!args.no_round).then_some(args.decimals),
        selection: SelectionOptions {
            thresholds: FTestThresholds {
                p_enter: args.p_enter,
                p_remove: args.p_remove,
            },
            max_steps: args.max_steps,
        },
        alpha: args.alpha,
        summary_json: args.summary_json.clone(),
    })
}

fn resolve_dir(
    flag: Option<&PathBuf>,
    env_key: &str,
    flag_name: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path.clone());
    }
    match env(env_key) {
        Some(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => Err(AppError::new(
            2,
            format!("Missing directory: pass {flag_name} or set {env_key}."),
        )),
    }
}
