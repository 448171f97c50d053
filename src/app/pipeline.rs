//! The batch runner.
//!
//! Directory scan -> per-file error boundary -> ingest -> selection -> export.
//! Files are processed strictly one after another; a failure in one file is
//! recorded as an outcome and never stops the batch. Batch-level reports are
//! written after the loop and their failures are recorded, not returned.

use std::path::{Path, PathBuf};

use crate::domain::{
    BatchConfig, BatchSummary, Dataset, FileOutcome, OutcomeStatus, SelectionMethod,
};
use crate::error::AppError;
use crate::fit::{select, validate_thresholds};
use crate::io::{
    SignificanceRow, display_name, file_stem, list_input_files, load_dataset, write_comparison_workbook,
    write_insignificant_summary, write_result_workbook, write_significance_summary, write_summary_json,
};
use crate::report::{MAX_DECIMALS, comparison_rows, format_model_line, r_squared_t_test, result_rows};

/// File name of the cross-method comparison workbook.
pub const COMPARISON_FILE_NAME: &str = "Comparison_R_vs_MATLAB.xlsx";

/// Validate settings that would otherwise fail every file the same way.
pub fn validate_config(config: &BatchConfig) -> Result<(), AppError> {
    if config.methods.is_empty() {
        return Err(AppError::new(2, "No selection method configured."));
    }
    if config.sheet.trim().is_empty() {
        return Err(AppError::new(2, "Worksheet name must not be empty."));
    }
    if !(config.alpha.is_finite() && config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(AppError::new(2, format!("Invalid alpha {} (must lie in (0, 1)).", config.alpha)));
    }
    if config.selection.max_steps == 0 {
        return Err(AppError::new(2, "max_steps must be > 0."));
    }
    if let Some(decimals) = config.decimals.filter(|&d| d > MAX_DECIMALS) {
        return Err(AppError::new(
            2,
            format!("Invalid decimals {decimals} (must be at most {MAX_DECIMALS})."),
        ));
    }
    if config.methods.contains(&SelectionMethod::FTest) {
        validate_thresholds(&config.selection.thresholds)?;
    }
    Ok(())
}

/// Run every configured method on every input workbook.
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary, AppError> {
    validate_config(config)?;

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create output directory '{}': {e}", config.output_dir.display()),
        )
    })?;

    let files = list_input_files(&config.input_dir);
    if files.is_empty() {
        log::warn!("No valid .xlsx files found in: {}", config.input_dir.display());
    } else {
        log::info!(
            "Running {} on {} files from {}",
            method_names(&config.methods),
            files.len(),
            config.input_dir.display()
        );
    }

    let mut summary = BatchSummary {
        files_found: files.len(),
        ..Default::default()
    };

    for path in &files {
        let file = display_name(path);
        match load_dataset(path, &config.sheet) {
            Ok(Some(dataset)) => {
                for &method in &config.methods {
                    let status = match process_dataset(&dataset, &file_stem(path), method, config) {
                        Ok(status) => {
                            log::info!("Processed {file} ({})", method.tag());
                            status
                        }
                        Err(e) => {
                            log::error!("Failed {file} ({}): {e}", method.tag());
                            OutcomeStatus::Failed { error: e.to_string() }
                        }
                    };
                    summary.outcomes.push(FileOutcome {
                        file: file.clone(),
                        method,
                        status,
                    });
                }
            }
            Ok(None) => {
                let reason = format!("worksheet '{}' is empty", config.sheet);
                log::warn!("Skipped {file}: {reason}");
                push_for_all(&mut summary, &file, config, OutcomeStatus::Skipped { reason });
            }
            Err(e) => {
                log::error!("Failed {file}: {e}");
                push_for_all(&mut summary, &file, config, OutcomeStatus::Failed { error: e.to_string() });
            }
        }
    }

    for &method in &config.methods {
        let written = write_method_summaries(&summary, method, config);
        record_report(&mut summary, written);
    }
    if config.methods.contains(&SelectionMethod::Aic) && config.methods.contains(&SelectionMethod::FTest) {
        let written = write_comparison(&summary, config);
        record_report(&mut summary, written);
    }

    if let Some(path) = &config.summary_json {
        match write_summary_json(path, &summary) {
            Ok(()) => log::info!("Run report written to {}", path.display()),
            Err(e) => record_report(&mut summary, Err(e)),
        }
    }

    Ok(summary)
}

/// Select, export and describe one dataset with one method.
fn process_dataset(
    dataset: &Dataset,
    stem: &str,
    method: SelectionMethod,
    config: &BatchConfig,
) -> Result<OutcomeStatus, AppError> {
    let model = select(method, dataset, &config.selection)?;
    log::debug!("{stem}: {}", format_model_line(&model));

    let decimals = match method {
        SelectionMethod::Aic => config.decimals,
        SelectionMethod::FTest => None,
    };
    let rows = result_rows(&model, decimals);
    let output = config.output_dir.join(method.output_file_name(stem));
    write_result_workbook(&output, &rows, &model)?;

    Ok(OutcomeStatus::Processed {
        output,
        response: dataset.response_name.clone(),
        rows_used: dataset.n_rows(),
        rows_dropped: dataset.rows_dropped(),
        r_squared: model.r_squared,
        retained: model.reported_names(),
        p_max: model.p_max(),
        insignificant: model.insignificant_count(config.alpha),
    })
}

fn push_for_all(summary: &mut BatchSummary, file: &str, config: &BatchConfig, status: OutcomeStatus) {
    for &method in &config.methods {
        summary.outcomes.push(FileOutcome {
            file: file.to_string(),
            method,
            status: status.clone(),
        });
    }
}

/// Keep the paths of a written report, or log and keep its error.
fn record_report(summary: &mut BatchSummary, written: Result<Vec<PathBuf>, AppError>) {
    match written {
        Ok(paths) => summary.summary_files.extend(paths),
        Err(e) => {
            log::error!("{e}");
            summary.report_errors.push(e.to_string());
        }
    }
}

/// Write `Summary_Max_P_Values_<tag>.xlsx` and `Summary_Insignificant_Terms_<tag>.xlsx`
/// when the method processed any file.
fn write_method_summaries(
    summary: &BatchSummary,
    method: SelectionMethod,
    config: &BatchConfig,
) -> Result<Vec<PathBuf>, AppError> {
    let rows: Vec<SignificanceRow> = summary
        .outcomes
        .iter()
        .filter(|o| o.method == method)
        .filter_map(|o| match &o.status {
            OutcomeStatus::Processed {
                p_max, insignificant, ..
            } => Some(SignificanceRow {
                dataset: file_stem(Path::new(&o.file)),
                p_max: *p_max,
                insignificant: *insignificant,
            }),
            _ => None,
        })
        .collect();
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let max_p = config
        .output_dir
        .join(format!("Summary_Max_P_Values_{}.xlsx", method.tag()));
    write_significance_summary(&max_p, &rows, config.alpha)?;
    let insignificant = config
        .output_dir
        .join(format!("Summary_Insignificant_Terms_{}.xlsx", method.tag()));
    write_insignificant_summary(&insignificant, &rows, config.alpha)?;
    Ok(vec![max_p, insignificant])
}

/// Write the cross-method comparison when any dataset was processed by both methods.
fn write_comparison(summary: &BatchSummary, config: &BatchConfig) -> Result<Vec<PathBuf>, AppError> {
    let rows = comparison_rows(summary);
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let test = r_squared_t_test(&rows);
    if let Some(t) = &test {
        log::info!(
            "Paired t-test on R-squared (MATLAB vs R, n={}): t={:.4} p={:.4e}",
            t.n,
            t.t_statistic,
            t.p_value
        );
    }
    let path = config.output_dir.join(COMPARISON_FILE_NAME);
    write_comparison_workbook(&path, &rows, test.as_ref(), config.alpha)?;
    Ok(vec![path])
}

fn method_names(methods: &[SelectionMethod]) -> String {
    methods
        .iter()
        .map(|m| m.display_name())
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, open_workbook_auto};

    use crate::domain::{DEFAULT_SHEET, INTERCEPT_NAME, SelectionOptions};
    use crate::io::{COMPARISON_SHEET, RESULTS_SHEET, SUMMARY_SHEET, T_TEST_SHEET, TableCell, write_table_workbook};
    use crate::report::{R_SQUARED_METRIC, TERM_METRIC};

    fn wiggle(i: usize) -> f64 {
        let v = (i as f64 * 12.9898).sin() * 43_758.545_3;
        v - v.floor() - 0.5
    }

    /// 20 rows of `x1, x2, y` with `y = 2 + 3 x1 + noise`.
    fn write_demo_like(path: &Path) {
        let rows: Vec<Vec<TableCell>> = (0..20)
            .map(|i| {
                let x1 = i as f64;
                let x2 = ((i * 11) % 7) as f64 * 1.5;
                let y = 2.0 + 3.0 * x1 + wiggle(i);
                vec![TableCell::Number(x1), TableCell::Number(x2), TableCell::Number(y)]
            })
            .collect();
        write_table_workbook(path, DEFAULT_SHEET, &["x1", "x2", "y"], &rows).unwrap();
    }

    fn config(input: &Path, output: &Path) -> BatchConfig {
        BatchConfig {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            methods: vec![SelectionMethod::Aic, SelectionMethod::FTest],
            sheet: DEFAULT_SHEET.to_string(),
            decimals: Some(4),
            selection: SelectionOptions::default(),
            alpha: 0.05,
            summary_json: None,
        }
    }

    fn read_results(path: &Path) -> Vec<(String, Data)> {
        let mut wb = open_workbook_auto(path).unwrap();
        let range = wb.worksheet_range(RESULTS_SHEET).unwrap();
        range
            .rows()
            .skip(1)
            .map(|r| (r[0].to_string(), r[1].clone()))
            .collect()
    }

    fn xlsx_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "xlsx"))
            .count()
    }

    #[test]
    fn demo_file_retains_only_x1() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_demo_like(&input.path().join("demo.xlsx"));

        let summary = run_batch(&config(input.path(), output.path())).unwrap();
        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.processed(), 2);

        let aic = read_results(&output.path().join("demo_R_stepwise.xlsx"));
        assert_eq!(aic.len(), 2);
        assert_eq!(aic[0].0, R_SQUARED_METRIC);
        let Data::Float(r2) = aic[0].1 else {
            panic!("R-squared should be numeric");
        };
        assert!(r2 > 0.99 && r2 <= 1.0);
        assert_eq!(aic[1], (TERM_METRIC.to_string(), Data::String("x1".into())));

        let ftest = read_results(&output.path().join("result_MATLAB_demo.xlsx"));
        let names: Vec<Data> = ftest.iter().skip(1).map(|(_, v)| v.clone()).collect();
        assert_eq!(
            names,
            vec![Data::String(INTERCEPT_NAME.into()), Data::String("x1".into())]
        );

        assert!(output.path().join("Summary_Max_P_Values_R.xlsx").exists());
        assert!(output.path().join("Summary_Max_P_Values_MATLAB.xlsx").exists());
    }

    #[test]
    fn empty_and_malformed_files_do_not_stop_the_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_table_workbook(&input.path().join("a_empty.xlsx"), DEFAULT_SHEET, &["x1", "y"], &[]).unwrap();
        write_table_workbook(
            &input.path().join("b_no_after.xlsx"),
            "Sheet1",
            &["x1", "y"],
            &[vec![TableCell::Number(1.0), TableCell::Number(2.0)]],
        )
        .unwrap();
        write_demo_like(&input.path().join("c_good.xlsx"));

        let mut cfg = config(input.path(), output.path());
        cfg.methods = vec![SelectionMethod::Aic];
        let summary = run_batch(&cfg).unwrap();

        assert_eq!(summary.files_found, 3);
        assert!(matches!(summary.outcomes[0].status, OutcomeStatus::Skipped { .. }));
        assert!(matches!(summary.outcomes[1].status, OutcomeStatus::Failed { .. }));
        assert!(matches!(summary.outcomes[2].status, OutcomeStatus::Processed { .. }));

        assert!(!output.path().join("a_empty_R_stepwise.xlsx").exists());
        assert!(!output.path().join("b_no_after_R_stepwise.xlsx").exists());
        assert!(output.path().join("c_good_R_stepwise.xlsx").exists());
    }

    #[test]
    fn no_matching_files_produce_no_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("notes.txt"), "x").unwrap();
        write_demo_like(&input.path().join("~$locked.xlsx"));

        let summary = run_batch(&config(input.path(), output.path())).unwrap();
        assert_eq!(summary.files_found, 0);
        assert!(summary.outcomes.is_empty());
        assert_eq!(xlsx_count(output.path()), 0);
    }

    #[test]
    fn missing_input_directory_is_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("out");
        let summary = run_batch(&config(&root.path().join("missing"), &output)).unwrap();
        assert_eq!(summary.files_found, 0);
        assert!(output.is_dir());
    }

    #[test]
    fn rerun_gives_identical_results() {
        let input = tempfile::tempdir().unwrap();
        let out_a = tempfile::tempdir().unwrap();
        let out_b = tempfile::tempdir().unwrap();
        write_demo_like(&input.path().join("demo.xlsx"));

        run_batch(&config(input.path(), out_a.path())).unwrap();
        run_batch(&config(input.path(), out_b.path())).unwrap();

        for name in ["demo_R_stepwise.xlsx", "result_MATLAB_demo.xlsx"] {
            assert_eq!(
                read_results(&out_a.path().join(name)),
                read_results(&out_b.path().join(name))
            );
        }
    }

    #[test]
    fn invalid_thresholds_abort_before_processing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut cfg = config(input.path(), output.path());
        cfg.selection.thresholds.p_enter = 0.5;
        let err = run_batch(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn summary_json_lists_outcomes() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_demo_like(&input.path().join("demo.xlsx"));
        let mut cfg = config(input.path(), output.path());
        let json = output.path().join("run.json");
        cfg.summary_json = Some(json.clone());

        run_batch(&cfg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["files_found"], 1);
        assert_eq!(value["outcomes"][0]["status"], "processed");
        assert_eq!(value["outcomes"][0]["method"], "aic");
        assert_eq!(value["outcomes"][0]["response"], "y");
        assert_eq!(value["outcomes"][0]["rows_used"], 20);
        assert_eq!(value["outcomes"][0]["rows_dropped"], 0);
    }

    #[test]
    fn unwritable_json_report_keeps_the_batch_result() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_demo_like(&input.path().join("demo.xlsx"));
        let mut cfg = config(input.path(), output.path());
        cfg.summary_json = Some(output.path().join("no/such/dir/run.json"));

        let summary = run_batch(&cfg).unwrap();
        assert_eq!(summary.processed(), 2);
        assert_eq!(summary.report_errors.len(), 1);
        assert!(summary.report_errors[0].contains("run.json"));
        assert!(output.path().join("demo_R_stepwise.xlsx").exists());
        assert!(output.path().join("result_MATLAB_demo.xlsx").exists());
    }

    fn cell_f64(range: &calamine::Range<Data>, pos: (usize, usize)) -> f64 {
        match range.get(pos) {
            Some(Data::Float(v)) => *v,
            other => panic!("expected a number at {pos:?}, got {other:?}"),
        }
    }

    fn processed_p_max(summary: &BatchSummary, file: &str, method: SelectionMethod) -> f64 {
        summary
            .outcomes
            .iter()
            .find_map(|o| match &o.status {
                OutcomeStatus::Processed { p_max, .. } if o.file == file && o.method == method => Some(*p_max),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn significance_summary_lists_each_processed_dataset() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_demo_like(&input.path().join("a_good.xlsx"));
        write_table_workbook(
            &input.path().join("b_no_after.xlsx"),
            "Sheet1",
            &["x1", "y"],
            &[vec![TableCell::Number(1.0), TableCell::Number(2.0)]],
        )
        .unwrap();
        write_demo_like(&input.path().join("c_good.xlsx"));

        let mut cfg = config(input.path(), output.path());
        cfg.methods = vec![SelectionMethod::Aic];
        let summary = run_batch(&cfg).unwrap();
        assert_eq!(summary.failed(), 1);

        let mut wb = open_workbook_auto(output.path().join("Summary_Max_P_Values_R.xlsx")).unwrap();
        let range = wb.worksheet_range(SUMMARY_SHEET).unwrap();
        assert_eq!(range.get_size(), (3, 3));
        assert_eq!(range.get((0, 0)), Some(&Data::String("Dataset".into())));
        assert_eq!(range.get((0, 1)), Some(&Data::String("p_max".into())));
        assert_eq!(range.get((0, 2)), Some(&Data::String("Count_p_gt_0.05".into())));
        assert_eq!(range.get((1, 0)), Some(&Data::String("a_good".into())));
        assert_eq!(range.get((2, 0)), Some(&Data::String("c_good".into())));

        let expected = processed_p_max(&summary, "a_good.xlsx", SelectionMethod::Aic);
        assert!((cell_f64(&range, (1, 1)) - expected).abs() <= expected.abs() * 1e-12);
        assert!(expected < 0.05);
        assert_eq!(cell_f64(&range, (1, 2)), 0.0);

        assert!(output.path().join("Summary_Insignificant_Terms_R.xlsx").exists());
        assert!(!output.path().join(COMPARISON_FILE_NAME).exists());
    }

    #[test]
    fn both_methods_write_a_comparison() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_demo_like(&input.path().join("a.xlsx"));
        write_demo_like(&input.path().join("b.xlsx"));

        let summary = run_batch(&config(input.path(), output.path())).unwrap();
        let path = output.path().join(COMPARISON_FILE_NAME);
        assert!(summary.summary_files.contains(&path));

        let mut wb = open_workbook_auto(&path).unwrap();
        let table = wb.worksheet_range(COMPARISON_SHEET).unwrap();
        assert_eq!(table.get_size(), (3, 5));
        assert_eq!(table.get((2, 0)), Some(&Data::String("b".into())));
        // Both methods keep x1 only, so the fits coincide.
        assert!((cell_f64(&table, (1, 1)) - cell_f64(&table, (1, 2))).abs() < 1e-12);

        let test = wb.worksheet_range(T_TEST_SHEET).unwrap();
        assert_eq!(test.get((1, 0)), Some(&Data::String("MATLAB vs R".into())));
        assert_eq!(cell_f64(&test, (1, 1)), 2.0);
    }

    #[test]
    fn oversized_decimals_are_rejected() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut cfg = config(input.path(), output.path());
        cfg.decimals = Some(MAX_DECIMALS + 1);
        assert_eq!(run_batch(&cfg).unwrap_err().exit_code(), 2);
    }
}
