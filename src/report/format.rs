//! Formatted terminal output.
//!
//! Formatting lives here so the selection code stays free of presentation and
//! output changes stay localized.

use crate::domain::{BatchSummary, FittedModel, OutcomeStatus};

/// One-line description of a selected model.
pub fn format_model_line(model: &FittedModel) -> String {
    format!(
        "{}: n={} | R-squared={:.4} (full {:.4}) | retained {} | p_max={:.4e} | steps={}",
        model.method.display_name(),
        model.n,
        model.r_squared,
        model.full_r_squared,
        fmt_names(&model.retained),
        model.p_max(),
        model.steps.len(),
    )
}

/// Multi-line summary printed after a batch run.
pub fn format_batch_summary(summary: &BatchSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Files: {} | processed={} skipped={} failed={}\n",
        summary.files_found,
        summary.processed(),
        summary.skipped(),
        summary.failed()
    ));

    for error in &summary.report_errors {
        out.push_str(&format!("Report error: {error}\n"));
    }

    if summary.outcomes.is_empty() {
        return out;
    }

    out.push_str(
        format!(
            "{:<32} {:<8} {:<10} {:>10} {:<30}\n",
            "file", "method", "status", "R2", "retained"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<32} {:-<8} {:-<10} {:-<10} {:-<30}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for o in &summary.outcomes {
        let (status, r2, detail) = match &o.status {
            OutcomeStatus::Processed {
                r_squared, retained, ..
            } => ("ok", format!("{r_squared:.4}"), fmt_names(retained)),
            OutcomeStatus::Skipped { reason } => ("skipped", String::new(), reason.clone()),
            OutcomeStatus::Failed { error } => ("failed", String::new(), error.clone()),
        };
        out.push_str(
            format!(
                "{:<32} {:<8} {:<10} {:>10} {}\n",
                truncate(&o.file, 32),
                o.method.tag(),
                status,
                r2,
                truncate(&detail, 60),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    for path in &summary.summary_files {
        out.push_str(&format!("Summary: {}\n", path.display()));
    }

    out
}

fn fmt_names(names: &[String]) -> String {
    format!("[{}]", names.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
