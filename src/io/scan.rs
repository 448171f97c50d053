//! Input directory scan.

use std::path::{Path, PathBuf};

use crate::domain::TEMP_FILE_PREFIX;

/// Whether a file name is an input workbook (not an Excel lock file).
pub fn is_input_workbook(name: &str) -> bool {
    name.ends_with(".xlsx") && !name.starts_with(TEMP_FILE_PREFIX)
}

/// List input workbooks in `dir`, sorted by file name.
///
/// A missing or unreadable directory yields an empty list and a warning; the
/// batch then completes without output.
pub fn list_input_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Input directory '{}' is not readable: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_str().is_some_and(is_input_workbook))
        .map(|entry| entry.path())
        .collect();
    files.sort();
    files
}

/// File name of `path` for log messages.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// File stem of `path` used to derive output names.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
