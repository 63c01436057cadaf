//! Source workbook discovery inside the `pre/` directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::Glob;

const PATTERN_SOURCE: &str = "*.xlsx";
const PREFIX_LOCK_FILE: &str = "~$";

/// Return the first `*.xlsx` file of `dir_source` in file-name order.
///
/// Office lock files (`~$name.xlsx`) are skipped.
pub fn find_source_workbook(dir_source: &Path) -> Result<PathBuf> {
    let matcher = Glob::new(PATTERN_SOURCE)
        .with_context(|| format!("invalid source pattern {PATTERN_SOURCE:?}"))?
        .compile_matcher();

    let mut l_candidates = Vec::new();
    let entries = fs::read_dir(dir_source)
        .with_context(|| format!("failed to list {}", dir_source.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir_source.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(c_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if c_name.starts_with(PREFIX_LOCK_FILE) || !matcher.is_match(c_name) {
            continue;
        }
        l_candidates.push(path);
    }

    l_candidates.sort();
    tracing::debug!(candidates = l_candidates.len(), dir = %dir_source.display(), "source candidates");

    match l_candidates.into_iter().next() {
        Some(path) => Ok(path),
        None => bail!(
            "no {PATTERN_SOURCE} source workbook found in {}",
            dir_source.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_workbook_by_name_wins() {
        let dir = tempfile::tempdir().unwrap();
        for c_name in ["b_report.xlsx", "a_report.xlsx", "notes.txt", "~$a_report.xlsx"] {
            fs::write(dir.path().join(c_name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("0_dir.xlsx")).unwrap();

        let path = find_source_workbook(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("a_report.xlsx"));
    }

    #[test]
    fn test_no_workbook_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let err = find_source_workbook(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no *.xlsx source workbook"));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_source_workbook(&dir.path().join("pre")).is_err());
    }
}
