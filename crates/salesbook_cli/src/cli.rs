//! Command-line surface of the `salesbook` binary.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Build the classified sales report workbook from a marketplace export.
#[derive(Parser, Debug)]
#[command(name = "salesbook", version, about)]
pub struct Cli {
    /// Project root holding `pre/`, `final/` and the YAML configuration
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Source workbook; defaults to the first `*.xlsx` in `<root>/pre`
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Output workbook; defaults to `<root>/final/final_report.xlsx`
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Classification book; defaults to `<root>/book.yaml`
    #[arg(long, value_name = "PATH")]
    pub book: Option<PathBuf>,

    /// Short view column list; defaults to `<root>/pars.yaml`
    #[arg(long, value_name = "PATH")]
    pub pars: Option<PathBuf>,

    /// Logistics view column list; defaults to `<root>/logistics.yaml` when present
    #[arg(long, value_name = "PATH")]
    pub logistics_columns: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

/// Input/output locations with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRunPaths {
    pub dir_source: PathBuf,
    pub path_source: Option<PathBuf>,
    pub path_out: PathBuf,
    pub path_book: PathBuf,
    pub path_pars: PathBuf,
    pub path_logistics_columns: Option<PathBuf>,
}

impl Cli {
    /// Resolve every path against `--root`.
    pub fn derive_run_paths(&self) -> SpecRunPaths {
        let root = self.root.as_path();
        SpecRunPaths {
            dir_source: root.join("pre"),
            path_source: self.source.clone(),
            path_out: self
                .out
                .clone()
                .unwrap_or_else(|| root.join("final").join("final_report.xlsx")),
            path_book: self.book.clone().unwrap_or_else(|| root.join("book.yaml")),
            path_pars: self.pars.clone().unwrap_or_else(|| root.join("pars.yaml")),
            path_logistics_columns: self
                .logistics_columns
                .clone()
                .or_else(|| derive_existing(&root.join("logistics.yaml"))),
        }
    }
}

fn derive_existing(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn test_defaults_resolve_against_root() {
        let cli = Cli::try_parse_from(["salesbook", "--root", "/data/shop"]).unwrap();
        let paths = cli.derive_run_paths();
        assert_eq!(paths.dir_source, PathBuf::from("/data/shop/pre"));
        assert_eq!(
            paths.path_out,
            PathBuf::from("/data/shop/final/final_report.xlsx")
        );
        assert_eq!(paths.path_book, PathBuf::from("/data/shop/book.yaml"));
        assert_eq!(paths.path_pars, PathBuf::from("/data/shop/pars.yaml"));
        assert_eq!(paths.path_source, None);
        assert_eq!(paths.path_logistics_columns, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_logistics_yaml_is_picked_up_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logistics.yaml"), "- Group\n").unwrap();

        let cli = Cli::try_parse_from([
            OsString::from("salesbook"),
            OsString::from("--root"),
            dir.path().as_os_str().to_owned(),
            OsString::from("-v"),
        ])
        .unwrap();
        let paths = cli.derive_run_paths();
        assert_eq!(
            paths.path_logistics_columns,
            Some(dir.path().join("logistics.yaml"))
        );
        assert!(cli.verbose);
    }

    #[test]
    fn test_explicit_paths_win() {
        let cli = Cli::try_parse_from([
            "salesbook",
            "--source",
            "in.xlsx",
            "--out",
            "out.xlsx",
            "--book",
            "b.yaml",
            "--pars",
            "p.yaml",
            "--logistics-columns",
            "l.yaml",
        ])
        .unwrap();
        let paths = cli.derive_run_paths();
        assert_eq!(paths.path_source, Some(PathBuf::from("in.xlsx")));
        assert_eq!(paths.path_out, PathBuf::from("out.xlsx"));
        assert_eq!(paths.path_book, PathBuf::from("b.yaml"));
        assert_eq!(paths.path_pars, PathBuf::from("p.yaml"));
        assert_eq!(
            paths.path_logistics_columns,
            Some(PathBuf::from("l.yaml"))
        );
    }
}
