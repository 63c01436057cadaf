//! `salesbook`: classify, order and subtotal a marketplace sales export.

use std::fs;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use salesbook_core::{SpecReportConfig, build_report};
use salesbook_io_xlsx::{
    SpecXlsxFormats, SpecXlsxSheetWriteOptions, XlsxWriter, read_xlsx_dataset,
};
use tracing_subscriber::EnvFilter;

mod cli;
mod discover;

use cli::{Cli, SpecRunPaths};
use discover::find_source_workbook;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(&cli.derive_run_paths())
}

fn init_logging(if_verbose: bool) {
    let c_level_default = if if_verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(c_level_default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn run(paths: &SpecRunPaths) -> Result<()> {
    let config = SpecReportConfig::load(
        &paths.path_book,
        &paths.path_pars,
        paths.path_logistics_columns.as_deref(),
    )
    .context("failed to load configuration")?;

    let path_source = match &paths.path_source {
        Some(path) => path.clone(),
        None => find_source_workbook(&paths.dir_source)?,
    };
    tracing::info!(source = %path_source.display(), "reading source workbook");

    let source = read_xlsx_dataset(&path_source)
        .map_err(|err| anyhow!(err))
        .with_context(|| format!("failed to read {}", path_source.display()))?;

    let views = build_report(&source, &config).context("failed to build report views")?;

    if let Some(dir_out) = paths.path_out.parent()
        && !dir_out.as_os_str().is_empty()
    {
        fs::create_dir_all(dir_out)
            .with_context(|| format!("failed to create {}", dir_out.display()))?;
    }

    let mut writer = XlsxWriter::new(paths.path_out.clone(), SpecXlsxFormats::default());
    for view in views.into_views() {
        let options = SpecXlsxSheetWriteOptions {
            if_autofilter: true,
            rows_highlight: view.rows_highlight,
            ..Default::default()
        };
        writer
            .write_sheet_from_dataset(&view.dataset, &view.sheet_name, &options)
            .map_err(|err| anyhow!(err))
            .with_context(|| format!("failed to write sheet {:?}", view.sheet_name))?;
        tracing::info!(
            sheet = %view.sheet_name,
            rows = view.dataset.height(),
            columns = view.dataset.width(),
            "view written"
        );
    }
    writer
        .close()
        .map_err(|err| anyhow!(err))
        .with_context(|| format!("failed to save {}", writer.file_out()))?;

    tracing::info!(path = %writer.file_out(), "report ready");
    Ok(())
}
