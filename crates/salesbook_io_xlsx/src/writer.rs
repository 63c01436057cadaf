//! XLSX writer kernel that renders datasets/dataframes into workbook output.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{NaiveDateTime, NaiveTime};
use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use salesbook_core::{Dataset, EnumCellValue};

use crate::bridge::{EnumColumnKind, derive_column_kinds, derive_dataset_from_dataframe};
use crate::conf::N_LEN_EXCEL_SHEET_NAME_MAX;
use crate::spec::{
    SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice, SpecXlsxFormats, SpecXlsxReport,
};
use crate::util::{
    convert_cell_value, plan_sheet_slices, sanitize_sheet_name, validate_unique_columns,
};

/// Per-sheet call options.
#[derive(Default, Debug, Clone)]
pub struct SpecXlsxSheetWriteOptions {
    /// Add an autofilter over header and body.
    pub if_autofilter: bool,
    /// Source row indices rendered with the highlight format.
    pub rows_highlight: Vec<usize>,
    /// Column width bounds.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

/// Body formats of one sheet slice for one row style.
struct XlsxBodyFormats {
    by_col: Vec<Format>,
    date: Format,
    datetime: Format,
}

impl XlsxBodyFormats {
    fn new(
        fmt_specs_by_col: &[SpecCellFormat],
        formats: &SpecXlsxFormats,
        patch: &SpecCellFormat,
    ) -> Self {
        Self {
            by_col: fmt_specs_by_col
                .iter()
                .map(|fmt_spec| derive_rust_xlsx_format(&fmt_spec.merge(patch)))
                .collect(),
            date: derive_rust_xlsx_format(&formats.date.merge(patch)),
            datetime: derive_rust_xlsx_format(&formats.datetime.merge(patch)),
        }
    }

    /// Date/time cells carry a date format whatever their column kind.
    fn select(&self, n_idx_col: usize, value: &EnumCellValue) -> &Format {
        match value {
            EnumCellValue::DateTime(dt) if is_midnight(dt) => &self.date,
            EnumCellValue::DateTime(_) => &self.datetime,
            _ => &self.by_col[n_idx_col],
        }
    }
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecXlsxFormats,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format presets.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(path_file_out: PathBuf, formats: SpecXlsxFormats) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook
            .save(&self.path_file_out)
            .map_err(derive_xlsx_error_text)?;
        self.if_closed = true;
        tracing::info!(path = %self.file_out(), "workbook saved");
        Ok(())
    }

    /// Write one sheet from a dataset.
    ///
    /// Every cell keeps its own type: numbers, date/times and booleans are
    /// written natively even inside a text column.
    pub fn write_sheet_from_dataset(
        &mut self,
        dataset: &Dataset,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }
        self.write_sheet(dataset, sheet_name, options)
    }

    /// Write one sheet from an in-memory dataframe.
    pub fn write_sheet_from_dataframe(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        let dataset = derive_dataset_from_dataframe(df_data)?;
        self.write_sheet_from_dataset(&dataset, sheet_name, options)
    }

    fn write_sheet(
        &mut self,
        dataset: &Dataset,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        validate_policy_autofit(&options.policy_autofit)?;
        validate_unique_columns(dataset.columns())?;

        let n_width_df = dataset.width();
        let n_height_df = dataset.height();
        let l_kinds = derive_column_kinds(dataset);

        let n_rows_header = 1usize;
        let set_rows_highlight: BTreeSet<usize> = options.rows_highlight.iter().copied().collect();

        let mut report = SpecXlsxReport::default();
        let l_sheet_parts = plan_sheet_slices(
            n_height_df,
            n_width_df,
            n_rows_header,
            &sanitize_sheet_name(sheet_name, "_"),
            &mut report,
        )?;

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique = self.derive_unique_sheet_name(&sheet_slice.sheet_name);
            if sheet_name_unique != sheet_slice.sheet_name {
                report.warn(format!(
                    "Sheet name {:?} already used, written as {sheet_name_unique:?}.",
                    sheet_slice.sheet_name
                ));
            }

            let n_col_start = sheet_slice.col_start_inclusive;
            let n_width_slice = sheet_slice.col_end_exclusive - n_col_start;
            let l_kinds_slice = &l_kinds[n_col_start..sheet_slice.col_end_exclusive];

            let l_fmt_spec_by_col = plan_column_formats(l_kinds_slice, &self.formats);
            let fmts_body =
                XlsxBodyFormats::new(&l_fmt_spec_by_col, &self.formats, &SpecCellFormat::default());
            let fmts_highlight =
                XlsxBodyFormats::new(&l_fmt_spec_by_col, &self.formats, &self.formats.highlight);
            let fmt_header = derive_rust_xlsx_format(&self.formats.header);

            let l_header_slice = &dataset.columns()[n_col_start..sheet_slice.col_end_exclusive];
            let mut l_width_by_col: Vec<usize> = l_header_slice
                .iter()
                .map(|c_name| estimate_unicode_string_width(c_name))
                .collect();

            let worksheet = self.workbook.add_worksheet();
            worksheet
                .set_name(&sheet_name_unique)
                .map_err(derive_xlsx_error_text)?;

            write_header(worksheet, l_header_slice, &fmt_header)?;

            let l_rows_slice =
                &dataset.rows()[sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive];
            for (n_row_local, row) in l_rows_slice.iter().enumerate() {
                let fmts_row =
                    if set_rows_highlight.contains(&(sheet_slice.row_start_inclusive + n_row_local)) {
                        &fmts_highlight
                    } else {
                        &fmts_body
                    };

                for n_idx_col in 0..n_width_slice {
                    let value = convert_cell_value(&row[n_col_start + n_idx_col]);
                    l_width_by_col[n_idx_col] = usize::max(
                        l_width_by_col[n_idx_col],
                        estimate_width_len(&value, l_kinds_slice[n_idx_col]),
                    );
                    write_cell_with_format(
                        worksheet,
                        n_rows_header + n_row_local,
                        n_idx_col,
                        &value,
                        fmts_row.select(n_idx_col, &value),
                    )?;
                }
            }

            worksheet
                .set_freeze_panes(cast_row_num(n_rows_header)?, 0)
                .map_err(derive_xlsx_error_text)?;

            if options.if_autofilter && n_width_slice > 0 {
                worksheet
                    .autofilter(
                        0,
                        0,
                        cast_row_num(n_rows_header - 1 + l_rows_slice.len())?,
                        cast_col_num(n_width_slice - 1)?,
                    )
                    .map_err(derive_xlsx_error_text)?;
            }

            apply_column_widths(worksheet, &l_width_by_col, &options.policy_autofit)?;

            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                ..sheet_slice
            });
        }

        for c_warning in &report.warnings {
            tracing::warn!(sheet = sheet_name, "{c_warning}");
        }
        tracing::debug!(
            sheet = sheet_name,
            rows = n_height_df,
            columns = n_width_df,
            highlighted = set_rows_highlight.len(),
            "sheet written"
        );
        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        let c_key = name.to_lowercase();
        if !self.set_sheet_names_existing.contains(&c_key) {
            self.set_sheet_names_existing.insert(c_key);
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            let c_key = candidate.to_lowercase();
            if !self.set_sheet_names_existing.contains(&c_key) {
                self.set_sheet_names_existing.insert(c_key);
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn is_midnight(dt: &NaiveDateTime) -> bool {
    dt.time() == NaiveTime::MIN
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue, kind: EnumColumnKind) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::Number(n) => match kind {
            EnumColumnKind::Integer => (*n as i64).to_string().len(),
            EnumColumnKind::Decimal => format!("{n:.2}").len(),
            _ => value.to_text().len(),
        },
        EnumCellValue::DateTime(dt) if is_midnight(dt) => "yyyy-mm-dd".len(),
        EnumCellValue::DateTime(_) => "yyyy-mm-dd hh:mm:ss".len(),
        other => estimate_unicode_string_width(&other.to_text()),
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn apply_column_widths(
    worksheet: &mut Worksheet,
    widths: &[usize],
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Result<(), String> {
    for (n_idx_col, n_width_recorded) in widths.iter().enumerate() {
        worksheet
            .set_column_width(
                cast_col_num(n_idx_col)?,
                derive_column_width(*n_width_recorded, policy_autofit) as f64,
            )
            .map_err(derive_xlsx_error_text)?;
    }
    Ok(())
}

/// Final column width: recorded width plus padding, clamped to the policy.
pub fn derive_column_width(width_recorded: usize, policy_autofit: &SpecAutofitCellsPolicy) -> usize {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    usize::min(
        n_max,
        usize::max(n_min, width_recorded + policy_autofit.width_cell_padding),
    )
}

/// Resolve the body format of each column from its kind.
pub fn plan_column_formats(kinds: &[EnumColumnKind], formats: &SpecXlsxFormats) -> Vec<SpecCellFormat> {
    kinds
        .iter()
        .map(|kind| match kind {
            EnumColumnKind::Integer => formats.integer.clone(),
            EnumColumnKind::Decimal => formats.decimal.clone(),
            EnumColumnKind::DateTime => formats.datetime.clone(),
            EnumColumnKind::Text => formats.text.clone(),
        })
        .collect()
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        );
    }
    Ok(())
}

fn write_header(
    worksheet: &mut Worksheet,
    header: &[String],
    fmt_header: &Format,
) -> Result<(), String> {
    for (col_idx, cell_value) in header.iter().enumerate() {
        if cell_value.is_empty() {
            worksheet
                .write_blank(0, cast_col_num(col_idx)?, fmt_header)
                .map_err(derive_xlsx_error_text)?;
        } else {
            worksheet
                .write_string_with_format(0, cast_col_num(col_idx)?, cell_value, fmt_header)
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => worksheet.write_blank(n_row, n_col, format),
        EnumCellValue::Number(val) => worksheet.write_number_with_format(n_row, n_col, *val, format),
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)
        }
        EnumCellValue::DateTime(dt) => worksheet.write_datetime_with_format(n_row, n_col, dt, format),
        EnumCellValue::String(val) => worksheet.write_string_with_format(n_row, n_col, val, format),
    }
    .map_err(derive_xlsx_error_text)?;
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}
