//! Stateless helper utilities used by the XLSX kernel.

use salesbook_core::EnumCellValue;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{SpecSheetSlice, SpecXlsxReport};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Normalize a cell value for writing: non-finite numbers become blank.
pub fn convert_cell_value(value: &EnumCellValue) -> EnumCellValue {
    match value {
        EnumCellValue::Number(n) if !n.is_finite() => EnumCellValue::None,
        other => other.clone(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    salesbook_core::dataset::validate_unique_columns(columns).map_err(|err| err.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Split a logical table into Excel-compliant sheet slices.
///
/// Empty tables (zero rows and/or zero columns) still yield one slice so the
/// sheet exists in the workbook.
pub fn plan_sheet_slices(
    height_df: usize,
    width_df: usize,
    height_header: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Result<Vec<SpecSheetSlice>, String> {
    let n_rows_data_max = N_NROWS_EXCEL_MAX
        .checked_sub(height_header)
        .filter(|n_rows| *n_rows > 0)
        .ok_or_else(|| {
            format!("Header too tall: height_header={height_header} exceeds Excel limit.")
        })?;

    let l_col_slices = derive_spans(width_df, N_NCOLS_EXCEL_MAX);
    let l_row_slices = derive_spans(height_df, n_rows_data_max);
    let n_parts_total = l_col_slices.len() * l_row_slices.len();

    let mut l_sheet_parts = Vec::with_capacity(n_parts_total);
    for (col_start, col_end) in &l_col_slices {
        for (row_start, row_end) in &l_row_slices {
            let c_part_sheet_name = if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, l_sheet_parts.len() + 1)
            };

            l_sheet_parts.push(SpecSheetSlice {
                sheet_name: c_part_sheet_name,
                row_start_inclusive: *row_start,
                row_end_exclusive: *row_end,
                col_start_inclusive: *col_start,
                col_end_exclusive: *col_end,
            });
        }
    }

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: {sheet_name:?} split into {n_parts_total} sheets (columns-first, then rows)."
        ));
    }

    Ok(l_sheet_parts)
}

fn derive_spans(n_total: usize, n_span_max: usize) -> Vec<(usize, usize)> {
    if n_total == 0 {
        return vec![(0, 0)];
    }
    (0..n_total)
        .step_by(n_span_max)
        .map(|n_start| (n_start, usize::min(n_total, n_start + n_span_max)))
        .collect()
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
