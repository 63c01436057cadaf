//! Calamine-backed reader producing a header-keyed [`Dataset`].

use std::collections::HashSet;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use salesbook_core::{Dataset, EnumCellValue};

/// Read the first worksheet of `path` as a dataset.
///
/// The first row is the header; blank headers become `Unnamed: {idx}` and
/// repeated headers receive `.1`, `.2`, ... suffixes.
pub fn read_xlsx_dataset(path: &Path) -> Result<Dataset, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| format!("Failed to open workbook {}: {err}", path.display()))?;

    let Some(c_sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(format!("Workbook {} has no worksheets.", path.display()));
    };
    let range = workbook
        .worksheet_range(&c_sheet_name)
        .map_err(|err| format!("Failed to read sheet {c_sheet_name:?}: {err}"))?;

    let dataset = derive_dataset_from_range(&range)?;
    tracing::info!(
        path = %path.display(),
        sheet = %c_sheet_name,
        rows = dataset.height(),
        columns = dataset.width(),
        "workbook read"
    );
    Ok(dataset)
}

/// Convert a used cell range into a dataset; fully blank body rows are dropped.
pub fn derive_dataset_from_range(range: &Range<Data>) -> Result<Dataset, String> {
    let mut l_rows_iter = range.rows();
    let Some(l_header_row) = l_rows_iter.next() else {
        return Ok(Dataset::empty());
    };

    let l_columns = derive_header_names(l_header_row);
    let n_width = l_columns.len();

    let mut l_rows = Vec::new();
    for l_cells in l_rows_iter {
        let mut row: Vec<EnumCellValue> = l_cells.iter().map(derive_cell_value).collect();
        row.resize(n_width, EnumCellValue::None);
        if row.iter().all(EnumCellValue::is_none) {
            continue;
        }
        l_rows.push(row);
    }

    Dataset::from_rows(l_columns, l_rows).map_err(|err| err.to_string())
}

fn derive_header_names(cells: &[Data]) -> Vec<String> {
    let mut set_seen: HashSet<String> = HashSet::new();
    let mut l_names = Vec::with_capacity(cells.len());

    for (n_idx, cell) in cells.iter().enumerate() {
        let value = derive_cell_value(cell);
        let c_base = if value.is_none() || value.to_text().trim().is_empty() {
            format!("Unnamed: {n_idx}")
        } else {
            value.to_text()
        };

        let mut c_name = c_base.clone();
        let mut n_dup = 1usize;
        while set_seen.contains(&c_name) {
            c_name = format!("{c_base}.{n_dup}");
            n_dup += 1;
        }
        set_seen.insert(c_name.clone());
        l_names.push(c_name);
    }

    l_names
}

fn derive_cell_value(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty | Data::Error(_) => EnumCellValue::None,
        Data::Bool(v) => EnumCellValue::Boolean(*v),
        Data::Int(v) => EnumCellValue::Number(*v as f64),
        Data::Float(v) => EnumCellValue::Number(*v),
        Data::String(v) => EnumCellValue::String(v.clone()),
        Data::DateTime(v) => v
            .as_datetime()
            .map_or_else(|| EnumCellValue::Number(v.as_f64()), EnumCellValue::DateTime),
        Data::DateTimeIso(v) => derive_datetime_from_iso(v)
            .map_or_else(|| EnumCellValue::String(v.clone()), EnumCellValue::DateTime),
        Data::DurationIso(v) => EnumCellValue::String(v.clone()),
    }
}

fn derive_datetime_from_iso(text: &str) -> Option<NaiveDateTime> {
    text.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            text.parse::<NaiveDate>()
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
