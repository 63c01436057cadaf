//! Dataset <-> polars `DataFrame` conversion and column kind inference.
//!
//! A column's kind comes from its non-blank cells: all-integral numbers are
//! `Integer`, other all-numeric columns `Decimal`, all date/times `DateTime`,
//! anything mixed or textual `Text`.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::{AnyValue, Column, DataFrame, DataType, NamedFrom, PlSmallStr, TimeUnit};
use salesbook_core::{Dataset, EnumCellValue};

use crate::util::validate_unique_columns;

/// Storage kind of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColumnKind {
    /// Integral numbers (`Int64`).
    Integer,
    /// Numbers with a fractional part (`Float64`).
    Decimal,
    /// Date/times (`Datetime[ms]`).
    DateTime,
    /// Text or mixed cells (`String`).
    Text,
}

/// Infer the kind of a column from its cells.
pub fn derive_column_kind<'a>(values: impl IntoIterator<Item = &'a EnumCellValue>) -> EnumColumnKind {
    let mut if_has_number = false;
    let mut if_has_datetime = false;
    let mut if_all_integral = true;
    for value in values {
        match value {
            EnumCellValue::None => {}
            EnumCellValue::Number(n) => {
                if_has_number = true;
                if !n.is_finite() || n.fract() != 0.0 || n.abs() >= i64::MAX as f64 {
                    if_all_integral = false;
                }
            }
            EnumCellValue::DateTime(_) => if_has_datetime = true,
            _ => return EnumColumnKind::Text,
        }
    }

    match (if_has_number, if_has_datetime, if_all_integral) {
        (true, true, _) | (false, false, _) => EnumColumnKind::Text,
        (false, true, _) => EnumColumnKind::DateTime,
        (true, false, true) => EnumColumnKind::Integer,
        (true, false, false) => EnumColumnKind::Decimal,
    }
}

/// Infer the kind of every column of `dataset`.
pub fn derive_column_kinds(dataset: &Dataset) -> Vec<EnumColumnKind> {
    (0..dataset.width())
        .map(|n_idx_col| derive_column_kind(dataset.rows().iter().map(|row| &row[n_idx_col])))
        .collect()
}

/// Convert a dataset into a typed `DataFrame`.
///
/// Mixed columns become `String`; use the dataset writer path to keep their
/// cell types.
pub fn derive_dataframe_from_dataset(dataset: &Dataset) -> Result<DataFrame, String> {
    validate_unique_columns(dataset.columns())?;

    let l_kinds = derive_column_kinds(dataset);
    let mut l_columns = Vec::with_capacity(dataset.width());
    for (n_idx_col, (c_name, kind)) in dataset.columns().iter().zip(l_kinds).enumerate() {
        let l_values: Vec<&EnumCellValue> =
            dataset.rows().iter().map(|row| &row[n_idx_col]).collect();
        let c_name = PlSmallStr::from(c_name.as_str());

        let column = match kind {
            EnumColumnKind::Integer => Column::new(
                c_name,
                l_values
                    .iter()
                    .map(|value| value.to_f64().map(|n| n as i64))
                    .collect::<Vec<Option<i64>>>(),
            ),
            EnumColumnKind::Decimal => Column::new(
                c_name,
                l_values
                    .iter()
                    .map(|value| value.to_f64())
                    .collect::<Vec<Option<f64>>>(),
            ),
            EnumColumnKind::DateTime => Column::new(
                c_name,
                l_values
                    .iter()
                    .map(|value| match value {
                        EnumCellValue::DateTime(dt) => Some(dt.and_utc().timestamp_millis()),
                        _ => None,
                    })
                    .collect::<Vec<Option<i64>>>(),
            )
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|err| format!("Failed to cast datetime column: {err}"))?,
            EnumColumnKind::Text => Column::new(
                c_name,
                l_values
                    .iter()
                    .map(|value| (!value.is_none()).then(|| value.to_text()))
                    .collect::<Vec<Option<String>>>(),
            ),
        };
        l_columns.push(column);
    }

    DataFrame::new(l_columns).map_err(|err| format!("Failed to build DataFrame: {err}"))
}

/// Convert a `DataFrame` into a dataset, cell by cell.
pub fn derive_dataset_from_dataframe(df: &DataFrame) -> Result<Dataset, String> {
    let l_columns: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    let mut l_rows = Vec::with_capacity(df.height());
    for n_idx_row in 0..df.height() {
        let mut row = Vec::with_capacity(l_columns.len());
        for col in df.get_columns() {
            let value = col
                .get(n_idx_row)
                .map_err(|err| format!("Failed to access cell value: {err}"))?;
            row.push(derive_cell_value_from_any_value(value));
        }
        l_rows.push(row);
    }

    Dataset::from_rows(l_columns, l_rows).map_err(|err| err.to_string())
}

/// Convert one polars cell back into a dataset cell.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        AnyValue::Datetime(n_value, time_unit, _) => {
            derive_datetime_from_timestamp(n_value, time_unit)
                .map_or(EnumCellValue::None, EnumCellValue::DateTime)
        }
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn derive_datetime_from_timestamp(n_value: i64, time_unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match time_unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(n_value)?,
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(n_value)?,
        TimeUnit::Nanoseconds => DateTime::from_timestamp_nanos(n_value),
    };
    Some(dt.naive_utc())
}
