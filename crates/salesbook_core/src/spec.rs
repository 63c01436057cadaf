//! Shared value models, configuration models and error types.

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{NaiveDateTime, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

use crate::conf::LABEL_UNKNOWN;

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Scalar cell value of one dataset row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date/time value.
    DateTime(NaiveDateTime),
}

impl EnumCellValue {
    /// Whether the cell is blank.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Borrow the text payload of a string cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as display text; blank cells render as `""`.
    ///
    /// Integral numbers drop the fractional part so `12345.0` reads `12345`.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) => convert_number_to_text(*n),
            Self::Boolean(b) => if *b { "True" } else { "False" }.to_string(),
            Self::DateTime(dt) => convert_datetime_to_text(dt),
        }
    }

    /// Numeric view of the value: numbers as-is, numeric text parsed.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Total "natural" order used by the sorter.
    ///
    /// Numbers < date/times < booleans < strings; blanks sort last.
    pub fn cmp_natural(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.rank_kind().cmp(&other.rank_kind()),
        }
    }

    fn rank_kind(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::DateTime(_) => 1,
            Self::Boolean(_) => 2,
            Self::String(_) => 3,
            Self::None => 4,
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDateTime> for EnumCellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<EnumCellValue>> From<Option<T>> for EnumCellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// Format a number as text, dropping `.0` on integral values.
pub fn convert_number_to_text(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        x.to_string()
    }
}

/// Format a date/time as ISO-like text; midnight values render date-only.
pub fn convert_datetime_to_text(dt: &NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BookConfiguration

/// One raw book value as written in `book.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnumBookValue {
    /// Legacy form: the value is the group label, color is unknown.
    Plain(String),
    /// Structured form; missing fields fall back to `Unknown`.
    Structured {
        /// Group label.
        group: Option<String>,
        /// Color label.
        color: Option<String>,
    },
}

/// Book entry with its raw (not yet normalized) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBookEntry {
    /// Raw key as written in configuration.
    pub key: String,
    /// Raw value.
    pub value: EnumBookValue,
}

/// Ordered classification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecBook {
    /// Entries in document order.
    pub entries: Vec<SpecBookEntry>,
}

impl SpecBook {
    /// Build a book from `(key, value)` pairs, keeping order.
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, EnumBookValue)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| SpecBookEntry {
                    key: key.into(),
                    value,
                })
                .collect(),
        }
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolved classification of one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecClassification {
    /// Group label.
    pub group: String,
    /// Color label; `Unknown` when not configured.
    pub color: String,
}

impl SpecClassification {
    /// Sentinel classification for unmatched keys.
    pub fn unknown() -> Self {
        Self {
            group: LABEL_UNKNOWN.to_string(),
            color: LABEL_UNKNOWN.to_string(),
        }
    }
}

impl From<&EnumBookValue> for SpecClassification {
    fn from(value: &EnumBookValue) -> Self {
        match value {
            EnumBookValue::Plain(group) => Self {
                group: group.clone(),
                color: LABEL_UNKNOWN.to_string(),
            },
            EnumBookValue::Structured { group, color } => Self {
                group: group.clone().unwrap_or_else(|| LABEL_UNKNOWN.to_string()),
                color: color.clone().unwrap_or_else(|| LABEL_UNKNOWN.to_string()),
            },
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Fatal configuration failures; the run stops before any view is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Configuration text is not valid YAML of the expected shape.
    #[error("Failed to parse {origin}: {source}")]
    Yaml {
        /// File name or other origin label.
        origin: String,
        /// Underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },
    /// Parsed YAML has an unsupported shape.
    #[error("Invalid config {origin}: {message}")]
    Invalid {
        /// File name or other origin label.
        origin: String,
        /// User-facing description.
        message: String,
    },
}

/// Fatal pipeline failures.
///
/// Lookup misses and absent optional columns are not errors; stages absorb
/// them and return their documented fallback.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// A required column is absent from the input dataset.
    #[error("Required column not found: {0:?}")]
    MissingColumn(String),
    /// Column names collide.
    #[error("Duplicate column names detected: {0}")]
    DuplicateColumns(String),
    /// Row length differs from the dataset width.
    #[error("Row {row} has {actual} cells, expected {expected}")]
    RowWidthMismatch {
        /// Zero-based row index.
        row: usize,
        /// Dataset width.
        expected: usize,
        /// Actual row length.
        actual: usize,
    },
    /// Inserted column length differs from the dataset height.
    #[error("Column {column:?} has {actual} values, expected {expected}")]
    ColumnHeightMismatch {
        /// Inserted column name.
        column: String,
        /// Dataset height.
        expected: usize,
        /// Actual value count.
        actual: usize,
    },
    /// Rows of one partition are not contiguous.
    #[error(
        "Input is not sorted by partition keys {keys:?}: partition {partition} reappears at row {row}"
    )]
    PartitionNotContiguous {
        /// Partition key columns.
        keys: Vec<String>,
        /// Display text of the repeated partition.
        partition: String,
        /// Row index where the partition reappears.
        row: usize,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
