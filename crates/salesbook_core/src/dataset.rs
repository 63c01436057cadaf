//! In-memory row table and the column projector.

use std::collections::{BTreeMap, BTreeSet};

use crate::spec::{EnumCellValue, PipelineError};

/// Ordered rows sharing one ordered, unique column set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<EnumCellValue>>,
}

impl Dataset {
    /// Create an empty dataset with the given columns.
    pub fn new(columns: Vec<String>) -> Result<Self, PipelineError> {
        validate_unique_columns(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a dataset from columns and positional rows.
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<EnumCellValue>>,
    ) -> Result<Self, PipelineError> {
        let mut dataset = Self::new(columns)?;
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Dataset with neither columns nor rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order; cells are positional against [`Self::columns`].
    pub fn rows(&self) -> &[Vec<EnumCellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by literal name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c_name| c_name == name)
    }

    /// Whether a column with this literal name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row_idx` in column `name`.
    pub fn value(&self, row_idx: usize, name: &str) -> Option<&EnumCellValue> {
        let n_idx_col = self.column_index(name)?;
        self.rows.get(row_idx).map(|row| &row[n_idx_col])
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&EnumCellValue>> {
        let n_idx_col = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[n_idx_col]).collect())
    }

    /// Append one row; its length must equal the dataset width.
    pub fn push_row(&mut self, row: Vec<EnumCellValue>) -> Result<(), PipelineError> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::RowWidthMismatch {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Return a copy with `values` inserted as column `name` at `col_idx`.
    pub fn with_column_inserted(
        &self,
        col_idx: usize,
        name: &str,
        values: Vec<EnumCellValue>,
    ) -> Result<Self, PipelineError> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::ColumnHeightMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        let n_idx = usize::min(col_idx, self.columns.len());
        let mut l_columns = self.columns.clone();
        l_columns.insert(n_idx, name.to_string());
        validate_unique_columns(&l_columns)?;

        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row_new = Vec::with_capacity(row.len() + 1);
                row_new.extend_from_slice(&row[..n_idx]);
                row_new.push(value);
                row_new.extend_from_slice(&row[n_idx..]);
                row_new
            })
            .collect();

        Ok(Self {
            columns: l_columns,
            rows,
        })
    }

    /// Return a copy with surrounding whitespace trimmed from column names.
    ///
    /// Names that collide after trimming receive `.1`, `.2`, ... suffixes in
    /// column order.
    pub fn with_trimmed_column_names(&self) -> Self {
        let mut set_seen: BTreeSet<String> = BTreeSet::new();
        let mut l_columns = Vec::with_capacity(self.columns.len());
        for c_name in &self.columns {
            let c_base = c_name.trim();
            let mut c_unique = c_base.to_string();
            let mut n_dup = 1usize;
            while set_seen.contains(&c_unique) {
                c_unique = format!("{c_base}.{n_dup}");
                n_dup += 1;
            }
            if c_unique != c_base {
                tracing::warn!(column = %c_name, renamed = %c_unique, "trimmed header collides");
            }
            set_seen.insert(c_unique.clone());
            l_columns.push(c_unique);
        }
        Self {
            columns: l_columns,
            rows: self.rows.clone(),
        }
    }

    /// Keep rows whose cell in column `name` satisfies `predicate`.
    ///
    /// Returns `None` when the column is absent.
    pub fn filter_by_column(
        &self,
        name: &str,
        predicate: impl Fn(&EnumCellValue) -> bool,
    ) -> Option<Self> {
        let n_idx_col = self.column_index(name)?;
        Some(Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(&row[n_idx_col]))
                .cloned()
                .collect(),
        })
    }

    /// Return a copy holding the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|idx| self.rows[*idx].clone()).collect(),
        }
    }
}

/// Select and reorder columns by name.
///
/// Requested names missing from `dataset` are skipped; no column outside the
/// request is ever produced. Repeated names are kept once.
pub fn project_columns<S: AsRef<str>>(dataset: &Dataset, names: &[S]) -> Dataset {
    let mut set_seen = BTreeSet::new();
    let mut l_columns = Vec::new();
    let mut l_idx = Vec::new();
    for c_name in names {
        let c_name = c_name.as_ref();
        if !set_seen.insert(c_name) {
            continue;
        }
        match dataset.column_index(c_name) {
            Some(n_idx) => {
                l_columns.push(c_name.to_string());
                l_idx.push(n_idx);
            }
            None => tracing::debug!(column = c_name, "projection skips absent column"),
        }
    }

    Dataset {
        columns: l_columns,
        rows: dataset
            .rows
            .iter()
            .map(|row| l_idx.iter().map(|idx| row[*idx].clone()).collect())
            .collect(),
    }
}

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), PipelineError> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {l_pos:?}", l_pos.len()))
        .collect::<Vec<_>>()
        .join("; ");

    Err(PipelineError::DuplicateColumns(c_msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_sample() -> Dataset {
        Dataset::from_rows(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![
                vec!["x".into(), 1.0.into(), EnumCellValue::None],
                vec!["y".into(), 2.0.into(), "z".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_project_skips_absent_and_follows_request_order() {
        let projected = project_columns(&derive_sample(), &["c", "missing", "a"]);
        assert_eq!(projected.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(projected.height(), 2);
        assert_eq!(projected.rows()[1], vec!["z".into(), "y".into()]);
    }

    #[test]
    fn test_project_never_invents_columns() {
        let projected = project_columns(&derive_sample(), &["nope", "other"]);
        assert_eq!(projected.width(), 0);
        assert_eq!(projected.height(), 2);
    }

    #[test]
    fn test_insert_column_rejects_duplicate_name() {
        let err = derive_sample()
            .with_column_inserted(0, "b", vec!["1".into(), "2".into()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateColumns(_)));
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut dataset = derive_sample();
        let err = dataset.push_row(vec!["only".into()]).unwrap_err();
        assert_eq!(
            err,
            PipelineError::RowWidthMismatch {
                row: 2,
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn test_trimmed_column_names() {
        let dataset = Dataset::from_rows(
            vec![" a ".to_string(), "b\t".to_string()],
            vec![vec![1.0.into(), 2.0.into()]],
        )
        .unwrap();
        let trimmed = dataset.with_trimmed_column_names();
        assert_eq!(trimmed.columns(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_trimmed_column_names_that_collide_get_suffixes() {
        let dataset = Dataset::from_rows(
            vec!["Склад".to_string(), "Склад ".to_string(), " Склад".to_string()],
            vec![vec![1.0.into(), 2.0.into(), 3.0.into()]],
        )
        .unwrap();
        let trimmed = dataset.with_trimmed_column_names();
        assert_eq!(trimmed.columns(), ["Склад", "Склад.1", "Склад.2"]);
        assert_eq!(trimmed.value(0, "Склад.1"), Some(&EnumCellValue::Number(2.0)));
    }

    #[test]
    fn test_filter_by_missing_column_is_none() {
        assert!(derive_sample().filter_by_column("nope", |_| true).is_none());
    }
}
