//! Key normalization, classification table and the row classifier.

use std::collections::HashMap;

use crate::conf::{COL_COLOR, COL_GROUP};
use crate::dataset::Dataset;
use crate::spec::{EnumCellValue, PipelineError, SpecBook, SpecClassification};

/// Canonical lookup form of a key: stringify, trim, lowercase.
///
/// Shared by table construction and row lookup.
pub fn normalize_key(value: &EnumCellValue) -> String {
    normalize_key_text(&value.to_text())
}

/// [`normalize_key`] for keys that are already text.
pub fn normalize_key_text(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Normalized key -> classification lookup.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    dict_by_key: HashMap<String, SpecClassification>,
    l_entries_in_order: Vec<SpecClassification>,
}

impl ClassificationTable {
    /// Build the table from an ordered book.
    ///
    /// When two raw keys normalize to the same key, the later entry wins.
    pub fn from_book(book: &SpecBook) -> Self {
        let mut dict_by_key = HashMap::with_capacity(book.len());
        let mut l_entries_in_order = Vec::with_capacity(book.len());

        for entry in &book.entries {
            let classification = SpecClassification::from(&entry.value);
            let c_key = normalize_key_text(&entry.key);
            if let Some(previous) = dict_by_key.insert(c_key.clone(), classification.clone())
                && previous != classification
            {
                tracing::debug!(key = %c_key, "book key overridden by later entry");
            }
            l_entries_in_order.push(classification);
        }

        Self {
            dict_by_key,
            l_entries_in_order,
        }
    }

    /// Look up a raw cell value.
    pub fn lookup(&self, key: &EnumCellValue) -> Option<&SpecClassification> {
        self.dict_by_key.get(&normalize_key(key))
    }

    /// Classifications in configuration order, including overridden ones.
    pub fn entries_in_order(&self) -> &[SpecClassification] {
        &self.l_entries_in_order
    }

    /// Number of distinct normalized keys.
    pub fn len(&self) -> usize {
        self.dict_by_key.len()
    }

    /// Whether the table has no keys.
    pub fn is_empty(&self) -> bool {
        self.dict_by_key.is_empty()
    }
}

/// Which classification columns the classifier prepends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumClassifyColumns {
    /// Prepend `Group` only.
    GroupOnly,
    /// Prepend `Group` then `Color` (default).
    #[default]
    GroupAndColor,
}

/// Prepend classification columns to every row of `dataset`.
///
/// Rows whose key misses the table are classified `Unknown`. Only an absent
/// `key_column` is an error.
pub fn classify_dataset(
    dataset: &Dataset,
    table: &ClassificationTable,
    key_column: &str,
    rule_columns: EnumClassifyColumns,
) -> Result<Dataset, PipelineError> {
    let n_idx_key = dataset
        .column_index(key_column)
        .ok_or_else(|| PipelineError::MissingColumn(key_column.to_string()))?;

    let unknown = SpecClassification::unknown();
    let mut l_groups = Vec::with_capacity(dataset.height());
    let mut l_colors = Vec::with_capacity(dataset.height());
    let mut n_misses = 0usize;

    for row in dataset.rows() {
        let classification = match table.lookup(&row[n_idx_key]) {
            Some(found) => found,
            None => {
                n_misses += 1;
                tracing::debug!(key = %row[n_idx_key].to_text(), "no book entry for key");
                &unknown
            }
        };
        l_groups.push(EnumCellValue::String(classification.group.clone()));
        l_colors.push(EnumCellValue::String(classification.color.clone()));
    }

    tracing::info!(
        rows = dataset.height(),
        misses = n_misses,
        "classified dataset by {key_column:?}"
    );

    let mut dataset_out = dataset.clone();
    if rule_columns == EnumClassifyColumns::GroupAndColor {
        dataset_out = dataset_out.with_column_inserted(0, COL_COLOR, l_colors)?;
    }
    dataset_out.with_column_inserted(0, COL_GROUP, l_groups)
}
