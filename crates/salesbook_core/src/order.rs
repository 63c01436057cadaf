//! Ordering policies and the stable multi-key sorter.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::classify::ClassificationTable;
use crate::conf::{COL_GROUP, LABEL_UNKNOWN, TUP_REASON_PRIORITY};
use crate::dataset::Dataset;
use crate::spec::{EnumCellValue, PipelineError};

////////////////////////////////////////////////////////////////////////////////
// #region OrderingPolicy

/// Distinct group labels in first-seen configuration order, then `Unknown`.
///
/// `Unknown` is always last, even when configuration names it as a group.
pub fn derive_group_order(table: &ClassificationTable) -> Vec<String> {
    let mut l_group_order: Vec<String> = Vec::new();
    let mut set_seen: HashSet<&str> = HashSet::new();
    for classification in table.entries_in_order() {
        let c_group = classification.group.as_str();
        if c_group != LABEL_UNKNOWN && set_seen.insert(c_group) {
            l_group_order.push(c_group.to_string());
        }
    }
    l_group_order.push(LABEL_UNKNOWN.to_string());
    l_group_order
}

/// Data-derived order of the reason column.
///
/// Priority labels come first (only those present in the data), then every
/// other distinct non-blank value in lexicographic order. Returns `None` when
/// the column is absent.
pub fn derive_reason_order(dataset: &Dataset, reason_column: &str) -> Option<Vec<String>> {
    let l_values = dataset.column_values(reason_column)?;

    let set_present: BTreeSet<String> = l_values
        .iter()
        .filter(|value| !value.is_none())
        .map(|value| value.to_text())
        .collect();

    let mut l_order: Vec<String> = TUP_REASON_PRIORITY
        .iter()
        .filter(|c_pref| set_present.contains(**c_pref))
        .map(ToString::to_string)
        .collect();
    l_order.extend(
        set_present
            .into_iter()
            .filter(|c_value| !TUP_REASON_PRIORITY.contains(&c_value.as_str())),
    );
    Some(l_order)
}

/// Immutable group ordering, built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingPolicy {
    l_group_order: Vec<String>,
}

impl OrderingPolicy {
    /// Derive the policy from the classification table.
    pub fn from_table(table: &ClassificationTable) -> Self {
        Self {
            l_group_order: derive_group_order(table),
        }
    }

    /// Group labels in sort order; always ends with `Unknown`.
    pub fn group_order(&self) -> &[String] {
        &self.l_group_order
    }

    /// Sort key ranking the `Group` column by this policy.
    ///
    /// Labels outside the order rank at the `Unknown` position.
    pub fn group_sort_key(&self) -> SpecSortKey {
        let n_rank_unknown = self
            .l_group_order
            .iter()
            .position(|c_group| c_group == LABEL_UNKNOWN)
            .unwrap_or(self.l_group_order.len());
        SpecSortKey::Ranked {
            column: COL_GROUP.to_string(),
            order: self.l_group_order.clone(),
            rank_missing: n_rank_unknown,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Sorter

/// One key of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSortKey {
    /// Ascending natural order of the cell values.
    Natural(String),
    /// Position of the cell text in `order`.
    Ranked {
        /// Sorted column.
        column: String,
        /// Labels in ascending order.
        order: Vec<String>,
        /// Rank assigned to blanks and labels outside `order`.
        rank_missing: usize,
    },
}

impl SpecSortKey {
    /// Natural-order key on `column`.
    pub fn natural(column: &str) -> Self {
        Self::Natural(column.to_string())
    }

    /// Ranked key on `column`; unlisted values and blanks sort last.
    pub fn ranked(column: &str, order: Vec<String>) -> Self {
        let rank_missing = order.len();
        Self::Ranked {
            column: column.to_string(),
            order,
            rank_missing,
        }
    }

    /// Sorted column name.
    pub fn column(&self) -> &str {
        match self {
            Self::Natural(column) | Self::Ranked { column, .. } => column,
        }
    }
}

enum EnumResolvedKey {
    Natural(usize),
    Ranked(Vec<usize>),
}

/// Stable sort by `keys`, applied left to right.
///
/// Keys on columns absent from `dataset` are skipped. Rows with equal key
/// tuples keep their input order.
pub fn sort_by_keys(dataset: &Dataset, keys: &[SpecSortKey]) -> Dataset {
    let mut l_resolved = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(n_idx_col) = dataset.column_index(key.column()) else {
            tracing::debug!(column = key.column(), "sort skips absent column");
            continue;
        };
        let resolved = match key {
            SpecSortKey::Natural(_) => EnumResolvedKey::Natural(n_idx_col),
            SpecSortKey::Ranked {
                order,
                rank_missing,
                ..
            } => {
                let dict_rank: HashMap<&str, usize> = order
                    .iter()
                    .enumerate()
                    .map(|(n_rank, c_label)| (c_label.as_str(), n_rank))
                    .collect();
                EnumResolvedKey::Ranked(
                    dataset
                        .rows()
                        .iter()
                        .map(|row| match &row[n_idx_col] {
                            EnumCellValue::None => *rank_missing,
                            value => dict_rank
                                .get(value.to_text().as_str())
                                .copied()
                                .unwrap_or(*rank_missing),
                        })
                        .collect(),
                )
            }
        };
        l_resolved.push(resolved);
    }

    let l_rows = dataset.rows();
    let mut l_idx: Vec<usize> = (0..dataset.height()).collect();
    // `sort_by` is a stable merge sort.
    l_idx.sort_by(|a, b| {
        for resolved in &l_resolved {
            let ord = match resolved {
                EnumResolvedKey::Natural(n_idx_col) => {
                    l_rows[*a][*n_idx_col].cmp_natural(&l_rows[*b][*n_idx_col])
                }
                EnumResolvedKey::Ranked(l_ranks) => l_ranks[*a].cmp(&l_ranks[*b]),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    dataset.take_rows(&l_idx)
}

/// Sort a classified dataset by group order, then `key_column`, then `extra_keys`.
pub fn sort_dataset(
    dataset: &Dataset,
    policy: &OrderingPolicy,
    key_column: &str,
    extra_keys: &[SpecSortKey],
) -> Result<Dataset, PipelineError> {
    if !dataset.has_column(key_column) {
        return Err(PipelineError::MissingColumn(key_column.to_string()));
    }

    let mut l_keys = Vec::with_capacity(extra_keys.len() + 2);
    l_keys.push(policy.group_sort_key());
    l_keys.push(SpecSortKey::natural(key_column));
    l_keys.extend_from_slice(extra_keys);
    Ok(sort_by_keys(dataset, &l_keys))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{COL_PAYMENT_REASON, COL_SUPPLIER_ARTICLE};
    use crate::spec::{EnumBookValue, SpecBook};

    fn derive_table(groups: &[(&str, &str)]) -> ClassificationTable {
        ClassificationTable::from_book(&SpecBook::from_entries(
            groups
                .iter()
                .map(|(key, group)| (*key, EnumBookValue::Plain(group.to_string()))),
        ))
    }

    fn derive_classified(rows: &[(&str, &str, i64)]) -> Dataset {
        Dataset::from_rows(
            vec![
                COL_GROUP.to_string(),
                COL_SUPPLIER_ARTICLE.to_string(),
                "n".to_string(),
            ],
            rows.iter()
                .map(|(group, key, n)| vec![(*group).into(), (*key).into(), (*n).into()])
                .collect(),
        )
        .unwrap()
    }

    fn derive_column_text(dataset: &Dataset, name: &str) -> Vec<String> {
        dataset
            .column_values(name)
            .unwrap()
            .into_iter()
            .map(EnumCellValue::to_text)
            .collect()
    }

    #[test]
    fn test_group_order_follows_first_occurrence_then_unknown() {
        let table = derive_table(&[("a", "Shoes"), ("b", "Bags"), ("c", "Shoes")]);
        assert_eq!(derive_group_order(&table), vec!["Shoes", "Bags", "Unknown"]);
    }

    #[test]
    fn test_configured_unknown_still_sorts_last() {
        let table = derive_table(&[("a", "Unknown"), ("b", "Bags")]);
        assert_eq!(derive_group_order(&table), vec!["Bags", "Unknown"]);

        let policy = OrderingPolicy::from_table(&table);
        let dataset = derive_classified(&[("Unknown", "zzz", 1), ("Bags", "b", 2)]);
        let sorted = sort_dataset(&dataset, &policy, COL_SUPPLIER_ARTICLE, &[]).unwrap();
        assert_eq!(derive_column_text(&sorted, COL_GROUP), vec!["Bags", "Unknown"]);
    }

    #[test]
    fn test_sort_puts_configured_groups_first_and_unknown_last() {
        let table = derive_table(&[("s1", "Shoes"), ("b1", "Bags")]);
        let policy = OrderingPolicy::from_table(&table);
        let dataset = derive_classified(&[
            ("Bags", "b1", 1),
            ("Unknown", "zz", 2),
            ("Shoes", "s1", 3),
            ("Bags", "b0", 4),
            ("Shoes", "s0", 5),
        ]);

        let sorted = sort_dataset(&dataset, &policy, COL_SUPPLIER_ARTICLE, &[]).unwrap();
        assert_eq!(
            derive_column_text(&sorted, COL_GROUP),
            vec!["Shoes", "Shoes", "Bags", "Bags", "Unknown"]
        );
        assert_eq!(
            derive_column_text(&sorted, COL_SUPPLIER_ARTICLE),
            vec!["s0", "s1", "b0", "b1", "zz"]
        );
    }

    #[test]
    fn test_sort_ranks_unlisted_group_as_unknown() {
        let table = derive_table(&[("s1", "Shoes")]);
        let policy = OrderingPolicy::from_table(&table);
        let dataset = derive_classified(&[("Hats", "b", 1), ("Unknown", "a", 2), ("Shoes", "z", 3)]);

        let sorted = sort_dataset(&dataset, &policy, COL_SUPPLIER_ARTICLE, &[]).unwrap();
        assert_eq!(
            derive_column_text(&sorted, COL_GROUP),
            vec!["Shoes", "Unknown", "Hats"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let table = derive_table(&[("k", "Shoes")]);
        let policy = OrderingPolicy::from_table(&table);
        let dataset = derive_classified(&[
            ("Shoes", "k", 3),
            ("Shoes", "k", 1),
            ("Shoes", "k", 2),
            ("Shoes", "k", 0),
        ]);

        let sorted = sort_dataset(&dataset, &policy, COL_SUPPLIER_ARTICLE, &[]).unwrap();
        assert_eq!(derive_column_text(&sorted, "n"), vec!["3", "1", "2", "0"]);
    }

    #[test]
    fn test_sort_applies_extra_keys_and_skips_absent() {
        let table = derive_table(&[("k", "Shoes")]);
        let policy = OrderingPolicy::from_table(&table);
        let dataset = derive_classified(&[("Shoes", "k", 3), ("Shoes", "k", 1), ("Shoes", "k", 2)]);

        let sorted = sort_dataset(
            &dataset,
            &policy,
            COL_SUPPLIER_ARTICLE,
            &[SpecSortKey::natural("missing"), SpecSortKey::natural("n")],
        )
        .unwrap();
        assert_eq!(derive_column_text(&sorted, "n"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_reason_order_priority_then_lexicographic() {
        let dataset = Dataset::from_rows(
            vec![COL_PAYMENT_REASON.to_string()],
            vec![
                vec!["Штраф".into()],
                vec!["Логистика".into()],
                vec![EnumCellValue::None],
                vec!["Возврат".into()],
                vec!["Продажа".into()],
                vec!["Логистика".into()],
            ],
        )
        .unwrap();

        assert_eq!(
            derive_reason_order(&dataset, COL_PAYMENT_REASON).unwrap(),
            vec!["Продажа", "Логистика", "Возврат", "Штраф"]
        );
    }

    #[test]
    fn test_reason_order_skips_absent_priority_labels() {
        let dataset = Dataset::from_rows(
            vec![COL_PAYMENT_REASON.to_string()],
            vec![vec!["b".into()], vec!["Логистика".into()], vec!["a".into()]],
        )
        .unwrap();
        assert_eq!(
            derive_reason_order(&dataset, COL_PAYMENT_REASON).unwrap(),
            vec!["Логистика", "a", "b"]
        );
        assert!(derive_reason_order(&dataset, "absent").is_none());
    }

    #[test]
    fn test_ranked_key_puts_blanks_last() {
        let dataset = Dataset::from_rows(
            vec!["r".to_string()],
            vec![vec![EnumCellValue::None], vec!["b".into()], vec!["a".into()]],
        )
        .unwrap();
        let sorted = sort_by_keys(
            &dataset,
            &[SpecSortKey::ranked("r", vec!["b".to_string(), "a".to_string()])],
        );
        assert_eq!(derive_column_text(&sorted, "r"), vec!["b", "a", ""]);
    }
}
