//! Per-partition subtotal injection.

use std::collections::HashSet;

use crate::conf::{
    COL_PAYMENT_REASON, COL_SUPPLIER_ARTICLE, LABEL_TOTAL_KEY, LABEL_TOTAL_REASON,
    TUP_LOGISTICS_PARTITION_KEYS,
};
use crate::dataset::Dataset;
use crate::spec::{EnumCellValue, PipelineError};

/// Sentinel texts written on synthesized subtotal rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSubtotalLabels {
    /// Column receiving `key_label`.
    pub key_column: String,
    /// Identifying-key text of a subtotal row.
    pub key_label: String,
    /// Column receiving `reason_label`.
    pub reason_column: String,
    /// Reason text of a subtotal row.
    pub reason_label: String,
}

impl Default for SpecSubtotalLabels {
    fn default() -> Self {
        Self {
            key_column: COL_SUPPLIER_ARTICLE.to_string(),
            key_label: LABEL_TOTAL_KEY.to_string(),
            reason_column: COL_PAYMENT_REASON.to_string(),
            reason_label: LABEL_TOTAL_REASON.to_string(),
        }
    }
}

/// Subtotal step configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSubtotalPlan {
    /// Partition key columns; rows of one partition must be contiguous.
    pub partition_keys: Vec<String>,
    /// Summed numeric column.
    pub sum_column: String,
    /// Subtotal row labels.
    pub labels: SpecSubtotalLabels,
}

impl SpecSubtotalPlan {
    /// Plan over the logistics partition keys (`Group`, `Color`, `Размер`).
    pub fn logistics(sum_column: &str) -> Self {
        Self {
            partition_keys: TUP_LOGISTICS_PARTITION_KEYS
                .iter()
                .map(ToString::to_string)
                .collect(),
            sum_column: sum_column.to_string(),
            labels: SpecSubtotalLabels::default(),
        }
    }
}

/// Aggregation output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecAggregated {
    /// Data rows interleaved with subtotal rows.
    pub dataset: Dataset,
    /// Row indices (in `dataset`) of the subtotal rows.
    pub rows_subtotal: Vec<usize>,
}

/// Append a subtotal row after every contiguous partition of `dataset`.
///
/// Returns `dataset` unchanged when `plan.sum_column` is absent. Fails with
/// [`PipelineError::PartitionNotContiguous`] when a partition reappears after
/// it was closed. Blank summands count as zero.
pub fn aggregate_subtotals(
    dataset: &Dataset,
    plan: &SpecSubtotalPlan,
) -> Result<SpecAggregated, PipelineError> {
    let Some(n_idx_sum) = dataset.column_index(&plan.sum_column) else {
        tracing::info!(
            column = %plan.sum_column,
            "sum column absent, subtotals skipped"
        );
        return Ok(SpecAggregated {
            dataset: dataset.clone(),
            rows_subtotal: vec![],
        });
    };

    let l_idx_keys: Vec<usize> = plan
        .partition_keys
        .iter()
        .filter_map(|c_name| {
            let n_idx = dataset.column_index(c_name);
            if n_idx.is_none() {
                tracing::debug!(column = %c_name, "partition key absent, treated as blank");
            }
            n_idx
        })
        .collect();
    let n_idx_key_label = dataset.column_index(&plan.labels.key_column);
    let n_idx_reason_label = dataset.column_index(&plan.labels.reason_column);

    let l_rows = dataset.rows();
    let derive_partition = |row_idx: usize| -> Vec<&EnumCellValue> {
        l_idx_keys.iter().map(|idx| &l_rows[row_idx][*idx]).collect()
    };

    let mut dataset_out = Dataset::new(dataset.columns().to_vec())?;
    let mut l_rows_subtotal = Vec::new();
    let mut set_closed: HashSet<String> = HashSet::new();

    let mut n_row_start = 0usize;
    while n_row_start < l_rows.len() {
        let l_partition = derive_partition(n_row_start);
        let mut n_row_end = n_row_start + 1;
        while n_row_end < l_rows.len() && derive_partition(n_row_end) == l_partition {
            n_row_end += 1;
        }

        let c_signature = format!("{l_partition:?}");
        if !set_closed.insert(c_signature) {
            return Err(PipelineError::PartitionNotContiguous {
                keys: plan.partition_keys.clone(),
                partition: l_partition
                    .iter()
                    .map(|value| value.to_text())
                    .collect::<Vec<_>>()
                    .join(" / "),
                row: n_row_start,
            });
        }

        let mut n_total = 0.0f64;
        for row in &l_rows[n_row_start..n_row_end] {
            n_total += derive_summand(&row[n_idx_sum]);
            dataset_out.push_row(row.clone())?;
        }

        let mut row_total = vec![EnumCellValue::None; dataset.width()];
        for (n_idx_col, value) in l_idx_keys.iter().zip(&l_partition) {
            row_total[*n_idx_col] = (*value).clone();
        }
        if let Some(n_idx) = n_idx_key_label {
            row_total[n_idx] = EnumCellValue::String(plan.labels.key_label.clone());
        }
        if let Some(n_idx) = n_idx_reason_label {
            row_total[n_idx] = EnumCellValue::String(plan.labels.reason_label.clone());
        }
        row_total[n_idx_sum] = EnumCellValue::Number(n_total);

        l_rows_subtotal.push(dataset_out.height());
        dataset_out.push_row(row_total)?;
        n_row_start = n_row_end;
    }

    tracing::info!(
        rows = dataset.height(),
        partitions = l_rows_subtotal.len(),
        "subtotals injected over {:?}",
        plan.sum_column
    );

    Ok(SpecAggregated {
        dataset: dataset_out,
        rows_subtotal: l_rows_subtotal,
    })
}

fn derive_summand(value: &EnumCellValue) -> f64 {
    match value {
        EnumCellValue::None => 0.0,
        EnumCellValue::Number(n) => *n,
        other => match other.to_f64() {
            Some(n) => n,
            None => {
                tracing::warn!(value = %other.to_text(), "non-numeric value counted as 0");
                0.0
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{COL_COLOR, COL_DELIVERY_SERVICES, COL_GROUP, COL_SIZE};
    use crate::dataset::project_columns;

    fn derive_logistics(rows: &[(&str, &str, &str, Option<f64>)]) -> Dataset {
        Dataset::from_rows(
            vec![
                COL_GROUP.to_string(),
                COL_COLOR.to_string(),
                COL_SUPPLIER_ARTICLE.to_string(),
                COL_SIZE.to_string(),
                COL_PAYMENT_REASON.to_string(),
                COL_DELIVERY_SERVICES.to_string(),
            ],
            rows.iter()
                .map(|(group, color, size, value)| {
                    vec![
                        (*group).into(),
                        (*color).into(),
                        "abc123".into(),
                        (*size).into(),
                        "Логистика".into(),
                        (*value).into(),
                    ]
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_subtotal_rows_follow_each_partition() {
        let dataset = derive_logistics(&[
            ("Shoes", "Red", "42", Some(100.0)),
            ("Shoes", "Red", "42", Some(50.0)),
            ("Shoes", "Red", "43", Some(30.0)),
        ]);
        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
                .unwrap();

        let out = &aggregated.dataset;
        assert_eq!(out.height(), 5);
        assert_eq!(aggregated.rows_subtotal, vec![2, 4]);
        assert_eq!(out.rows()[0], dataset.rows()[0]);
        assert_eq!(out.rows()[1], dataset.rows()[1]);
        assert_eq!(out.rows()[3], dataset.rows()[2]);

        assert_eq!(
            out.value(2, COL_DELIVERY_SERVICES),
            Some(&EnumCellValue::Number(150.0))
        );
        assert_eq!(out.value(2, COL_SUPPLIER_ARTICLE), Some(&"ИТОГО".into()));
        assert_eq!(out.value(2, COL_PAYMENT_REASON), Some(&"Сумма".into()));
        assert_eq!(out.value(2, COL_GROUP), Some(&"Shoes".into()));
        assert_eq!(out.value(2, COL_COLOR), Some(&"Red".into()));
        assert_eq!(out.value(2, COL_SIZE), Some(&"42".into()));
        assert_eq!(
            out.value(4, COL_DELIVERY_SERVICES),
            Some(&EnumCellValue::Number(30.0))
        );
        assert_eq!(out.value(4, COL_SIZE), Some(&"43".into()));
    }

    #[test]
    fn test_missing_sum_column_is_noop() {
        let dataset = derive_logistics(&[("Shoes", "Red", "42", Some(1.0))]);
        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics("absent column")).unwrap();
        assert_eq!(aggregated.dataset, dataset);
        assert!(aggregated.rows_subtotal.is_empty());
    }

    #[test]
    fn test_blank_summands_count_as_zero() {
        let dataset = derive_logistics(&[
            ("Bags", "Unknown", "M", None),
            ("Bags", "Unknown", "M", Some(7.5)),
        ]);
        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
                .unwrap();
        assert_eq!(aggregated.dataset.height(), 3);
        assert_eq!(
            aggregated.dataset.value(2, COL_DELIVERY_SERVICES),
            Some(&EnumCellValue::Number(7.5))
        );
    }

    #[test]
    fn test_subtotal_count_equals_partition_count() {
        let dataset = derive_logistics(&[
            ("Shoes", "Red", "42", Some(1.0)),
            ("Shoes", "Blue", "42", Some(2.0)),
            ("Shoes", "Blue", "43", Some(3.0)),
            ("Bags", "Blue", "43", Some(4.0)),
        ]);
        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
                .unwrap();
        assert_eq!(aggregated.rows_subtotal.len(), 4);
        assert_eq!(aggregated.dataset.height(), dataset.height() + 4);
    }

    #[test]
    fn test_non_contiguous_partition_fails_fast() {
        let dataset = derive_logistics(&[
            ("Shoes", "Red", "42", Some(1.0)),
            ("Shoes", "Blue", "42", Some(2.0)),
            ("Shoes", "Red", "42", Some(3.0)),
        ]);
        let err = aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PartitionNotContiguous { row: 2, .. }
        ));
    }

    #[test]
    fn test_absent_partition_key_counts_as_blank() {
        let dataset = derive_logistics(&[
            ("Shoes", "Red", "42", Some(1.0)),
            ("Shoes", "Red", "43", Some(2.0)),
            ("Shoes", "Blue", "42", Some(4.0)),
        ]);
        let l_columns_kept: Vec<&str> = dataset
            .columns()
            .iter()
            .map(String::as_str)
            .filter(|c_name| *c_name != COL_SIZE)
            .collect();
        let dataset = project_columns(&dataset, &l_columns_kept);

        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
                .unwrap();

        let out = &aggregated.dataset;
        assert_eq!(out.columns(), dataset.columns());
        assert_eq!(aggregated.rows_subtotal, vec![2, 4]);
        assert_eq!(out.value(2, COL_SIZE), None);
        assert_eq!(out.value(2, COL_COLOR), Some(&"Red".into()));
        assert_eq!(
            out.value(2, COL_DELIVERY_SERVICES),
            Some(&EnumCellValue::Number(3.0))
        );
        assert_eq!(out.value(4, COL_COLOR), Some(&"Blue".into()));
        assert_eq!(
            out.value(4, COL_DELIVERY_SERVICES),
            Some(&EnumCellValue::Number(4.0))
        );
    }

    #[test]
    fn test_blank_partition_key_is_left_blank_on_subtotal() {
        let dataset = derive_logistics(&[("Shoes", "Red", "", Some(1.0))]);
        let mut l_rows: Vec<Vec<EnumCellValue>> = dataset.rows().to_vec();
        let n_idx_size = dataset.column_index(COL_SIZE).unwrap();
        l_rows[0][n_idx_size] = EnumCellValue::None;
        let dataset = Dataset::from_rows(dataset.columns().to_vec(), l_rows).unwrap();

        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
                .unwrap();
        assert_eq!(aggregated.rows_subtotal, vec![1]);
        assert_eq!(
            aggregated.dataset.value(1, COL_SIZE),
            Some(&EnumCellValue::None)
        );
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let dataset = derive_logistics(&[]);
        let aggregated =
            aggregate_subtotals(&dataset, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
                .unwrap();
        assert!(aggregated.dataset.is_empty());
        assert_eq!(aggregated.dataset.columns(), dataset.columns());
        assert!(aggregated.rows_subtotal.is_empty());
    }

    #[test]
    fn test_numeric_text_summands_are_parsed() {
        let dataset = Dataset::from_rows(
            vec![COL_GROUP.to_string(), "v".to_string()],
            vec![vec!["g".into(), "2.5".into()], vec!["g".into(), "n/a".into()]],
        )
        .unwrap();
        let plan = SpecSubtotalPlan {
            partition_keys: vec![COL_GROUP.to_string()],
            sum_column: "v".to_string(),
            labels: SpecSubtotalLabels::default(),
        };
        let aggregated = aggregate_subtotals(&dataset, &plan).unwrap();
        assert_eq!(
            aggregated.dataset.value(2, "v"),
            Some(&EnumCellValue::Number(2.5))
        );
    }
}
