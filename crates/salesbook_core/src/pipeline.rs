//! Report assembly: Original, Short, Grouped and Logistics views.

use std::path::Path;

use crate::aggregate::{SpecAggregated, SpecSubtotalPlan, aggregate_subtotals};
use crate::classify::{ClassificationTable, EnumClassifyColumns, classify_dataset};
use crate::conf::{
    COL_COLOR, COL_DELIVERY_SERVICES, COL_PAYMENT_REASON, COL_SALE_DATE, COL_SIZE,
    COL_SUPPLIER_ARTICLE, REASON_LOGISTICS, SHEET_GROUPED, SHEET_LOGISTICS, SHEET_ORIGINAL,
    SHEET_SHORT, derive_default_logistics_columns,
};
use crate::config::{load_book, load_columns};
use crate::dataset::{Dataset, project_columns};
use crate::order::{OrderingPolicy, SpecSortKey, derive_reason_order, sort_by_keys, sort_dataset};
use crate::spec::{ConfigError, EnumCellValue, PipelineError, SpecBook};

/// Everything the pipeline reads from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReportConfig {
    /// Classification book.
    pub book: SpecBook,
    /// Column list of the Short view.
    pub short_columns: Vec<String>,
    /// Column list of the Logistics view.
    pub logistics_columns: Vec<String>,
}

impl SpecReportConfig {
    /// Load configuration files; the logistics list falls back to the default.
    pub fn load(
        path_book: &Path,
        path_short_columns: &Path,
        path_logistics_columns: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let book = load_book(path_book)?;
        let short_columns = load_columns(path_short_columns)?;
        let logistics_columns = match path_logistics_columns {
            Some(path) => load_columns(path)?,
            None => derive_default_logistics_columns(),
        };
        tracing::info!(
            entries = book.len(),
            short = short_columns.len(),
            logistics = logistics_columns.len(),
            "configuration loaded"
        );
        Ok(Self {
            book,
            short_columns,
            logistics_columns,
        })
    }
}

/// One named output table.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecReportView {
    /// Target sheet name.
    pub sheet_name: String,
    /// Table content.
    pub dataset: Dataset,
    /// Row indices to highlight (subtotal rows).
    pub rows_highlight: Vec<usize>,
}

impl SpecReportView {
    fn plain(sheet_name: &str, dataset: Dataset) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            dataset,
            rows_highlight: vec![],
        }
    }
}

/// All views of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecReportViews {
    /// Source as read.
    pub original: SpecReportView,
    /// Projected source.
    pub short: SpecReportView,
    /// Classified and sorted Short view.
    pub grouped: SpecReportView,
    /// Logistics rows with subtotals.
    pub logistics: SpecReportView,
}

impl SpecReportViews {
    /// Views in workbook order.
    pub fn into_views(self) -> Vec<SpecReportView> {
        vec![self.original, self.short, self.grouped, self.logistics]
    }
}

/// Short view: trim header whitespace, then project to `columns`.
pub fn prepare_short(source: &Dataset, columns: &[String]) -> Result<Dataset, PipelineError> {
    let short = project_columns(&source.with_trimmed_column_names(), columns);
    tracing::info!(columns = ?short.columns(), "short view columns");
    Ok(short)
}

/// Grouped view: classify, then sort by group, article and reason order.
pub fn prepare_grouped(
    short: &Dataset,
    table: &ClassificationTable,
    policy: &OrderingPolicy,
) -> Result<Dataset, PipelineError> {
    let classified = classify_dataset(
        short,
        table,
        COL_SUPPLIER_ARTICLE,
        EnumClassifyColumns::GroupAndColor,
    )?;

    let l_extra_keys = match derive_reason_order(&classified, COL_PAYMENT_REASON) {
        Some(l_reason_order) => vec![SpecSortKey::ranked(COL_PAYMENT_REASON, l_reason_order)],
        None => vec![],
    };
    sort_dataset(&classified, policy, COL_SUPPLIER_ARTICLE, &l_extra_keys)
}

/// Logistics view: reason filter, classify, project, sort, subtotal.
///
/// Header whitespace is trimmed as in the Short view. Without the reason
/// column the view is an empty dataset. Rows are sorted Group, Color, Size
/// first so every subtotal partition is contiguous. Partitions of one group
/// therefore follow Color and Size order, not the order of their smallest
/// article; rows inside a partition stay ordered by article, then sale date.
pub fn prepare_logistics(
    source: &Dataset,
    table: &ClassificationTable,
    policy: &OrderingPolicy,
    columns: &[String],
) -> Result<SpecAggregated, PipelineError> {
    let source = source.with_trimmed_column_names();
    let Some(logistics) = source.filter_by_column(COL_PAYMENT_REASON, |value| {
        matches!(value, EnumCellValue::String(s) if s == REASON_LOGISTICS)
    }) else {
        tracing::info!("reason column absent, logistics view is empty");
        return Ok(SpecAggregated::default());
    };

    let classified = classify_dataset(
        &logistics,
        table,
        COL_SUPPLIER_ARTICLE,
        EnumClassifyColumns::GroupAndColor,
    )?;
    let projected = project_columns(&classified, columns);

    let sorted = sort_by_keys(
        &projected,
        &[
            policy.group_sort_key(),
            SpecSortKey::natural(COL_COLOR),
            SpecSortKey::natural(COL_SIZE),
            SpecSortKey::natural(COL_SUPPLIER_ARTICLE),
            SpecSortKey::natural(COL_SALE_DATE),
        ],
    );

    aggregate_subtotals(&sorted, &SpecSubtotalPlan::logistics(COL_DELIVERY_SERVICES))
}

/// Build every view from one source table.
pub fn build_report(
    source: &Dataset,
    config: &SpecReportConfig,
) -> Result<SpecReportViews, PipelineError> {
    let table = ClassificationTable::from_book(&config.book);
    let policy = OrderingPolicy::from_table(&table);
    tracing::info!(
        keys = table.len(),
        groups = ?policy.group_order(),
        "classification table ready"
    );

    let short = prepare_short(source, &config.short_columns)?;
    let grouped = prepare_grouped(&short, &table, &policy)?;
    let logistics = prepare_logistics(source, &table, &policy, &config.logistics_columns)?;

    Ok(SpecReportViews {
        original: SpecReportView::plain(SHEET_ORIGINAL, source.clone()),
        short: SpecReportView::plain(SHEET_SHORT, short),
        grouped: SpecReportView::plain(SHEET_GROUPED, grouped),
        logistics: SpecReportView {
            sheet_name: SHEET_LOGISTICS.to_string(),
            dataset: logistics.dataset,
            rows_highlight: logistics.rows_subtotal,
        },
    })
}
