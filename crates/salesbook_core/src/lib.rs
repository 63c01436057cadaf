//! `salesbook_core` v1:
//! Classification, ordering and subtotal pipeline for marketplace sales exports.
//!
//! Module layout follows the sibling `salesbook_io_xlsx` crate:
//! - `conf`      : column names, labels and default column lists
//! - `spec`      : cell values, configuration models and errors
//! - `dataset`   : in-memory table plus projection/filter helpers
//! - `classify`  : key normalization, classification table and classifier
//! - `order`     : group/reason ordering policies and the stable sorter
//! - `aggregate` : per-partition subtotal injection
//! - `config`    : YAML configuration loading
//! - `pipeline`  : assembly of the report views
pub mod aggregate;
pub mod classify;
pub mod conf;
pub mod config;
pub mod dataset;
pub mod order;
pub mod pipeline;
pub mod spec;

pub use aggregate::{SpecAggregated, SpecSubtotalLabels, SpecSubtotalPlan, aggregate_subtotals};
pub use classify::{ClassificationTable, EnumClassifyColumns, classify_dataset, normalize_key};
pub use config::{load_book, load_columns, parse_book, parse_columns};
pub use dataset::{Dataset, project_columns};
pub use order::{
    OrderingPolicy, SpecSortKey, derive_group_order, derive_reason_order, sort_by_keys,
    sort_dataset,
};
pub use pipeline::{SpecReportConfig, SpecReportView, SpecReportViews, build_report};
pub use spec::{
    ConfigError, EnumBookValue, EnumCellValue, PipelineError, SpecBook, SpecBookEntry,
    SpecClassification,
};
