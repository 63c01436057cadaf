//! `salesbook_io_xlsx` v1:
//! XLSX read/write kernel for sales report datasets.
//!
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : format specs and write options
//! - `util`   : pure helper functions
//! - `bridge` : dataset <-> polars `DataFrame` conversion, column kinds
//! - `reader` : calamine-backed workbook reader
//! - `writer` : rust_xlsxwriter-backed workbook writer
pub mod bridge;
pub mod conf;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use bridge::{
    EnumColumnKind, derive_column_kinds, derive_dataframe_from_dataset, derive_dataset_from_dataframe,
};
pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_formats,
};
pub use reader::{derive_dataset_from_range, read_xlsx_dataset};
pub use spec::{
    SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice, SpecXlsxFormats, SpecXlsxReport,
};
pub use util::{plan_sheet_slices, sanitize_sheet_name};
pub use writer::{SpecXlsxSheetWriteOptions, XlsxWriter};
