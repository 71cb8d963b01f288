//! `extrakit_io_xlsx` v1:
//! Workbook reading and single-sheet rendering kernel.
//!
//! Modules:
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options/errors
//! - `util`   : pure helper functions
//! - `reader` : workbook reader (sheet listing, sheet -> DataFrame)
//! - `writer` : DataFrame -> formatted single-sheet workbook bytes
pub mod conf;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_RENDER_TAB_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_PERCENT_COLUMN_MARKERS,
};
pub use reader::XlsxWorkbookReader;
pub use spec::{
    EnumCellValue, SpecCellFormat, SpecRenderFormats, SpecRenderOptions, XlsxReadError,
    XlsxRenderError,
};
pub use util::{
    derive_cell_value_from_any_value, derive_f64_from_cell_value, format_cell_text,
    sanitize_sheet_name,
};
pub use writer::{SpecColumnFormatPlan, plan_column_formats, render_sheet};
