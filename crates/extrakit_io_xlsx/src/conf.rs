//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecRenderFormats};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel column width upper bound, in character units.
pub const N_WIDTH_EXCEL_COLUMN_MAX: usize = 255;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Tab name used inside every rendered sheet file.
pub const C_RENDER_TAB_NAME_DEFAULT: &str = "Export";
/// Column-name markers that switch a column to percentage display.
pub const TUP_PERCENT_COLUMN_MARKERS: [&str; 2] = ["Pourcent", "Marge"];

/// Body cell texts read as missing values.
pub const TUP_MISSING_CELL_TEXTS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Number format applied to percentage columns.
pub const C_NUM_FORMAT_PERCENT: &str = "0.00%";
/// Number format applied to datetime cells.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";

/// Days between the spreadsheet serial epoch (1899-12-30) and 1970-01-01.
pub const N_DAYS_SERIAL_EPOCH_TO_UNIX: f64 = 25_569.0;
/// Milliseconds per day.
pub const N_MS_PER_DAY: f64 = 86_400_000.0;

/// Build default format presets used by [`crate::writer::render_sheet`].
pub fn derive_default_render_formats() -> SpecRenderFormats {
    SpecRenderFormats {
        header: SpecCellFormat {
            bold: Some(true),
            border: Some(1),
            align: Some("center".to_string()),
            ..Default::default()
        },
        body: SpecCellFormat::default(),
        percent: SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_PERCENT.to_string()),
            ..Default::default()
        },
        datetime: SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DATETIME.to_string()),
            ..Default::default()
        },
    }
}
