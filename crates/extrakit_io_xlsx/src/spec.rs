//! Shared XLSX specification models and error types.

use thiserror::Error;

use crate::conf::{
    N_WIDTH_EXCEL_COLUMN_MAX, TUP_PERCENT_COLUMN_MARKERS, derive_default_render_formats,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification, converted to a `rust_xlsxwriter::Format` at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment.
    pub align: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            border: other.border.or(self.border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Named format presets used by the sheet renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRenderFormats {
    /// Header row format.
    pub header: SpecCellFormat,
    /// Base format for body cells.
    pub body: SpecCellFormat,
    /// Patch merged onto body cells of percentage columns.
    pub percent: SpecCellFormat,
    /// Patch merged onto datetime body cells.
    pub datetime: SpecCellFormat,
}

/// Normalized cell value during read/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Integral numeric value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// Timestamp as milliseconds since the Unix epoch.
    DateTime(i64),
}

impl EnumCellValue {
    /// Whether the value counts as missing (blank or NaN).
    pub fn is_missing(&self) -> bool {
        match self {
            Self::None => true,
            Self::Number(n) => n.is_nan(),
            _ => false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderOptions

/// Options controlling how one table is rendered as a standalone sheet file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRenderOptions {
    /// Substrings (case-sensitive) marking a column as percentage-formatted.
    pub percent_column_markers: Vec<String>,
    /// Width padding added to the widest cell text of each column.
    pub width_cell_padding: usize,
    /// Maximum final column width.
    pub width_cell_max: usize,
    /// Format presets.
    pub formats: SpecRenderFormats,
}

impl Default for SpecRenderOptions {
    fn default() -> Self {
        Self {
            percent_column_markers: TUP_PERCENT_COLUMN_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
            width_cell_padding: 2,
            width_cell_max: N_WIDTH_EXCEL_COLUMN_MAX,
            formats: derive_default_render_formats(),
        }
    }
}

impl SpecRenderOptions {
    /// Whether `column_name` contains one of the percentage markers.
    pub fn is_percent_column(&self, column_name: &str) -> bool {
        self.percent_column_markers
            .iter()
            .any(|c_marker| column_name.contains(c_marker.as_str()))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Workbook open / sheet decode failures.
#[derive(Debug, Error)]
pub enum XlsxReadError {
    /// The byte stream is not a readable spreadsheet container.
    #[error("cannot open workbook: {0}")]
    Open(String),
    /// The requested sheet is not declared in the workbook.
    #[error("sheet not found: {0:?}")]
    SheetNotFound(String),
    /// The sheet exists but its content cannot be decoded into a table.
    #[error("cannot parse sheet {sheet:?}: {message}")]
    Parse {
        /// Sheet being decoded.
        sheet: String,
        /// Underlying decoder error text.
        message: String,
    },
}

/// Sheet rendering failures.
#[derive(Debug, Error)]
pub enum XlsxRenderError {
    /// The table shape is not writable (e.g. duplicated column names).
    #[error("invalid table: {0}")]
    Table(String),
    /// The table does not fit in a single worksheet.
    #[error("table exceeds worksheet limits: {0}")]
    Limit(String),
    /// The writer failed while building or encoding the workbook.
    #[error("xlsx write error: {0}")]
    Write(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
