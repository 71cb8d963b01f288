//! Export specification models: options, findings, per-sheet results and errors.

use std::fmt;

use chrono::NaiveDateTime;
use extrakit_io_xlsx::conf::C_RENDER_TAB_NAME_DEFAULT;
use extrakit_io_xlsx::{SpecRenderOptions, XlsxReadError};
use thiserror::Error;

use crate::conf::{
    C_LOG_FILE_NAME, C_SHEET_FILE_EXTENSION, N_MARGIN_MIN_DEFAULT, N_PREVIEW_ROWS_DEFAULT,
    N_YEAR_LOWER_DEFAULT, N_YEAR_UPPER_DEFAULT, TUP_COLS_MARGIN, TUP_COLS_RESULT, TUP_COLS_YEAR,
};

////////////////////////////////////////////////////////////////////////////////
// #region AnalyzeOptions

/// Inclusive range of expected years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecYearBounds {
    /// Smallest accepted year.
    pub lower: i64,
    /// Largest accepted year.
    pub upper: i64,
}

impl SpecYearBounds {
    /// Build bounds, rejecting `lower > upper`.
    pub fn new(lower: i64, upper: i64) -> Result<Self, ExportError> {
        if lower > upper {
            return Err(ExportError::InvalidOptions(format!(
                "year bounds must satisfy lower <= upper, got [{lower}-{upper}]."
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Whether `[min, max]` leaves the expected range.
    pub fn is_exceeded_by(&self, min: f64, max: f64) -> bool {
        min < self.lower as f64 || max > self.upper as f64
    }
}

impl Default for SpecYearBounds {
    fn default() -> Self {
        Self {
            lower: N_YEAR_LOWER_DEFAULT,
            upper: N_YEAR_UPPER_DEFAULT,
        }
    }
}

impl fmt::Display for SpecYearBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.lower, self.upper)
    }
}

/// Business-rule thresholds and the column names each rule looks for.
///
/// Column lists are synonyms: the first name present in the table is used.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecAnalyzeOptions {
    /// Expected year range.
    pub year_bounds: SpecYearBounds,
    /// Margin ratio under which a warning is raised.
    pub margin_min: f64,
    /// Result column spellings.
    pub cols_result: Vec<String>,
    /// Margin column spellings.
    pub cols_margin: Vec<String>,
    /// Year column spellings.
    pub cols_year: Vec<String>,
}

impl Default for SpecAnalyzeOptions {
    fn default() -> Self {
        Self {
            year_bounds: SpecYearBounds::default(),
            margin_min: N_MARGIN_MIN_DEFAULT,
            cols_result: TUP_COLS_RESULT.iter().map(ToString::to_string).collect(),
            cols_margin: TUP_COLS_MARGIN.iter().map(ToString::to_string).collect(),
            cols_year: TUP_COLS_YEAR.iter().map(ToString::to_string).collect(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Input options for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecExportOptions {
    /// Business-rule configuration.
    pub analyze: SpecAnalyzeOptions,
    /// Formatting of the per-sheet files.
    pub render: SpecRenderOptions,
    /// Tab name inside each per-sheet file.
    pub tab_name: String,
    /// Extension of per-sheet archive entries (without dot).
    pub file_extension: String,
    /// Archive entry name of the run log.
    pub log_file_name: String,
    /// Rows kept in the preview of the last processed table.
    pub preview_rows: usize,
    /// Run timestamp; the local clock is read when `None`.
    pub timestamp: Option<NaiveDateTime>,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        Self {
            analyze: SpecAnalyzeOptions::default(),
            render: SpecRenderOptions::default(),
            tab_name: C_RENDER_TAB_NAME_DEFAULT.to_string(),
            file_extension: C_SHEET_FILE_EXTENSION.to_string(),
            log_file_name: C_LOG_FILE_NAME.to_string(),
            preview_rows: N_PREVIEW_ROWS_DEFAULT,
            timestamp: None,
        }
    }
}

impl SpecExportOptions {
    /// Default options with the given year bounds.
    pub fn with_year_bounds(year_bounds: SpecYearBounds) -> Self {
        let mut options = Self::default();
        options.analyze.year_bounds = year_bounds;
        options
    }

    /// Archive entry name for sheet `sheet_name`.
    pub fn derive_entry_name(&self, sheet_name: &str) -> String {
        format!("{sheet_name}.{}", self.file_extension)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Findings

/// Severity class of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFindingSeverity {
    /// Informational line.
    Info,
    /// Data-quality warning.
    Warning,
}

/// Rule that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFindingKind {
    /// At least one cell is missing.
    MissingValues,
    /// Share of non-missing cells.
    Completeness,
    /// Negative values in the result column.
    NegativeResults,
    /// Margins under the configured threshold.
    LowMargins,
    /// Years outside the configured range.
    YearsOutOfBounds,
}

/// One diagnostic line produced by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFinding {
    /// Severity class.
    pub severity: EnumFindingSeverity,
    /// Producing rule.
    pub kind: EnumFindingKind,
    /// Human-readable text (icon included).
    pub message: String,
}

impl SpecFinding {
    /// Build an informational finding.
    pub fn info(kind: EnumFindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: EnumFindingSeverity::Info,
            kind,
            message: message.into(),
        }
    }

    /// Build a warning finding.
    pub fn warning(kind: EnumFindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: EnumFindingSeverity::Warning,
            kind,
            message: message.into(),
        }
    }

    /// Whether this finding is a warning.
    pub fn is_warning(&self) -> bool {
        self.severity == EnumFindingSeverity::Warning
    }
}

impl fmt::Display for SpecFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Analyzer output for one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetAnalysis {
    /// Findings in rule order.
    pub findings: Vec<SpecFinding>,
    /// Rows holding at least one non-missing cell.
    pub usable_row_count: u64,
    /// Completeness percentage, when the table has cells.
    pub completeness_pct: Option<u8>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetResults

/// Outcome of one requested sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumSheetStatus {
    /// Rendered, analyzed and archived.
    Success,
    /// Not declared in the workbook.
    NotFound,
    /// Present but could not be parsed, rendered or archived.
    Failed(String),
}

impl EnumSheetStatus {
    /// Short status label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Failed(_) => "failed",
        }
    }
}

/// Per-sheet result, one per requested name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetResult {
    /// Requested (display) sheet name.
    pub sheet_name: String,
    /// Rendered single-sheet workbook, on success.
    pub formatted_bytes: Option<Vec<u8>>,
    /// Analyzer findings, on success.
    pub findings: Vec<SpecFinding>,
    /// Usable rows, `0` unless successful.
    pub usable_row_count: u64,
    /// Outcome.
    pub status: EnumSheetStatus,
}

impl SpecSheetResult {
    /// Result for a sheet absent from the workbook.
    pub fn not_found(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            formatted_bytes: None,
            findings: vec![],
            usable_row_count: 0,
            status: EnumSheetStatus::NotFound,
        }
    }

    /// Result for a sheet that failed with `reason`.
    pub fn failed(sheet_name: &str, reason: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            formatted_bytes: None,
            findings: vec![],
            usable_row_count: 0,
            status: EnumSheetStatus::Failed(reason.into()),
        }
    }

    /// Result for a processed sheet.
    pub fn success(sheet_name: &str, formatted_bytes: Vec<u8>, analysis: SpecSheetAnalysis) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            formatted_bytes: Some(formatted_bytes),
            findings: analysis.findings,
            usable_row_count: analysis.usable_row_count,
            status: EnumSheetStatus::Success,
        }
    }

    /// Whether the sheet was exported.
    pub fn is_success(&self) -> bool {
        self.status == EnumSheetStatus::Success
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// "Whole run failed" errors; per-sheet failures are [`EnumSheetStatus`] values.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The workbook bytes could not be opened.
    #[error(transparent)]
    Read(#[from] XlsxReadError),
    /// Options are inconsistent.
    #[error("invalid export options: {0}")]
    InvalidOptions(String),
    /// The in-memory archive could not be assembled.
    #[error("archive error: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Archive(err.to_string())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_bounds_reject_inverted_range() {
        assert!(SpecYearBounds::new(2026, 2022).is_err());

        let bounds = SpecYearBounds::new(2020, 2026).unwrap();
        assert_eq!(bounds.to_string(), "[2020-2026]");
        assert!(!bounds.is_exceeded_by(2020.0, 2026.0));
        assert!(bounds.is_exceeded_by(2019.0, 2024.0));
        assert!(bounds.is_exceeded_by(2021.0, 2027.0));
    }

    #[test]
    fn export_options_defaults_match_presets() {
        let options = SpecExportOptions::default();
        assert_eq!(options.analyze.year_bounds, SpecYearBounds::new(2022, 2026).unwrap());
        assert_eq!(options.analyze.cols_year, vec!["Annee", "Année"]);
        assert_eq!(options.tab_name, "Export");
        assert_eq!(options.derive_entry_name("Export_Qlik"), "Export_Qlik.xlsx");
        assert_eq!(options.log_file_name, "log_export.txt");
    }
}
