//! `extrakit_export` v1:
//! Workbook-to-archive export pipeline with data-quality diagnostics.
//!
//! Modules:
//! - `conf`    : default thresholds, column names and archive names
//! - `spec`    : options/findings/sheet results/errors
//! - `analyze` : business-rule checks over one parsed table
//! - `report`  : export report model + log builder
//! - `export`  : orchestration (parse -> render -> analyze -> zip)
pub mod analyze;
pub mod conf;
pub mod export;
pub mod report;
pub mod spec;

pub use analyze::analyze_sheet;
pub use conf::{TUP_SHEETS_CANDIDATE, TUP_SHEETS_DEFAULT, derive_default_sheet_selection};
pub use export::{SpecExportOutput, export_workbook_bytes, run_export, validate_export_options};
pub use report::{ReportExport, ReportExportBuilder};
pub use spec::{
    EnumFindingKind, EnumFindingSeverity, EnumSheetStatus, ExportError, SpecAnalyzeOptions,
    SpecExportOptions, SpecFinding, SpecSheetAnalysis, SpecSheetResult, SpecYearBounds,
};
