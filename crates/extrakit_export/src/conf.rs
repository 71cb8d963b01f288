//! Export pipeline constants and default presets.

/// Lower bound of the expected year range.
pub const N_YEAR_LOWER_DEFAULT: i64 = 2022;
/// Upper bound of the expected year range.
pub const N_YEAR_UPPER_DEFAULT: i64 = 2026;
/// Margins strictly below this ratio raise a warning.
pub const N_MARGIN_MIN_DEFAULT: f64 = 0.10;

/// Accepted spellings of the result column.
pub const TUP_COLS_RESULT: [&str; 1] = ["Résultat"];
/// Accepted spellings of the margin column.
pub const TUP_COLS_MARGIN: [&str; 1] = ["Marge"];
/// Accepted spellings of the year column, in lookup order.
pub const TUP_COLS_YEAR: [&str; 2] = ["Annee", "Année"];

/// Archive entry holding the run log.
pub const C_LOG_FILE_NAME: &str = "log_export.txt";
/// Extension of per-sheet archive entries.
pub const C_SHEET_FILE_EXTENSION: &str = "xlsx";
/// Prefix of the suggested archive download name.
pub const C_ARCHIVE_NAME_PREFIX: &str = "export_Qlik";
/// Rows kept in the preview of the last processed table.
pub const N_PREVIEW_ROWS_DEFAULT: usize = 10;

/// Timestamp layout of the log header line.
pub const C_LOG_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
/// Timestamp layout of the suggested archive name.
pub const C_ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Sheets the export screen offers for selection.
pub const TUP_SHEETS_CANDIDATE: [&str; 4] = [
    "Historique_Global",
    "Historique_Local",
    "Historique_Projection",
    "Export_Qlik",
];
/// Sheets selected when the caller does not choose.
pub const TUP_SHEETS_DEFAULT: [&str; 1] = ["Export_Qlik"];

/// Default sheet selection as owned names.
pub fn derive_default_sheet_selection() -> Vec<String> {
    TUP_SHEETS_DEFAULT.iter().map(ToString::to_string).collect()
}
