//! Data-quality analysis of one parsed sheet.
//!
//! Rules run in a fixed order and each one is a guarded check returning
//! `Option<SpecFinding>`: a rule whose column is absent yields nothing.

use extrakit_io_xlsx::{
    EnumCellValue, derive_cell_value_from_any_value, derive_f64_from_cell_value,
};
use log::debug;
use polars::prelude::{Column, DataFrame};

use crate::spec::{EnumFindingKind, SpecAnalyzeOptions, SpecFinding, SpecSheetAnalysis};

/// Missing-cell counters over a whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecMissingStats {
    /// Rows with at least one non-missing cell.
    pub cnt_rows_usable: u64,
    /// Missing (null or NaN) cells.
    pub cnt_cells_missing: u64,
    /// All cells (`height * width`).
    pub cnt_cells_total: u64,
}

/// Analyze `df` and return its findings and usable-row count.
pub fn analyze_sheet(
    df: &DataFrame,
    display_name: &str,
    options: &SpecAnalyzeOptions,
) -> SpecSheetAnalysis {
    let stats = derive_missing_stats(df);
    let completeness_pct = calculate_completeness_pct(&stats);

    let findings: Vec<SpecFinding> = [
        check_missing_values(&stats),
        completeness_pct.map(create_completeness_finding),
        check_negative_results(df, options),
        check_low_margins(df, options),
        check_year_bounds(df, options),
    ]
    .into_iter()
    .flatten()
    .collect();

    debug!(
        "analyzed {display_name:?}: {} usable rows, {} findings",
        stats.cnt_rows_usable,
        findings.len()
    );

    SpecSheetAnalysis {
        findings,
        usable_row_count: stats.cnt_rows_usable,
        completeness_pct,
    }
}

/// Count usable rows and missing cells.
pub fn derive_missing_stats(df: &DataFrame) -> SpecMissingStats {
    let n_height = df.height();
    let mut l_if_row_has_value = vec![false; n_height];
    let mut cnt_cells_missing = 0u64;

    for col in df.get_columns() {
        for (n_idx_row, if_row_has_value) in l_if_row_has_value.iter_mut().enumerate() {
            if is_cell_missing(col, n_idx_row) {
                cnt_cells_missing += 1;
            } else {
                *if_row_has_value = true;
            }
        }
    }

    SpecMissingStats {
        cnt_rows_usable: l_if_row_has_value.iter().filter(|val| **val).count() as u64,
        cnt_cells_missing,
        cnt_cells_total: (n_height * df.width()) as u64,
    }
}

/// `round((1 - missing / total) * 100)`, half to even; `None` for a table without cells.
pub fn calculate_completeness_pct(stats: &SpecMissingStats) -> Option<u8> {
    if stats.cnt_cells_total == 0 {
        return None;
    }
    let n_ratio_missing = stats.cnt_cells_missing as f64 / stats.cnt_cells_total as f64;
    let n_pct = ((1.0 - n_ratio_missing) * 100.0).round_ties_even();
    Some(n_pct.clamp(0.0, 100.0) as u8)
}

fn is_cell_missing(col: &Column, n_idx_row: usize) -> bool {
    match col.get(n_idx_row) {
        Ok(value) => derive_cell_value_from_any_value(value).is_missing(),
        Err(_) => true,
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Rules

/// Warn when any cell is missing.
pub fn check_missing_values(stats: &SpecMissingStats) -> Option<SpecFinding> {
    (stats.cnt_cells_missing > 0).then(|| {
        SpecFinding::warning(EnumFindingKind::MissingValues, "⚠ Contains missing values.")
    })
}

fn create_completeness_finding(n_pct: u8) -> SpecFinding {
    SpecFinding::info(
        EnumFindingKind::Completeness,
        format!("🔎 Completeness score: {n_pct}%"),
    )
}

/// Warn when the result column holds a negative value.
pub fn check_negative_results(
    df: &DataFrame,
    options: &SpecAnalyzeOptions,
) -> Option<SpecFinding> {
    let col = select_first_column(df, &options.cols_result)?;
    derive_numeric_values(col)
        .into_iter()
        .any(|n_value| n_value < 0.0)
        .then(|| {
            SpecFinding::warning(EnumFindingKind::NegativeResults, "⚠ Negative results detected")
        })
}

/// Warn when the margin column holds a value under `margin_min`.
pub fn check_low_margins(df: &DataFrame, options: &SpecAnalyzeOptions) -> Option<SpecFinding> {
    let col = select_first_column(df, &options.cols_margin)?;
    derive_numeric_values(col)
        .into_iter()
        .any(|n_value| n_value < options.margin_min)
        .then(|| {
            SpecFinding::warning(
                EnumFindingKind::LowMargins,
                format!("📉 Margins below {}%", format_ratio_as_pct(options.margin_min)),
            )
        })
}

/// Warn when the year column's min/max leave the expected bounds.
pub fn check_year_bounds(df: &DataFrame, options: &SpecAnalyzeOptions) -> Option<SpecFinding> {
    let col = select_first_column(df, &options.cols_year)?;
    let l_values = derive_numeric_values(col);
    let n_min = l_values.iter().copied().reduce(f64::min)?;
    let n_max = l_values.iter().copied().reduce(f64::max)?;

    let year_bounds = options.year_bounds;
    year_bounds.is_exceeded_by(n_min, n_max).then(|| {
        SpecFinding::warning(
            EnumFindingKind::YearsOutOfBounds,
            format!("⚠ Years outside expected bounds {year_bounds}"),
        )
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnAccess

/// First column of `df` whose name is in `names`, following `names` order.
pub fn select_first_column<'a>(df: &'a DataFrame, names: &[String]) -> Option<&'a Column> {
    names.iter().find_map(|c_name| df.column(c_name).ok())
}

/// Numeric interpretation of every non-missing cell; other cells are skipped.
pub fn derive_numeric_values(col: &Column) -> Vec<f64> {
    (0..col.len())
        .filter_map(|n_idx_row| col.get(n_idx_row).ok())
        .map(derive_cell_value_from_any_value)
        .filter(|value| !matches!(value, EnumCellValue::None))
        .filter_map(|value| derive_f64_from_cell_value(&value))
        .collect()
}

fn format_ratio_as_pct(ratio: f64) -> String {
    let n_pct = (ratio * 100.0 * 100.0).round() / 100.0;
    n_pct.to_string()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
