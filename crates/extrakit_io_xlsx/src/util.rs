//! Stateless helper utilities shared by the reader and the writer kernel.

use std::collections::{BTreeMap, BTreeSet};

use chrono::DateTime;
use polars::prelude::{AnyValue, TimeUnit};

use crate::conf::{
    N_DAYS_SERIAL_EPOCH_TO_UNIX, N_LEN_EXCEL_SHEET_NAME_MAX, N_MS_PER_DAY, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL, TUP_MISSING_CELL_TEXTS,
};
use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert a polars value into the normalized cell representation.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Integer(val as i64),
        AnyValue::UInt16(val) => EnumCellValue::Integer(val as i64),
        AnyValue::UInt32(val) => EnumCellValue::Integer(val as i64),
        AnyValue::UInt64(val) => match i64::try_from(val) {
            Ok(n) => EnumCellValue::Integer(n),
            Err(_) => EnumCellValue::Number(val as f64),
        },
        AnyValue::Int8(val) => EnumCellValue::Integer(val as i64),
        AnyValue::Int16(val) => EnumCellValue::Integer(val as i64),
        AnyValue::Int32(val) => EnumCellValue::Integer(val as i64),
        AnyValue::Int64(val) => EnumCellValue::Integer(val),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        AnyValue::Datetime(val, time_unit, _) => {
            EnumCellValue::DateTime(convert_time_unit_to_ms(val, time_unit))
        }
        _ => EnumCellValue::String(value.to_string()),
    }
}

/// Whether a body cell text stands for a missing value (exact match, no trimming).
pub fn is_missing_text(text: &str) -> bool {
    TUP_MISSING_CELL_TEXTS.contains(&text)
}

/// Interpret a cell as a number; text is parsed, other kinds are ignored.
pub fn derive_f64_from_cell_value(value: &EnumCellValue) -> Option<f64> {
    let n_value = match value {
        EnumCellValue::Number(val) => *val,
        EnumCellValue::Integer(val) => *val as f64,
        EnumCellValue::String(val) => val.trim().parse::<f64>().ok()?,
        EnumCellValue::None | EnumCellValue::Boolean(_) | EnumCellValue::DateTime(_) => {
            return None;
        }
    };
    if n_value.is_nan() { None } else { Some(n_value) }
}

fn convert_time_unit_to_ms(value: i64, time_unit: TimeUnit) -> i64 {
    match time_unit {
        TimeUnit::Nanoseconds => value.div_euclid(1_000_000),
        TimeUnit::Microseconds => value.div_euclid(1_000),
        TimeUnit::Milliseconds => value,
    }
}

/// Convert Unix milliseconds to a spreadsheet serial date (1900 date system).
pub fn convert_unix_ms_to_serial(ms: i64) -> f64 {
    ms as f64 / N_MS_PER_DAY + N_DAYS_SERIAL_EPOCH_TO_UNIX
}

/// Display text of one cell, as used for column sizing and text columns.
///
/// Missing values render as an empty string.
pub fn format_cell_text(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::None => String::new(),
        EnumCellValue::String(val) => val.clone(),
        EnumCellValue::Number(val) => {
            if val.is_nan() {
                String::new()
            } else {
                val.to_string()
            }
        }
        EnumCellValue::Integer(val) => val.to_string(),
        EnumCellValue::Boolean(val) => if *val { "True" } else { "False" }.to_string(),
        EnumCellValue::DateTime(ms) => match DateTime::from_timestamp_millis(*ms) {
            Some(dt) => dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
            None => ms.to_string(),
        },
    }
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    format_cell_text(value).chars().count()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

/// Turn raw header texts into unique column names.
///
/// Blank headers become `Unnamed: <idx>`; repeats of `X` become `X.1`, `X.2`, ...
pub fn derive_unique_column_names(header_texts: &[String]) -> Vec<String> {
    let l_names_raw: Vec<String> = header_texts
        .iter()
        .enumerate()
        .map(|(n_idx, c_text)| {
            let c_text = c_text.trim();
            if c_text.is_empty() {
                format!("Unnamed: {n_idx}")
            } else {
                c_text.to_string()
            }
        })
        .collect();

    let mut set_names_taken: BTreeSet<String> = BTreeSet::new();
    let mut dict_dup_counter: BTreeMap<String, usize> = BTreeMap::new();
    let mut l_names = Vec::with_capacity(l_names_raw.len());

    for c_name in l_names_raw {
        if set_names_taken.insert(c_name.clone()) {
            l_names.push(c_name);
            continue;
        }

        let n_counter = dict_dup_counter.entry(c_name.clone()).or_insert(0);
        loop {
            *n_counter += 1;
            let c_candidate = format!("{c_name}.{n_counter}");
            if set_names_taken.insert(c_candidate.clone()) {
                l_names.push(c_candidate);
                break;
            }
        }
    }

    l_names
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Check that a table with a one-row header fits in a single worksheet.
pub fn validate_sheet_limits(height_df: usize, width_df: usize) -> Result<(), String> {
    if width_df > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "{width_df} columns exceed the worksheet maximum of {N_NCOLS_EXCEL_MAX}."
        ));
    }
    if height_df + 1 > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "{height_df} data rows plus header exceed the worksheet maximum of {N_NROWS_EXCEL_MAX}."
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_unique_column_names_fills_blanks_and_suffixes_repeats() {
        let l_header = vec![
            "Annee".to_string(),
            "".to_string(),
            "Marge".to_string(),
            "Marge".to_string(),
            "Marge.1".to_string(),
            "Marge".to_string(),
        ];

        assert_eq!(
            derive_unique_column_names(&l_header),
            vec![
                "Annee".to_string(),
                "Unnamed: 1".to_string(),
                "Marge".to_string(),
                "Marge.1".to_string(),
                "Marge.1.1".to_string(),
                "Marge.2".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_unique_columns_reports_positions() {
        let l_cols = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let err = validate_unique_columns(&l_cols).unwrap_err();
        assert!(err.contains("\"a\" x2 at indices [0, 2]"), "{err}");
        assert!(validate_unique_columns(&l_cols[..2]).is_ok());
    }

    #[test]
    fn test_format_cell_text_matches_display_rules() {
        assert_eq!(format_cell_text(&EnumCellValue::None), "");
        assert_eq!(format_cell_text(&EnumCellValue::Number(f64::NAN)), "");
        assert_eq!(format_cell_text(&EnumCellValue::Number(0.05)), "0.05");
        assert_eq!(format_cell_text(&EnumCellValue::Number(2023.0)), "2023");
        assert_eq!(format_cell_text(&EnumCellValue::Integer(-12)), "-12");
        assert_eq!(format_cell_text(&EnumCellValue::Boolean(true)), "True");
        assert_eq!(
            format_cell_text(&EnumCellValue::DateTime(1_704_067_200_000)),
            "2024-01-01 00:00:00"
        );
        assert_eq!(estimate_width_len(&EnumCellValue::String("Année".into())), 5);
    }

    #[test]
    fn test_is_missing_text_matches_exact_markers() {
        assert!(is_missing_text("NA"));
        assert!(is_missing_text("null"));
        assert!(is_missing_text(""));
        assert!(!is_missing_text(" NA"));
        assert!(!is_missing_text("Na"));
        assert!(!is_missing_text("NAN"));
    }

    #[test]
    fn test_unix_ms_to_serial_date() {
        // 2024-01-01 12:00:00
        let n_serial = convert_unix_ms_to_serial(1_704_110_400_000);
        assert!((n_serial - 45_292.5).abs() < 1e-9);
        assert_eq!(convert_unix_ms_to_serial(0), 25_569.0);
    }

    #[test]
    fn test_derive_f64_from_cell_value_parses_text_and_skips_others() {
        assert_eq!(
            derive_f64_from_cell_value(&EnumCellValue::String(" -3.5 ".into())),
            Some(-3.5)
        );
        assert_eq!(derive_f64_from_cell_value(&EnumCellValue::Integer(7)), Some(7.0));
        assert_eq!(derive_f64_from_cell_value(&EnumCellValue::String("n/a".into())), None);
        assert_eq!(derive_f64_from_cell_value(&EnumCellValue::Number(f64::NAN)), None);
        assert_eq!(derive_f64_from_cell_value(&EnumCellValue::Boolean(true)), None);
    }

    #[test]
    fn test_sanitize_sheet_name_and_limits() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);

        assert!(validate_sheet_limits(10, 3).is_ok());
        assert!(validate_sheet_limits(N_NROWS_EXCEL_MAX, 1).is_err());
        assert!(validate_sheet_limits(1, N_NCOLS_EXCEL_MAX + 1).is_err());
    }
}
