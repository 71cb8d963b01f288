//! Workbook reader that decodes one named sheet at a time into a DataFrame.

use std::io::Cursor;

use calamine::{CellErrorType, Data, Range, Reader, Xlsx, open_workbook_from_rs};
use log::debug;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series, TimeUnit};

use crate::spec::{EnumCellValue, XlsxReadError};
use crate::util::{derive_unique_column_names, format_cell_text, is_missing_text};

/// Column dtype inferred from the non-missing cells of one sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumColumnKind {
    Empty,
    Integer,
    Float,
    Boolean,
    DateTime,
    Text,
}

/// Read-only workbook handle over an in-memory byte stream.
///
/// Only the workbook directory is decoded on [`Self::open`]; worksheet
/// content is decoded on demand by [`Self::parse_sheet`].
pub struct XlsxWorkbookReader {
    workbook: Xlsx<Cursor<Vec<u8>>>,
    l_sheet_names: Vec<String>,
}

impl XlsxWorkbookReader {
    /// Open a workbook from raw `.xlsx` / `.xlsm` bytes.
    pub fn open(bytes: impl Into<Vec<u8>>) -> Result<Self, XlsxReadError> {
        let workbook = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(bytes.into()))
            .map_err(|err| XlsxReadError::Open(err.to_string()))?;
        let l_sheet_names = workbook.sheet_names();
        debug!("opened workbook with sheets {l_sheet_names:?}");

        Ok(Self {
            workbook,
            l_sheet_names,
        })
    }

    /// Sheet names in workbook declaration order.
    pub fn list_sheets(&self) -> &[String] {
        &self.l_sheet_names
    }

    /// Whether `name` is one of the declared sheets.
    pub fn contains_sheet(&self, name: &str) -> bool {
        self.l_sheet_names.iter().any(|c_name| c_name == name)
    }

    /// Decode sheet `name` into a table whose first row is the header.
    pub fn parse_sheet(&mut self, name: &str) -> Result<DataFrame, XlsxReadError> {
        if !self.contains_sheet(name) {
            return Err(XlsxReadError::SheetNotFound(name.to_string()));
        }

        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|err| XlsxReadError::Parse {
                sheet: name.to_string(),
                message: err.to_string(),
            })?;

        let df = derive_dataframe_from_range(&range).map_err(|message| XlsxReadError::Parse {
            sheet: name.to_string(),
            message,
        })?;
        debug!(
            "parsed sheet {name:?}: {} rows x {} columns",
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// Build a DataFrame from a worksheet range (first row = header).
pub fn derive_dataframe_from_range(range: &Range<Data>) -> Result<DataFrame, String> {
    let mut it_rows = range.rows();
    let Some(l_header_cells) = it_rows.next() else {
        return Ok(DataFrame::empty());
    };

    let l_header_texts: Vec<String> = l_header_cells
        .iter()
        .map(|cell| format_cell_text(&derive_cell_value_from_data(cell)))
        .collect();
    let l_colnames = derive_unique_column_names(&l_header_texts);

    let n_width = l_colnames.len();
    let mut l_values_by_col: Vec<Vec<EnumCellValue>> = vec![Vec::new(); n_width];
    for row in it_rows {
        for (n_idx_col, l_values) in l_values_by_col.iter_mut().enumerate() {
            let value = row
                .get(n_idx_col)
                .map_or(EnumCellValue::None, derive_body_cell_value);
            l_values.push(value);
        }
    }

    let l_columns = l_colnames
        .iter()
        .zip(&l_values_by_col)
        .map(|(c_name, l_values)| derive_column_from_values(c_name, l_values))
        .collect::<Result<Vec<_>, _>>()?;

    DataFrame::new(l_columns).map_err(|err| format!("Failed to assemble table: {err}"))
}

/// Normalize one decoded cell.
///
/// Blank cells and `#N/A` errors are missing; other errors keep their text.
pub fn derive_cell_value_from_data(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Integer(*val),
        Data::Bool(val) => EnumCellValue::Boolean(*val),
        Data::DateTime(val) if val.is_duration() => EnumCellValue::Number(val.as_f64()),
        Data::DateTime(val) => match val.as_datetime() {
            Some(dt) => EnumCellValue::DateTime(dt.and_utc().timestamp_millis()),
            None => EnumCellValue::Number(val.as_f64()),
        },
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(CellErrorType::NA) => EnumCellValue::None,
        Data::Error(err) => EnumCellValue::String(err.to_string()),
    }
}

/// Normalize one body cell; missing-value markers in text cells become missing.
fn derive_body_cell_value(cell: &Data) -> EnumCellValue {
    match cell {
        Data::String(val) if is_missing_text(val) => EnumCellValue::None,
        _ => derive_cell_value_from_data(cell),
    }
}

fn derive_column_kind(values: &[EnumCellValue]) -> EnumColumnKind {
    let mut enum_kind = EnumColumnKind::Empty;
    let mut if_has_missing = false;

    for value in values {
        let enum_kind_cell = match value {
            EnumCellValue::None => {
                if_has_missing = true;
                continue;
            }
            EnumCellValue::Number(n) if n.is_nan() => {
                if_has_missing = true;
                continue;
            }
            EnumCellValue::Integer(_) => EnumColumnKind::Integer,
            EnumCellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    EnumColumnKind::Integer
                } else {
                    EnumColumnKind::Float
                }
            }
            EnumCellValue::Boolean(_) => EnumColumnKind::Boolean,
            EnumCellValue::DateTime(_) => EnumColumnKind::DateTime,
            EnumCellValue::String(_) => return EnumColumnKind::Text,
        };

        enum_kind = match (enum_kind, enum_kind_cell) {
            (EnumColumnKind::Empty, kind) => kind,
            (prev, kind) if prev == kind => prev,
            (EnumColumnKind::Integer, EnumColumnKind::Float)
            | (EnumColumnKind::Float, EnumColumnKind::Integer) => EnumColumnKind::Float,
            _ => return EnumColumnKind::Text,
        };
    }

    // An integer column with holes cannot stay integral (same as a NaN-carrying float column).
    if enum_kind == EnumColumnKind::Integer && if_has_missing {
        return EnumColumnKind::Float;
    }
    enum_kind
}

fn derive_column_from_values(name: &str, values: &[EnumCellValue]) -> Result<Column, String> {
    let series = match derive_column_kind(values) {
        EnumColumnKind::Empty => {
            Series::new(name.into(), vec![None::<f64>; values.len()])
        }
        EnumColumnKind::Integer => {
            let l_values: Vec<i64> = values
                .iter()
                .map(|value| match value {
                    EnumCellValue::Integer(n) => *n,
                    EnumCellValue::Number(n) => *n as i64,
                    _ => 0,
                })
                .collect();
            Series::new(name.into(), l_values)
        }
        EnumColumnKind::Float => {
            let l_values: Vec<Option<f64>> = values
                .iter()
                .map(|value| match value {
                    EnumCellValue::Integer(n) => Some(*n as f64),
                    EnumCellValue::Number(n) if !n.is_nan() => Some(*n),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), l_values)
        }
        EnumColumnKind::Boolean => {
            let l_values: Vec<Option<bool>> = values
                .iter()
                .map(|value| match value {
                    EnumCellValue::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), l_values)
        }
        EnumColumnKind::DateTime => {
            let l_values: Vec<Option<i64>> = values
                .iter()
                .map(|value| match value {
                    EnumCellValue::DateTime(ms) => Some(*ms),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), l_values)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .map_err(|err| format!("Failed to build datetime column {name:?}: {err}"))?
        }
        EnumColumnKind::Text => {
            let l_values: Vec<Option<String>> = values
                .iter()
                .map(|value| {
                    if value.is_missing() {
                        None
                    } else {
                        Some(format_cell_text(value))
                    }
                })
                .collect();
            Series::new(name.into(), l_values)
        }
    };

    Ok(Column::from(series))
}

#[cfg(test)]
mod tests {
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use pretty_assertions::assert_eq;
    use polars::prelude::AnyValue;

    use super::*;

    fn build_range(rows: Vec<Vec<Data>>) -> Range<Data> {
        let n_height = rows.len() as u32;
        let n_width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (n_height - 1, n_width - 1));
        for (n_row, row) in rows.into_iter().enumerate() {
            for (n_col, cell) in row.into_iter().enumerate() {
                range.set_value((n_row as u32, n_col as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_header_row_becomes_unique_column_names() {
        let range = build_range(vec![
            vec![
                Data::String("Marge".into()),
                Data::Empty,
                Data::String("Marge".into()),
            ],
            vec![Data::Float(0.1), Data::Float(1.0), Data::Float(0.2)],
        ]);

        let df = derive_dataframe_from_range(&range).unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec!["Marge", "Unnamed: 1", "Marge.1"]
        );
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_column_kinds_follow_cell_types() {
        let range = build_range(vec![
            vec![
                Data::String("Annee".into()),
                Data::String("Marge".into()),
                Data::String("Libelle".into()),
                Data::String("Vide".into()),
                Data::String("Actif".into()),
            ],
            vec![
                Data::Float(2023.0),
                Data::Float(0.05),
                Data::String("A".into()),
                Data::Empty,
                Data::Bool(true),
            ],
            vec![
                Data::Float(2024.0),
                Data::Empty,
                Data::Float(3.0),
                Data::Empty,
                Data::Bool(false),
            ],
        ]);

        let df = derive_dataframe_from_range(&range).unwrap();
        let l_dtypes: Vec<DataType> = df.dtypes();
        assert_eq!(
            l_dtypes,
            vec![
                DataType::Int64,
                DataType::Float64,
                DataType::String,
                DataType::Float64,
                DataType::Boolean,
            ]
        );

        let col_libelle = df.column("Libelle").unwrap();
        assert_eq!(col_libelle.get(1).unwrap(), AnyValue::String("3"));
        assert_eq!(df.column("Marge").unwrap().null_count(), 1);
        assert_eq!(df.column("Vide").unwrap().null_count(), 2);
    }

    #[test]
    fn test_integer_column_with_missing_cells_becomes_float() {
        let range = build_range(vec![
            vec![Data::String("Annee".into())],
            vec![Data::Float(2023.0)],
            vec![Data::Empty],
            vec![Data::Int(2025)],
        ]);

        let df = derive_dataframe_from_range(&range).unwrap();
        assert_eq!(df.dtypes(), vec![DataType::Float64]);
        assert_eq!(df.column("Annee").unwrap().null_count(), 1);
    }

    #[test]
    fn test_na_errors_are_missing_and_other_errors_are_text() {
        assert_eq!(
            derive_cell_value_from_data(&Data::Error(CellErrorType::NA)),
            EnumCellValue::None
        );
        assert_eq!(
            derive_cell_value_from_data(&Data::Error(CellErrorType::Div0)),
            EnumCellValue::String("#DIV/0!".to_string())
        );
    }

    #[test]
    fn test_missing_markers_in_body_text_become_nulls() {
        let range = build_range(vec![
            vec![Data::String("NA".into()), Data::String("Libelle".into())],
            vec![Data::String("NA".into()), Data::String("n/a".into())],
            vec![Data::Float(3.0), Data::String("x".into())],
            vec![Data::Float(4.5), Data::String(" NA".into())],
        ]);

        let df = derive_dataframe_from_range(&range).unwrap();
        assert_eq!(df.get_column_names_str(), vec!["NA", "Libelle"]);
        assert_eq!(df.dtypes(), vec![DataType::Float64, DataType::String]);
        assert_eq!(df.column("NA").unwrap().null_count(), 1);

        let col_libelle = df.column("Libelle").unwrap();
        assert_eq!(col_libelle.null_count(), 1);
        assert_eq!(col_libelle.get(2).unwrap(), AnyValue::String(" NA"));
    }

    #[test]
    fn test_durations_stay_numeric() {
        let cell = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(derive_cell_value_from_data(&cell), EnumCellValue::Number(1.5));
    }

    #[test]
    fn test_dates_follow_workbook_date_system() {
        let cell_1900 = Data::DateTime(ExcelDateTime::new(45_292.0, ExcelDateTimeType::DateTime, false));
        let cell_1904 = Data::DateTime(ExcelDateTime::new(
            45_292.0 - 1_462.0,
            ExcelDateTimeType::DateTime,
            true,
        ));
        // 2024-01-01T00:00:00Z in both systems.
        assert_eq!(
            derive_cell_value_from_data(&cell_1900),
            EnumCellValue::DateTime(1_704_067_200_000)
        );
        assert_eq!(
            derive_cell_value_from_data(&cell_1904),
            EnumCellValue::DateTime(1_704_067_200_000)
        );
    }

    #[test]
    fn test_open_rejects_non_workbook_bytes() {
        let err = XlsxWorkbookReader::open(b"definitely not a zip".to_vec())
            .err()
            .unwrap();
        assert!(matches!(err, XlsxReadError::Open(_)));
    }
}
