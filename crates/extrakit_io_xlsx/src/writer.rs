//! XLSX writer kernel that renders one DataFrame as a standalone workbook buffer.

use log::debug;
use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::spec::{EnumCellValue, SpecCellFormat, SpecRenderOptions, XlsxRenderError};
use crate::util::{
    convert_unix_ms_to_serial, derive_cell_value_from_any_value, estimate_width_len,
    sanitize_sheet_name, validate_sheet_limits, validate_unique_columns,
};

/// Formats planned for the body cells of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnFormatPlan {
    /// Whether the column carries the percentage display format.
    pub if_is_percent_col: bool,
    /// Format for regular body cells.
    pub fmt_cell: SpecCellFormat,
    /// Format for datetime body cells.
    pub fmt_cell_datetime: SpecCellFormat,
}

/// Render `df` as a single-sheet workbook and return the encoded bytes.
///
/// - Row 0 holds the column names; data rows follow in table order.
/// - Each column is sized to its widest text plus padding.
/// - Columns matched by [`SpecRenderOptions::is_percent_column`] display as `0.00%`.
pub fn render_sheet(
    df: &DataFrame,
    tab_name: &str,
    options: &SpecRenderOptions,
) -> Result<Vec<u8>, XlsxRenderError> {
    let l_colnames_df: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    validate_unique_columns(&l_colnames_df).map_err(XlsxRenderError::Table)?;

    let n_width_df = l_colnames_df.len();
    let n_height_df = df.height();
    validate_sheet_limits(n_height_df, n_width_df).map_err(XlsxRenderError::Limit)?;

    let l_plan_col_formats = plan_column_formats(&l_colnames_df, options);
    let l_fmt_data_by_col: Vec<Format> = l_plan_col_formats
        .iter()
        .map(|plan| derive_rust_xlsx_format(&plan.fmt_cell))
        .collect();
    let l_fmt_datetime_by_col: Vec<Format> = l_plan_col_formats
        .iter()
        .map(|plan| derive_rust_xlsx_format(&plan.fmt_cell_datetime))
        .collect();
    let fmt_header = derive_rust_xlsx_format(&options.formats.header);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sanitize_sheet_name(tab_name, "_"))
        .map_err(derive_xlsx_error)?;

    let mut l_width_by_col = vec![0usize; n_width_df];
    write_header(worksheet, &l_colnames_df, &fmt_header)?;
    for (n_idx_col, c_name) in l_colnames_df.iter().enumerate() {
        l_width_by_col[n_idx_col] = c_name.chars().count();
    }

    for (n_idx_col, col) in df.get_columns().iter().enumerate() {
        for n_idx_row in 0..n_height_df {
            let value = derive_cell_value_from_any_value(col.get(n_idx_row).map_err(|err| {
                XlsxRenderError::Write(format!("Failed to access cell value: {err}"))
            })?);

            l_width_by_col[n_idx_col] =
                usize::max(l_width_by_col[n_idx_col], estimate_width_len(&value));

            let format = if matches!(value, EnumCellValue::DateTime(_)) {
                &l_fmt_datetime_by_col[n_idx_col]
            } else {
                &l_fmt_data_by_col[n_idx_col]
            };
            write_cell_with_format(worksheet, n_idx_row + 1, n_idx_col, &value, format)?;
        }
    }

    for (n_idx_col, plan) in l_plan_col_formats.iter().enumerate() {
        let n_width_final = usize::min(
            options.width_cell_max,
            l_width_by_col[n_idx_col] + options.width_cell_padding,
        );
        worksheet
            .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
            .map_err(derive_xlsx_error)?;

        if plan.if_is_percent_col {
            worksheet
                .set_column_format(cast_col_num(n_idx_col)?, &l_fmt_data_by_col[n_idx_col])
                .map_err(derive_xlsx_error)?;
        }
    }

    let v_bytes = workbook.save_to_buffer().map_err(derive_xlsx_error)?;
    debug!(
        "rendered {n_height_df} rows x {n_width_df} columns into {} bytes",
        v_bytes.len()
    );
    Ok(v_bytes)
}

/// Build per-column body formats for the given column names.
pub fn plan_column_formats(
    colnames: &[String],
    options: &SpecRenderOptions,
) -> Vec<SpecColumnFormatPlan> {
    colnames
        .iter()
        .map(|c_name| {
            let if_is_percent_col = options.is_percent_column(c_name);
            let fmt_cell = if if_is_percent_col {
                options.formats.body.with_(options.formats.percent.clone())
            } else {
                options.formats.body.clone()
            };
            let fmt_cell_datetime = fmt_cell.merge(&options.formats.datetime);

            SpecColumnFormatPlan {
                if_is_percent_col,
                fmt_cell,
                fmt_cell_datetime,
            }
        })
        .collect()
}

fn write_header(
    worksheet: &mut Worksheet,
    colnames: &[String],
    fmt_header: &Format,
) -> Result<(), XlsxRenderError> {
    for (col_idx, cell_value) in colnames.iter().enumerate() {
        worksheet
            .write_string_with_format(0, cast_col_num(col_idx)?, cell_value, fmt_header)
            .map_err(derive_xlsx_error)?;
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxRenderError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        // Missing cells are left unwritten; the column format still applies.
        EnumCellValue::None => {}
        EnumCellValue::Number(val) if val.is_nan() => {}
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Integer(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val as f64, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::DateTime(ms) => {
            worksheet
                .write_number_with_format(n_row, n_col, convert_unix_ms_to_serial(*ms), format)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, XlsxRenderError> {
    u32::try_from(value).map_err(|_| XlsxRenderError::Limit(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, XlsxRenderError> {
    u16::try_from(value)
        .map_err(|_| XlsxRenderError::Limit(format!("column index overflow: {value}")))
}

fn derive_xlsx_error(err: XlsxError) -> XlsxRenderError {
    XlsxRenderError::Write(err.to_string())
}
