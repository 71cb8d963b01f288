//! Export orchestration: parse, render, analyze and archive requested sheets.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};

use chrono::Local;
use extrakit_io_xlsx::{XlsxWorkbookReader, render_sheet};
use log::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::analyze::analyze_sheet;
use crate::report::{ReportExport, ReportExportBuilder};
use crate::spec::{ExportError, SpecExportOptions, SpecSheetResult};

/// Report and archive bytes of one export run.
#[derive(Debug, Clone)]
pub struct SpecExportOutput {
    /// Per-sheet results, totals and log text.
    pub report: ReportExport,
    /// Zip archive: one entry per exported sheet plus the run log.
    pub archive: Vec<u8>,
}

struct SpecExportContext<'a> {
    spec_export_options: &'a SpecExportOptions,
    zip_writer: ZipWriter<Cursor<Vec<u8>>>,
    zip_file_options: SimpleFileOptions,
    set_entry_names: BTreeSet<String>,
    builder_export_report: ReportExportBuilder,
}

/// Open `bytes` as a workbook and export `sheet_names` from it.
///
/// A workbook that cannot be opened aborts the run with [`ExportError::Read`].
pub fn export_workbook_bytes<S: AsRef<str>>(
    bytes: impl Into<Vec<u8>>,
    sheet_names: &[S],
    spec_export_options: &SpecExportOptions,
) -> Result<SpecExportOutput, ExportError> {
    validate_export_options(spec_export_options)?;
    let mut reader = XlsxWorkbookReader::open(bytes)?;
    run_export(&mut reader, sheet_names, spec_export_options)
}

/// Export `sheet_names` from an opened workbook, in requested order.
///
/// Every requested name yields one [`SpecSheetResult`]: missing and failing
/// sheets are recorded in the report and do not stop the run. Returns
/// [`ExportError`] only for invalid options or an archive I/O failure.
pub fn run_export<S: AsRef<str>>(
    reader: &mut XlsxWorkbookReader,
    sheet_names: &[S],
    spec_export_options: &SpecExportOptions,
) -> Result<SpecExportOutput, ExportError> {
    validate_export_options(spec_export_options)?;

    let timestamp = spec_export_options
        .timestamp
        .unwrap_or_else(|| Local::now().naive_local());
    let mut ctx = SpecExportContext {
        spec_export_options,
        zip_writer: ZipWriter::new(Cursor::new(Vec::new())),
        zip_file_options: SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated),
        set_entry_names: BTreeSet::from([spec_export_options.log_file_name.clone()]),
        builder_export_report: ReportExportBuilder::new(timestamp),
    };

    for c_name in sheet_names.iter().map(AsRef::as_ref) {
        export_one_sheet(&mut ctx, reader, c_name)?;
    }

    let SpecExportContext {
        mut zip_writer,
        zip_file_options,
        builder_export_report,
        ..
    } = ctx;
    let report = builder_export_report.build();
    zip_writer.start_file(spec_export_options.log_file_name.as_str(), zip_file_options)?;
    zip_writer.write_all(report.log_text.as_bytes())?;
    let archive = zip_writer.finish()?.into_inner();

    info!("{report} archive_bytes={}", archive.len());
    Ok(SpecExportOutput { report, archive })
}

fn export_one_sheet(
    ctx: &mut SpecExportContext<'_>,
    reader: &mut XlsxWorkbookReader,
    c_name: &str,
) -> Result<(), ExportError> {
    let spec_export_options = ctx.spec_export_options;

    if !reader.contains_sheet(c_name) {
        warn!("sheet {c_name:?} not found in workbook");
        ctx.builder_export_report
            .add_result(SpecSheetResult::not_found(c_name));
        return Ok(());
    }

    let c_entry_name = spec_export_options.derive_entry_name(c_name);
    if ctx.set_entry_names.contains(&c_entry_name) {
        warn!("sheet {c_name:?} skipped: archive entry {c_entry_name:?} already written");
        ctx.builder_export_report.add_result(SpecSheetResult::failed(
            c_name,
            format!("Duplicate archive entry {c_entry_name:?}"),
        ));
        return Ok(());
    }

    let df = match reader.parse_sheet(c_name) {
        Ok(df) => df,
        Err(err) => {
            record_failure(ctx, c_name, err.to_string());
            return Ok(());
        }
    };
    // The preview follows the last parsed table, even if rendering fails below.
    ctx.builder_export_report
        .set_preview(df.head(Some(spec_export_options.preview_rows)));

    let v_bytes = match render_sheet(
        &df,
        &spec_export_options.tab_name,
        &spec_export_options.render,
    ) {
        Ok(v_bytes) => v_bytes,
        Err(err) => {
            record_failure(ctx, c_name, err.to_string());
            return Ok(());
        }
    };

    let analysis = analyze_sheet(&df, c_name, &spec_export_options.analyze);

    ctx.zip_writer
        .start_file(c_entry_name.as_str(), ctx.zip_file_options)?;
    ctx.zip_writer.write_all(&v_bytes)?;
    debug!("archived {c_entry_name:?} ({} bytes)", v_bytes.len());
    ctx.set_entry_names.insert(c_entry_name);

    ctx.builder_export_report
        .add_result(SpecSheetResult::success(c_name, v_bytes, analysis));
    Ok(())
}

fn record_failure(ctx: &mut SpecExportContext<'_>, c_name: &str, reason: String) {
    warn!("sheet {c_name:?} failed: {reason}");
    ctx.builder_export_report
        .add_result(SpecSheetResult::failed(c_name, reason));
}

/// Reject options that cannot produce a consistent archive.
pub fn validate_export_options(spec_export_options: &SpecExportOptions) -> Result<(), ExportError> {
    let year_bounds = spec_export_options.analyze.year_bounds;
    if year_bounds.lower > year_bounds.upper {
        return Err(ExportError::InvalidOptions(format!(
            "year bounds must satisfy lower <= upper, got {year_bounds}."
        )));
    }
    if !spec_export_options.analyze.margin_min.is_finite() {
        return Err(ExportError::InvalidOptions(
            "margin threshold must be a finite number.".to_string(),
        ));
    }
    if spec_export_options.tab_name.trim().is_empty() {
        return Err(ExportError::InvalidOptions(
            "tab name must not be empty.".to_string(),
        ));
    }
    if spec_export_options.file_extension.trim().is_empty() {
        return Err(ExportError::InvalidOptions(
            "file extension must not be empty.".to_string(),
        ));
    }
    if spec_export_options.log_file_name.trim().is_empty() {
        return Err(ExportError::InvalidOptions(
            "log file name must not be empty.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;
    use zip::ZipArchive;

    use super::*;
    use crate::spec::{EnumSheetStatus, SpecYearBounds};

    fn build_workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet().set_name("Export_Qlik").unwrap();
        worksheet.write_string(0, 0, "Annee").unwrap();
        worksheet.write_string(0, 1, "Marge").unwrap();
        worksheet.write_number(1, 0, 2023).unwrap();
        worksheet.write_number(1, 1, 0.25).unwrap();
        worksheet.write_number(2, 0, 2024).unwrap();
        worksheet.write_number(2, 1, 0.30).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn derive_options() -> SpecExportOptions {
        SpecExportOptions {
            timestamp: NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5),
            ..SpecExportOptions::default()
        }
    }

    fn derive_entry_names(archive: &[u8]) -> Vec<String> {
        let zip_archive = ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
        let mut l_names: Vec<String> = zip_archive.file_names().map(ToString::to_string).collect();
        l_names.sort();
        l_names
    }

    #[test]
    fn duplicate_request_keeps_first_entry_only() {
        let output = export_workbook_bytes(
            build_workbook_bytes(),
            &["Export_Qlik", "Export_Qlik"],
            &derive_options(),
        )
        .unwrap();

        let l_status: Vec<&str> = output
            .report
            .sheet_results
            .iter()
            .map(|result| result.status.label())
            .collect();
        assert_eq!(l_status, vec!["success", "failed"]);
        assert_eq!(output.report.total_usable_rows, 2);
        assert_eq!(
            derive_entry_names(&output.archive),
            vec!["Export_Qlik.xlsx", "log_export.txt"]
        );
    }

    #[test]
    fn entry_colliding_with_log_name_fails() {
        let mut options = derive_options();
        options.log_file_name = "Export_Qlik.xlsx".to_string();

        let output = export_workbook_bytes(build_workbook_bytes(), &["Export_Qlik"], &options)
            .unwrap();
        assert!(matches!(
            output.report.sheet_results[0].status,
            EnumSheetStatus::Failed(_)
        ));
        assert_eq!(derive_entry_names(&output.archive), vec!["Export_Qlik.xlsx"]);
    }

    #[test]
    fn preview_is_capped_and_log_entry_matches_report() {
        let mut options = derive_options();
        options.preview_rows = 1;

        let output =
            export_workbook_bytes(build_workbook_bytes(), &["Export_Qlik"], &options).unwrap();
        let df_preview = output.report.df_preview.as_ref().unwrap();
        assert_eq!(df_preview.shape(), (1, 2));

        let mut zip_archive = ZipArchive::new(Cursor::new(output.archive.clone())).unwrap();
        let mut c_log = String::new();
        zip_archive
            .by_name("log_export.txt")
            .unwrap()
            .read_to_string(&mut c_log)
            .unwrap();
        assert_eq!(c_log, output.report.log_text);
        assert!(c_log.starts_with("Export performed on 02/01/2025 03:04:05\n\n"));
    }

    #[test]
    fn custom_extension_names_entries() {
        let mut options = derive_options();
        options.file_extension = "xlsm".to_string();

        let output =
            export_workbook_bytes(build_workbook_bytes(), &["Export_Qlik"], &options).unwrap();
        assert_eq!(
            derive_entry_names(&output.archive),
            vec!["Export_Qlik.xlsm", "log_export.txt"]
        );
    }

    #[test]
    fn invalid_options_abort_before_reading() {
        let mut options = derive_options();
        options.analyze.year_bounds = SpecYearBounds {
            lower: 2030,
            upper: 2020,
        };
        let err = export_workbook_bytes(build_workbook_bytes(), &["Export_Qlik"], &options)
            .err()
            .unwrap();
        assert!(matches!(err, ExportError::InvalidOptions(_)));

        let mut options = derive_options();
        options.file_extension = " ".to_string();
        assert!(validate_export_options(&options).is_err());

        assert!(validate_export_options(&derive_options()).is_ok());
    }
}
