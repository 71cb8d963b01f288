//! Export report model and the builder that writes the run log.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;

use crate::conf::{C_ARCHIVE_NAME_PREFIX, C_ARCHIVE_TIMESTAMP_FORMAT, C_LOG_TIMESTAMP_FORMAT};
use crate::spec::{EnumSheetStatus, SpecSheetResult};

/// Outcome of one export run.
#[derive(Debug, Clone)]
pub struct ReportExport {
    /// Run timestamp, shared by the log header and the archive name.
    pub timestamp: NaiveDateTime,
    /// One result per requested sheet, in requested order.
    pub sheet_results: Vec<SpecSheetResult>,
    /// Sum of usable rows over successful sheets.
    pub total_usable_rows: u64,
    /// Full text of `log_export.txt`.
    pub log_text: String,
    /// First rows of the last parsed table.
    pub df_preview: Option<DataFrame>,
}

impl ReportExport {
    /// Number of exported sheets.
    pub fn cnt_success(&self) -> u64 {
        self.count_status("success")
    }

    /// Number of requested sheets absent from the workbook.
    pub fn cnt_not_found(&self) -> u64 {
        self.count_status("not_found")
    }

    /// Number of sheets that failed to parse, render or archive.
    pub fn cnt_failed(&self) -> u64 {
        self.count_status("failed")
    }

    fn count_status(&self, label: &str) -> u64 {
        self.sheet_results
            .iter()
            .filter(|result| result.status.label() == label)
            .count() as u64
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_requested".to_string(), self.sheet_results.len() as u64);
        dict_counts.insert("cnt_success".to_string(), self.cnt_success());
        dict_counts.insert("cnt_not_found".to_string(), self.cnt_not_found());
        dict_counts.insert("cnt_failed".to_string(), self.cnt_failed());
        dict_counts.insert("total_usable_rows".to_string(), self.total_usable_rows);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} requested={} success={} not_found={} failed={} usable_rows={}",
            dict_counts["cnt_requested"],
            dict_counts["cnt_success"],
            dict_counts["cnt_not_found"],
            dict_counts["cnt_failed"],
            dict_counts["total_usable_rows"]
        )
    }

    /// Suggested download name, `export_Qlik_YYYYMMDD_HHMMSS.zip`.
    pub fn archive_file_name(&self) -> String {
        format!(
            "{C_ARCHIVE_NAME_PREFIX}_{}.zip",
            self.timestamp.format(C_ARCHIVE_TIMESTAMP_FORMAT)
        )
    }
}

impl fmt::Display for ReportExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXPORT]"))
    }
}

/// Mutable accumulator for sheet results and log lines.
#[derive(Debug, Clone)]
pub struct ReportExportBuilder {
    timestamp: NaiveDateTime,
    sheet_results: Vec<SpecSheetResult>,
    total_usable_rows: u64,
    log_text: String,
    df_preview: Option<DataFrame>,
}

impl ReportExportBuilder {
    /// Start a report; the log opens with the run timestamp.
    pub fn new(timestamp: NaiveDateTime) -> Self {
        let log_text = format!(
            "Export performed on {}\n\n",
            timestamp.format(C_LOG_TIMESTAMP_FORMAT)
        );
        Self {
            timestamp,
            sheet_results: Vec::new(),
            total_usable_rows: 0,
            log_text,
            df_preview: None,
        }
    }

    /// Record one sheet result and append its log block.
    pub fn add_result(&mut self, result: SpecSheetResult) {
        if result.is_success() {
            self.total_usable_rows += result.usable_row_count;
        }
        push_result_block(&mut self.log_text, &result);
        self.sheet_results.push(result);
    }

    /// Replace the preview table.
    pub fn set_preview(&mut self, df_preview: DataFrame) {
        self.df_preview = Some(df_preview);
    }

    /// Finalize builder into immutable report, closing the log with the total.
    pub fn build(mut self) -> ReportExport {
        self.log_text.push_str(&format!(
            "✅ Total usable rows exported: {}\n",
            self.total_usable_rows
        ));
        ReportExport {
            timestamp: self.timestamp,
            sheet_results: self.sheet_results,
            total_usable_rows: self.total_usable_rows,
            log_text: self.log_text,
            df_preview: self.df_preview,
        }
    }
}

fn push_result_block(log_text: &mut String, result: &SpecSheetResult) {
    let c_name = &result.sheet_name;
    match &result.status {
        EnumSheetStatus::Success => {
            log_text.push_str(&format!(
                "{c_name} : {} usable rows exported.\n",
                result.usable_row_count
            ));
            for finding in &result.findings {
                log_text.push_str(&format!("  {finding}\n"));
            }
        }
        EnumSheetStatus::NotFound => {
            log_text.push_str(&format!("{c_name} : ❌ Sheet not found in workbook.\n"));
        }
        EnumSheetStatus::Failed(reason) => {
            log_text.push_str(&format!("{c_name} : ❌ Error processing sheet ({reason})\n"));
        }
    }
    log_text.push('\n');
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::{EnumFindingKind, SpecFinding, SpecSheetAnalysis};

    fn derive_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap()
    }

    #[test]
    fn log_text_lists_every_sheet_in_order() {
        let mut builder = ReportExportBuilder::new(derive_timestamp());
        builder.add_result(SpecSheetResult::success(
            "Export_Qlik",
            vec![1, 2, 3],
            SpecSheetAnalysis {
                findings: vec![
                    SpecFinding::info(EnumFindingKind::Completeness, "🔎 Completeness score: 100%"),
                    SpecFinding::warning(EnumFindingKind::LowMargins, "📉 Margins below 10%"),
                ],
                usable_row_count: 4,
                completeness_pct: Some(100),
            },
        ));
        builder.add_result(SpecSheetResult::not_found("Historique_Local"));
        builder.add_result(SpecSheetResult::failed("Historique_Global", "bad cell"));

        let report = builder.build();
        assert_eq!(
            report.log_text,
            "Export performed on 07/03/2025 09:05:01\n\
             \n\
             Export_Qlik : 4 usable rows exported.\n\
             \x20\x20🔎 Completeness score: 100%\n\
             \x20\x20📉 Margins below 10%\n\
             \n\
             Historique_Local : ❌ Sheet not found in workbook.\n\
             \n\
             Historique_Global : ❌ Error processing sheet (bad cell)\n\
             \n\
             ✅ Total usable rows exported: 4\n"
        );
        assert_eq!(report.total_usable_rows, 4);
    }

    #[test]
    fn empty_run_still_has_header_and_total() {
        let report = ReportExportBuilder::new(derive_timestamp()).build();
        assert_eq!(
            report.log_text,
            "Export performed on 07/03/2025 09:05:01\n\n✅ Total usable rows exported: 0\n"
        );
        assert!(report.df_preview.is_none());
    }

    #[test]
    fn report_counters_and_names() {
        let mut builder = ReportExportBuilder::new(derive_timestamp());
        builder.add_result(SpecSheetResult::success(
            "A",
            vec![],
            SpecSheetAnalysis {
                usable_row_count: 3,
                ..SpecSheetAnalysis::default()
            },
        ));
        builder.add_result(SpecSheetResult::not_found("B"));
        builder.add_result(SpecSheetResult::failed("C", "x"));
        builder.add_result(SpecSheetResult::failed("D", "y"));
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_requested"], 4);
        assert_eq!(dict_counts["cnt_success"], 1);
        assert_eq!(dict_counts["cnt_not_found"], 1);
        assert_eq!(dict_counts["cnt_failed"], 2);
        assert_eq!(dict_counts["total_usable_rows"], 3);
        assert_eq!(
            report.to_string(),
            "[EXPORT] requested=4 success=1 not_found=1 failed=2 usable_rows=3"
        );
        assert_eq!(report.archive_file_name(), "export_Qlik_20250307_090501.zip");
    }
}
