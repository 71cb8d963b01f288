use std::collections::BTreeMap;

use extrakit_export::conf::{
    C_SHEET_FILE_EXTENSION, N_MARGIN_MIN_DEFAULT, N_YEAR_LOWER_DEFAULT, N_YEAR_UPPER_DEFAULT,
};
use extrakit_export::{
    EnumSheetStatus, ExportError, ReportExport, SpecExportOptions, SpecSheetResult,
    SpecYearBounds, TUP_SHEETS_CANDIDATE, derive_default_sheet_selection, export_workbook_bytes,
};
use extrakit_io_xlsx::XlsxWorkbookReader;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "extrakit.export.workbook.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "SheetResult")]
#[derive(Debug, Clone)]
struct PySheetResult {
    #[pyo3(get)]
    sheet_name: String,
    #[pyo3(get)]
    status: String,
    #[pyo3(get)]
    reason: Option<String>,
    #[pyo3(get)]
    usable_row_count: u64,
    #[pyo3(get)]
    findings: Vec<String>,
    cnt_warnings: usize,
}

impl From<SpecSheetResult> for PySheetResult {
    fn from(sheet_result: SpecSheetResult) -> Self {
        let reason = match &sheet_result.status {
            EnumSheetStatus::Failed(reason) => Some(reason.clone()),
            EnumSheetStatus::Success | EnumSheetStatus::NotFound => None,
        };
        Self {
            status: sheet_result.status.label().to_string(),
            reason,
            usable_row_count: sheet_result.usable_row_count,
            cnt_warnings: sheet_result
                .findings
                .iter()
                .filter(|finding| finding.is_warning())
                .count(),
            findings: sheet_result
                .findings
                .into_iter()
                .map(|finding| finding.message)
                .collect(),
            sheet_name: sheet_result.sheet_name,
        }
    }
}

#[pymethods]
impl PySheetResult {
    #[getter]
    fn warning_count(&self) -> usize {
        self.cnt_warnings
    }

    fn __repr__(&self) -> String {
        format!(
            "SheetResult(sheet_name={:?}, status={:?}, usable_row_count={})",
            self.sheet_name, self.status, self.usable_row_count
        )
    }
}

#[pyclass(name = "ReportExport")]
#[derive(Debug, Clone)]
struct PyReportExport {
    #[pyo3(get)]
    archive_file_name: String,
    #[pyo3(get)]
    log_text: String,
    #[pyo3(get)]
    total_usable_rows: u64,
    #[pyo3(get)]
    sheets: Vec<PySheetResult>,
    v_archive: Vec<u8>,
    dict_counts: BTreeMap<String, u64>,
    c_summary: String,
}

impl PyReportExport {
    fn new(report: ReportExport, v_archive: Vec<u8>) -> Self {
        Self {
            archive_file_name: report.archive_file_name(),
            dict_counts: report.to_dict(),
            c_summary: report.to_string(),
            log_text: report.log_text,
            total_usable_rows: report.total_usable_rows,
            sheets: report
                .sheet_results
                .into_iter()
                .map(PySheetResult::from)
                .collect(),
            v_archive,
        }
    }
}

#[pymethods]
impl PyReportExport {
    #[getter]
    fn archive<'py>(&self, py: Python<'py>) -> Bound<'py, PyBytes> {
        PyBytes::new(py, &self.v_archive)
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.dict_counts.clone()
    }

    fn __str__(&self) -> String {
        self.c_summary.clone()
    }
}

fn map_export_error(exception: ExportError) -> PyErr {
    match exception {
        ExportError::Read(err) => PyValueError::new_err(err.to_string()),
        ExportError::InvalidOptions(message) => PyValueError::new_err(message),
        ExportError::Archive(message) => {
            PyRuntimeError::new_err(format!("Failed to assemble archive: {message}"))
        }
    }
}

#[pyfunction(name = "list_sheets")]
fn list_sheets_py(py: Python<'_>, data: &[u8]) -> PyResult<Vec<String>> {
    py.allow_threads(|| {
        XlsxWorkbookReader::open(data).map(|reader| reader.list_sheets().to_vec())
    })
    .map_err(|err| PyValueError::new_err(err.to_string()))
}

#[pyfunction(name = "export_workbook")]
#[pyo3(signature = (
    data,
    sheet_names = None,
    year_bounds = (N_YEAR_LOWER_DEFAULT, N_YEAR_UPPER_DEFAULT),
    margin_min = N_MARGIN_MIN_DEFAULT,
    file_extension = C_SHEET_FILE_EXTENSION
))]
fn export_workbook_py(
    py: Python<'_>,
    data: &[u8],
    sheet_names: Option<Vec<String>>,
    year_bounds: (i64, i64),
    margin_min: f64,
    file_extension: &str,
) -> PyResult<PyReportExport> {
    let l_sheet_names = sheet_names.unwrap_or_else(derive_default_sheet_selection);
    let (n_year_lower, n_year_upper) = year_bounds;
    let mut spec_export_options = SpecExportOptions::with_year_bounds(
        SpecYearBounds::new(n_year_lower, n_year_upper).map_err(map_export_error)?,
    );
    spec_export_options.analyze.margin_min = margin_min;
    spec_export_options.file_extension = file_extension.to_string();

    let output = py
        .allow_threads(|| export_workbook_bytes(data, &l_sheet_names, &spec_export_options))
        .map_err(map_export_error)?;
    Ok(PyReportExport::new(output.report, output.archive))
}

#[pymodule]
fn _extrakit_export_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySheetResult>()?;
    module.add_class::<PyReportExport>()?;
    module.add_function(wrap_pyfunction!(list_sheets_py, module)?)?;
    module.add_function(wrap_pyfunction!(export_workbook_py, module)?)?;
    module.add("SHEETS_CANDIDATE", TUP_SHEETS_CANDIDATE.to_vec())?;
    module.add("SHEETS_DEFAULT", derive_default_sheet_selection())?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
