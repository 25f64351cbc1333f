//! Tabular export: one CSV "sheet" per (IFC file, IDS file) pair plus a summary.
//!
//! Sheet naming and row layout are shared with the `.xlsx` exporter.

use crate::error::ExportError;
use crate::model::{EntityResult, IfcResult, ValidationReport};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Spreadsheet formats cap sheet names at 31 characters.
pub const MAX_SHEET_NAME: usize = 31;

pub const RESULT_COLUMNS: [&str; 8] = [
    "Specification",
    "Entity Type",
    "Entity Name",
    "GUID",
    "Status",
    "Validation Type",
    "Validation Message",
    "Details",
];

pub const SUMMARY_COLUMNS: [&str; 6] = ["IFC File", "IDS File", "Total", "Passed", "Failed", "Pass Rate"];

pub const SUMMARY_SHEET: &str = "Summary";

/// One result sheet: its unique name and the pair it holds.
pub(super) struct Sheet<'a> {
    pub name: String,
    pub ids_name: &'a str,
    pub ifc: &'a IfcResult,
}

/// Result sheets in report order, IDS-major.
pub(super) fn sheets(report: &ValidationReport) -> Vec<Sheet<'_>> {
    let mut taken = HashSet::new();
    report
        .ids_results
        .iter()
        .flat_map(|ids| ids.ifc_results.iter().map(move |ifc| (ids, ifc)))
        .map(|(ids, ifc)| Sheet {
            name: sheet_name(&ifc.file_name, &ids.ids_name, &mut taken),
            ids_name: &ids.ids_name,
            ifc,
        })
        .collect()
}

fn row<'a>(specification: &'a str, entity: &'a EntityResult, tail: [&'a str; 4]) -> [&'a str; 8] {
    let [status, kind, message, details] = tail;
    [
        specification,
        entity.entity_type.as_str(),
        entity.name.as_str(),
        entity.guid.as_str(),
        status,
        kind,
        message,
        details,
    ]
}

/// One row per validation; an entity without validations still gets a row.
pub(super) fn result_rows(ifc: &IfcResult) -> Vec<[&str; 8]> {
    let mut rows = Vec::new();
    for spec in &ifc.specification_results {
        for entity in &spec.entity_results {
            if entity.validations.is_empty() {
                rows.push(row(&spec.specification, entity, [entity.status.as_str(), "", "", ""]));
            }
            for validation in &entity.validations {
                rows.push(row(
                    &spec.specification,
                    entity,
                    [
                        validation.status.as_str(),
                        validation.facet_type.element_name(),
                        &validation.message,
                        &validation.details,
                    ],
                ));
            }
        }
    }
    rows
}

fn base_name(file_name: &str) -> &str {
    let name = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    if name.is_empty() {
        file_name
    } else {
        name
    }
}

fn truncate(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

/// Builds `<ifcBase>_<idsBase>`, stripped of characters spreadsheets reject,
/// cut to [`MAX_SHEET_NAME`] and made unique against `taken`.
#[must_use]
pub fn sheet_name(ifc_file: &str, ids_file: &str, taken: &mut HashSet<String>) -> String {
    let raw = format!("{}_{}", base_name(ifc_file), base_name(ids_file));
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' | '\'' => '_',
            c => c,
        })
        .collect();

    let mut name = truncate(&cleaned, MAX_SHEET_NAME);
    let mut counter = 2;
    while taken.contains(&name.to_lowercase()) || name.eq_ignore_ascii_case(SUMMARY_SHEET) {
        let suffix = format!("~{counter}");
        name = format!(
            "{}{suffix}",
            truncate(&cleaned, MAX_SHEET_NAME - suffix.chars().count())
        );
        counter += 1;
    }
    taken.insert(name.to_lowercase());
    name
}

fn create(path: &Path) -> Result<csv::Writer<File>, ExportError> {
    let file = File::create(path).map_err(|source| ExportError::FileCreate {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::Writer::from_writer(file))
}

fn finish(mut writer: csv::Writer<File>) -> Result<(), ExportError> {
    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })
}

fn write_results(path: &Path, ifc: &IfcResult) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    writer.write_record(RESULT_COLUMNS)?;
    for row in result_rows(ifc) {
        writer.write_record(row)?;
    }
    finish(writer)
}

/// Writes the report into `dir` as `<sheet>.csv` files plus `Summary.csv`.
///
/// Returns the written paths, summary last.
pub fn export_csv<P: AsRef<Path>>(report: &ValidationReport, dir: P) -> Result<Vec<PathBuf>, ExportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|source| ExportError::FileCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    let sheets = sheets(report);
    let mut written = Vec::with_capacity(sheets.len() + 1);
    for sheet in &sheets {
        let path = dir.join(format!("{}.csv", sheet.name));
        write_results(&path, sheet.ifc)?;
        written.push(path);
    }

    let summary_path = dir.join(format!("{SUMMARY_SHEET}.csv"));
    let mut writer = create(&summary_path)?;
    writer.write_record(SUMMARY_COLUMNS)?;
    for sheet in &sheets {
        let summary = sheet.ifc.summary();
        writer.write_record([
            sheet.ifc.file_name.clone(),
            sheet.ids_name.to_string(),
            summary.total.to_string(),
            summary.passed.to_string(),
            summary.failed.to_string(),
            format!("{:.1}%", summary.pass_rate()),
        ])?;
    }
    finish(writer)?;
    written.push(summary_path);

    tracing::info!(dir = %dir.display(), files = written.len(), "CSV export written");
    Ok(written)
}
