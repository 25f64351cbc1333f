//! Spreadsheet export: the pair sheets and the summary in one `.xlsx` workbook.

use super::csv::{result_rows, sheets, RESULT_COLUMNS, SUMMARY_COLUMNS, SUMMARY_SHEET};
use crate::error::ExportError;
use crate::model::ValidationReport;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;

fn write_header(worksheet: &mut Worksheet, columns: &[&str], bold: &Format) -> Result<(), XlsxError> {
    for (col, title) in (0u16..).zip(columns) {
        worksheet.write_string_with_format(0, col, *title, bold)?;
    }
    Ok(())
}

/// Writes one worksheet per (IFC, IDS) pair, named as in the CSV export,
/// followed by a `Summary` worksheet with numeric counts and the pass rate
/// as a percentage cell.
pub fn export_xlsx<P: AsRef<Path>>(report: &ValidationReport, path: P) -> Result<(), ExportError> {
    let path = path.as_ref();
    let bold = Format::new().set_bold();
    let percent = Format::new().set_num_format("0.0%");
    let sheets = sheets(report);
    let mut workbook = Workbook::new();

    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_header(worksheet, &RESULT_COLUMNS, &bold)?;
        for (row, cells) in (1u32..).zip(result_rows(sheet.ifc)) {
            for (col, cell) in (0u16..).zip(cells) {
                worksheet.write_string(row, col, cell)?;
            }
        }
    }

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_header(summary, &SUMMARY_COLUMNS, &bold)?;
    for (row, sheet) in (1u32..).zip(&sheets) {
        let counts = sheet.ifc.summary();
        summary.write_string(row, 0, &sheet.ifc.file_name)?;
        summary.write_string(row, 1, sheet.ids_name)?;
        summary.write_number(row, 2, counts.total as f64)?;
        summary.write_number(row, 3, counts.passed as f64)?;
        summary.write_number(row, 4, counts.failed as f64)?;
        summary.write_number_with_format(row, 5, counts.pass_rate() / 100.0, &percent)?;
    }

    workbook.save(path)?;
    tracing::info!(file = %path.display(), sheets = sheets.len() + 1, "XLSX export written");
    Ok(())
}
