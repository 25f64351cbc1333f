//! Error types for IDS Inspector.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading IFC models or IDS specifications.
///
/// IFC text itself never produces an error: malformed records are skipped.
/// Only structural problems with IDS input abort a parse.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read an input file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The IDS document is not well-formed XML.
    #[error("malformed IDS XML: {message}")]
    MalformedXml { message: String },

    /// A required sheet is absent from a tabular IDS workbook.
    #[error("workbook is missing required sheet '{sheet}'")]
    MissingSheet { sheet: String },

    /// The workbook layout is not usable (e.g. JSON that is not a sheet map).
    #[error("invalid workbook: {message}")]
    InvalidWorkbook { message: String },

    /// Failed to read a CSV sheet.
    #[error("CSV read failed: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// Failed to open or read an `.xlsx`/`.ods` workbook.
    #[error("spreadsheet read failed: {source}")]
    Spreadsheet {
        #[from]
        source: calamine::Error,
    },

    /// Failed to read a JSON workbook.
    #[error("JSON read failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        ParseError::MalformedXml {
            message: err.to_string(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ParseError::MalformedXml {
            message: err.to_string(),
        }
    }
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to emit IDS XML.
    #[error("XML write failed: {message}")]
    XmlWrite { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },

    /// Failed to build or save an `.xlsx` workbook.
    #[error("XLSX write failed: {source}")]
    Xlsx {
        #[from]
        source: rust_xlsxwriter::XlsxError,
    },
}

/// Errors that can occur when loading a validator configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
