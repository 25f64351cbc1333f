use crate::error::ExportError;
use crate::model::ValidationReport;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the full result tree as pretty-printed JSON, creating missing
/// parent directories.
pub fn export_json<P: AsRef<Path>>(report: &ValidationReport, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::FileCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, report)?;
    out.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    tracing::info!(path = %path_ref.display(), "JSON report written");
    Ok(())
}
