pub mod csv;
pub mod json;
pub mod xlsx;

pub use crate::error::ExportError;
pub use csv::{export_csv, sheet_name};
pub use json::export_json;
pub use xlsx::export_xlsx;
