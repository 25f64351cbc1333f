pub mod workbook;
pub mod writer;
pub mod xml;

pub use crate::error::ParseError;
pub use workbook::{parse_cell, parse_workbook, Workbook, WorkbookImport};
pub use writer::{write_ids, write_ids_file};
pub use xml::{parse_ids, parse_ids_file};
