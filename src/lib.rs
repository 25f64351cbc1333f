//! # IDS Inspector
//!
//! Validates IFC building models against IDS (Information Delivery
//! Specification) requirement documents.
//!
//! ## Features
//!
//! - Parse IFC STEP files into flat entity records with property sets,
//!   materials, classifications and containment
//! - Read IDS XML or a tabular workbook, write IDS XML back out
//! - Check entities against applicability and requirement facets
//! - Run many models against many IDS documents on a worker pool
//! - Browse results in the terminal or export them to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use ids_inspector::ids::parse_ids_file;
//! use ids_inspector::parser::parse_ifc_file;
//! use ids_inspector::validation::validate_batch;
//!
//! let model = parse_ifc_file("model.ifc").expect("Failed to parse");
//! let ids = parse_ids_file("rules.ids").expect("Failed to read IDS");
//! for spec in &ids.specifications {
//!     if let Some(result) = validate_batch(&model.entities, spec) {
//!         println!("{}: {} passed, {} failed", spec.name, result.pass_count, result.fail_count);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod ids;
pub mod model;
pub mod parser;
pub mod ui;
pub mod validation;
