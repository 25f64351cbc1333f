//! Terminal browser for validation reports.

pub mod app;
pub mod dashboard;

pub use app::App;
