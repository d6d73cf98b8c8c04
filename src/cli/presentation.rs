//! CLI presentation: text and json formatters.

mod report;

pub use report::{format_report, format_validation_errors};
