//! CLI domain: parse, output, and presentation only.
//! Orchestration lives in the binary and in [`crate::sync`].

mod output;
mod parse;
mod presentation;

pub use output::{exit_code, map_error};
pub use parse::{Cli, ReportFormat};
pub use presentation::{format_report, format_validation_errors};
