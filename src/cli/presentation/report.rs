//! Run report formatters.

use crate::cli::ReportFormat;
use crate::config::ValidationError;
use crate::error::SyncError;
use crate::report::{CommitOutcome, SyncReport};
use comfy_table::Table;

pub fn format_report(report: &SyncReport, format: ReportFormat) -> Result<String, SyncError> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report).map_err(|source| {
            SyncError::Encode {
                path: "<report>".into(),
                source,
            }
        }),
        ReportFormat::Text => Ok(format_report_text(report)),
    }
}

fn format_report_text(report: &SyncReport) -> String {
    let elapsed = report.finished_at - report.started_at;
    let mut s = format!(
        "Sync finished in {:.1}s\n  Repo: {}{}\n  Collections: {}\n  Items: {}\n  Cards: {} ({} with SQL)\n  Leaves mirrored: {}\n  Files written: {}",
        elapsed.num_milliseconds() as f64 / 1000.0,
        report.repo_path,
        if report.fresh_repo { " (new)" } else { "" },
        report.collections,
        report.items,
        report.artifacts,
        report.resolved_bodies,
        report.indexed_leaves,
        report.files_written,
    );

    if let Some(fingerprint) = &report.fingerprint {
        s.push_str(&format!("\n  Tree fingerprint: {}", &fingerprint[..fingerprint.len().min(16)]));
    }

    match &report.commit {
        CommitOutcome::Committed { revision, message } => {
            s.push_str(&format!("\n  Committed: {} ({})", revision, message));
        }
        CommitOutcome::Unchanged { revision: Some(revision) } => {
            s.push_str(&format!("\n  No changes; HEAD is {}", revision));
        }
        CommitOutcome::Unchanged { revision: None } => {
            s.push_str("\n  No commit");
        }
    }

    if let Some(archive) = &report.archive {
        s.push_str(&format!("\n  Archive: {}", archive));
    }

    let degradations = report.degradations.entries();
    if degradations.is_empty() {
        s.push_str("\n\nNo degradations.");
    } else {
        s.push_str(&format!("\n\nDegradations ({}):\n", degradations.len()));
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Kind", "Subject", "Detail"]);
        for d in degradations {
            table.add_row(vec![d.kind.as_str(), d.subject.as_str(), d.detail.as_str()]);
        }
        s.push_str(&table.to_string());
    }
    s
}

pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    let mut s = format!("Configuration is incomplete ({} problems):", errors.len());
    for e in errors {
        s.push_str(&format!("\n  - {}", e));
    }
    s
}
