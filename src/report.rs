//! Run report: every item the pipeline skipped or degraded, plus the outcome.

use crate::error::{ErrorKind, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One absorbed failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub kind: ErrorKind,
    /// What was affected, e.g. `card 42` or a path.
    pub subject: String,
    pub detail: String,
}

/// Collects degradations from one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DegradationLog {
    entries: Vec<Degradation>,
}

impl DegradationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an absorbed error and emit it as a warning.
    pub fn record(&mut self, subject: impl Into<String>, err: &SyncError) {
        let subject = subject.into();
        let kind = err.kind();
        warn!(kind = %kind, subject = %subject, "{}", err);
        self.entries.push(Degradation {
            kind,
            subject,
            detail: err.to_string(),
        });
    }

    pub fn entries(&self) -> &[Degradation] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Counts per kind, in a stable order.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.kind.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// How the snapshot step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed { revision: String, message: String },
    Unchanged { revision: Option<String> },
}

impl CommitOutcome {
    pub fn revision(&self) -> Option<&str> {
        match self {
            CommitOutcome::Committed { revision, .. } => Some(revision),
            CommitOutcome::Unchanged { revision } => revision.as_deref(),
        }
    }
}

/// Everything a finished run has to say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repo_path: String,
    pub fresh_repo: bool,
    pub collections: usize,
    pub items: usize,
    pub artifacts: usize,
    pub resolved_bodies: usize,
    pub files_written: usize,
    /// Leaves recorded in the path index, i.e. leaves actually mirrored.
    pub indexed_leaves: usize,
    pub fingerprint: Option<String>,
    pub commit: CommitOutcome,
    pub archive: Option<String>,
    pub degradations: DegradationLog,
}
