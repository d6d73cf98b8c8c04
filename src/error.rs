//! Error types for the Metabase mirror pipeline.
//!
//! Every stage returns `Result<_, SyncError>`. Only authentication and
//! configuration failures stop a run; the pipeline turns every other error
//! into a [`crate::report::Degradation`] and keeps going.

use crate::model::NodeId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used for reporting and propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Transport,
    Integrity,
    SerializationGap,
    Cycle,
    Filesystem,
    VersionControl,
    Config,
}

impl ErrorKind {
    /// Fatal kinds abort the run; everything else degrades to absence.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Auth | ErrorKind::Config)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Transport => "transport",
            ErrorKind::Integrity => "integrity",
            ErrorKind::SerializationGap => "serialization_gap",
            ErrorKind::Cycle => "cycle",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::VersionControl => "version_control",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("No artifact record for {kind} {id}")]
    MissingArtifact { kind: String, id: NodeId },

    #[error("Artifact {id} already indexed at {}", existing.display())]
    DuplicatePath { id: NodeId, existing: PathBuf },

    #[error("Card {id} has no serialized query: {reason}")]
    SerializationGap { id: NodeId, reason: String },

    #[error("Collection {0} was already expanded; hierarchy contains a cycle")]
    Cycle(NodeId),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode metadata for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Version control error: {0}")]
    VersionControl(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Auth(_) => ErrorKind::Auth,
            SyncError::Transport { .. } => ErrorKind::Transport,
            SyncError::MissingArtifact { .. } | SyncError::DuplicatePath { .. } => {
                ErrorKind::Integrity
            }
            SyncError::SerializationGap { .. } => ErrorKind::SerializationGap,
            SyncError::Cycle(_) => ErrorKind::Cycle,
            SyncError::Filesystem { .. } | SyncError::Encode { .. } => ErrorKind::Filesystem,
            SyncError::Git(_) | SyncError::VersionControl(_) => ErrorKind::VersionControl,
            SyncError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}
