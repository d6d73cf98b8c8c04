//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ErrorKind, SyncError};

/// Map a fatal error to the message printed on stderr.
pub fn map_error(e: &SyncError) -> String {
    format!("error [{}]: {}", e.kind(), e)
}

/// Process exit status for a fatal error.
pub fn exit_code(e: &SyncError) -> i32 {
    match e.kind() {
        ErrorKind::Config => 2,
        ErrorKind::Auth => 3,
        _ => 1,
    }
}
