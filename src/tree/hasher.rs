//! Mirror fingerprint
//!
//! A BLAKE3 digest over the materialized tree: every directory and file path
//! (root-relative, sorted) plus file contents. Two runs against an unchanged
//! remote produce the same fingerprint.

use crate::error::SyncError;
use crate::tree::walker::{Entry, Walker};
use blake3::Hasher;
use std::path::Path;

/// 32-byte BLAKE3 digest
pub type Hash = [u8; 32];

/// Hash the mirror rooted at `root`, ignoring `.git`.
pub fn compute_tree_hash(root: &Path) -> Result<Hash, SyncError> {
    let entries = Walker::new(root.to_path_buf()).walk()?;
    let mut hasher = Hasher::new();

    for entry in &entries {
        let path_string = entry.path().to_string_lossy();
        let path_bytes = path_string.as_bytes();
        match entry {
            Entry::Directory { .. } => {
                hasher.update(b"directory");
                hasher.update(&(path_bytes.len() as u64).to_be_bytes());
                hasher.update(path_bytes);
            }
            Entry::File { .. } => {
                let full = root.join(entry.path());
                let content =
                    std::fs::read(&full).map_err(|e| SyncError::filesystem(&full, e))?;
                hasher.update(b"file");
                hasher.update(&(path_bytes.len() as u64).to_be_bytes());
                hasher.update(path_bytes);
                hasher.update(&(content.len() as u64).to_be_bytes());
                hasher.update(&content);
            }
        }
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Hex-encoded [`compute_tree_hash`].
pub fn fingerprint(root: &Path) -> Result<String, SyncError> {
    compute_tree_hash(root).map(hex::encode)
}
