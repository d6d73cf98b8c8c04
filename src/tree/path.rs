//! Naming of directories and files in the mirror
//!
//! Every name embeds the remote id, so two distinct nodes never map to the
//! same path. The layout is part of the on-disk contract:
//!
//! - container directory: `<id>-<slug>` or `<id>`
//! - container metadata: `collection-<id>-metadata.json`
//! - leaf metadata: `<kind>-<id>-metadata.json`
//! - leaf body: `<kind>-<id>.sql`

use crate::model::{NodeId, COLLECTION_KIND};

/// Extension of leaf body files.
pub const BODY_EXTENSION: &str = "sql";

/// Replace characters that would split or escape a path segment. A segment
/// that is exactly `.` or `..` gets a `_` prefix.
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}

/// Directory name of a container.
pub fn directory_name(id: &NodeId, slug: Option<&str>) -> String {
    match slug.filter(|s| !s.is_empty()) {
        Some(slug) => sanitize_segment(&format!("{}-{}", id, slug)),
        None => sanitize_segment(id.as_str()),
    }
}

pub fn container_metadata_file(id: &NodeId) -> String {
    sanitize_segment(&format!("{}-{}-metadata.json", COLLECTION_KIND, id))
}

pub fn leaf_metadata_file(kind: &str, id: &NodeId) -> String {
    sanitize_segment(&format!("{}-{}-metadata.json", kind, id))
}

pub fn leaf_body_file(kind: &str, id: &NodeId) -> String {
    sanitize_segment(&format!("{}-{}.{}", kind, id, BODY_EXTENSION))
}
