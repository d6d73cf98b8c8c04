//! Filesystem materializer
//!
//! Writes the assembled [`Tree`] as a directory mirror. Containers become
//! directories with a metadata file; leaves become a metadata file plus, when
//! their card has a resolved body, a `.sql` file. Each write that fails is
//! recorded and skipped; siblings are still written.

use crate::error::SyncError;
use crate::model::NodeId;
use crate::report::DegradationLog;
use crate::resolver::ArtifactMap;
use crate::tree::node::NodeRole;
use crate::tree::path::{
    container_metadata_file, directory_name, leaf_body_file, leaf_metadata_file,
};
use crate::tree::{NodeIndex, Tree};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Key under which a leaf's card record is attached in its metadata.
pub const CARD_KEY: &str = "_card";

/// Artifact id to the directory holding its files. Write-once per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    entries: BTreeMap<NodeId, PathBuf>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` under `dir`. A second insertion for the same id is refused
    /// and returns the directory already recorded.
    pub fn insert(&mut self, id: NodeId, dir: PathBuf) -> Result<(), PathBuf> {
        match self.entries.get(&id) {
            Some(existing) => Err(existing.clone()),
            None => {
                self.entries.insert(id, dir);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Path> {
        self.entries.get(id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one materialization pass
#[derive(Debug, Clone, Default)]
pub struct MaterializeOutcome {
    pub path_index: PathIndex,
    pub directories_created: usize,
    pub files_written: usize,
}

/// Writes a tree under a fixed root directory.
pub struct Materializer {
    root: PathBuf,
}

impl Materializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Write every node of `tree`. The walk is depth-first in remote order,
    /// driven by an explicit stack.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn write_tree(
        &self,
        tree: &Tree,
        artifacts: &ArtifactMap,
        log: &mut DegradationLog,
    ) -> MaterializeOutcome {
        let start = Instant::now();
        let mut outcome = MaterializeOutcome::default();

        if let Err(e) = fs::create_dir_all(&self.root) {
            log.record(
                self.root.display().to_string(),
                &SyncError::filesystem(&self.root, e),
            );
            return outcome;
        }

        let projections = tree.projections();
        let mut stack: Vec<(NodeIndex, PathBuf)> = tree
            .roots()
            .iter()
            .rev()
            .map(|&index| (index, self.root.clone()))
            .collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(tree_node) = tree.get(index) else {
                continue;
            };
            match tree_node.role() {
                NodeRole::Container => {
                    let node = &tree_node.node;
                    let dir = parent.join(directory_name(&node.id, node.slug.as_deref()));
                    if let Err(e) = fs::create_dir_all(&dir) {
                        // Nothing below can be written either.
                        log.record(
                            format!("collection {}", node.id),
                            &SyncError::filesystem(&dir, e),
                        );
                        continue;
                    }
                    outcome.directories_created += 1;

                    let metadata_path = dir.join(container_metadata_file(&node.id));
                    self.write_json(&metadata_path, &projections[index], &mut outcome, log);

                    for &child in tree.children(index).iter().rev() {
                        stack.push((child, dir.clone()));
                    }
                }
                NodeRole::Leaf(kind) => {
                    self.write_leaf(
                        kind,
                        index,
                        tree,
                        &projections,
                        &parent,
                        artifacts,
                        &mut outcome,
                        log,
                    );
                }
            }
        }

        info!(
            directories = outcome.directories_created,
            files = outcome.files_written,
            indexed = outcome.path_index.len(),
            duration_ms = start.elapsed().as_millis(),
            "Materialization completed"
        );
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn write_leaf(
        &self,
        kind: &str,
        index: NodeIndex,
        tree: &Tree,
        projections: &[Value],
        dir: &Path,
        artifacts: &ArtifactMap,
        outcome: &mut MaterializeOutcome,
        log: &mut DegradationLog,
    ) {
        let Some(tree_node) = tree.get(index) else {
            return;
        };
        let id = &tree_node.node.id;
        let subject = format!("{} {}", kind, id);

        let Some(artifact) = artifacts.get(id) else {
            log.record(
                subject,
                &SyncError::MissingArtifact {
                    kind: kind.to_string(),
                    id: id.clone(),
                },
            );
            return;
        };

        let mut metadata = projections[index].clone();
        if let Value::Object(map) = &mut metadata {
            map.insert(CARD_KEY.to_string(), artifact.record_value());
        }
        self.write_json(&dir.join(leaf_metadata_file(kind, id)), &metadata, outcome, log);

        if let Err(existing) = outcome.path_index.insert(id.clone(), dir.to_path_buf()) {
            log.record(
                subject.clone(),
                &SyncError::DuplicatePath {
                    id: id.clone(),
                    existing,
                },
            );
        }

        match &artifact.body {
            Some(body) => {
                let body_path = dir.join(leaf_body_file(kind, id));
                self.write_file(&body_path, body.as_bytes(), outcome, log);
            }
            None => log.record(
                subject,
                &SyncError::SerializationGap {
                    id: id.clone(),
                    reason: "no resolved body; sql file skipped".to_string(),
                },
            ),
        }
    }

    fn write_json(
        &self,
        path: &Path,
        value: &Value,
        outcome: &mut MaterializeOutcome,
        log: &mut DegradationLog,
    ) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => self.write_file(path, text.as_bytes(), outcome, log),
            Err(source) => log.record(
                path.display().to_string(),
                &SyncError::Encode {
                    path: path.to_path_buf(),
                    source,
                },
            ),
        }
    }

    fn write_file(
        &self,
        path: &Path,
        bytes: &[u8],
        outcome: &mut MaterializeOutcome,
        log: &mut DegradationLog,
    ) {
        match fs::write(path, bytes) {
            Ok(()) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
                outcome.files_written += 1;
            }
            Err(e) => log.record(path.display().to_string(), &SyncError::filesystem(path, e)),
        }
    }
}
