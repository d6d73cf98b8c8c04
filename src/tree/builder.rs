//! Tree builder: expands the remote collection hierarchy
//!
//! Expansion is a work-list over collection nodes with a visited set. The
//! remote contract says the hierarchy is a tree; the visited set makes a
//! violation show up as a reported cycle instead of an endless walk.

use crate::client::{MetabaseApi, SessionToken};
use crate::error::SyncError;
use crate::model::NodeId;
use crate::report::DegradationLog;
use crate::tree::{NodeIndex, Tree};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Builds a [`Tree`] from the remote API, one children fetch per collection.
pub struct TreeBuilder<'a> {
    api: &'a dyn MetabaseApi,
    token: &'a SessionToken,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(api: &'a dyn MetabaseApi, token: &'a SessionToken) -> Self {
        Self { api, token }
    }

    /// Fetch the top-level collections and expand every collection below them.
    ///
    /// Fetch failures are recorded and treated as "no children"; the rest of
    /// the hierarchy is still expanded.
    #[instrument(skip_all)]
    pub async fn build(&self, log: &mut DegradationLog) -> Tree {
        let start = Instant::now();
        let mut tree = Tree::new();
        let mut pending: VecDeque<NodeIndex> = VecDeque::new();

        match self.api.fetch_collection_tree(self.token).await {
            Ok(roots) => {
                debug!(roots = roots.len(), "Fetched collection tree");
                for root in roots {
                    pending.push_back(tree.push_root(root));
                }
            }
            Err(e) => log.record("collection tree", &e),
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut fetches = 0usize;

        while let Some(index) = pending.pop_front() {
            let id = match tree.get(index) {
                Some(node) => node.node.id.clone(),
                None => continue,
            };
            if !visited.insert(id.clone()) {
                log.record(format!("collection {}", id), &SyncError::Cycle(id));
                continue;
            }

            // Roots are expanded whatever their model says.
            tree.mark_expanded(index);
            fetches += 1;
            match self.api.fetch_collection_items(self.token, &id).await {
                Ok(items) => {
                    debug!(collection_id = %id, items = items.len(), "Expanded collection");
                    for item in items {
                        let expand = item.is_collection();
                        let child = tree.push_child(index, item);
                        if expand {
                            pending.push_back(child);
                        }
                    }
                }
                Err(e) => log.record(format!("collection {}", id), &e),
            }
        }

        info!(
            nodes = tree.len(),
            collections = tree.container_count(),
            fetches,
            duration_ms = start.elapsed().as_millis(),
            "Tree build completed"
        );
        tree
    }
}
