//! Collection hierarchy
//!
//! The remote hierarchy is a forest (no single root), held here as an arena of
//! nodes addressed by index. Children are always pushed after their parent, so
//! a child's index is strictly greater than its parent's.

pub mod builder;
pub mod hasher;
pub mod node;
pub mod path;
pub mod walker;

pub use node::{NodeIndex, TreeNode};

use crate::model::RemoteNode;
use serde_json::Value;

/// Key under which expanded children appear in a node's JSON projection.
pub const ITEMS_KEY: &str = "_items";

/// The assembled hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    roots: Vec<NodeIndex>,
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level node.
    pub fn push_root(&mut self, node: RemoteNode) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(TreeNode::new(node));
        self.roots.push(index);
        index
    }

    /// Append `node` as the last child of `parent`, marking the parent expanded.
    ///
    /// Panics if `parent` is not an index of this tree.
    pub fn push_child(&mut self, parent: NodeIndex, node: RemoteNode) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(TreeNode::new(node));
        self.nodes[parent]
            .children
            .get_or_insert_with(Vec::new)
            .push(index);
        index
    }

    /// Mark a node as expanded even if it ends up with no children.
    pub fn mark_expanded(&mut self, index: NodeIndex) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.children.get_or_insert_with(Vec::new);
        }
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn get(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Children of an expanded node; empty for leaves and unknown indices.
    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        self.nodes
            .get(index)
            .and_then(|n| n.children.as_deref())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes materialized as directories.
    pub fn container_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_container()).count()
    }

    /// Nodes materialized as files.
    pub fn leaf_count(&self) -> usize {
        self.nodes.len() - self.container_count()
    }

    /// JSON projection of every node: its record plus, when expanded, an
    /// `_items` array holding the projections of its children.
    ///
    /// Built bottom-up by walking indices in reverse, which is valid because
    /// children always come after their parent.
    pub fn projections(&self) -> Vec<Value> {
        let mut out: Vec<Value> = vec![Value::Null; self.nodes.len()];
        for index in (0..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            let mut record = node.node.record.clone();
            if let Some(children) = &node.children {
                let items = children.iter().map(|&c| out[c].clone()).collect();
                record.insert(ITEMS_KEY.to_string(), Value::Array(items));
            }
            out[index] = Value::Object(record);
        }
        out
    }
}
