//! Arena node types

use crate::model::RemoteNode;

/// Position of a node in [`super::Tree`].
pub type NodeIndex = usize;

/// A remote node plus its expansion state.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub node: RemoteNode,
    /// `None` until the node is expanded; leaves are never expanded.
    pub children: Option<Vec<NodeIndex>>,
}

/// How the materializer treats a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole<'a> {
    /// Becomes a directory with a metadata file.
    Container,
    /// Becomes metadata (and maybe SQL) files; carries the kind tag.
    Leaf(&'a str),
}

impl TreeNode {
    pub fn new(node: RemoteNode) -> Self {
        Self {
            node,
            children: None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// Collections, and anything already carrying a child list, are containers.
    pub fn role(&self) -> NodeRole<'_> {
        if self.node.is_collection() || self.is_expanded() {
            NodeRole::Container
        } else {
            NodeRole::Leaf(&self.node.kind)
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.role(), NodeRole::Container)
    }
}
