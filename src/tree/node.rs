//! Tree nodes
//!
//! Leaf: sorted positions, one record chain per position, sibling links
//! Inner: sorted separators, `keys.len() + 1` children
//!
//! Separator convention: keys `>= keys[i]` live under `children[i + 1]`.

use std::fmt;

use crate::record::{Position, RecordId};

/// Handle of a node inside its tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Head and tail of the records sharing one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chain {
    pub(crate) head: RecordId,
    pub(crate) tail: RecordId,
}

impl Chain {
    pub(crate) fn single(id: RecordId) -> Self {
        Self { head: id, tail: id }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LeafNode {
    pub(crate) keys: Vec<Position>,
    pub(crate) chains: Vec<Chain>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl LeafNode {
    pub(crate) fn empty() -> Self {
        Self {
            keys: Vec::new(),
            chains: Vec::new(),
            parent: None,
            left: None,
            right: None,
        }
    }

    /// Slot index for `key`: exact match, else first greater key.
    #[inline]
    pub(crate) fn locate(&self, key: Position) -> usize {
        locate(&self.keys, key, NodeKind::Leaf)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InnerNode {
    pub(crate) keys: Vec<Position>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl InnerNode {
    /// Index of the child whose subtree may hold `key`.
    #[inline]
    pub(crate) fn locate(&self, key: Position) -> usize {
        locate(&self.keys, key, NodeKind::Inner)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf(LeafNode),
    Inner(InnerNode),
}

impl Node {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Inner(_) => NodeKind::Inner,
        }
    }

    pub(crate) fn keys(&self) -> &[Position] {
        match self {
            Node::Leaf(leaf) => &leaf.keys,
            Node::Inner(inner) => &inner.keys,
        }
    }

    pub(crate) fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::Inner(inner) => inner.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::Inner(inner) => inner.parent = parent,
        }
    }
}

/// Which variant a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Holds record chains.
    Leaf,
    /// Holds routing separators.
    Inner,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Leaf => f.write_str("leaf"),
            NodeKind::Inner => f.write_str("inner"),
        }
    }
}

/// Binary search shared by descent and insertion.
///
/// An exact match at `i` yields `i` in a leaf (the chain slot) and `i + 1`
/// in an inner node (the subtree holding keys `>= key`). Without a match
/// the result is the index of the first greater key.
pub(crate) fn locate(keys: &[Position], key: Position, kind: NodeKind) -> usize {
    match keys.binary_search(&key) {
        Ok(i) => match kind {
            NodeKind::Leaf => i,
            NodeKind::Inner => i + 1,
        },
        Err(i) => i,
    }
}
