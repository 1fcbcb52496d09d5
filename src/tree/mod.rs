//! Position-indexed B+-tree
//!
//! All records live in leaves; inner nodes only route. Leaves form a
//! doubly linked list left to right so ordered scans never re-descend.
//!
//! Nodes and records are stored in two arenas owned by the tree. Every
//! link (child, parent, sibling, chain, owning leaf) is an index into one
//! of them, so only the arenas own anything and teardown is a plain drop.
//!
//! Splits follow the usual convention:
//! - leaf split: the right half's first key is copied up
//! - inner split: the middle key is pushed up and removed from both halves

mod audit;
mod node;
mod traversal;

pub use audit::{InvariantViolation, TreeStats};
pub use node::{NodeId, NodeKind};
pub use traversal::{RecordRef, Records};

use thiserror::Error;
use tracing::debug;

use crate::record::{Position, RecordId, VariantRecord};
use node::{Chain, InnerNode, LeafNode, Node};

/// Smallest accepted rank for either node kind.
pub const MIN_RANK: usize = 3;

/// Invalid tree configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Rank below [`MIN_RANK`].
    #[error("{kind} rank must be >= {MIN_RANK}, got {rank}")]
    RankTooSmall {
        /// Node kind the rank applies to.
        kind: NodeKind,
        /// Rejected value.
        rank: usize,
    },
}

/// Validate a rank for the given node kind.
pub fn validate_rank(kind: NodeKind, rank: usize) -> Result<usize, ConfigError> {
    if rank < MIN_RANK {
        return Err(ConfigError::RankTooSmall { kind, rank });
    }
    Ok(rank)
}

/// B+-tree keyed by genomic position with chained duplicates.
///
/// Lifecycle has two phases. While building, only [`insert`](Self::insert)
/// is used and record back-references are stale. After
/// [`synchronize`](Self::synchronize) the tree is read-only in practice and
/// [`next_record`](Self::next_record) becomes available. Any later insert
/// returns the tree to the build phase.
#[derive(Debug)]
pub struct BPlusTree<V> {
    nodes: Vec<Node>,
    records: Vec<VariantRecord<V>>,
    root: NodeId,
    height: usize,
    first_leaf: NodeId,
    last_leaf: NodeId,
    /// Max children per inner node.
    inner_rank: usize,
    /// Max entries per leaf.
    leaf_rank: usize,
    distinct_positions: usize,
    synchronized: bool,
}

impl<V> BPlusTree<V> {
    /// Create an empty tree (a single empty leaf as root).
    pub fn new(inner_rank: usize, leaf_rank: usize) -> Result<Self, ConfigError> {
        let inner_rank = validate_rank(NodeKind::Inner, inner_rank)?;
        let leaf_rank = validate_rank(NodeKind::Leaf, leaf_rank)?;
        let root = NodeId(0);

        Ok(Self {
            nodes: vec![Node::Leaf(LeafNode::empty())],
            records: Vec::new(),
            root,
            height: 1,
            first_leaf: root,
            last_leaf: root,
            inner_rank,
            leaf_rank,
            distinct_positions: 0,
            // Nothing to stamp yet.
            synchronized: true,
        })
    }

    /// Insert a record at `key`, returning its id.
    ///
    /// A key already present gets the new record appended to its chain and
    /// the tree shape is untouched.
    ///
    /// # Panics
    ///
    /// If `key` is 0 (positions are 1-based).
    pub fn insert(&mut self, key: Position, payload: V) -> RecordId {
        assert!(key >= 1, "position {key} is not 1-based");

        let id = RecordId(arena_slot(self.records.len(), "record"));
        self.records.push(VariantRecord::new(key, payload));
        self.synchronized = false;

        let leaf_id = self.find_leaf(key);
        let Node::Leaf(leaf) = &mut self.nodes[leaf_id.index()] else {
            unreachable!("descent ended on inner node {leaf_id}");
        };

        let slot = leaf.locate(key);
        if leaf.keys.get(slot) == Some(&key) {
            let chain = &mut leaf.chains[slot];
            let tail = std::mem::replace(&mut chain.tail, id);
            self.records[tail.index()].same_key_next = Some(id);
            return id;
        }

        leaf.keys.insert(slot, key);
        leaf.chains.insert(slot, Chain::single(id));
        self.distinct_positions += 1;

        if leaf.keys.len() > self.leaf_rank {
            self.split_leaf(leaf_id);
        }
        id
    }

    /// Deleting variants is not supported.
    ///
    /// Loaded variants are permanent for the lifetime of the index, so
    /// there is no rebalancing or merge logic to back a removal.
    ///
    /// # Panics
    ///
    /// Always.
    pub fn remove_record(&mut self, record: RecordId) -> ! {
        panic!(
            "remove_record({record}): variant removal is unsupported, loaded variants are permanent"
        );
    }

    /// Descend from the root to the leaf whose range covers `key`.
    fn find_leaf(&self, key: Position) -> NodeId {
        let mut id = self.root;
        loop {
            match &self.nodes[id.index()] {
                Node::Leaf(_) => return id,
                Node::Inner(inner) => id = inner.children[inner.locate(key)],
            }
        }
    }

    fn split_leaf(&mut self, leaf_id: NodeId) {
        let right_id = NodeId(arena_slot(self.nodes.len(), "node"));
        let leaf_rank = self.leaf_rank;
        let leaf = self.leaf_mut(leaf_id);
        assert_eq!(
            leaf.keys.len(),
            leaf_rank + 1,
            "leaf {leaf_id} split with wrong fill"
        );

        // ceil((leaf_rank + 1) / 2) entries stay on the left.
        let keep = (leaf_rank + 2) / 2;
        let keys = leaf.keys.split_off(keep);
        let chains = leaf.chains.split_off(keep);
        let separator = keys[0];
        let parent = leaf.parent;
        let old_right = leaf.right.replace(right_id);

        self.nodes.push(Node::Leaf(LeafNode {
            keys,
            chains,
            parent,
            left: Some(leaf_id),
            right: old_right,
        }));

        match old_right {
            Some(next) => self.leaf_mut(next).left = Some(right_id),
            None => self.last_leaf = right_id,
        }

        self.promote(leaf_id, separator, right_id, parent);
    }

    fn split_inner(&mut self, node_id: NodeId) {
        let right_id = NodeId(arena_slot(self.nodes.len(), "node"));
        let inner_rank = self.inner_rank;
        let inner = self.inner_mut(node_id);
        assert_eq!(
            inner.children.len(),
            inner_rank + 1,
            "inner node {node_id} split with wrong fill"
        );

        let mid = inner.keys.len() / 2;
        let keys = inner.keys.split_off(mid + 1);
        let separator = inner
            .keys
            .pop()
            .unwrap_or_else(|| unreachable!("inner node {node_id} lost its middle key"));
        let children = inner.children.split_off(mid + 1);
        let parent = inner.parent;

        for &child in &children {
            self.nodes[child.index()].set_parent(Some(right_id));
        }
        self.nodes.push(Node::Inner(InnerNode {
            keys,
            children,
            parent,
        }));

        self.promote(node_id, separator, right_id, parent);
    }

    /// Hand a fresh separator to the parent, growing a new root if needed.
    fn promote(
        &mut self,
        left: NodeId,
        separator: Position,
        right: NodeId,
        parent: Option<NodeId>,
    ) {
        match parent {
            Some(parent) => self.insert_inner(parent, separator, right),
            None => self.grow_root(left, separator, right),
        }
    }

    fn insert_inner(&mut self, node_id: NodeId, separator: Position, right_child: NodeId) {
        let inner_rank = self.inner_rank;
        let inner = self.inner_mut(node_id);
        let idx = match inner.keys.binary_search(&separator) {
            Ok(_) => panic!("separator {separator} already routed by inner node {node_id}"),
            Err(idx) => idx,
        };
        inner.keys.insert(idx, separator);
        inner.children.insert(idx + 1, right_child);
        let overflow = inner.children.len() > inner_rank;

        self.nodes[right_child.index()].set_parent(Some(node_id));
        if overflow {
            self.split_inner(node_id);
        }
    }

    fn grow_root(&mut self, left: NodeId, separator: Position, right: NodeId) {
        let root_id = NodeId(arena_slot(self.nodes.len(), "node"));
        self.nodes.push(Node::Inner(InnerNode {
            keys: vec![separator],
            children: vec![left, right],
            parent: None,
        }));
        self.nodes[left.index()].set_parent(Some(root_id));
        self.nodes[right.index()].set_parent(Some(root_id));
        self.root = root_id;
        self.height += 1;
        debug!(height = self.height, separator, "root split");
    }

    fn leaf(&self, id: NodeId) -> &LeafNode {
        match &self.nodes[id.index()] {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => unreachable!("{id} is not a leaf"),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode {
        match &mut self.nodes[id.index()] {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => unreachable!("{id} is not a leaf"),
        }
    }

    fn inner_mut(&mut self, id: NodeId) -> &mut InnerNode {
        match &mut self.nodes[id.index()] {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => unreachable!("{id} is not an inner node"),
        }
    }

    /// Number of records (duplicates included).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record was inserted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct positions.
    pub fn distinct_positions(&self) -> usize {
        self.distinct_positions
    }

    /// Levels from root to leaves (1 for a lone leaf).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Max children per inner node.
    pub fn inner_rank(&self) -> usize {
        self.inner_rank
    }

    /// Max entries per leaf.
    pub fn leaf_rank(&self) -> usize {
        self.leaf_rank
    }

    /// Current root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Leftmost leaf.
    pub fn first_leaf(&self) -> NodeId {
        self.first_leaf
    }

    /// Rightmost leaf.
    pub fn last_leaf(&self) -> NodeId {
        self.last_leaf
    }

    /// Whether back-references are current.
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Record by id.
    ///
    /// # Panics
    ///
    /// If `id` was issued by another tree and is out of range here.
    pub fn record(&self, id: RecordId) -> &VariantRecord<V> {
        &self.records[id.index()]
    }

    /// Kind of a node.
    pub fn node_kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind()
    }

    /// Keys held by a node (separators for inner nodes).
    pub fn node_keys(&self, id: NodeId) -> &[Position] {
        self.nodes[id.index()].keys()
    }
}

fn arena_slot(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("{what} arena exhausted at {len} entries"))
}
