//! Variant records stored in the tree
//!
//! A record is one loaded variant: its 1-based position (the tree key),
//! the payload it was built from, and the link to the next record sharing
//! the same position.
//!
//! Records live in an arena owned by their tree and are addressed by
//! [`RecordId`]. Nodes and other records only ever hold ids, so the
//! back-references (`owning_leaf`) never create ownership cycles.

use std::fmt;

use crate::tree::NodeId;

/// 1-based genomic coordinate, the sort key of the tree.
pub type Position = u64;

/// Stable handle of a record inside its tree's record arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) u32);

impl RecordId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw arena slot (insertion order within one tree).
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One variant stored in the index.
#[derive(Debug, Clone)]
pub struct VariantRecord<V> {
    key: Position,
    payload: V,
    /// Next record at the same key, in insertion order.
    pub(crate) same_key_next: Option<RecordId>,
    /// Leaf holding this record's slot. Only valid after `synchronize`.
    pub(crate) owning_leaf: Option<NodeId>,
}

impl<V> VariantRecord<V> {
    pub(crate) fn new(key: Position, payload: V) -> Self {
        debug_assert!(key >= 1, "positions are 1-based");
        Self {
            key,
            payload,
            same_key_next: None,
            owning_leaf: None,
        }
    }

    /// Genomic position (1-based).
    #[inline]
    pub fn position(&self) -> Position {
        self.key
    }

    /// Payload supplied at insertion.
    #[inline]
    pub fn payload(&self) -> &V {
        &self.payload
    }

    /// Next record sharing this position, if any.
    #[inline]
    pub fn same_key_next(&self) -> Option<RecordId> {
        self.same_key_next
    }

    /// Leaf that held this record at the last `synchronize`.
    #[inline]
    pub fn owning_leaf(&self) -> Option<NodeId> {
        self.owning_leaf
    }
}
