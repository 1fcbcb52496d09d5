//! Structural audit and statistics
//!
//! `check_invariants` re-derives every structural property from scratch:
//! ordering, separator ranges, fill bounds, parent and sibling links,
//! uniform leaf depth, chain bookkeeping and (when synchronized) the
//! owning-leaf stamps. Tests call it after every mutation burst.

use bitvec::prelude::*;
use thiserror::Error;

use super::node::{Node, NodeId};
use super::BPlusTree;
use crate::record::{Position, RecordId};

/// A broken structural property.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Keys not strictly ascending.
    #[error("node {node} keys are not strictly ascending")]
    Unsorted {
        /// Offending node.
        node: NodeId,
    },
    /// A key falls outside the range routed to its node.
    #[error("node {node} holds key {key} outside its routed range")]
    KeyOutOfRange {
        /// Offending node.
        node: NodeId,
        /// Misplaced key.
        key: Position,
    },
    /// Fill outside the allowed bounds.
    #[error("node {node} holds {len} entries, allowed {min}..={max}")]
    Fill {
        /// Offending node.
        node: NodeId,
        /// Entries found.
        len: usize,
        /// Lower bound.
        min: usize,
        /// Upper bound.
        max: usize,
    },
    /// Child or chain count does not match the key count.
    #[error("node {node} has {keys} keys but {slots} slots")]
    SlotCount {
        /// Offending node.
        node: NodeId,
        /// Key count.
        keys: usize,
        /// Child or chain count.
        slots: usize,
    },
    /// Parent back-reference disagrees with the owning node.
    #[error("node {node} parent link is stale")]
    ParentLink {
        /// Offending node.
        node: NodeId,
    },
    /// Node reachable twice from the root.
    #[error("node {node} is owned by more than one parent")]
    SharedNode {
        /// Offending node.
        node: NodeId,
    },
    /// Leaves at different depths.
    #[error("leaf {node} sits at depth {depth}, tree height is {height}")]
    UnevenDepth {
        /// Offending leaf.
        node: NodeId,
        /// Depth found.
        depth: usize,
        /// Recorded height.
        height: usize,
    },
    /// Sibling list disagrees with in-order leaf sequence.
    #[error("leaf sibling links broken at {node}")]
    SiblingLink {
        /// Offending leaf.
        node: NodeId,
    },
    /// Chain records disagree with their slot.
    #[error("chain at leaf {node} slot {slot} is inconsistent")]
    Chain {
        /// Leaf holding the chain.
        node: NodeId,
        /// Slot index.
        slot: usize,
    },
    /// Record arena and chains disagree on the total.
    #[error("chains reach {reached} records, arena holds {stored}")]
    RecordCount {
        /// Records reachable through chains.
        reached: usize,
        /// Records stored.
        stored: usize,
    },
    /// A synchronized record points at the wrong leaf.
    #[error("record {record} owning leaf is stale")]
    OwningLeaf {
        /// Offending record.
        record: RecordId,
    },
}

/// Shape summary of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TreeStats {
    /// Levels from root to leaves.
    pub height: usize,
    /// Leaf nodes.
    pub leaf_nodes: usize,
    /// Inner nodes.
    pub inner_nodes: usize,
    /// Records, duplicates included.
    pub records: usize,
    /// Distinct positions.
    pub distinct_positions: usize,
}

struct Audit {
    visited: BitVec,
    in_order_leaves: Vec<NodeId>,
    reached_records: usize,
}

impl<V> BPlusTree<V> {
    /// Shape summary.
    pub fn stats(&self) -> TreeStats {
        let leaf_nodes = self
            .nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf(_)))
            .count();
        TreeStats {
            height: self.height,
            leaf_nodes,
            inner_nodes: self.nodes.len() - leaf_nodes,
            records: self.records.len(),
            distinct_positions: self.distinct_positions,
        }
    }

    /// Verify every structural invariant, reporting the first violation.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut audit = Audit {
            visited: bitvec![0; self.nodes.len()],
            in_order_leaves: Vec::new(),
            reached_records: 0,
        };

        if self.nodes[self.root.index()].parent().is_some() {
            return Err(InvariantViolation::ParentLink { node: self.root });
        }
        self.audit_node(self.root, None, None, 1, &mut audit)?;
        self.audit_siblings(&audit.in_order_leaves)?;

        if audit.reached_records != self.records.len() {
            return Err(InvariantViolation::RecordCount {
                reached: audit.reached_records,
                stored: self.records.len(),
            });
        }
        Ok(())
    }

    fn audit_node(
        &self,
        id: NodeId,
        lower: Option<Position>,
        upper: Option<Position>,
        depth: usize,
        audit: &mut Audit,
    ) -> Result<(), InvariantViolation> {
        if audit.visited.replace(id.index(), true) {
            return Err(InvariantViolation::SharedNode { node: id });
        }

        let node = &self.nodes[id.index()];
        let keys = node.keys();
        if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(InvariantViolation::Unsorted { node: id });
        }
        // Keys under a separator s satisfy lower <= key < upper.
        for &key in keys {
            let above = lower.map_or(true, |lo| key >= lo);
            let below = upper.map_or(true, |hi| key < hi);
            if !(above && below) {
                return Err(InvariantViolation::KeyOutOfRange { node: id, key });
            }
        }
        let is_root = id == self.root;

        match node {
            Node::Leaf(leaf) => {
                if depth != self.height {
                    return Err(InvariantViolation::UnevenDepth {
                        node: id,
                        depth,
                        height: self.height,
                    });
                }
                if leaf.chains.len() != leaf.keys.len() {
                    return Err(InvariantViolation::SlotCount {
                        node: id,
                        keys: leaf.keys.len(),
                        slots: leaf.chains.len(),
                    });
                }
                // A split leaves floor((rank + 1) / 2) on the smaller side.
                let min = if is_root { 0 } else { (self.leaf_rank + 1) / 2 };
                check_fill(id, leaf.keys.len(), min, self.leaf_rank)?;

                for (slot, (&key, chain)) in leaf.keys.iter().zip(&leaf.chains).enumerate() {
                    let mut cursor = Some(chain.head);
                    let mut last = chain.head;
                    while let Some(record_id) = cursor {
                        let record = self.record(record_id);
                        if record.position() != key {
                            return Err(InvariantViolation::Chain { node: id, slot });
                        }
                        if self.synchronized && record.owning_leaf() != Some(id) {
                            return Err(InvariantViolation::OwningLeaf { record: record_id });
                        }
                        audit.reached_records += 1;
                        last = record_id;
                        cursor = record.same_key_next();
                    }
                    if last != chain.tail {
                        return Err(InvariantViolation::Chain { node: id, slot });
                    }
                }
                audit.in_order_leaves.push(id);
            }
            Node::Inner(inner) => {
                if inner.children.len() != inner.keys.len() + 1 {
                    return Err(InvariantViolation::SlotCount {
                        node: id,
                        keys: inner.keys.len(),
                        slots: inner.children.len(),
                    });
                }
                let min = if is_root {
                    1
                } else {
                    (self.inner_rank + 1) / 2 - 1
                };
                check_fill(id, inner.keys.len(), min, self.inner_rank - 1)?;

                for (i, &child) in inner.children.iter().enumerate() {
                    if self.nodes[child.index()].parent() != Some(id) {
                        return Err(InvariantViolation::ParentLink { node: child });
                    }
                    let child_lower = if i == 0 { lower } else { Some(inner.keys[i - 1]) };
                    let child_upper = inner.keys.get(i).copied().or(upper);
                    self.audit_node(child, child_lower, child_upper, depth + 1, audit)?;
                }
            }
        }
        Ok(())
    }

    fn audit_siblings(&self, in_order: &[NodeId]) -> Result<(), InvariantViolation> {
        let (Some(&first), Some(&last)) = (in_order.first(), in_order.last()) else {
            return Err(InvariantViolation::SiblingLink { node: self.root });
        };
        if first != self.first_leaf {
            return Err(InvariantViolation::SiblingLink { node: self.first_leaf });
        }
        if last != self.last_leaf {
            return Err(InvariantViolation::SiblingLink { node: self.last_leaf });
        }

        for (i, &id) in in_order.iter().enumerate() {
            let leaf = self.leaf(id);
            let expected_left = i.checked_sub(1).map(|j| in_order[j]);
            let expected_right = in_order.get(i + 1).copied();
            if leaf.left != expected_left || leaf.right != expected_right {
                return Err(InvariantViolation::SiblingLink { node: id });
            }
        }
        Ok(())
    }
}

fn check_fill(node: NodeId, len: usize, min: usize, max: usize) -> Result<(), InvariantViolation> {
    if len < min || len > max {
        return Err(InvariantViolation::Fill {
            node,
            len,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::Chain;

    fn build(keys: impl IntoIterator<Item = Position>) -> BPlusTree<()> {
        let mut tree = BPlusTree::new(4, 5).unwrap();
        for key in keys {
            tree.insert(key, ());
        }
        tree
    }

    #[test]
    fn ascending_descending_and_interleaved_loads_stay_valid() {
        for tree in [
            build(1..=200),
            build((1..=200).rev()),
            build((1..=200).map(|i| (i * 37) % 211 + 1)),
        ] {
            tree.check_invariants().unwrap();
        }
    }

    #[test]
    fn synchronized_stamps_are_audited() {
        let mut tree = build((1..=50).chain(1..=50));
        tree.synchronize();
        tree.check_invariants().unwrap();

        // Records inserted after synchronize move the tree back to build phase.
        tree.insert(51, ());
        assert!(!tree.is_synchronized());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn stats_count_nodes_and_records() {
        let tree = build((1..=30).chain([5, 5]));
        let stats = tree.stats();
        assert_eq!(stats.records, 32);
        assert_eq!(stats.distinct_positions, 30);
        assert_eq!(stats.height, tree.height());
        assert_eq!(stats.leaf_nodes + stats.inner_nodes, tree.nodes.len());
        assert!(stats.leaf_nodes >= 30 / 5);
    }

    #[test]
    fn detects_corrupted_ordering() {
        let mut tree = build([1, 2, 3]);
        if let Node::Leaf(leaf) = &mut tree.nodes[0] {
            leaf.keys.swap(0, 2);
        }
        assert!(matches!(
            tree.check_invariants(),
            Err(InvariantViolation::Unsorted { .. })
        ));
    }

    #[test]
    fn detects_broken_chain_tail() {
        let mut tree = build([4, 4, 9]);
        if let Node::Leaf(leaf) = &mut tree.nodes[0] {
            leaf.chains[0] = Chain::single(leaf.chains[0].head);
        }
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::Chain {
                node: NodeId(0),
                slot: 0
            })
        );
    }
}
