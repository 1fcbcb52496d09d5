//! Ordered access: point queries, stepping, back-pointer stamping
//!
//! Query phase only reads the arenas, so any number of threads can share a
//! synchronized `&BPlusTree` and walk it concurrently.

use std::fmt;
use std::iter::FusedIterator;

use super::node::Node;
use super::BPlusTree;
use crate::record::{Position, RecordId, VariantRecord};

/// Borrowed handle to a record, able to step to its successor.
pub struct RecordRef<'a, V> {
    tree: &'a BPlusTree<V>,
    id: RecordId,
}

impl<V> Clone for RecordRef<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for RecordRef<'_, V> {}

impl<V> fmt::Debug for RecordRef<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRef")
            .field("id", &self.id)
            .field("position", &self.position())
            .finish()
    }
}

impl<'a, V> RecordRef<'a, V> {
    /// Arena id of the record.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Underlying record.
    pub fn record(&self) -> &'a VariantRecord<V> {
        self.tree.record(self.id)
    }

    /// 1-based position.
    pub fn position(&self) -> Position {
        self.record().position()
    }

    /// Payload supplied at insertion.
    pub fn payload(&self) -> &'a V {
        self.record().payload()
    }

    /// Next record at the same position, if any.
    pub fn same_key_next(&self) -> Option<RecordRef<'a, V>> {
        self.record()
            .same_key_next()
            .map(|id| self.tree.handle(id))
    }

    /// Successor in ascending order; see [`BPlusTree::next_record`].
    pub fn advance(self) -> Option<RecordRef<'a, V>> {
        self.tree.next_record(self.id)
    }
}

impl<V> BPlusTree<V> {
    fn handle(&self, id: RecordId) -> RecordRef<'_, V> {
        RecordRef { tree: self, id }
    }

    /// First record with position `>= pos` (head of its chain).
    pub fn record_at_or_after(&self, pos: Position) -> Option<RecordRef<'_, V>> {
        let leaf = self.leaf(self.find_leaf(pos));
        let slot = leaf.locate(pos);
        if let Some(chain) = leaf.chains.get(slot) {
            return Some(self.handle(chain.head));
        }

        // Everything in this leaf is smaller; the answer opens the next leaf.
        let right = self.leaf(leaf.right?);
        right.chains.first().map(|chain| self.handle(chain.head))
    }

    /// Successor of `id`: its chain neighbour, else the next slot's head.
    ///
    /// # Panics
    ///
    /// If records were inserted since the last [`synchronize`](Self::synchronize).
    pub fn next_record(&self, id: RecordId) -> Option<RecordRef<'_, V>> {
        assert!(
            self.synchronized,
            "next_record({id}) requires synchronize() after the last insert"
        );

        let record = self.record(id);
        if let Some(next) = record.same_key_next {
            return Some(self.handle(next));
        }

        let Some(leaf_id) = record.owning_leaf else {
            unreachable!("synchronized record {id} has no owning leaf");
        };
        let leaf = self.leaf(leaf_id);
        let slot = match leaf.keys.binary_search(&record.position()) {
            Ok(slot) => slot,
            Err(_) => unreachable!("record {id} missing from its owning leaf {leaf_id}"),
        };

        if let Some(chain) = leaf.chains.get(slot + 1) {
            return Some(self.handle(chain.head));
        }
        let right = self.leaf(leaf.right?);
        right.chains.first().map(|chain| self.handle(chain.head))
    }

    /// Stamp every record with the leaf currently holding it.
    ///
    /// Walks the sibling list once; O(records). Running it again without
    /// intervening inserts assigns the same leaves.
    pub fn synchronize(&mut self) {
        let mut cursor = Some(self.first_leaf);
        while let Some(leaf_id) = cursor {
            let Node::Leaf(leaf) = &self.nodes[leaf_id.index()] else {
                unreachable!("sibling list reached inner node {leaf_id}");
            };
            for chain in &leaf.chains {
                let mut next = Some(chain.head);
                while let Some(id) = next {
                    let record = &mut self.records[id.index()];
                    record.owning_leaf = Some(leaf_id);
                    next = record.same_key_next;
                }
            }
            cursor = leaf.right;
        }
        self.synchronized = true;
    }

    /// Ascending iterator over every record.
    pub fn iter(&self) -> Records<'_, V> {
        Records {
            next: self
                .leaf(self.first_leaf)
                .chains
                .first()
                .map(|chain| self.handle(chain.head)),
        }
    }

    /// Ascending iterator starting at the first record `>= pos`.
    pub fn iter_from(&self, pos: Position) -> Records<'_, V> {
        Records {
            next: self.record_at_or_after(pos),
        }
    }
}

/// Ascending record iterator driven by [`BPlusTree::next_record`].
pub struct Records<'a, V> {
    next: Option<RecordRef<'a, V>>,
}

impl<V> fmt::Debug for Records<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records").field("next", &self.next).finish()
    }
}

impl<V> Clone for Records<'_, V> {
    fn clone(&self) -> Self {
        Self { next: self.next }
    }
}

impl<'a, V> Iterator for Records<'a, V> {
    type Item = RecordRef<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.advance();
        Some(current)
    }
}

impl<V> FusedIterator for Records<'_, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn synced(keys: &[Position], inner_rank: usize, leaf_rank: usize) -> BPlusTree<usize> {
        let mut tree = BPlusTree::new(inner_rank, leaf_rank).unwrap();
        for (i, &key) in keys.iter().enumerate() {
            tree.insert(key, i);
        }
        tree.synchronize();
        tree
    }

    #[test]
    fn at_or_after_hits_and_misses() {
        let tree = synced(&[10, 20, 30, 40, 50, 60], 3, 3);
        assert_eq!(tree.record_at_or_after(1).map(|r| r.position()), Some(10));
        assert_eq!(tree.record_at_or_after(30).map(|r| r.position()), Some(30));
        assert_eq!(tree.record_at_or_after(31).map(|r| r.position()), Some(40));
        assert_eq!(tree.record_at_or_after(60).map(|r| r.position()), Some(60));
        assert!(tree.record_at_or_after(61).is_none());
    }

    #[test]
    fn miss_past_leaf_end_crosses_to_sibling() {
        // Leaves [10, 20] and [30, 40]; 25 descends left of separator 30.
        let tree = synced(&[10, 20, 30, 40], 3, 3);
        let found = tree.record_at_or_after(25).unwrap();
        assert_eq!(found.position(), 30);
        assert_eq!(found.record().owning_leaf(), Some(tree.last_leaf()));
    }

    #[test]
    fn empty_tree_has_nothing() {
        let tree = synced(&[], 3, 3);
        assert!(tree.record_at_or_after(1).is_none());
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn iteration_visits_chains_in_insertion_order() {
        let tree = synced(&[3, 1, 3, 2, 3, 1], 3, 3);
        let seen: Vec<(Position, usize)> =
            tree.iter().map(|r| (r.position(), *r.payload())).collect();
        assert_eq!(seen, vec![(1, 1), (1, 5), (2, 3), (3, 0), (3, 2), (3, 4)]);
    }

    #[test]
    fn iter_from_starts_mid_sequence() {
        let tree = synced(&[5, 15, 25, 35, 45], 3, 3);
        let tail: Vec<Position> = tree.iter_from(16).map(|r| r.position()).collect();
        assert_eq!(tail, vec![25, 35, 45]);
    }

    #[test]
    fn synchronize_is_idempotent() {
        let mut tree = synced(&[8, 3, 9, 1, 4, 4, 7, 2, 6], 3, 3);
        let first: Vec<_> = (0..tree.len() as u32)
            .map(|i| tree.record(RecordId(i)).owning_leaf())
            .collect();
        tree.synchronize();
        let second: Vec<_> = (0..tree.len() as u32)
            .map(|i| tree.record(RecordId(i)).owning_leaf())
            .collect();
        assert_eq!(first, second);
        assert!(first.iter().all(Option::is_some));
    }

    #[test]
    #[should_panic(expected = "requires synchronize()")]
    fn stepping_before_synchronize_panics() {
        let mut tree = synced(&[1, 2], 3, 3);
        let id = tree.insert(3, 2);
        let _ = tree.next_record(id);
    }
}
