use std::ops::Range;
use std::sync::Arc;

use super::StoreConfig;
use crate::record::{Position, RecordId};
use crate::tree::{BPlusTree, ConfigError, RecordRef, Records, TreeStats};

/// All variants of one chromosome, ordered by position.
#[derive(Debug)]
pub struct ChromosomeIndex<V> {
    name: Arc<str>,
    tree: BPlusTree<V>,
}

impl<V> ChromosomeIndex<V> {
    /// Create an empty index for `name`.
    pub fn new(name: impl Into<Arc<str>>, config: StoreConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            tree: BPlusTree::new(config.inner_rank, config.leaf_rank)?,
        })
    }

    /// Chromosome name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    /// Records inserted, duplicates included.
    pub fn record_count(&self) -> usize {
        self.tree.len()
    }

    /// Underlying tree.
    pub fn tree(&self) -> &BPlusTree<V> {
        &self.tree
    }

    /// Insert a variant payload at `pos`.
    pub fn insert(&mut self, pos: Position, payload: V) -> RecordId {
        self.tree.insert(pos, payload)
    }

    /// Refresh record back-references; see [`BPlusTree::synchronize`].
    pub fn synchronize(&mut self) {
        self.tree.synchronize();
    }

    /// First record with position `>= pos`.
    pub fn record_at_or_after(&self, pos: Position) -> Option<RecordRef<'_, V>> {
        self.tree.record_at_or_after(pos)
    }

    /// Successor of a record in ascending order.
    ///
    /// Prefer [`RecordRef::advance`] when a handle from this index is at hand.
    ///
    /// # Panics
    ///
    /// If the index is not synchronized, or if `id` was issued by another
    /// chromosome and is out of range here. An in-range id from another
    /// chromosome yields an unrelated record.
    pub fn next_record(&self, id: RecordId) -> Option<RecordRef<'_, V>> {
        self.tree.next_record(id)
    }

    /// Every record in ascending order.
    pub fn records(&self) -> Records<'_, V> {
        self.tree.iter()
    }

    /// Records with `range.start <= position < range.end`.
    pub fn records_in_range(
        &self,
        range: Range<Position>,
    ) -> impl Iterator<Item = RecordRef<'_, V>> + '_ {
        let end = range.end;
        self.tree
            .iter_from(range.start)
            .take_while(move |record| record.position() < end)
    }

    /// Tree shape summary.
    pub fn stats(&self) -> TreeStats {
        self.tree.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_query_is_half_open() {
        let mut chrom = ChromosomeIndex::new("7", StoreConfig::new(3, 3).unwrap()).unwrap();
        for pos in [100, 150, 150, 200, 250, 300] {
            chrom.insert(pos, pos);
        }
        chrom.synchronize();

        let hits: Vec<Position> = chrom
            .records_in_range(150..250)
            .map(|record| record.position())
            .collect();
        assert_eq!(hits, vec![150, 150, 200]);
        assert_eq!(chrom.records_in_range(301..400).count(), 0);
        assert_eq!(chrom.records_in_range(200..200).count(), 0);
        assert_eq!(chrom.record_count(), 6);
        assert_eq!(chrom.name(), "7");
    }

    #[test]
    #[should_panic]
    fn next_record_rejects_id_from_larger_chromosome() {
        let config = StoreConfig::new(3, 3).unwrap();
        let mut big = ChromosomeIndex::new("1", config).unwrap();
        let foreign = (1..=10).map(|pos| big.insert(pos, pos)).last().unwrap();

        let mut small = ChromosomeIndex::new("2", config).unwrap();
        small.insert(5, 5);
        small.synchronize();
        let _ = small.next_record(foreign);
    }
}
