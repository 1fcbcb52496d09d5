use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use varitree::{BPlusTree, GenomeVariantStore, LoadContext, Position, StoreConfig, Variant};

fn build(keys: &[Position], inner_rank: usize, leaf_rank: usize) -> BPlusTree<usize> {
    let mut tree = BPlusTree::new(inner_rank, leaf_rank).expect("ranks >= 3");
    for (i, &key) in keys.iter().enumerate() {
        tree.insert(key, i);
    }
    tree.synchronize();
    tree
}

fn keys_strategy() -> impl Strategy<Value = Vec<Position>> {
    proptest::collection::vec(1u64..500, 0..300)
}

proptest! {
    #[test]
    fn traversal_is_sorted_and_fifo_within_key(
        keys in keys_strategy(),
        inner_rank in 3usize..8,
        leaf_rank in 3usize..10,
    ) {
        let tree = build(&keys, inner_rank, leaf_rank);
        let seen: Vec<(Position, usize)> =
            tree.iter().map(|r| (r.position(), *r.payload())).collect();

        let mut expected: Vec<(Position, usize)> =
            keys.iter().copied().zip(0..).collect();
        expected.sort_by_key(|&(key, _)| key); // stable: keeps insertion order
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn structure_holds_after_every_insert(
        keys in proptest::collection::vec(1u64..200, 1..120),
        inner_rank in 3usize..7,
        leaf_rank in 3usize..7,
    ) {
        let mut tree = BPlusTree::new(inner_rank, leaf_rank).unwrap();
        for (i, &key) in keys.iter().enumerate() {
            tree.insert(key, i);
            prop_assert!(tree.check_invariants().is_ok(), "{:?}", tree.check_invariants());
        }
        tree.synchronize();
        prop_assert_eq!(tree.check_invariants(), Ok(()));
        prop_assert_eq!(tree.len(), keys.len());
        prop_assert_eq!(
            tree.distinct_positions(),
            keys.iter().collect::<BTreeSet<_>>().len()
        );
    }

    #[test]
    fn at_or_after_returns_smallest_key_not_below_probe(
        keys in keys_strategy(),
        probes in proptest::collection::vec(1u64..520, 1..50),
        leaf_rank in 3usize..10,
    ) {
        let tree = build(&keys, 4, leaf_rank);
        let set: BTreeSet<Position> = keys.iter().copied().collect();

        for &key in &keys {
            prop_assert_eq!(tree.record_at_or_after(key).map(|r| r.position()), Some(key));
        }
        for probe in probes {
            let expected = set.range(probe..).next().copied();
            prop_assert_eq!(tree.record_at_or_after(probe).map(|r| r.position()), expected);
        }
    }

    #[test]
    fn synchronize_twice_is_stable(keys in keys_strategy(), leaf_rank in 3usize..6) {
        let mut tree = build(&keys, 3, leaf_rank);
        let first: Vec<_> = tree.iter().map(|r| (r.id(), r.record().owning_leaf())).collect();
        tree.synchronize();
        let second: Vec<_> = tree.iter().map(|r| (r.id(), r.record().owning_leaf())).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn store_round_trips_multiset(
        pairs in proptest::collection::vec((0u8..4, 1u64..300), 0..250),
    ) {
        let mut store =
            GenomeVariantStore::new(Default::default(), StoreConfig::new(3, 4).unwrap()).unwrap();
        let mut ctx = LoadContext::new();
        let mut expected: BTreeMap<(String, Position), usize> = BTreeMap::new();
        for &(chrom, pos) in &pairs {
            let name = format!("chr{chrom}");
            store.insert(Variant::new(name.as_str(), pos, "C", &["T"]), &mut ctx);
            *expected.entry((name, pos)).or_default() += 1;
        }
        store.synchronize();

        let mut flattened: BTreeMap<(String, Position), usize> = BTreeMap::new();
        for chrom in store.chromosomes() {
            for record in chrom.records() {
                prop_assert_eq!(record.payload().chrom_name(), chrom.name());
                *flattened
                    .entry((chrom.name().to_string(), record.position()))
                    .or_default() += 1;
            }
        }
        prop_assert_eq!(flattened, expected);
        prop_assert_eq!(store.total_record_count(), pairs.len());
    }
}
