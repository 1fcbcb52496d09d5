//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use varitree::{GenomeVariantStore, LoadContext, Position, StoreConfig, Variant};

pub fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn sample_vcf_text() -> String {
    std::fs::read_to_string(data_path("sample.vcf")).expect("read sample.vcf")
}

pub fn snv(chrom: &str, pos: Position) -> Variant {
    Variant::new(chrom, pos, "A", &["G"])
}

/// Build a synchronized store from `(chrom, pos)` pairs, tagging each
/// variant's ID with its insertion index.
pub fn store_from(pairs: &[(&str, Position)], config: StoreConfig) -> GenomeVariantStore {
    let mut store = GenomeVariantStore::new(Arc::default(), config).expect("valid config");
    let mut ctx = LoadContext::new();
    for (i, &(chrom, pos)) in pairs.iter().enumerate() {
        store.insert(snv(chrom, pos).with_id(i.to_string()), &mut ctx);
    }
    store.synchronize();
    store
}

/// Positions of `chrom` in traversal order.
pub fn positions(store: &GenomeVariantStore, chrom: &str) -> Vec<Position> {
    store
        .records(chrom)
        .map(|records| records.map(|record| record.position()).collect())
        .unwrap_or_default()
}

/// Insertion index stored in the ID by [`store_from`].
pub fn insertion_index(variant: &Variant) -> usize {
    variant
        .id
        .as_deref()
        .and_then(|id| id.parse().ok())
        .expect("tagged id")
}
