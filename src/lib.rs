//! # Genome variant index
//!
//! A position-indexed B+-tree store for genomic variant records, built once
//! per program run from a VCF/BCF file and then queried by read realignment
//! and k-mer generation to find the variants near a genomic interval.
//!
//! ## Structure
//!
//! 1. **Records**: one per kept variant, keyed by 1-based position;
//!    variants at the same position are chained in file order
//! 2. **Tree**: copy-up leaf splits, push-up inner splits, doubly linked
//!    leaves, arena-allocated nodes addressed by index
//! 3. **Chromosomes**: one tree per chromosome, looked up by name
//! 4. **Store**: bulk load, filtering, and the synchronize pass that
//!    makes constant-time stepping possible
//!
//! ## Usage Example
//!
//! ```no_run
//! use varitree::{GenomeVariantStore, StoreConfig};
//!
//! let (store, summary) = GenomeVariantStore::from_path("calls.vcf.gz", StoreConfig::default())?;
//! println!("indexed {} variants", summary.inserted);
//!
//! let mut cursor = store.record_at_or_after("chr1", 1_000_000);
//! while let Some(record) = cursor {
//!     if record.position() >= 1_001_000 {
//!         break;
//!     }
//!     println!("{} {:?}", record.position(), record.payload().alleles);
//!     cursor = store.next_record(record);
//! }
//! # Ok::<(), varitree::StoreError>(())
//! ```
//!
//! Once loaded the store is read-only and can be shared across threads.

#![warn(missing_docs, missing_debug_implementations)]

pub mod record;   // Positions, record ids, variant records
pub mod tree;     // B+-tree with chained duplicates
pub mod variant;  // Variant payloads and VCF/BCF sources
pub mod store;    // Per-chromosome indexes and bulk loading

// Re-exports for convenience
pub use record::{Position, RecordId, VariantRecord};
pub use store::{
    ChromosomeIndex, GenomeVariantStore, LoadContext, LoadSummary, StoreConfig, StoreError,
};
pub use tree::{BPlusTree, ConfigError, InvariantViolation, RecordRef, Records, TreeStats};
pub use variant::{HtsVcfReader, Variant, VariantHeader, VariantSource, VcfError, VcfReader};
