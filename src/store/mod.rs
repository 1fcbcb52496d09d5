//! Genome-wide variant store
//!
//! One [`ChromosomeIndex`] per chromosome, all built with the same
//! [`StoreConfig`] and sharing the header of the file they were loaded
//! from. [`GenomeVariantStore::load`] runs the whole build phase (filter,
//! insert, synchronize); the returned store only answers queries.

mod chromosome;
mod config;
mod load;

pub use chromosome::ChromosomeIndex;
pub use config::{StoreConfig, DEFAULT_INNER_RANK, DEFAULT_LEAF_RANK};
pub use load::{LoadContext, LoadSummary};

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{Position, RecordId};
use crate::tree::{ConfigError, RecordRef, Records};
use crate::variant::{HtsVcfReader, Variant, VariantHeader, VariantSource, VcfError};

/// Errors that can occur while building a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected tree configuration.
    #[error("invalid store configuration: {0}")]
    Config(#[from] ConfigError),

    /// Variant source failed mid-load.
    #[error("failed to read variants: {0}")]
    Source(#[from] VcfError),
}

/// In-memory index of every loaded variant, by chromosome and position.
#[derive(Debug)]
pub struct GenomeVariantStore {
    header: Arc<VariantHeader>,
    config: StoreConfig,
    chromosomes: Vec<ChromosomeIndex<Variant>>,
    by_name: HashMap<Arc<str>, usize>,
}

impl GenomeVariantStore {
    /// Empty store for manual building.
    pub fn new(header: Arc<VariantHeader>, config: StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            header,
            config,
            chromosomes: Vec::new(),
            by_name: HashMap::new(),
        })
    }

    /// Build a store from any variant source.
    ///
    /// Reference-only and symbolic records are skipped. The first source
    /// error aborts the load. The returned store is synchronized.
    pub fn load<S: VariantSource>(
        source: S,
        config: StoreConfig,
    ) -> Result<(Self, LoadSummary), StoreError> {
        let mut store = Self::new(source.header(), config)?;
        let mut ctx = LoadContext::new();
        let mut summary = LoadSummary::default();

        for variant in source {
            let variant = variant?;
            summary.read += 1;

            if variant.is_reference_only() {
                debug!(
                    chrom = variant.chrom_name(),
                    pos = variant.position,
                    "skipping reference-only record"
                );
                summary.skipped_reference_only += 1;
                continue;
            }
            if variant.has_symbolic_allele() {
                debug!(
                    chrom = variant.chrom_name(),
                    pos = variant.position,
                    "skipping symbolic record"
                );
                summary.skipped_symbolic += 1;
                continue;
            }

            store.insert(variant, &mut ctx);
            summary.inserted += 1;
        }

        store.synchronize();
        summary.chromosomes = store.chromosomes.len();
        info!(
            read = summary.read,
            inserted = summary.inserted,
            skipped = summary.skipped(),
            chromosomes = summary.chromosomes,
            "variant store loaded"
        );
        Ok((store, summary))
    }

    /// Load a VCF/BCF file through htslib.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        config: StoreConfig,
    ) -> Result<(Self, LoadSummary), StoreError> {
        config.validate()?;
        let reader = HtsVcfReader::from_path(path)?;
        Self::load(reader, config)
    }

    /// Register a chromosome, returning its slot.
    ///
    /// Names are unique: asking for an existing name logs a warning and
    /// returns the chromosome registered first.
    pub fn add_chromosome(&mut self, name: impl Into<Arc<str>>) -> usize {
        let name = name.into();
        if let Some(&slot) = self.by_name.get(&name) {
            warn!(chrom = %name, "chromosome already registered, keeping the first");
            return slot;
        }
        self.create_chromosome(name)
    }

    fn create_chromosome(&mut self, name: Arc<str>) -> usize {
        // Config was validated when the store was built.
        let index = match ChromosomeIndex::new(Arc::clone(&name), self.config) {
            Ok(index) => index,
            Err(err) => unreachable!("validated config rejected: {err}"),
        };
        let slot = self.chromosomes.len();
        self.chromosomes.push(index);
        self.by_name.insert(name, slot);
        debug!(chrom = %self.chromosomes[slot].name(), slot, "new chromosome");
        slot
    }

    /// Insert one variant into its chromosome (build phase).
    ///
    /// Queries stepping with `next_record` need [`synchronize`](Self::synchronize)
    /// to run after the last insert.
    pub fn insert(&mut self, variant: Variant, ctx: &mut LoadContext) -> RecordId {
        let slot = self.resolve_slot(&variant.chrom, ctx);
        let pos = variant.position;
        self.chromosomes[slot].insert(pos, variant)
    }

    fn resolve_slot(&mut self, chrom: &Arc<str>, ctx: &mut LoadContext) -> usize {
        let cached = ctx.cached(chrom).filter(|&slot| {
            self.chromosomes.get(slot).map(ChromosomeIndex::name) == Some(chrom.as_ref())
        });
        if let Some(slot) = cached {
            return slot;
        }

        let slot = match self.by_name.get(chrom) {
            Some(&slot) => slot,
            None => self.create_chromosome(Arc::clone(chrom)),
        };
        ctx.remember(self.chromosomes[slot].shared_name(), slot);
        slot
    }

    /// Refresh back-references in every chromosome.
    pub fn synchronize(&mut self) {
        for chrom in &mut self.chromosomes {
            chrom.synchronize();
        }
    }

    /// First record on `chrom` with position `>= pos`.
    ///
    /// Unknown chromosomes and positions past the last record are `None`.
    pub fn record_at_or_after(&self, chrom: &str, pos: Position) -> Option<RecordRef<'_, Variant>> {
        self.chromosome(chrom)?.record_at_or_after(pos)
    }

    /// Successor of `record` within its chromosome.
    pub fn next_record<'a>(
        &'a self,
        record: RecordRef<'a, Variant>,
    ) -> Option<RecordRef<'a, Variant>> {
        record.advance()
    }

    /// Every record of `chrom` in ascending order.
    pub fn records(&self, chrom: &str) -> Option<Records<'_, Variant>> {
        self.chromosome(chrom).map(ChromosomeIndex::records)
    }

    /// Records of `chrom` with `range.start <= position < range.end`.
    pub fn records_in_range(
        &self,
        chrom: &str,
        range: Range<Position>,
    ) -> impl Iterator<Item = RecordRef<'_, Variant>> + '_ {
        self.chromosome(chrom)
            .into_iter()
            .flat_map(move |index| index.records_in_range(range.clone()))
    }

    /// Chromosome by name.
    pub fn chromosome(&self, name: &str) -> Option<&ChromosomeIndex<Variant>> {
        self.by_name.get(name).map(|&slot| &self.chromosomes[slot])
    }

    /// Chromosomes in first-seen order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &ChromosomeIndex<Variant>> {
        self.chromosomes.iter()
    }

    /// Records across all chromosomes.
    pub fn total_record_count(&self) -> usize {
        self.chromosomes.iter().map(ChromosomeIndex::record_count).sum()
    }

    /// Header shared by the store.
    pub fn header(&self) -> &Arc<VariantHeader> {
        &self.header
    }

    /// Tree configuration.
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Whether every chromosome is synchronized.
    pub fn is_synchronized(&self) -> bool {
        self.chromosomes
            .iter()
            .all(|chrom| chrom.tree().is_synchronized())
    }
}
