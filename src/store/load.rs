use std::sync::Arc;

/// Bulk-load state carried between sequential inserts.
///
/// Variant files are sorted by chromosome, so consecutive records almost
/// always land in the same chromosome. The cached entry is re-validated
/// against the store on every use, so a context handed to another store
/// (or reused after chromosomes were added) still resolves correctly.
#[derive(Debug, Default)]
pub struct LoadContext {
    last: Option<(Arc<str>, usize)>,
}

impl LoadContext {
    /// Fresh context with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cached(&self, chrom: &str) -> Option<usize> {
        match &self.last {
            Some((name, slot)) if name.as_ref() == chrom => Some(*slot),
            _ => None,
        }
    }

    pub(crate) fn remember(&mut self, chrom: &Arc<str>, slot: usize) {
        self.last = Some((Arc::clone(chrom), slot));
    }
}

/// Counters reported by a bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoadSummary {
    /// Records read from the source.
    pub read: usize,
    /// Records inserted into the index.
    pub inserted: usize,
    /// Skipped for lacking an alternate allele.
    pub skipped_reference_only: usize,
    /// Skipped for carrying a symbolic or breakend allele.
    pub skipped_symbolic: usize,
    /// Chromosomes in the finished store.
    pub chromosomes: usize,
}

impl LoadSummary {
    /// Records filtered out before insertion.
    pub fn skipped(&self) -> usize {
        self.skipped_reference_only + self.skipped_symbolic
    }
}
