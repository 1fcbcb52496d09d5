//! Variant payloads and the sources that produce them.
//!
//! The index never looks inside a [`Variant`]; the accessors here are for
//! downstream consumers (read realignment, allele combinatorics).

mod hts;
mod source;
mod vcf;

pub use hts::HtsVcfReader;
pub use source::{VariantSource, VcfError};
pub use vcf::VcfReader;

use std::sync::Arc;

use crate::record::Position;

/// One variant call as read from a VCF/BCF file.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// 1-based position of the first reference base.
    pub position: Position,
    /// ID column (`None` for `.`).
    pub id: Option<Box<str>>,
    /// Reference allele at index 0, alternates after it.
    pub alleles: Vec<Box<str>>,
    /// Phred-scaled quality (`None` for `.`).
    pub quality: Option<f32>,
}

impl Variant {
    /// Build a variant from its reference and alternate alleles.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        position: Position,
        reference: &str,
        alternates: &[&str],
    ) -> Self {
        let alleles = std::iter::once(reference)
            .chain(alternates.iter().copied())
            .map(Box::<str>::from)
            .collect();
        Self {
            chrom: chrom.into(),
            position,
            id: None,
            alleles,
            quality: None,
        }
    }

    /// Set the ID column.
    pub fn with_id(mut self, id: impl Into<Box<str>>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the quality column.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// 1-based position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Chromosome name.
    pub fn chrom_name(&self) -> &str {
        &self.chrom
    }

    /// Number of alleles, reference included.
    pub fn allele_count(&self) -> usize {
        self.alleles.len()
    }

    /// Allele text; index 0 is the reference.
    pub fn allele(&self, idx: usize) -> Option<&str> {
        self.alleles.get(idx).map(AsRef::as_ref)
    }

    /// Reference allele.
    pub fn reference(&self) -> &str {
        self.allele(0).unwrap_or("")
    }

    /// Alternate alleles.
    pub fn alternates(&self) -> impl Iterator<Item = &str> {
        self.alleles.iter().skip(1).map(AsRef::as_ref)
    }

    /// Reference bases spanned by allele `idx`.
    ///
    /// Insertion-like alleles (longer than the reference) cover a single
    /// anchor base; substitutions and deletions cover the whole reference
    /// allele. Returns `None` for an out-of-range index.
    pub fn allele_covered_length(&self, idx: usize) -> Option<usize> {
        let allele = self.allele(idx)?;
        let ref_len = self.reference().len();
        if idx > 0 && allele.len() > ref_len {
            Some(1)
        } else {
            Some(ref_len)
        }
    }

    /// True when no usable alternate allele exists (none, or only `.`).
    pub fn is_reference_only(&self) -> bool {
        self.alternates().all(|alt| alt == "." || alt.is_empty())
    }

    /// True when any alternate is symbolic (`<DEL>`, `<*>`) or a breakend.
    pub fn has_symbolic_allele(&self) -> bool {
        self.alternates()
            .any(|alt| alt.starts_with('<') || alt.contains('[') || alt.contains(']'))
    }
}

/// Contig declared in a VCF header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigInfo {
    /// Contig name as used in the CHROM column.
    pub name: Arc<str>,
    /// Declared length, when present.
    pub length: Option<u64>,
}

/// Header metadata shared by every chromosome of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantHeader {
    /// `##` meta lines, verbatim without the leading `##`.
    pub meta: Vec<String>,
    /// Declared contigs in header order.
    pub contigs: Vec<ContigInfo>,
    /// Sample columns after FORMAT.
    pub samples: Vec<String>,
}

impl VariantHeader {
    /// Look up a declared contig.
    pub fn contig(&self, name: &str) -> Option<&ContigInfo> {
        self.contigs.iter().find(|contig| contig.name.as_ref() == name)
    }

    /// Header order of a contig (its rid in BCF terms).
    pub fn contig_rank(&self, name: &str) -> Option<usize> {
        self.contigs
            .iter()
            .position(|contig| contig.name.as_ref() == name)
    }

    /// Contig names in header order.
    pub fn contig_names(&self) -> impl Iterator<Item = &str> {
        self.contigs.iter().map(|contig| contig.name.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_expose_alleles() {
        let variant = Variant::new("chr2", 100, "A", &["G", "AT"])
            .with_id("rs1")
            .with_quality(30.0);
        assert_eq!(variant.position(), 100);
        assert_eq!(variant.chrom_name(), "chr2");
        assert_eq!(variant.allele_count(), 3);
        assert_eq!(variant.allele(0), Some("A"));
        assert_eq!(variant.allele(2), Some("AT"));
        assert_eq!(variant.allele(3), None);
        assert_eq!(variant.id.as_deref(), Some("rs1"));
    }

    #[test]
    fn covered_length_rules() {
        let deletion = Variant::new("1", 10, "ACGT", &["A"]);
        assert_eq!(deletion.allele_covered_length(0), Some(4));
        assert_eq!(deletion.allele_covered_length(1), Some(4));

        let insertion = Variant::new("1", 10, "A", &["ACCC"]);
        assert_eq!(insertion.allele_covered_length(1), Some(1));

        let mnp = Variant::new("1", 10, "AC", &["GT"]);
        assert_eq!(mnp.allele_covered_length(1), Some(2));
        assert_eq!(mnp.allele_covered_length(5), None);
    }

    #[test]
    fn filter_predicates() {
        assert!(Variant::new("1", 1, "A", &[]).is_reference_only());
        assert!(Variant::new("1", 1, "A", &["."]).is_reference_only());
        assert!(!Variant::new("1", 1, "A", &["T"]).is_reference_only());

        assert!(Variant::new("1", 1, "A", &["<DEL>"]).has_symbolic_allele());
        assert!(Variant::new("1", 1, "A", &["T", "<*>"]).has_symbolic_allele());
        assert!(Variant::new("1", 1, "G", &["G]17:198982]"]).has_symbolic_allele());
        assert!(!Variant::new("1", 1, "A", &["T", "AC"]).has_symbolic_allele());
    }

    #[test]
    fn header_contig_lookup() {
        let header = VariantHeader {
            contigs: vec![
                ContigInfo {
                    name: Arc::from("chr1"),
                    length: Some(248_956_422),
                },
                ContigInfo {
                    name: Arc::from("chrM"),
                    length: None,
                },
            ],
            ..VariantHeader::default()
        };
        assert_eq!(header.contig_rank("chrM"), Some(1));
        assert_eq!(header.contig("chr1").and_then(|c| c.length), Some(248_956_422));
        assert!(header.contig("chr9").is_none());
        assert_eq!(header.contig_names().collect::<Vec<_>>(), vec!["chr1", "chrM"]);
    }
}
