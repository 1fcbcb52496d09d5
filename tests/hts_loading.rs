//! Loading through htslib matches the text reader

mod common;

use common::{data_path, positions, sample_vcf_text};
use test_case::test_case;
use varitree::{
    GenomeVariantStore, HtsVcfReader, StoreConfig, StoreError, VariantSource, VcfError, VcfReader,
};

#[test]
fn htslib_reader_decodes_sample() {
    let reader = HtsVcfReader::from_path(data_path("sample.vcf")).expect("htslib opens vcf");
    let header = reader.header();
    assert_eq!(header.contig_names().collect::<Vec<_>>(), vec!["chr1", "chr2"]);

    let variants: Vec<_> = reader.collect::<Result<_, _>>().expect("records decode");
    assert_eq!(variants.len(), 9);
    assert_eq!(variants[0].position, 100);
    assert_eq!(variants[0].id.as_deref(), Some("rs100"));
    assert_eq!(variants[0].quality, Some(50.0));
    assert_eq!(variants[8].alleles.len(), 3);
}

#[test]
fn htslib_header_keeps_meta_and_contig_lengths() {
    let reader = HtsVcfReader::from_path(data_path("sample.vcf")).expect("htslib opens vcf");
    let header = reader.header();

    assert_eq!(header.contig("chr1").and_then(|c| c.length), Some(5000));
    assert_eq!(header.contig("chr2").and_then(|c| c.length), Some(3000));
    assert!(header.meta.iter().any(|line| line == "fileformat=VCFv4.2"));
    assert!(header.meta.iter().any(|line| line == "source=varitree-tests"));
    assert!(header
        .meta
        .iter()
        .any(|line| line.starts_with("contig=<ID=chr1") && !line.contains("IDX")));
}

#[test]
fn from_path_matches_text_load() {
    let config = StoreConfig::new(3, 4).unwrap();
    let (hts, hts_summary) =
        GenomeVariantStore::from_path(data_path("sample.vcf"), config).expect("htslib load");
    let text = sample_vcf_text();
    let (plain, plain_summary) =
        GenomeVariantStore::load(VcfReader::new(text.as_bytes()).unwrap(), config).unwrap();

    assert_eq!(hts_summary, plain_summary);
    assert_eq!(hts.header().contigs, plain.header().contigs);
    for chrom in ["chr1", "chr2"] {
        assert_eq!(positions(&hts, chrom), positions(&plain, chrom));
    }
}

#[test]
fn missing_file_is_a_source_error() {
    let err = GenomeVariantStore::from_path(data_path("absent.vcf"), StoreConfig::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::Source(_)));
}

#[test_case("pos_zero.vcf" ; "zero position")]
#[test_case("missing_ref.vcf" ; "missing reference allele")]
fn both_readers_reject_malformed_record(fixture: &str) {
    let path = data_path(fixture);

    let err = GenomeVariantStore::from_path(&path, StoreConfig::default()).unwrap_err();
    assert!(matches!(err, StoreError::Source(_)), "{err}");

    let hts: Vec<_> = HtsVcfReader::from_path(&path).expect("htslib opens vcf").collect();
    assert!(hts[0].is_ok());
    assert!(hts.iter().any(Result::is_err));

    let text = std::fs::read_to_string(&path).expect("read fixture");
    let plain: Result<Vec<_>, _> = VcfReader::new(text.as_bytes()).unwrap().collect();
    assert!(matches!(plain, Err(VcfError::Parse { line: 5, .. })));
}
