use std::path::Path;
use std::sync::Arc;

use rust_htslib::bcf::{self, header::HeaderRecord, record::Numeric, Read};

use super::{ContigInfo, Variant, VariantHeader, VariantSource, VcfError};
use crate::record::Position;

/// VCF / bgzipped VCF / BCF reader backed by htslib.
///
/// Contig names are resolved once from the header's rid table. Positions
/// are converted from htslib's 0-based coordinates to 1-based, and a POS of
/// 0 (which htslib accepts) is rejected like the text reader does.
pub struct HtsVcfReader {
    reader: bcf::Reader,
    record: bcf::Record,
    header: Arc<VariantHeader>,
    contigs: Vec<Arc<str>>,
    records_read: usize,
}

impl std::fmt::Debug for HtsVcfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtsVcfReader")
            .field("contigs", &self.contigs.len())
            .field("records_read", &self.records_read)
            .finish()
    }
}

impl HtsVcfReader {
    /// Open any format htslib can sniff (`.vcf`, `.vcf.gz`, `.bcf`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let reader = bcf::Reader::from_path(path)?;
        let view = reader.header();

        let contigs = (0..view.contig_count())
            .map(|rid| {
                view.rid2name(rid)
                    .map(|name| Arc::from(String::from_utf8_lossy(name)))
            })
            .collect::<Result<Vec<Arc<str>>, _>>()?;
        let samples = view
            .samples()
            .into_iter()
            .map(|sample| String::from_utf8_lossy(sample).into_owned())
            .collect();

        let records = view.header_records();
        let header = VariantHeader {
            meta: records.iter().map(meta_line).collect(),
            contigs: contigs
                .iter()
                .map(|name| ContigInfo {
                    name: Arc::clone(name),
                    length: contig_length(&records, name),
                })
                .collect(),
            samples,
        };
        let record = reader.empty_record();

        Ok(Self {
            reader,
            record,
            header: Arc::new(header),
            contigs,
            records_read: 0,
        })
    }

    fn convert(&self) -> Result<Variant, VcfError> {
        let index = self.records_read;
        let record = &self.record;

        let rid = record
            .rid()
            .ok_or_else(|| VcfError::parse(index, "record without contig id"))?;
        let chrom = self
            .contigs
            .get(rid as usize)
            .cloned()
            .ok_or(VcfError::UnknownContig { record: index, rid })?;

        let position = Position::try_from(record.pos() + 1)
            .map_err(|_| VcfError::parse(index, format!("negative position {}", record.pos())))?;
        if position == 0 {
            return Err(VcfError::parse(index, "POS must be 1-based"));
        }

        let alleles: Vec<Box<str>> = record
            .alleles()
            .into_iter()
            .map(|allele| Box::from(String::from_utf8_lossy(allele)))
            .collect();
        match alleles.first() {
            Some(reference) if !reference.is_empty() && reference.as_ref() != "." => {}
            _ => return Err(VcfError::parse(index, "missing REF allele")),
        }

        let id = record.id();
        let qual = record.qual();

        Ok(Variant {
            chrom,
            position,
            id: (id.as_slice() != b".").then(|| Box::from(String::from_utf8_lossy(&id))),
            alleles,
            quality: (!qual.is_missing()).then_some(qual),
        })
    }
}

/// Render a header record the way it reads after `##` in VCF text.
///
/// htslib's internal `IDX` bookkeeping key is dropped.
fn meta_line(record: &HeaderRecord) -> String {
    let (key, values) = match record {
        HeaderRecord::Generic { key, value } => return format!("{key}={value}"),
        HeaderRecord::Filter { key, values }
        | HeaderRecord::Info { key, values }
        | HeaderRecord::Format { key, values }
        | HeaderRecord::Contig { key, values }
        | HeaderRecord::Structured { key, values } => (key, values),
    };
    let body: Vec<String> = values
        .iter()
        .filter(|(name, _)| name.as_str() != "IDX")
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("{key}=<{}>", body.join(","))
}

fn contig_length(records: &[HeaderRecord], name: &str) -> Option<u64> {
    records.iter().find_map(|record| match record {
        HeaderRecord::Contig { values, .. }
            if values.get("ID").map(String::as_str) == Some(name) =>
        {
            values.get("length").and_then(|length| length.parse().ok())
        }
        _ => None,
    })
}

impl Iterator for HtsVcfReader {
    type Item = Result<Variant, VcfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = self.reader.read(&mut self.record)? {
            return Some(Err(err.into()));
        }
        self.records_read += 1;
        Some(self.convert())
    }
}

impl VariantSource for HtsVcfReader {
    fn header(&self) -> Arc<VariantHeader> {
        Arc::clone(&self.header)
    }
}
