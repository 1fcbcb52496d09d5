use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::Split;
use std::sync::Arc;

use super::{ContigInfo, Variant, VariantHeader, VariantSource, VcfError};
use crate::record::Position;

const COLUMN_HEADER: &str = "#CHROM";
const LINE_END: &[char] = &['\n', '\r'];

/// Streaming reader for uncompressed VCF text.
///
/// The header is consumed eagerly by [`VcfReader::new`] so it is available
/// before the first record. Only the fixed columns the index needs (CHROM,
/// POS, ID, REF, ALT, QUAL) are decoded; INFO and sample columns are
/// skipped.
#[derive(Debug)]
pub struct VcfReader<R> {
    reader: R,
    header: Arc<VariantHeader>,
    line: usize,
    buf: String,
    last_chrom: Option<Arc<str>>,
}

impl VcfReader<BufReader<File>> {
    /// Open a plain-text VCF file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> VcfReader<R> {
    /// Parse the header and position the reader on the first record.
    pub fn new(mut reader: R) -> Result<Self, VcfError> {
        let mut header = VariantHeader::default();
        let mut buf = String::new();
        let mut line = 0;

        loop {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                break;
            }
            line += 1;
            let text = buf.trim_end_matches(LINE_END);

            if let Some(meta) = text.strip_prefix("##") {
                if let Some(contig) = meta.strip_prefix("contig=") {
                    header.contigs.push(parse_contig(contig, line)?);
                }
                header.meta.push(meta.to_string());
            } else if text.starts_with(COLUMN_HEADER) {
                header.samples = text.split('\t').skip(9).map(str::to_string).collect();
                break;
            } else if text.trim().is_empty() {
                continue;
            } else {
                return Err(VcfError::MissingColumnHeader { line });
            }
        }

        Ok(Self {
            reader,
            header: Arc::new(header),
            line,
            buf,
            last_chrom: None,
        })
    }

    fn parse_record(&mut self) -> Result<Variant, VcfError> {
        let line = self.line;
        let text = self.buf.trim_end_matches(LINE_END);
        let mut fields = text.split('\t');

        let chrom = field(&mut fields, line, "CHROM")?;
        let pos = field(&mut fields, line, "POS")?;
        let id = field(&mut fields, line, "ID")?;
        let reference = field(&mut fields, line, "REF")?;
        let alt = field(&mut fields, line, "ALT")?;
        let qual = fields.next();

        let position: Position = pos
            .parse()
            .map_err(|_| VcfError::parse(line, format!("invalid POS '{pos}'")))?;
        if position == 0 {
            return Err(VcfError::parse(line, "POS must be 1-based"));
        }
        if reference.is_empty() || reference == "." {
            return Err(VcfError::parse(line, "missing REF allele"));
        }

        let quality = match qual {
            None | Some(".") => None,
            Some(q) => Some(
                q.parse::<f32>()
                    .map_err(|_| VcfError::parse(line, format!("invalid QUAL '{q}'")))?,
            ),
        };

        let mut alleles = vec![Box::<str>::from(reference)];
        if alt != "." {
            alleles.extend(alt.split(',').map(Box::<str>::from));
        }

        let reused = self
            .last_chrom
            .as_ref()
            .filter(|last| last.as_ref() == chrom)
            .cloned();
        let chrom = match reused {
            Some(last) => last,
            None => {
                let fresh: Arc<str> = Arc::from(chrom);
                self.last_chrom = Some(Arc::clone(&fresh));
                fresh
            }
        };

        Ok(Variant {
            chrom,
            position,
            id: (id != ".").then(|| Box::from(id)),
            alleles,
            quality,
        })
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<Variant, VcfError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(err) => return Some(Err(err.into())),
            }

            let text = self.buf.trim_end_matches(LINE_END);
            if text.trim().is_empty() {
                continue;
            }
            if text.starts_with('#') {
                return Some(Err(VcfError::parse(
                    self.line,
                    "header line after #CHROM",
                )));
            }
            return Some(self.parse_record());
        }
    }
}

impl<R: BufRead> VariantSource for VcfReader<R> {
    fn header(&self) -> Arc<VariantHeader> {
        Arc::clone(&self.header)
    }
}

fn field<'a>(fields: &mut Split<'a, char>, line: usize, name: &str) -> Result<&'a str, VcfError> {
    fields
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| VcfError::parse(line, format!("missing {name} column")))
}

/// Parse the `<ID=..,length=..>` body of a contig line.
fn parse_contig(body: &str, line: usize) -> Result<ContigInfo, VcfError> {
    let inner = body
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .ok_or_else(|| VcfError::parse(line, "contig line is not <...> structured"))?;

    let mut name: Option<Arc<str>> = None;
    let mut length = None;
    for entry in inner.split(',') {
        match entry.split_once('=') {
            Some(("ID", value)) => name = Some(Arc::from(value)),
            Some(("length", value)) => {
                length = Some(value.parse::<u64>().map_err(|_| {
                    VcfError::parse(line, format!("invalid contig length '{value}'"))
                })?)
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| VcfError::parse(line, "contig line without ID"))?;
    Ok(ContigInfo { name, length })
}
