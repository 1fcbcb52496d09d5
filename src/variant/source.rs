use std::sync::Arc;

use thiserror::Error;

use super::{Variant, VariantHeader};

/// Errors raised while reading variants.
#[derive(Debug, Error)]
pub enum VcfError {
    /// Underlying read failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// htslib could not open or decode the file.
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    /// Data line seen before the `#CHROM` column header.
    #[error("line {line}: data before the #CHROM header line")]
    MissingColumnHeader {
        /// 1-based line number.
        line: usize,
    },

    /// Malformed header or data line.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number (record index for binary input).
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// Record refers to a contig id the header does not declare.
    #[error("record {record} refers to undeclared contig id {rid}")]
    UnknownContig {
        /// 1-based record index.
        record: usize,
        /// Contig id found on the record.
        rid: u32,
    },
}

impl VcfError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        VcfError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Stream of variants plus the header they were declared under.
///
/// Implemented by the bundled readers; tests and callers with their own
/// parsers can implement it over any iterator.
pub trait VariantSource: Iterator<Item = Result<Variant, VcfError>> {
    /// Header metadata, shared with the store built from this source.
    fn header(&self) -> Arc<VariantHeader>;
}
