use std::fmt::{self, Display};

use crate::models::interval::GenomicInterval;

/// One schema-applied record from a query or database file.
///
/// Coordinates are normalized to 0-based half-open before a `LocRecord`
/// is constructed, regardless of the source dialect. The raw line is
/// kept so sinks can emit the original text without re-reading the
/// source.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct LocRecord {
    pub chrom: String,
    pub begin: u32,
    pub end: u32,

    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub rsid: Option<String>,

    pub line: String,
}

impl LocRecord {
    pub fn new(chrom: String, begin: u32, end: u32, line: String) -> Self {
        LocRecord {
            chrom,
            begin,
            end,
            ref_allele: None,
            alt_allele: None,
            rsid: None,
            line,
        }
    }

    /// Region string of this record, `chrom:begin-end`.
    pub fn as_region_string(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.begin, self.end)
    }
}

impl GenomicInterval for LocRecord {
    #[inline]
    fn begin(&self) -> u32 {
        self.begin
    }

    #[inline]
    fn end(&self) -> u32 {
        self.end
    }
}

impl Display for LocRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_region_string() {
        let rec = LocRecord::new("chr1".to_string(), 100, 200, "chr1\t100\t200".to_string());
        assert_eq!(rec.as_region_string(), "chr1:100-200");
        assert!(rec.overlap(150, 250));
        assert!(!rec.overlap(200, 250));
    }
}
