use vannot_core::models::{GenomicInterval, LocRecord};

/// Row-level predicate applied to raw lines before decoding.
///
/// Filters must be pure: a rebound reader replays the stream and every
/// filter is evaluated again.
pub trait LineFilter {
    fn accept(&self, line: &str) -> bool;
}

/// Location-level predicate applied to decoded records.
pub trait LocationFilter {
    fn accept(&self, record: &LocRecord) -> bool;
}

/// Drops blank lines.
pub struct EmptyLineFilter;

impl LineFilter for EmptyLineFilter {
    fn accept(&self, line: &str) -> bool {
        !line.trim().is_empty()
    }
}

/// Drops lines starting with a comment indicator.
pub struct CommentLineFilter {
    indicator: String,
}

impl CommentLineFilter {
    pub fn new(indicator: &str) -> Self {
        CommentLineFilter {
            indicator: indicator.to_string(),
        }
    }
}

impl LineFilter for CommentLineFilter {
    fn accept(&self, line: &str) -> bool {
        !line.starts_with(&self.indicator)
    }
}

/// Keeps records intersecting one half-open region.
pub struct RegionFilter {
    chrom: String,
    begin: u32,
    end: u32,
}

impl RegionFilter {
    pub fn new(chrom: &str, begin: u32, end: u32) -> Self {
        RegionFilter {
            chrom: chrom.to_string(),
            begin,
            end,
        }
    }
}

impl LocationFilter for RegionFilter {
    fn accept(&self, record: &LocRecord) -> bool {
        record.chrom == self.chrom && record.overlap(self.begin, self.end)
    }
}
