use std::path::Path;

use vannot_core::Result;
use vannot_core::models::LocRecord;
use vannot_core::schema::{Dialect, RecordSchema};

use crate::filters::{CommentLineFilter, EmptyLineFilter, LineFilter, LocationFilter};
use crate::source::RawSource;

/// Lazy, filtered record stream over one physical source.
///
/// Construction validates the schema and resolves the file's header
/// once; after that the reader is a pull iterator. Line filters run on
/// the raw text, location filters on the decoded record, each in
/// registration order, and a record is yielded only when every filter
/// accepts it.
pub struct RecordReader {
    source: RawSource,
    schema: RecordSchema,
    line_filters: Vec<Box<dyn LineFilter>>,
    location_filters: Vec<Box<dyn LocationFilter>>,
    pending: Option<String>,
}

impl RecordReader {
    pub fn open<P: AsRef<Path>>(path: P, schema: RecordSchema) -> Result<Self> {
        let source = RawSource::open(path)?;
        Self::from_source(source, schema)
    }

    pub fn from_source(source: RawSource, mut schema: RecordSchema) -> Result<Self> {
        schema.validate()?;

        let line_filters: Vec<Box<dyn LineFilter>> = vec![
            Box::new(EmptyLineFilter),
            Box::new(CommentLineFilter::new(schema.comment_indicator())),
        ];

        let mut reader = RecordReader {
            source,
            schema,
            line_filters,
            location_filters: Vec::new(),
            pending: None,
        };
        reader.resolve_header()?;
        Ok(reader)
    }

    /// Consume leading comment lines and capture the header line if one
    /// is present, leaving the first data line pending.
    fn resolve_header(&mut self) -> Result<()> {
        let mut buf = String::new();
        while self.source.next_line(&mut buf)? {
            if buf.starts_with(self.schema.comment_indicator()) {
                continue;
            }
            if buf.starts_with('#') {
                // dialect header line, e.g. VCF's #CHROM
                self.schema.set_header(&buf);
                continue;
            }
            if self.schema.has_header() && self.schema.header_cols().is_none() {
                self.schema.set_header(&buf);
                continue;
            }
            self.pending = Some(std::mem::take(&mut buf));
            break;
        }
        Ok(())
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn kind(&self) -> crate::source::SourceKind {
        self.source.kind()
    }

    pub fn add_line_filter(&mut self, filter: Box<dyn LineFilter>) {
        self.line_filters.push(filter);
    }

    /// Bind location filters. On a schema without positional columns
    /// this is accepted but has no effect.
    pub fn set_location_filters(&mut self, filters: Vec<Box<dyn LocationFilter>>) {
        self.location_filters = filters;
    }

    /// Seek the underlying block-gzip source; any buffered line is
    /// discarded so the next pull decodes from the new position.
    pub fn seek_virtual(&mut self, vpos: u64) -> Result<()> {
        self.pending = None;
        self.source.seek_virtual(vpos)
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        let mut buf = String::new();
        if self.source.next_line(&mut buf)? {
            Ok(Some(buf))
        } else {
            Ok(None)
        }
    }

    /// Pull the next record that passes every filter.
    pub fn next_record(&mut self) -> Result<Option<LocRecord>> {
        loop {
            let line = match self.next_line()? {
                Some(line) => line,
                None => return Ok(None),
            };

            if !self.line_filters.iter().all(|f| f.accept(&line)) {
                continue;
            }

            let record = self.schema.parse_line(&line)?;

            // location filters only mean something for positioned records
            if self.schema.dialect() != Dialect::Rsid
                && !self.location_filters.iter().all(|f| f.accept(&record))
            {
                continue;
            }

            return Ok(Some(record));
        }
    }
}

impl Iterator for RecordReader {
    type Item = Result<LocRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::RegionFilter;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[rstest]
    fn test_bed_stream_with_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "a.bed",
            "##library=x\nchr1\t10\t20\n\nchr1\t30\t40\nchr2\t5\t9\n",
        );

        let reader = RecordReader::open(&path, RecordSchema::bed()).unwrap();
        let records: Vec<LocRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_region_string(), "chr1:10-20");
        assert_eq!(records[2].chrom, "chr2");
    }

    #[rstest]
    fn test_vcf_header_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "a.vcf",
            "##fileformat=VCFv4.2\n##contig=<ID=chr1>\n#CHROM\tPOS\tID\tREF\tALT\n\
             chr1\t100\trs1\tA\tG\nchr1\t200\trs2\tAT\tA\n",
        );

        let mut reader = RecordReader::open(&path, RecordSchema::vcf()).unwrap();
        assert_eq!(reader.schema().column_index("POS"), Some(2));
        assert_eq!(reader.schema().column_index("ref"), Some(4));

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.begin, 99);
        assert_eq!(first.end, 100);
        assert_eq!(first.rsid, None);
        assert_eq!(first.ref_allele.as_deref(), Some("A"));

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.begin, 199);
        assert_eq!(second.end, 201); // two-base REF

        assert!(reader.next_record().unwrap().is_none());
    }

    #[rstest]
    fn test_declared_header_line_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.tsv", "chrom\tstart\tend\nchr1\t10\t20\n");

        let mut schema = RecordSchema::bed();
        schema.set_has_header(true);
        let mut reader = RecordReader::open(&path, schema).unwrap();

        assert_eq!(reader.schema().column_index("start"), Some(2));
        let rec = reader.next_record().unwrap().unwrap();
        assert_eq!(rec.begin, 10);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[rstest]
    fn test_location_filters_narrow_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.bed", "chr1\t10\t20\nchr1\t300\t400\nchr2\t10\t20\n");

        let mut reader = RecordReader::open(&path, RecordSchema::bed()).unwrap();
        reader.set_location_filters(vec![Box::new(RegionFilter::new("chr1", 0, 100))]);

        let records: Vec<LocRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_region_string(), "chr1:10-20");
    }

    #[rstest]
    fn test_location_filters_noop_on_rsid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.tsv", "x\trs1\ny\trs2\n");

        let mut reader = RecordReader::open(&path, RecordSchema::rsid()).unwrap();
        // binding positional filters to a non-positional stream is
        // accepted and ignored
        reader.set_location_filters(vec![Box::new(RegionFilter::new("chr1", 0, 1))]);

        let records: Vec<LocRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].rsid.as_deref(), Some("rs2"));
    }

    #[rstest]
    fn test_custom_line_filter_runs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.bed", "chr1\t10\t20\nchr2\t10\t20\n");

        struct DropChr2;
        impl crate::filters::LineFilter for DropChr2 {
            fn accept(&self, line: &str) -> bool {
                !line.starts_with("chr2")
            }
        }

        let mut reader = RecordReader::open(&path, RecordSchema::bed()).unwrap();
        reader.add_line_filter(Box::new(DropChr2));
        let records: Vec<LocRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chrom, "chr1");
    }

    #[rstest]
    fn test_malformed_line_surfaces_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.bed", "chr1\tnot-a-number\t20\n");

        let mut reader = RecordReader::open(&path, RecordSchema::bed()).unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, vannot_core::VannotError::Parse(_)));
    }
}
