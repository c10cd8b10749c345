use std::str::FromStr;

use crate::errors::{Result, VannotError};
use crate::models::LocRecord;

/// Sentinel for "this column is not present".
pub const NO_COL: i32 = -1;
/// Default 1-based column holding the rs identifier in RSID files.
pub const DEFAULT_RSID_COL: i32 = 2;
/// REF alleles longer than this are truncated for end-coordinate
/// derivation unless the schema allows large variants.
pub const DEFAULT_MAX_VARIANT_LENGTH: u32 = 1000;
/// How many leading bytes of a header line are kept for comparison.
pub const MAX_HEADER_COMPARE_LENGTH: usize = 128;
/// How many leading bytes of a header line form its short signature.
pub const START_COMPARE_LENGTH: usize = 7;
pub const DEFAULT_COMMENT_INDICATOR: &str = "##";

/// File dialect a schema interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Vcf,
    Bed,
    BedAllele,
    Tab,
    Rsid,
}

impl FromStr for Dialect {
    type Err = VannotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vcf" => Ok(Dialect::Vcf),
            "bed" => Ok(Dialect::Bed),
            "bedallele" | "bed-allele" => Ok(Dialect::BedAllele),
            "tab" => Ok(Dialect::Tab),
            "rsid" => Ok(Dialect::Rsid),
            _ => Err(VannotError::Configuration(format!(
                "unknown dialect: {}. Valid options are vcf, bed, bedallele, tab, rsid",
                s
            ))),
        }
    }
}

/// Column delimiter of a record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
    Space,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
            Delimiter::Space => ' ',
        }
    }
}

/// Declares how to pull chromosome, coordinates, and alleles out of a
/// row for one input file.
///
/// Column indices are 1-based with [`NO_COL`] meaning absent. A schema
/// must pass [`validate`](RecordSchema::validate) before it is used for
/// extraction; after that it is immutable except for the header fields,
/// which are resolved once when the file's header line is first seen.
///
/// Coordinates leave [`parse_line`](RecordSchema::parse_line) already
/// normalized to 0-based half-open, whatever the file's convention.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub sequence_col: i32,
    pub begin_col: i32,
    pub end_col: i32,
    pub ref_col: i32,
    pub alt_col: i32,
    pub rsid_col: i32,

    zero_based: bool,
    delimiter: Delimiter,
    comment_indicator: String,
    has_header: bool,
    dialect: Dialect,

    header_cols: Option<Vec<String>>,
    header_str: Option<String>,
    header_start: Option<String>,

    max_variant_len: u32,
    allow_large_variants: bool,

    validated: bool,
}

impl RecordSchema {
    fn new(
        dialect: Dialect,
        sequence_col: i32,
        begin_col: i32,
        end_col: i32,
        ref_col: i32,
        alt_col: i32,
        zero_based: bool,
        has_header: bool,
    ) -> Self {
        RecordSchema {
            sequence_col,
            begin_col,
            end_col,
            ref_col,
            alt_col,
            rsid_col: NO_COL,
            zero_based,
            delimiter: Delimiter::default(),
            comment_indicator: DEFAULT_COMMENT_INDICATOR.to_string(),
            has_header,
            dialect,
            header_cols: None,
            header_str: None,
            header_start: None,
            max_variant_len: DEFAULT_MAX_VARIANT_LENGTH,
            allow_large_variants: false,
            validated: false,
        }
    }

    /// VCF: CHROM=1, POS=2, REF=4, ALT=5, 1-based, headered. The end
    /// coordinate is derived from the REF allele length.
    pub fn vcf() -> Self {
        Self::new(Dialect::Vcf, 1, 2, 0, 4, 5, false, true)
    }

    /// BED: chrom=1, start=2, end=3, 0-based half-open.
    pub fn bed() -> Self {
        Self::new(Dialect::Bed, 1, 2, 3, NO_COL, NO_COL, true, false)
    }

    /// BED with ref/alt allele columns appended (columns 4 and 5).
    pub fn bed_allele() -> Self {
        Self::new(Dialect::BedAllele, 1, 2, 3, 4, 5, true, false)
    }

    /// Generic TAB file; positional columns must be configured before
    /// `validate()` will accept it.
    pub fn tab() -> Self {
        Self::new(Dialect::Tab, NO_COL, NO_COL, NO_COL, NO_COL, NO_COL, false, false)
    }

    /// RSID-keyed file: no positional columns, identifier in column 2.
    pub fn rsid() -> Self {
        let mut schema = Self::new(
            Dialect::Rsid,
            NO_COL,
            NO_COL,
            NO_COL,
            NO_COL,
            NO_COL,
            false,
            false,
        );
        schema.rsid_col = DEFAULT_RSID_COL;
        schema
    }

    /// Check the positional column setup and normalize the end column.
    ///
    /// Every dialect other than [`Dialect::Rsid`] needs a sequence
    /// column, a start column, and a non-negative end column; `end_col
    /// == 0` means "point feature" and is rewritten to the start column.
    /// Must be called before [`parse_line`](Self::parse_line).
    pub fn validate(&mut self) -> Result<()> {
        if self.dialect != Dialect::Rsid {
            if self.sequence_col < 1 {
                return Err(VannotError::Configuration(
                    "a valid sequence-name column is required".to_string(),
                ));
            }
            if self.begin_col < 1 {
                return Err(VannotError::Configuration(
                    "a valid start-position column is required".to_string(),
                ));
            }
            if self.end_col < 0 {
                return Err(VannotError::Configuration(
                    "a valid end-position column is required".to_string(),
                ));
            }
        }

        if self.end_col == 0 {
            self.end_col = self.begin_col;
        }
        self.validated = true;
        Ok(())
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// True when the end coordinate is the start coordinate: SNV-like
    /// rows rather than ranged features.
    pub fn is_point_feature(&self) -> bool {
        self.end_col == 0 || self.end_col == self.begin_col
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_zero_based(&self) -> bool {
        self.zero_based
    }

    pub fn set_zero_based(&mut self, zero_based: bool) {
        self.zero_based = zero_based;
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    pub fn set_delimiter(&mut self, delimiter: Delimiter) {
        self.delimiter = delimiter;
    }

    pub fn comment_indicator(&self) -> &str {
        &self.comment_indicator
    }

    pub fn set_comment_indicator(&mut self, indicator: &str) {
        if indicator.is_empty() {
            return;
        }
        self.comment_indicator = indicator.trim().to_string();
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn set_has_header(&mut self, has_header: bool) {
        self.has_header = has_header;
    }

    pub fn max_variant_len(&self) -> u32 {
        self.max_variant_len
    }

    pub fn set_max_variant_len(&mut self, max: u32) {
        self.max_variant_len = max;
    }

    pub fn allow_large_variants(&self) -> bool {
        self.allow_large_variants
    }

    pub fn set_allow_large_variants(&mut self, allow: bool) {
        self.allow_large_variants = allow;
    }

    /// The line prefix that marks this dialect's column-header line, if
    /// the dialect has a fixed one.
    pub fn header_prefix(&self) -> Option<&'static str> {
        match self.dialect {
            Dialect::Vcf => Some("#CHROM"),
            _ => None,
        }
    }

    /// Record the file's header line. Called once by the reader when
    /// the header is first seen; later calls replace the earlier
    /// resolution.
    pub fn set_header(&mut self, line: &str) {
        let cols = line
            .trim_start_matches('#')
            .split(self.delimiter.as_char())
            .map(|c| c.to_string())
            .collect();
        self.header_cols = Some(cols);
        self.header_str = Some(truncated(line, MAX_HEADER_COMPARE_LENGTH));
        self.header_start = Some(truncated(line, START_COMPARE_LENGTH));
    }

    pub fn header_cols(&self) -> Option<&[String]> {
        self.header_cols.as_deref()
    }

    pub fn header_str(&self) -> Option<&str> {
        self.header_str.as_deref()
    }

    pub fn header_start(&self) -> Option<&str> {
        self.header_start.as_deref()
    }

    /// 1-based index of a named header column, case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<i32> {
        let cols = self.header_cols.as_ref()?;
        cols.iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| i as i32 + 1)
    }

    /// Name of a 1-based header column.
    pub fn column_name(&self, col: i32) -> Option<&str> {
        if col < 1 {
            return None;
        }
        self.header_cols
            .as_ref()
            .and_then(|cols| cols.get(col as usize - 1))
            .map(|s| s.as_str())
    }

    /// Interpret one data line into a [`LocRecord`].
    ///
    /// Fails with `Configuration` when the schema was never validated,
    /// and `Parse` when a required field is missing or malformed.
    pub fn parse_line(&self, line: &str) -> Result<LocRecord> {
        if !self.validated {
            return Err(VannotError::Configuration(
                "schema must be validated before records are extracted".to_string(),
            ));
        }

        let fields: Vec<&str> = line.split(self.delimiter.as_char()).collect();

        if self.dialect == Dialect::Rsid {
            let rsid = self.field(&fields, self.rsid_col, line, "rs identifier")?;
            let mut record = LocRecord::new(String::new(), 0, 0, line.to_string());
            record.rsid = Some(rsid.to_string());
            return Ok(record);
        }

        let chrom = self.field(&fields, self.sequence_col, line, "sequence name")?;
        let raw_begin = self.parse_coord(&fields, self.begin_col, line, "start position")?;

        let begin = if self.zero_based {
            raw_begin
        } else {
            raw_begin.checked_sub(1).ok_or_else(|| {
                VannotError::Parse(format!("1-based start position cannot be 0 in: {}", line))
            })?
        };

        let ref_allele = self.optional_field(&fields, self.ref_col);
        let alt_allele = self.optional_field(&fields, self.alt_col);

        // A 1-based closed end equals the half-open end numerically, so
        // only the point-feature and VCF cases need derivation.
        let end = if self.dialect == Dialect::Vcf {
            let ref_len = ref_allele.as_deref().map_or(1, |r| r.len() as u32).max(1);
            let capped = if self.allow_large_variants {
                ref_len
            } else {
                ref_len.min(self.max_variant_len)
            };
            begin + capped
        } else if self.is_point_feature() {
            begin + 1
        } else {
            let raw_end = self.parse_coord(&fields, self.end_col, line, "end position")?;
            if raw_end < begin {
                return Err(VannotError::Parse(format!(
                    "end position precedes start position in: {}",
                    line
                )));
            }
            raw_end
        };

        let mut record = LocRecord::new(chrom.to_string(), begin, end, line.to_string());
        record.ref_allele = ref_allele;
        record.alt_allele = alt_allele;
        Ok(record)
    }

    fn field<'a>(&self, fields: &[&'a str], col: i32, line: &str, what: &str) -> Result<&'a str> {
        if col < 1 {
            return Err(VannotError::Configuration(format!(
                "no column configured for {}",
                what
            )));
        }
        fields.get(col as usize - 1).copied().ok_or_else(|| {
            VannotError::Parse(format!(
                "line has {} columns but {} expected in column {}: {}",
                fields.len(),
                what,
                col,
                line
            ))
        })
    }

    fn optional_field(&self, fields: &[&str], col: i32) -> Option<String> {
        if col < 1 {
            return None;
        }
        fields.get(col as usize - 1).map(|s| s.to_string())
    }

    fn parse_coord(&self, fields: &[&str], col: i32, line: &str, what: &str) -> Result<u32> {
        let raw = self.field(fields, col, line, what)?;
        raw.parse::<u32>().map_err(|_| {
            VannotError::Parse(format!("invalid {} '{}' in: {}", what, raw, line))
        })
    }

    /// Serialize the column setup to the 9-field comma string persisted
    /// alongside an index.
    pub fn to_spec_string(&self) -> String {
        let dialect = match self.dialect {
            Dialect::Vcf => "vcf",
            Dialect::Bed => "bed",
            Dialect::BedAllele => "bedallele",
            Dialect::Tab => "tab",
            Dialect::Rsid => "rsid",
        };
        format!(
            "{},{},{},{},{},{},{},{},{}",
            dialect,
            self.sequence_col,
            self.begin_col,
            self.end_col,
            if self.zero_based { 1 } else { 0 },
            self.comment_indicator,
            self.ref_col,
            self.alt_col,
            if self.has_header { 1 } else { 0 },
        )
    }

    /// Inverse of [`to_spec_string`](Self::to_spec_string). The result
    /// is not yet validated.
    pub fn from_spec_string(s: &str) -> Result<Self> {
        let cols: Vec<&str> = s.split(',').collect();
        if cols.len() != 9 {
            return Err(VannotError::Configuration(format!(
                "parsing schema string with error, 9 columns are expected: {}",
                s
            )));
        }

        let dialect = Dialect::from_str(cols[0])?;
        let parse_col = |v: &str, what: &str| -> Result<i32> {
            v.parse::<i32>().map_err(|_| {
                VannotError::Configuration(format!("invalid {} column '{}' in schema string", what, v))
            })
        };

        let mut schema = Self::new(
            dialect,
            parse_col(cols[1], "sequence")?,
            parse_col(cols[2], "start")?,
            parse_col(cols[3], "end")?,
            parse_col(cols[6], "ref")?,
            parse_col(cols[7], "alt")?,
            cols[4] == "1",
            cols[8] == "1",
        );
        if dialect == Dialect::Rsid {
            schema.rsid_col = DEFAULT_RSID_COL;
        }
        schema.set_comment_indicator(cols[5]);
        Ok(schema)
    }
}

fn truncated(s: &str, max: usize) -> String {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_presets() {
        let vcf = RecordSchema::vcf();
        assert_eq!(vcf.sequence_col, 1);
        assert_eq!(vcf.begin_col, 2);
        assert_eq!(vcf.end_col, 0);
        assert_eq!(vcf.ref_col, 4);
        assert_eq!(vcf.alt_col, 5);
        assert!(vcf.has_header());
        assert!(!vcf.is_zero_based());

        let bed = RecordSchema::bed();
        assert_eq!((bed.sequence_col, bed.begin_col, bed.end_col), (1, 2, 3));
        assert!(bed.is_zero_based());
        assert!(!bed.is_point_feature());
    }

    #[rstest]
    fn test_validate_normalizes_point_end_column() {
        let mut schema = RecordSchema::vcf();
        schema.validate().unwrap();
        assert_eq!(schema.end_col, schema.begin_col);
        assert!(schema.is_point_feature());
    }

    #[rstest]
    fn test_validate_rejects_missing_columns() {
        let mut schema = RecordSchema::tab();
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, VannotError::Configuration(_)));
        assert!(err.to_string().contains("sequence-name"));

        let mut schema = RecordSchema::tab();
        schema.sequence_col = 1;
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("start-position"));
    }

    #[rstest]
    fn test_rsid_skips_positional_checks() {
        let mut schema = RecordSchema::rsid();
        schema.validate().unwrap();
        let rec = schema.parse_line("x\trs12345\ty").unwrap();
        assert_eq!(rec.rsid.as_deref(), Some("rs12345"));
        assert_eq!(rec.begin, 0);
        assert_eq!(rec.end, 0);
    }

    #[rstest]
    fn test_parse_bed_line_passthrough() {
        let mut schema = RecordSchema::bed();
        schema.validate().unwrap();
        let rec = schema.parse_line("chr1\t32481\t32787\tpeak_1\t92").unwrap();
        assert_eq!(rec.chrom, "chr1");
        assert_eq!(rec.begin, 32481);
        assert_eq!(rec.end, 32787);
    }

    #[rstest]
    fn test_parse_one_based_normalization() {
        let mut schema = RecordSchema::tab();
        schema.sequence_col = 1;
        schema.begin_col = 2;
        schema.end_col = 3;
        schema.validate().unwrap();

        // 1-based closed [100, 105] is half-open [99, 105)
        let rec = schema.parse_line("chr2\t100\t105").unwrap();
        assert_eq!(rec.begin, 99);
        assert_eq!(rec.end, 105);

        let err = schema.parse_line("chr2\t0\t105").unwrap_err();
        assert!(matches!(err, VannotError::Parse(_)));
    }

    #[rstest]
    #[case("ACGT", 4)]
    #[case("A", 1)]
    fn test_vcf_end_from_ref_length(#[case] ref_allele: &str, #[case] width: u32) {
        let mut schema = RecordSchema::vcf();
        schema.validate().unwrap();
        let line = format!("chr1\t1000\trs1\t{}\tA\t.\tPASS", ref_allele);
        let rec = schema.parse_line(&line).unwrap();
        assert_eq!(rec.begin, 999);
        assert_eq!(rec.end, 999 + width);
        assert_eq!(rec.ref_allele.as_deref(), Some(ref_allele));
    }

    #[rstest]
    fn test_vcf_large_variant_cap() {
        let mut schema = RecordSchema::vcf();
        schema.set_max_variant_len(10);
        schema.validate().unwrap();

        let big_ref = "A".repeat(50);
        let line = format!("chr1\t1000\trs1\t{}\tA\t.\tPASS", big_ref);

        let rec = schema.parse_line(&line).unwrap();
        assert_eq!(rec.end - rec.begin, 10);

        let mut schema = RecordSchema::vcf();
        schema.set_max_variant_len(10);
        schema.set_allow_large_variants(true);
        schema.validate().unwrap();
        let rec = schema.parse_line(&line).unwrap();
        assert_eq!(rec.end - rec.begin, 50);
    }

    #[rstest]
    fn test_parse_rejects_short_line() {
        let mut schema = RecordSchema::bed();
        schema.validate().unwrap();
        let err = schema.parse_line("chr1\t100").unwrap_err();
        assert!(matches!(err, VannotError::Parse(_)));
    }

    #[rstest]
    fn test_unvalidated_schema_is_rejected() {
        let schema = RecordSchema::bed();
        let err = schema.parse_line("chr1\t1\t2").unwrap_err();
        assert!(matches!(err, VannotError::Configuration(_)));
    }

    #[rstest]
    fn test_header_resolution_and_lookup() {
        let mut schema = RecordSchema::vcf();
        schema.set_header("#CHROM\tPOS\tID\tREF\tALT\tQUAL");
        assert_eq!(schema.column_index("pos"), Some(2));
        assert_eq!(schema.column_index("QUAL"), Some(6));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.column_name(4), Some("REF"));
        assert_eq!(schema.header_start(), Some("#CHROM\t"));
    }

    #[rstest]
    fn test_spec_string_round_trip() {
        let mut schema = RecordSchema::bed_allele();
        schema.set_comment_indicator("#!");
        let spec = schema.to_spec_string();
        let parsed = RecordSchema::from_spec_string(&spec).unwrap();
        assert_eq!(parsed.dialect(), Dialect::BedAllele);
        assert_eq!(parsed.sequence_col, 1);
        assert_eq!(parsed.begin_col, 2);
        assert_eq!(parsed.end_col, 3);
        assert_eq!(parsed.ref_col, 4);
        assert_eq!(parsed.alt_col, 5);
        assert!(parsed.is_zero_based());
        assert_eq!(parsed.comment_indicator(), "#!");
        assert_eq!(parsed.to_spec_string(), spec);
    }

    #[rstest]
    fn test_spec_string_rejects_wrong_arity() {
        let err = RecordSchema::from_spec_string("vcf,1,2").unwrap_err();
        assert!(err.to_string().contains("9 columns"));
    }
}
