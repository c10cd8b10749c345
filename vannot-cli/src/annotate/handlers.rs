use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use fxhash::FxHashMap as HashMap;
use indicatif::ProgressBar;

use vannot_core::models::LocRecord;
use vannot_core::schema::{Dialect, RecordSchema};
use vannot_io::RecordReader;
use vannot_join::{ReaderStack, ResultSink};

/// Writes one TSV row per query: the raw query line, the hit count,
/// and the matching database lines joined by ';'.
struct TsvSink<W: Write> {
    out: W,
    queries: u64,
    hits: u64,
    failed: Option<io::Error>,
}

impl<W: Write> TsvSink<W> {
    fn new(out: W) -> Self {
        TsvSink {
            out,
            queries: 0,
            hits: 0,
            failed: None,
        }
    }
}

impl<W: Write> ResultSink<LocRecord> for TsvSink<W> {
    fn accept(&mut self, query: &LocRecord, matches: &[LocRecord]) {
        self.queries += 1;
        self.hits += matches.len() as u64;

        let joined = matches
            .iter()
            .map(|m| m.line.as_str())
            .collect::<Vec<_>>()
            .join(";");
        // the sink contract has no error channel; the first failure is
        // kept and surfaced when the run finishes
        if self.failed.is_none() {
            if let Err(e) = writeln!(self.out, "{}\t{}\t{}", query.line, matches.len(), joined) {
                self.failed = Some(e);
            }
        }
    }
}

pub fn run_annotate(matches: &ArgMatches) -> Result<()> {
    let query_file = matches
        .get_one::<String>("query")
        .expect("A path to a query file is required.");

    let database_file = matches
        .get_one::<String>("database")
        .expect("A path to a database file is required.");

    let query_schema = build_schema(matches, "query-format")?;
    let db_schema = build_schema(matches, "db-format")?;

    // group both sides by chromosome, keeping the query file's
    // chromosome order for the output
    let (chrom_order, mut queries) = read_grouped(query_file, query_schema)
        .with_context(|| format!("Failed to read query file: {}", query_file))?;
    let (_, mut database) = read_grouped(database_file, db_schema)
        .with_context(|| format!("Failed to read database file: {}", database_file))?;

    let out: Box<dyn Write> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create: {}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let mut stack = ReaderStack::new(TsvSink::new(out));

    let bar = ProgressBar::new(chrom_order.len() as u64);
    for chrom in &chrom_order {
        let chrom_queries = queries.remove(chrom).unwrap_or_default();
        match database.remove(chrom) {
            Some(records) => {
                stack.set_iterator(Box::new(records.into_iter().map(Ok)));
            }
            None => {
                // chromosome absent from the database: every query on it
                // reports zero matches
                stack.set_iterator(Box::new(std::iter::empty()));
            }
        }
        stack
            .find_overlaps(&chrom_queries)
            .with_context(|| format!("Annotation failed on {}", chrom))?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    let mut sink = stack.into_sink();
    sink.out.flush()?;
    if let Some(e) = sink.failed {
        return Err(anyhow!(e)).context("Failed writing results");
    }

    println!("Annotated {} queries, {} hits total", sink.queries, sink.hits);
    Ok(())
}

fn build_schema(matches: &ArgMatches, key: &str) -> Result<RecordSchema> {
    let default_format = "bed".to_string();
    let format = matches.get_one::<String>(key).unwrap_or(&default_format);

    let dialect = Dialect::from_str(format)?;
    let mut schema = match dialect {
        Dialect::Vcf => RecordSchema::vcf(),
        Dialect::Bed => RecordSchema::bed(),
        Dialect::BedAllele => RecordSchema::bed_allele(),
        Dialect::Tab => RecordSchema::tab(),
        Dialect::Rsid => {
            return Err(anyhow!(
                "rsid inputs are not position-sorted and cannot be annotated by overlap"
            ));
        }
    };

    if dialect == Dialect::Tab {
        schema.sequence_col = parse_col(matches, "seq-col")?.unwrap_or(schema.sequence_col);
        schema.begin_col = parse_col(matches, "begin-col")?.unwrap_or(schema.begin_col);
        schema.end_col = parse_col(matches, "end-col")?.unwrap_or(schema.end_col);
        if matches.get_flag("zero-based") {
            schema.set_zero_based(true);
        }
    }

    Ok(schema)
}

fn parse_col(matches: &ArgMatches, key: &str) -> Result<Option<i32>> {
    match matches.get_one::<String>(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| anyhow!("Invalid column number for --{}: {}", key, raw)),
    }
}

fn read_grouped(
    path: &str,
    schema: RecordSchema,
) -> Result<(Vec<String>, HashMap<String, Vec<LocRecord>>)> {
    let reader = RecordReader::open(path, schema)?;

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<LocRecord>> = HashMap::default();

    for record in reader {
        let record = record?;
        let by_chrom = grouped.entry(record.chrom.clone()).or_insert_with(|| {
            order.push(record.chrom.clone());
            Vec::new()
        });
        by_chrom.push(record);
    }

    Ok((order, grouped))
}
