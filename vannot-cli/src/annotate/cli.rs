use clap::{Command, arg};

pub const ANNOTATE_CMD: &str = "annotate";

pub fn create_annotate_cli() -> Command {
    Command::new(ANNOTATE_CMD)
        .about("Report every database record overlapping each query location. Both files must be sorted by chromosome and start position.")
        .arg_required_else_help(true)
        .arg(arg!(-q <query> "The query file (plain, gzip, or block-gzip; container is sniffed)"))
        .arg(arg!(-d <database> "The sorted database file to annotate from"))
        .arg(arg!(-o --output [output] "Write results to this path instead of stdout"))
        .arg(arg!(--"query-format" [format] "Query dialect: vcf, bed, bedallele, or tab (default bed)"))
        .arg(arg!(--"db-format" [format] "Database dialect: vcf, bed, bedallele, or tab (default bed)"))
        .arg(arg!(--"seq-col" [col] "1-based sequence-name column for tab inputs"))
        .arg(arg!(--"begin-col" [col] "1-based start-position column for tab inputs"))
        .arg(arg!(--"end-col" [col] "1-based end-position column for tab inputs; 0 marks point features"))
        .arg(arg!(--"zero-based" "Treat tab coordinates as 0-based half-open"))
}
