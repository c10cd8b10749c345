//! # Input readers for genomic record files.
//!
//! One [`RecordReader`] presents a lazy, filtered stream of
//! schema-applied records regardless of how the bytes are stored on
//! disk: block-gzip, plain gzip, or uncompressed text with possibly
//! very long lines. The physical container is picked by file signature
//! alone — magic bytes, never the file extension.

pub mod filters;
pub mod reader;
pub mod source;

// re-exports
pub use self::filters::{CommentLineFilter, EmptyLineFilter, LineFilter, LocationFilter, RegionFilter};
pub use self::reader::RecordReader;
pub use self::source::{RawSource, SourceKind};
