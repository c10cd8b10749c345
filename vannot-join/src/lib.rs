//! # Overlap-join engine.
//!
//! Joins a sorted stream of decoded database intervals against a
//! sorted query stream and reports every overlapping pair to a
//! [`ResultSink`]. The engine holds a bounded active window — only the
//! database intervals that still span the current query coordinate —
//! so whole chromosomes join in a single forward pass without
//! materializing either side.
//!
//! The database side usually arrives from a [`vannot_codec`] block
//! iterator seeded through a [`BlockIndex`] provider; any iterator of
//! sorted [`GenomicInterval`](vannot_core::models::GenomicInterval)s
//! works the same way.

pub mod index;
pub mod sink;
pub mod stack;

// re-exports
pub use self::index::{BlockIndex, MemoryIndex};
pub use self::sink::{CollectSink, CountSink, ResultSink};
pub use self::stack::ReaderStack;
