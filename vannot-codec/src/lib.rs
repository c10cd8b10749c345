//! # Compact interval codec.
//!
//! Translates between absolute `(begin, end)` genomic intervals and the
//! delta-coded, variable-width byte stream packed into each compressed
//! index block. Database files hold millions of near-contiguous sorted
//! intervals, so per-record deltas are small; one flag byte plus zero to
//! six payload bytes per record keeps amortized overhead under a byte
//! while width escapes stay correct across arbitrarily large jumps.
//!
//! The decoder is an owned session ([`BlockDecoder`]) seeded from a
//! block header and advanced one record at a time; [`BlockRecordIter`]
//! wraps it into an iterator with corruption detection against the
//! declared block length. [`BlockEncoder`] is the exact inverse and is
//! what the index writer uses.

pub mod block;
pub mod vpos;

// re-exports
pub use self::block::{BlockDecoder, BlockEncoder, BlockRecord, BlockRecordIter, decode_block};
