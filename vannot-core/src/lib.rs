//! # Core library for vannot: genomic-interval annotation.
//!
//! This crate holds the pieces every other vannot crate builds on: the
//! [`LocRecord`](models::LocRecord) record value, the
//! [`GenomicInterval`](models::GenomicInterval) capability trait, the
//! [`RecordSchema`](schema::RecordSchema) column descriptor for the
//! supported file dialects, and the shared error taxonomy.

pub mod errors;
pub mod models;
pub mod schema;

// re-export for cleaner imports
pub use errors::{Result, VannotError};
