use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use vannot_core::schema::RecordSchema;
use vannot_core::{Result, VannotError};

/// Supplies per-chromosome seek targets and the persisted schema of an
/// indexed database file.
///
/// The engine consumes this contract and never looks behind it; an
/// unknown chromosome answers `None` so the caller skips it instead of
/// aborting the whole job.
pub trait BlockIndex {
    /// Address of the compressed block to seek to for records near
    /// `pos` on `chrom`.
    fn lookup_block(&self, chrom: &str, pos: u32) -> Option<u64>;

    /// Minimum start coordinate indexed for `chrom`; seeds the block
    /// decoder session.
    fn min_coordinate(&self, chrom: &str) -> Option<u32>;

    fn sequence_names(&self) -> &[String];

    fn schema(&self) -> &RecordSchema;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChromEntry {
    min: u32,
    bin_width: u32,
    bins: Vec<u64>,
}

/// In-memory [`BlockIndex`] over fixed-width coordinate bins, one
/// block address per bin.
#[derive(Debug)]
pub struct MemoryIndex {
    schema: RecordSchema,
    names: Vec<String>,
    chroms: HashMap<String, ChromEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    schema_spec: String,
    names: Vec<String>,
    chroms: HashMap<String, ChromEntry>,
}

impl MemoryIndex {
    pub fn new(schema: RecordSchema) -> Self {
        MemoryIndex {
            schema,
            names: Vec::new(),
            chroms: HashMap::new(),
        }
    }

    /// Register a chromosome with its minimum coordinate and binned
    /// block addresses; `bins[i]` covers coordinates
    /// `[i * bin_width, (i + 1) * bin_width)`.
    pub fn insert_chromosome(
        &mut self,
        name: &str,
        min: u32,
        bin_width: u32,
        bins: Vec<u64>,
    ) -> Result<()> {
        if bin_width == 0 {
            return Err(VannotError::Configuration(
                "bin width must be positive".to_string(),
            ));
        }
        if bins.is_empty() {
            return Err(VannotError::Configuration(format!(
                "chromosome {} has no blocks",
                name
            )));
        }
        if !self.chroms.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.chroms.insert(
            name.to_string(),
            ChromEntry {
                min,
                bin_width,
                bins,
            },
        );
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let persisted = PersistedIndex {
            schema_spec: self.schema.to_spec_string(),
            names: self.names.clone(),
            chroms: self.chroms.clone(),
        };
        let wtr = BufWriter::new(File::create(path)?);
        bincode::serialize_into(wtr, &persisted)
            .map_err(|e| VannotError::Io(std::io::Error::other(e.to_string())))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        let persisted: PersistedIndex = bincode::deserialize_from(rdr)
            .map_err(|e| VannotError::CorruptData(format!("invalid index file: {}", e)))?;
        Ok(MemoryIndex {
            schema: RecordSchema::from_spec_string(&persisted.schema_spec)?,
            names: persisted.names,
            chroms: persisted.chroms,
        })
    }
}

impl BlockIndex for MemoryIndex {
    fn lookup_block(&self, chrom: &str, pos: u32) -> Option<u64> {
        let entry = self.chroms.get(chrom)?;
        let bin = ((pos / entry.bin_width) as usize).min(entry.bins.len() - 1);
        Some(entry.bins[bin])
    }

    fn min_coordinate(&self, chrom: &str) -> Option<u32> {
        self.chroms.get(chrom).map(|e| e.min)
    }

    fn sequence_names(&self) -> &[String] {
        &self.names
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sample_index() -> MemoryIndex {
        let mut index = MemoryIndex::new(RecordSchema::bed());
        index
            .insert_chromosome("chr1", 1_000, 16_384, vec![10, 20, 30])
            .unwrap();
        index
            .insert_chromosome("chr2", 50, 16_384, vec![40])
            .unwrap();
        index
    }

    #[rstest]
    fn test_lookup_bins_and_clamping() {
        let index = sample_index();
        assert_eq!(index.lookup_block("chr1", 0), Some(10));
        assert_eq!(index.lookup_block("chr1", 16_384), Some(20));
        assert_eq!(index.lookup_block("chr1", 40_000), Some(30));
        // positions past the last bin clamp to it
        assert_eq!(index.lookup_block("chr1", 10_000_000), Some(30));
    }

    #[rstest]
    fn test_unknown_chromosome_is_none_not_error() {
        let index = sample_index();
        assert_eq!(index.lookup_block("chrM", 0), None);
        assert_eq!(index.min_coordinate("chrM"), None);
    }

    #[rstest]
    fn test_sequence_names_keep_insertion_order() {
        let index = sample_index();
        assert_eq!(index.sequence_names(), &["chr1", "chr2"]);
        assert_eq!(index.min_coordinate("chr1"), Some(1_000));
    }

    #[rstest]
    fn test_insert_rejects_degenerate_entries() {
        let mut index = MemoryIndex::new(RecordSchema::bed());
        assert!(index.insert_chromosome("chr1", 0, 0, vec![1]).is_err());
        assert!(index.insert_chromosome("chr1", 0, 16_384, vec![]).is_err());
    }

    #[rstest]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.vannot.idx");

        let index = sample_index();
        index.save(&path).unwrap();

        let loaded = MemoryIndex::load(&path).unwrap();
        assert_eq!(loaded.sequence_names(), index.sequence_names());
        assert_eq!(loaded.min_coordinate("chr1"), Some(1_000));
        assert_eq!(loaded.lookup_block("chr2", 123), Some(40));
        assert_eq!(
            loaded.schema().to_spec_string(),
            index.schema().to_spec_string()
        );
    }

    #[rstest]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk");
        std::fs::write(&path, b"\xff\xfe\xfd").unwrap();
        let err = MemoryIndex::load(&path).unwrap_err();
        assert!(matches!(err, VannotError::CorruptData(_)));
    }
}
