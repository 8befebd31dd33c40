//! Index builder
//!
//! Embeds chunk records in order and publishes the vectors together with the
//! records as metadata. Row `i` of the built index is record `i`.

use std::path::Path;
use std::time::Instant;

use crate::embedding::EmbeddingEngine;
use crate::error::Result;
use crate::index::{IndexHeader, VectorIndex};
use crate::record::{read_records, ChunkRecord};
use crate::storage::IndexStore;

/// Records handed to the embedding engine per progress step
const PROGRESS_STEP: usize = 1024;

/// Builds inner-product indexes with a shared embedding engine
pub struct Indexer<'a> {
    engine: &'a EmbeddingEngine,
}

impl<'a> Indexer<'a> {
    pub fn new(engine: &'a EmbeddingEngine) -> Self {
        Self { engine }
    }

    /// Embed every record's text; vectors are added in record order.
    ///
    /// Bypasses the engine's query cache. Any provider failure aborts the
    /// whole build.
    pub fn build(&self, records: &[ChunkRecord]) -> Result<VectorIndex> {
        let mut index = VectorIndex::new(self.engine.dimension());
        if records.is_empty() {
            log::warn!("No chunk records to index; building an empty index");
            return Ok(index);
        }

        let started = Instant::now();
        for step in records.chunks(PROGRESS_STEP) {
            let texts: Vec<&str> = step.iter().map(|r| r.text.as_str()).collect();
            for vector in self.engine.embed_batch_uncached(&texts)? {
                index.add(&vector)?;
            }
            log::info!("Embedded {}/{} chunks", index.len(), records.len());
        }

        log::info!(
            "Indexed {} chunks with {} in {:.1}s",
            index.len(),
            self.engine.model_name(),
            started.elapsed().as_secs_f64()
        );
        Ok(index)
    }

    /// Load the chunk store, then [`build`](Self::build)
    pub fn build_from_store(&self, chunk_path: &Path, limit: Option<usize>) -> Result<(VectorIndex, Vec<ChunkRecord>)> {
        let records = read_records(chunk_path, limit)?;
        log::info!("Loaded {} chunk records from {}", records.len(), chunk_path.display());
        let index = self.build(&records)?;
        Ok((index, records))
    }

    /// Build from the chunk store and publish the pair into `store`.
    ///
    /// Nothing is published unless every record was embedded.
    pub fn build_and_publish(&self, chunk_path: &Path, limit: Option<usize>, store: &IndexStore) -> Result<IndexHeader> {
        let (index, records) = self.build_from_store(chunk_path, limit)?;
        store.publish(&index, &records, self.engine.model_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::record::write_records;
    use tempfile::TempDir;

    fn records(n: usize) -> Vec<ChunkRecord> {
        (0..n)
            .map(|i| ChunkRecord::new("en/doc.txt", i, "en", format!("chunk number {i} about symptom{i}")))
            .collect()
    }

    #[test]
    fn test_rows_follow_record_order() {
        let engine = EmbeddingEngine::new(Box::new(HashEmbedder::new(64)), 3);
        let records = records(10);
        let index = Indexer::new(&engine).build(&records).unwrap();

        assert_eq!(index.len(), records.len());
        for (row, record) in records.iter().enumerate() {
            let expected = engine.embed(&record.text).unwrap();
            assert_eq!(index.row(row).unwrap(), expected.as_slice());
        }
    }

    #[test]
    fn test_build_does_not_fill_query_cache() {
        let engine = EmbeddingEngine::new(Box::new(HashEmbedder::new(32)), 4);
        let index = Indexer::new(&engine).build(&records(25)).unwrap();
        assert_eq!(index.len(), 25);
        assert_eq!(engine.cache_size(), 0);
    }

    #[test]
    fn test_empty_input_builds_empty_index() {
        let engine = EmbeddingEngine::new(Box::new(HashEmbedder::new(16)), 8);
        let index = Indexer::new(&engine).build(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 16);
    }

    #[test]
    fn test_build_from_store_honors_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunks.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        write_records(&mut file, &records(5)).unwrap();

        let engine = EmbeddingEngine::new(Box::new(HashEmbedder::new(16)), 8);
        let (index, loaded) = Indexer::new(&engine)
            .build_from_store(&path, Some(2))
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(index.len(), 2);
    }
}
