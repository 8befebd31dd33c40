//! Inner-product vector index
//!
//! A flat, row-major matrix of unit vectors. Row order is insertion order and
//! is the join key to the metadata store: row `i` belongs to record `i`.
//! Exact search scans every row; [`HnswGraph`] provides an approximate
//! path over the same rows for large corpora.

mod artifact;
mod hnsw;

pub use artifact::{read_artifact, read_header, write_artifact, IndexHeader, FORMAT_VERSION, MAGIC};
pub use hnsw::HnswGraph;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::embedding::dot;
use crate::error::{RagError, Result};

/// Flat inner-product index
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuild from a row-major buffer, as read back from disk
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 && !data.is_empty() {
            return Err(RagError::schema_mismatch("zero-dimension index with data"));
        }
        if dimension != 0 && data.len() % dimension != 0 {
            return Err(RagError::schema_mismatch(format!(
                "buffer of {} floats is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Append one vector; returns its row
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(RagError::provider(format!(
                "cannot add vector of dimension {} to index of dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        let row = self.len();
        self.data.extend_from_slice(vector);
        Ok(row)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.len() {
            return None;
        }
        let start = row * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Rows in insertion order
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dimension.max(1))
    }

    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Exact top-k by inner product, best first; equal scores keep lower rows first
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(RagError::schema_mismatch(format!(
                "query has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        // BinaryHeap min-heap for top-K
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(top_k + 1);
        for (row, vector) in self.rows().enumerate() {
            let score = dot(query, vector);
            if !score.is_finite() {
                continue;
            }
            heap.push(HeapEntry { score, row });
            if heap.len() > top_k {
                heap.pop(); // Remove the lowest score
            }
        }

        let mut results: Vec<(usize, f32)> = heap.into_iter().map(|e| (e.row, e.score)).collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(results)
    }
}

/// Min-heap entry for top-K selection
#[derive(Debug)]
struct HeapEntry {
    score: f32,
    row: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so the worst entry sits on top: lowest score,
        // and among equal scores the highest row
        match other.score.partial_cmp(&self.score) {
            Some(Ordering::Equal) | None => self.row.cmp(&other.row),
            Some(ord) => ord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::normalize;

    fn unit(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        normalize(&mut v);
        v
    }

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(3);
        for v in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
            index.add(&unit(&v)).unwrap();
        }
        index
    }

    #[test]
    fn test_add_assigns_rows_in_order() {
        let mut index = VectorIndex::new(2);
        assert_eq!(index.add(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.row(1).unwrap(), &[0.0, 1.0]);
        assert!(index.row(2).is_none());
    }

    #[test]
    fn test_add_wrong_dimension() {
        let mut index = VectorIndex::new(2);
        assert!(index.add(&[1.0, 0.0, 0.0]).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_top_k() {
        let index = sample_index();
        let results = index.search(&unit(&[1.0, 0.1, 0.0]), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_search_self_match_scores_one() {
        let index = sample_index();
        for row in 0..index.len() {
            let query = index.row(row).unwrap().to_vec();
            let results = index.search(&query, 1).unwrap();
            assert_eq!(results[0].0, row);
            assert!((results[0].1 - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_search_ties_prefer_lower_row() {
        let mut index = VectorIndex::new(2);
        for _ in 0..5 {
            index.add(&[1.0, 0.0]).unwrap();
        }
        let rows: Vec<_> = index
            .search(&[1.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_k_bounds() {
        let index = sample_index();
        let query = unit(&[1.0, 0.0, 0.0]);
        assert!(index.search(&query, 0).unwrap().is_empty());
        assert_eq!(index.search(&query, 50).unwrap().len(), 4);
        assert!(VectorIndex::new(3).search(&query, 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = sample_index();
        let err = index.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, RagError::SchemaMismatch(_)));
    }

    #[test]
    fn test_from_raw_validates_shape() {
        assert!(VectorIndex::from_raw(3, vec![0.0; 7]).is_err());
        assert_eq!(VectorIndex::from_raw(3, vec![0.0; 9]).unwrap().len(), 3);
    }
}
