//! HNSW graph over index rows
//!
//! Built in memory from a loaded [`VectorIndex`]; never persisted. Candidates
//! are rescored with the exact inner product so scores match the flat path.

use instant_distance::{Builder, HnswMap, Point, Search};

use super::VectorIndex;
use crate::embedding::dot;

const EF_CONSTRUCTION: usize = 100;
const EF_SEARCH: usize = 128;
const SEED: u64 = 0x4852_4147;

/// HNSW point wrapper for one row vector
#[derive(Clone)]
struct RowPoint(Vec<f32>);

impl Point for RowPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Unit vectors: distance = 1 - inner product (HNSW finds minimum)
        1.0 - dot(&self.0, &other.0)
    }
}

/// Approximate nearest-neighbour graph; values are row numbers
pub struct HnswGraph {
    hnsw: HnswMap<RowPoint, usize>,
    rows: usize,
}

impl HnswGraph {
    pub fn build(index: &VectorIndex) -> Self {
        let points: Vec<RowPoint> = index.rows().map(|v| RowPoint(v.to_vec())).collect();
        let rows: Vec<usize> = (0..points.len()).collect();
        let count = points.len();

        let hnsw = Builder::default()
            .ef_construction(EF_CONSTRUCTION)
            .ef_search(EF_SEARCH)
            .seed(SEED)
            .build(points, rows);

        log::debug!("Built HNSW graph over {} rows", count);
        Self { hnsw, rows: count }
    }

    /// Candidate list size at query time; `top_k` above this is not served
    pub fn ef_search(&self) -> usize {
        EF_SEARCH
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Approximate top-k as `(row, score)`, best first
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        let query_point = RowPoint(query.to_vec());
        let mut search = Search::default();
        let mut results = Vec::with_capacity(top_k);

        // The graph reorders points internally; the map value is the stable row
        for candidate in self.hnsw.search(&query_point, &mut search) {
            let row = *candidate.value;
            results.push((row, dot(query, &candidate.point.0)));
            if results.len() >= top_k {
                break;
            }
        }

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        results
    }
}
