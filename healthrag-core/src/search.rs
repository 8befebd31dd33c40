//! Top-k retrieval over a published index
//!
//! Loads an index/metadata pair, embeds queries with the same engine that
//! built the index and maps result rows back to their chunk records.

use serde::Serialize;

use crate::config::SearchSettings;
use crate::embedding::EmbeddingEngine;
use crate::error::{RagError, Result};
use crate::index::{HnswGraph, IndexHeader, VectorIndex};
use crate::record::ChunkRecord;
use crate::storage::{IndexStore, LoadedIndex};

/// Per-query search options
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Maximum hits to return
    pub top_k: usize,
    /// Drop hits scoring below this
    pub min_score: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
        }
    }
}

impl From<&SearchSettings> for SearchConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            top_k: settings.top_k,
            min_score: settings.min_score,
        }
    }
}

/// One retrieved chunk
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// 1-based position in the result list
    pub rank: usize,
    /// Row in the index (and line in the metadata store)
    pub row: usize,
    /// Inner product with the query; cosine similarity for unit vectors
    pub score: f32,
    pub record: ChunkRecord,
}

/// Query side of the pipeline
pub struct Retriever<'a> {
    engine: &'a EmbeddingEngine,
    header: IndexHeader,
    index: VectorIndex,
    records: Vec<ChunkRecord>,
    graph: Option<HnswGraph>,
    defaults: SearchConfig,
}

impl<'a> Retriever<'a> {
    /// Load the published pair from `store` and check it against `engine`
    pub fn open(store: &IndexStore, engine: &'a EmbeddingEngine, settings: &SearchSettings) -> Result<Self> {
        let loaded = store.load()?;
        Self::from_loaded(loaded, engine, settings)
    }

    pub fn from_loaded(loaded: LoadedIndex, engine: &'a EmbeddingEngine, settings: &SearchSettings) -> Result<Self> {
        let LoadedIndex {
            header,
            index,
            records,
        } = loaded;

        if index.len() != records.len() {
            return Err(RagError::schema_mismatch(format!(
                "index has {} rows but metadata has {} records",
                index.len(),
                records.len()
            )));
        }
        if index.dimension() != engine.dimension() {
            return Err(RagError::schema_mismatch(format!(
                "index was built with dimension {}, engine produces {}",
                index.dimension(),
                engine.dimension()
            )));
        }
        if header.model != engine.model_name() {
            return Err(RagError::schema_mismatch(format!(
                "index was built with model {}, engine uses {}",
                header.model,
                engine.model_name()
            )));
        }

        let graph = if settings.hnsw_threshold > 0 && index.len() >= settings.hnsw_threshold {
            log::info!("Building HNSW graph over {} rows", index.len());
            Some(HnswGraph::build(&index))
        } else {
            None
        };

        Ok(Self {
            engine,
            header,
            index,
            records,
            graph,
            defaults: SearchConfig::from(settings),
        })
    }

    /// Top `top_k` hits for `query`, best first, no score threshold
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.search_with(
            query,
            &SearchConfig {
                top_k,
                min_score: None,
            },
        )
    }

    pub fn search_with(&self, query: &str, config: &SearchConfig) -> Result<Vec<SearchHit>> {
        if config.top_k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.engine.embed(query)?;
        self.search_vector(&vector, config)
    }

    /// Search with an already embedded, unit-length query
    pub fn search_vector(&self, vector: &[f32], config: &SearchConfig) -> Result<Vec<SearchHit>> {
        let ranked = match &self.graph {
            Some(graph) if config.top_k <= graph.ef_search() => {
                if vector.len() != self.index.dimension() {
                    return Err(RagError::schema_mismatch(format!(
                        "query has dimension {}, index has {}",
                        vector.len(),
                        self.index.dimension()
                    )));
                }
                graph.search(vector, config.top_k)
            }
            _ => self.index.search(vector, config.top_k)?,
        };

        let mut hits = Vec::with_capacity(ranked.len());
        for (row, score) in ranked {
            if config.min_score.is_some_and(|min| score < min) {
                continue;
            }
            hits.push(SearchHit {
                rank: hits.len() + 1,
                row,
                score,
                record: self.record(row)?.clone(),
            });
        }
        Ok(hits)
    }

    /// Metadata record for `row`
    pub fn record(&self, row: usize) -> Result<&ChunkRecord> {
        self.records.get(row).ok_or(RagError::OutOfRange {
            row,
            len: self.records.len(),
        })
    }

    /// Search options from configuration
    pub fn defaults(&self) -> &SearchConfig {
        &self.defaults
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether queries are served from the HNSW graph
    pub fn is_approximate(&self) -> bool {
        self.graph.is_some()
    }
}

/// Render hits as a citation block for prompt context
pub fn format_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No relevant context found.".to_string();
    }

    hits.iter()
        .map(|hit| {
            format!(
                "[Source: {}#{}, lang: {}, score: {:.2}]\n{}",
                hit.record.source, hit.record.chunk_index, hit.record.language, hit.score, hit.record.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
