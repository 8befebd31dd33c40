//! HealthRAG core
//!
//! Offline retrieval pipeline for multilingual healthcare documents:
//! chunk extracted text into overlapping word windows, embed the chunks into
//! an inner-product index persisted next to its metadata, and retrieve the
//! top-k chunks for a query.
//!
//! ## Features
//!
//! - **Sliding-window chunking** - Word windows with configurable overlap, language inferred from paths
//! - **Pluggable embeddings** - Local fastembed model, OpenAI-compatible HTTP endpoint, or feature hashing
//! - **Bound index/metadata pair** - Header carries row count, model and a metadata digest
//! - **Exact or HNSW search** - Linear scan for small corpora, instant-distance graph for large ones
//!
//! ## Example
//!
//! ```ignore
//! use healthrag_core::{EmbeddingEngine, IndexStore, Indexer, PipelineConfig, Retriever};
//!
//! let config = PipelineConfig::load(None)?;
//! let engine = EmbeddingEngine::from_config(&config.embedding)?;
//! let store = IndexStore::new(&config.paths.index_dir);
//!
//! Indexer::new(&engine).build_and_publish(&config.paths.chunk_path, None, &store)?;
//!
//! let retriever = Retriever::open(&store, &engine, &config.search)?;
//! for hit in retriever.search("symptoms of dengue", 5)? {
//!     println!("{:.3} {}#{}", hit.score, hit.record.source, hit.record.chunk_index);
//! }
//! ```

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod indexer;
pub mod record;
pub mod search;
pub mod storage;

// Re-exports for convenience
pub use chunk::{ChunkReport, Chunker, Document};
pub use config::{ChunkConfig, EmbeddingConfig, PathsConfig, PipelineConfig, ProviderKind, SearchSettings};
pub use embedding::{EmbeddingEngine, EmbeddingProvider, HashEmbedder};
pub use error::{RagError, Result};
pub use index::{IndexHeader, VectorIndex};
pub use indexer::Indexer;
pub use record::{read_records, ChunkId, ChunkRecord};
pub use search::{format_context, Retriever, SearchConfig, SearchHit};
pub use storage::{IndexInfo, IndexStore, LoadedIndex};
