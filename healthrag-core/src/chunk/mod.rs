//! Document chunking
//!
//! Walks a tree of extracted `.txt` files, normalizes each document and
//! splits it into overlapping word windows. Every window becomes one
//! [`ChunkRecord`] in the chunk store.
//!
//! ## Example
//!
//! ```ignore
//! use healthrag_core::{ChunkConfig, Chunker};
//!
//! let chunker = Chunker::new(ChunkConfig::default())?;
//! let report = chunker.run(Path::new("data_text"), Path::new("data_chunks/chunks.jsonl"))?;
//! println!("{} chunks from {} documents", report.chunks_written, report.documents_chunked);
//! ```

mod text;
mod window;

use std::path::{Path, PathBuf};

use crate::config::ChunkConfig;
use crate::error::{RagError, Result};
use crate::record::{ChunkRecord, RecordWriter};

pub use text::{clean_text, decode_lossy, infer_language, source_name, DEFAULT_LANGUAGE};
pub use window::{chunk_words, expected_chunk_count, window_spans};

/// A cleaned source document ready for chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the text root, `/`-separated
    pub source: String,
    /// Inferred from the path segments
    pub language: String,
    /// Cleaned text, never empty
    pub text: String,
}

impl Document {
    /// Read and clean one file below `root`.
    ///
    /// Fails with [`RagError::InputDecoding`] when the file cannot be read and
    /// [`RagError::EmptyDocument`] when nothing is left after cleaning.
    pub fn load(root: &Path, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| RagError::InputDecoding {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rel = path.strip_prefix(root).unwrap_or(path);
        Self::from_raw(rel, &decode_lossy(&bytes))
            .ok_or_else(|| RagError::EmptyDocument(path.to_path_buf()))
    }

    /// Build from a relative path and raw text; `None` if the text cleans to nothing
    pub fn from_raw(rel_path: &Path, raw: &str) -> Option<Self> {
        let text = clean_text(raw);
        if text.trim().is_empty() {
            return None;
        }
        Some(Self {
            source: source_name(rel_path),
            language: infer_language(rel_path).to_string(),
            text,
        })
    }
}

/// Counters for one chunking run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    pub documents_seen: usize,
    pub documents_chunked: usize,
    pub skipped_empty: usize,
    pub skipped_unreadable: usize,
    pub chunks_written: usize,
}

/// Sliding-window chunker
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Create a chunker; rejects configurations whose window cannot advance
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Records for one document, in `chunk_index` order
    pub fn chunk_document(&self, doc: &Document) -> Vec<ChunkRecord> {
        chunk_words(&doc.text, &self.config)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                ChunkRecord::new(doc.source.as_str(), i, doc.language.as_str(), text)
            })
            .collect()
    }

    /// All `.txt` files below `root`, sorted by path
    pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(RagError::config(format!(
                "text directory not found: {}",
                root.display()
            )));
        }

        let pattern = format!(
            "{}/**/*.txt",
            glob::Pattern::escape(&root.to_string_lossy())
        );
        let entries = glob::glob(&pattern)
            .map_err(|e| RagError::config(format!("invalid text directory pattern: {e}")))?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable path {}: {}", e.path().display(), e),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Chunk every document below `root` into a fresh store at `out`.
    ///
    /// Per-file failures are logged and counted; the store is only published
    /// once every document has been processed.
    pub fn run(&self, root: &Path, out: &Path) -> Result<ChunkReport> {
        let files = Self::discover(root)?;
        log::info!(
            "Chunking {} files from {} (max_tokens={}, overlap={})",
            files.len(),
            root.display(),
            self.config.max_tokens,
            self.config.overlap
        );

        let mut writer = RecordWriter::create(out)?;
        let mut report = ChunkReport::default();

        for path in &files {
            report.documents_seen += 1;
            let doc = match Document::load(root, path) {
                Ok(doc) => doc,
                Err(RagError::EmptyDocument(p)) => {
                    log::debug!("Skipping empty document {}", p.display());
                    report.skipped_empty += 1;
                    continue;
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("{}. Skipping.", e);
                    report.skipped_unreadable += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let records = self.chunk_document(&doc);
            for record in &records {
                writer.append(record)?;
            }
            log::debug!("{}: {} chunks ({})", doc.source, records.len(), doc.language);
            report.documents_chunked += 1;
        }

        report.chunks_written = writer.commit()?;
        log::info!(
            "Wrote {} chunks from {} documents to {} ({} empty, {} unreadable)",
            report.chunks_written,
            report.documents_chunked,
            out.display(),
            report.skipped_empty,
            report.skipped_unreadable
        );
        Ok(report)
    }
}
