//! Chunk record type and JSONL record stores
//!
//! The chunk store written by the chunker and the metadata store written
//! next to the index share one schema: one [`ChunkRecord`] per line.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Unique identifier for chunk records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    /// Create a new random ChunkId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChunkId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One word-window chunk of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Generated when the chunk is created, never changed afterwards
    pub id: ChunkId,
    /// Document path relative to the text root
    pub source: String,
    /// Position of this chunk within its source document
    pub chunk_index: usize,
    /// Language tag inferred from the source path
    pub language: String,
    /// Chunk text, words joined by single spaces
    pub text: String,
}

impl ChunkRecord {
    pub fn new(
        source: impl Into<String>,
        chunk_index: usize,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: ChunkId::new(),
            source: source.into(),
            chunk_index,
            language: language.into(),
            text: text.into(),
        }
    }

    /// Field checks serde cannot express
    fn validate(&self) -> std::result::Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("empty `text`".into());
        }
        if self.source.is_empty() {
            return Err("empty `source`".into());
        }
        if self.language.is_empty() {
            return Err("empty `language`".into());
        }
        Ok(())
    }
}

/// Read every record of a JSONL store, stopping after `limit` records if set.
/// A limit of zero reads everything.
///
/// Blank lines are skipped. Any other line that does not decode to a valid
/// [`ChunkRecord`] fails the whole read.
pub fn read_records(path: &Path, limit: Option<usize>) -> Result<Vec<ChunkRecord>> {
    let limit = limit.filter(|&max| max > 0);
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        if limit.is_some_and(|max| records.len() >= max) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ChunkRecord = serde_json::from_str(&line)
            .map_err(|e| RagError::invalid_record(path, idx + 1, e.to_string()))?;
        record
            .validate()
            .map_err(|reason| RagError::invalid_record(path, idx + 1, reason))?;
        records.push(record);
    }

    Ok(records)
}

/// Serialize records as JSONL into any writer
pub fn write_records<'a, W, I>(writer: &mut W, records: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a ChunkRecord>,
{
    let mut count = 0;
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    Ok(count)
}

/// Append-only JSONL writer that only becomes visible on [`commit`].
///
/// Records go to a temporary sibling file; `commit` flushes it and renames
/// it over the target. Dropping the writer without committing removes the
/// temporary file and leaves any previous store untouched.
///
/// [`commit`]: RecordWriter::commit
pub struct RecordWriter {
    target: PathBuf,
    temp: PathBuf,
    out: Option<BufWriter<File>>,
    written: usize,
}

impl RecordWriter {
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let temp = temp_sibling(&target);
        let out = BufWriter::new(File::create(&temp)?);
        Ok(Self {
            target,
            temp,
            out: Some(out),
            written: 0,
        })
    }

    pub fn append(&mut self, record: &ChunkRecord) -> Result<()> {
        if let Some(out) = self.out.as_mut() {
            write_records(out, std::iter::once(record))?;
            self.written += 1;
        }
        Ok(())
    }

    /// Records appended so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and atomically move the store into place
    pub fn commit(mut self) -> Result<usize> {
        if let Some(out) = self.out.take() {
            let file = out.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        std::fs::rename(&self.temp, &self.target)?;
        Ok(self.written)
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        // No-op after a successful commit: the temp file was renamed away.
        self.out = None;
        let _ = std::fs::remove_file(&self.temp);
    }
}

/// `<dir>/.<name>.tmp-<uuid>` next to `target`
pub(crate) fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    target.with_file_name(format!(".{}.tmp-{}", name, Uuid::new_v4()))
}
