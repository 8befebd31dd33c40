//! Index directory storage
//!
//! A published build is a pair of files in one directory: the binary vector
//! artifact (`index.bin`) and the JSONL metadata store (`meta.jsonl`). Row `i`
//! of the artifact belongs to line `i` of the metadata. The artifact header
//! carries the SHA-256 of the metadata file it was published with, so a pair
//! from different builds is detected at load time.
//!
//! Writers take an exclusive fs2 lock on `.lock`, write both files to
//! temporary siblings and rename them into place. Readers take a shared lock.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};
use crate::index::{read_artifact, read_header, write_artifact, IndexHeader, VectorIndex};
use crate::record::{read_records, temp_sibling, write_records, ChunkRecord};

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "meta.jsonl";
const LOCK_FILE: &str = ".lock";

/// Artifact, metadata and header of one published build
#[derive(Debug)]
pub struct LoadedIndex {
    pub header: IndexHeader,
    pub index: VectorIndex,
    pub records: Vec<ChunkRecord>,
}

/// Summary of a published build, read from the header alone
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub dir: PathBuf,
    pub rows: u64,
    pub dimension: u32,
    pub model: String,
    pub built_at: DateTime<Utc>,
    pub metadata_sha256: String,
    pub index_bytes: u64,
    pub metadata_bytes: u64,
}

/// Directory holding one published index/metadata pair
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// True when an artifact has been published here
    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    /// Publish `index` and `records` as one build, replacing any previous pair.
    ///
    /// On error nothing is renamed and the previous pair stays readable.
    pub fn publish(&self, index: &VectorIndex, records: &[ChunkRecord], model: &str) -> Result<IndexHeader> {
        if index.len() != records.len() {
            return Err(RagError::schema_mismatch(format!(
                "refusing to publish {} vectors with {} metadata records",
                index.len(),
                records.len()
            )));
        }

        std::fs::create_dir_all(&self.dir)?;
        let lock = File::create(self.dir.join(LOCK_FILE))?;
        lock.lock_exclusive()?;

        let metadata_path = self.metadata_path();
        let index_path = self.index_path();
        let metadata_temp = TempFile::new(temp_sibling(&metadata_path));
        let index_temp = TempFile::new(temp_sibling(&index_path));

        // 1. meta.jsonl, hashed while it is written
        let mut hashing = HashingWriter::new(BufWriter::new(File::create(metadata_temp.path())?));
        write_records(&mut hashing, records)?;
        let (out, digest) = hashing.finish();
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        // 2. index.bin
        let header = IndexHeader::new(index, model, digest);
        let mut out = BufWriter::new(File::create(index_temp.path())?);
        write_artifact(&mut out, &header, index)?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        // 3. Swap both into place; the artifact goes last
        metadata_temp.persist(&metadata_path)?;
        index_temp.persist(&index_path)?;

        log::info!(
            "Published {} rows (dim {}, model {}) to {}",
            header.rows,
            header.dimension,
            header.model,
            self.dir.display()
        );
        Ok(header)
    }

    /// Load the published pair, verifying that both halves belong together
    pub fn load(&self) -> Result<LoadedIndex> {
        let _lock = self.acquire_shared_lock()?;
        self.ensure_published()?;

        let mut reader = BufReader::new(File::open(self.index_path())?);
        let (header, index) = read_artifact(&mut reader)?;

        let metadata_path = self.metadata_path();
        if !metadata_path.is_file() {
            return Err(RagError::schema_mismatch(format!(
                "{} is missing next to {}",
                METADATA_FILE, INDEX_FILE
            )));
        }

        let digest = file_sha256(&metadata_path)?;
        if digest != header.metadata_sha256 {
            return Err(RagError::schema_mismatch(format!(
                "{} does not belong to this index (sha256 {}, expected {})",
                METADATA_FILE, digest, header.metadata_sha256
            )));
        }

        let records = read_records(&metadata_path, None)?;
        if records.len() as u64 != header.rows {
            return Err(RagError::schema_mismatch(format!(
                "index has {} rows but metadata has {} records",
                header.rows,
                records.len()
            )));
        }

        log::debug!("Loaded {} rows from {}", header.rows, self.dir.display());
        Ok(LoadedIndex {
            header,
            index,
            records,
        })
    }

    /// Header and file sizes without loading any vectors
    pub fn info(&self) -> Result<IndexInfo> {
        let _lock = self.acquire_shared_lock()?;
        self.ensure_published()?;

        let index_path = self.index_path();
        let mut reader = BufReader::new(File::open(&index_path)?);
        let header = read_header(&mut reader)?;
        let metadata_bytes = std::fs::metadata(self.metadata_path())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(IndexInfo {
            dir: self.dir.clone(),
            rows: header.rows,
            dimension: header.dimension,
            model: header.model,
            built_at: header.built_at,
            metadata_sha256: header.metadata_sha256,
            index_bytes: std::fs::metadata(&index_path)?.len(),
            metadata_bytes,
        })
    }

    fn ensure_published(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(RagError::NotFound(format!(
                "{} does not exist; build the index first",
                self.index_path().display()
            )))
        }
    }

    /// Shared lock for reading; `None` when nothing was ever published here
    fn acquire_shared_lock(&self) -> Result<Option<File>> {
        let lock_path = self.dir.join(LOCK_FILE);
        if !lock_path.exists() {
            return Ok(None);
        }
        let lock = File::open(&lock_path)?;
        lock.lock_shared()?;
        Ok(Some(lock))
    }
}

/// Temporary file removed on drop unless persisted
struct TempFile {
    path: PathBuf,
    persisted: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persist(mut self, target: &Path) -> io::Result<()> {
        std::fs::rename(&self.path, target)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Writer that hashes everything passing through it
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Inner writer and hex digest
    fn finish(self) -> (W, String) {
        (self.inner, hex::encode(self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hashing = HashingWriter::new(io::sink());
    io::copy(&mut file, &mut hashing)?;
    Ok(hashing.finish().1)
}
