//! Binary index artifact
//!
//! Layout: a bincode-encoded [`IndexHeader`] followed by the bincode-encoded
//! row-major `Vec<f32>`. The header can be read without touching the vectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use super::VectorIndex;
use crate::error::{RagError, Result};

pub const MAGIC: [u8; 4] = *b"HRAG";
pub const FORMAT_VERSION: u32 = 1;

/// Describes one published build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub dimension: u32,
    pub rows: u64,
    /// Embedding model the vectors came from
    pub model: String,
    /// SHA-256 (hex) of the metadata file published with this artifact
    pub metadata_sha256: String,
    pub built_at: DateTime<Utc>,
}

impl IndexHeader {
    pub fn new(index: &VectorIndex, model: impl Into<String>, metadata_sha256: impl Into<String>) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            dimension: index.dimension() as u32,
            rows: index.len() as u64,
            model: model.into(),
            metadata_sha256: metadata_sha256.into(),
            built_at: Utc::now(),
        }
    }

    fn check_format(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(RagError::schema_mismatch(format!(
                "not an index artifact (magic {:?})",
                self.magic
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(RagError::schema_mismatch(format!(
                "unsupported index format version {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }
}

/// Write header and vectors
pub fn write_artifact<W: Write>(writer: &mut W, header: &IndexHeader, index: &VectorIndex) -> Result<()> {
    if header.rows != index.len() as u64 || header.dimension as usize != index.dimension() {
        return Err(RagError::schema_mismatch(format!(
            "header describes {}x{}, index is {}x{}",
            header.rows,
            header.dimension,
            index.len(),
            index.dimension()
        )));
    }
    bincode::serialize_into(&mut *writer, header)?;
    bincode::serialize_into(&mut *writer, index.as_slice())?;
    Ok(())
}

/// Read and check only the header
pub fn read_header<R: Read>(reader: &mut R) -> Result<IndexHeader> {
    let header: IndexHeader = bincode::deserialize_from(reader)?;
    header.check_format()?;
    Ok(header)
}

/// Read header and vectors, checking that the two agree
pub fn read_artifact<R: Read>(reader: &mut R) -> Result<(IndexHeader, VectorIndex)> {
    let header = read_header(reader)?;
    let data: Vec<f32> = bincode::deserialize_from(reader)?;

    let expected = header.rows as usize * header.dimension as usize;
    if data.len() != expected {
        return Err(RagError::schema_mismatch(format!(
            "artifact holds {} floats, header promises {} rows of dimension {}",
            data.len(),
            header.rows,
            header.dimension
        )));
    }

    let index = VectorIndex::from_raw(header.dimension as usize, data)?;
    Ok((header, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> VectorIndex {
        let mut index = VectorIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.6, 0.8]).unwrap();
        index
    }

    #[test]
    fn test_header_readable_alone() {
        let index = index();
        let header = IndexHeader::new(&index, "hash-2", "abc");
        let mut buf = Vec::new();
        write_artifact(&mut buf, &header, &index).unwrap();

        let read = read_header(&mut buf.as_slice()).unwrap();
        assert_eq!(read.rows, 2);
        assert_eq!(read.dimension, 2);
        assert_eq!(read.model, "hash-2");

        let (full_header, loaded) = read_artifact(&mut buf.as_slice()).unwrap();
        assert_eq!(full_header, header);
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let index = index();
        let mut header = IndexHeader::new(&index, "m", "d");
        header.magic = *b"FAIS";
        let mut buf = Vec::new();
        write_artifact(&mut buf, &header, &index).unwrap();
        let err = read_artifact(&mut buf.as_slice()).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_row_count_lie_rejected() {
        let index = index();
        let mut header = IndexHeader::new(&index, "m", "d");
        header.rows = 3;
        let mut buf = Vec::new();
        assert!(write_artifact(&mut buf, &header, &index).is_err());

        // Forge the header by hand to bypass the writer check
        let mut forged = Vec::new();
        bincode::serialize_into(&mut forged, &header).unwrap();
        bincode::serialize_into(&mut forged, index.as_slice()).unwrap();
        let err = read_artifact(&mut forged.as_slice()).unwrap_err();
        assert!(matches!(err, RagError::SchemaMismatch(_)));
    }

    #[test]
    fn test_truncated_artifact_is_error() {
        let index = index();
        let header = IndexHeader::new(&index, "m", "d");
        let mut buf = Vec::new();
        write_artifact(&mut buf, &header, &index).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(read_artifact(&mut buf.as_slice()).is_err());
    }
}
