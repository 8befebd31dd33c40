//! Pipeline configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file at all) yields a runnable configuration. Call
//! [`PipelineConfig::validate`] after applying overrides and before touching
//! any document.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

/// Environment variable naming a config file when `--config` is not given
pub const CONFIG_ENV: &str = "HEALTHRAG_CONFIG";

/// Sliding-window parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkConfig {
    /// Window size in words (default: 400)
    pub max_tokens: usize,
    /// Words shared by consecutive windows (default: 80)
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            overlap: 80,
        }
    }
}

impl ChunkConfig {
    pub fn new(max_tokens: usize, overlap: usize) -> Result<Self> {
        let config = Self { max_tokens, overlap };
        config.validate()?;
        Ok(config)
    }

    /// Reject windows that could not advance
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::config("chunking.max_tokens must be at least 1"));
        }
        if self.overlap >= self.max_tokens {
            return Err(RagError::config(format!(
                "chunking.overlap ({}) must be smaller than chunking.max_tokens ({})",
                self.overlap, self.max_tokens
            )));
        }
        Ok(())
    }

    /// Words the window moves forward between chunks
    pub fn stride(&self) -> usize {
        self.max_tokens - self.overlap
    }
}

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local ONNX model through fastembed
    #[default]
    Fastembed,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
    /// Feature-hashing bag of words, no model required
    Hash,
}

impl std::str::FromStr for ProviderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fastembed" => Ok(Self::Fastembed),
            "http" => Ok(Self::Http),
            "hash" => Ok(Self::Hash),
            other => Err(RagError::config(format!(
                "unknown embedding provider '{other}' (expected fastembed, http or hash)"
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fastembed => "fastembed",
            Self::Http => "http",
            Self::Hash => "hash",
        };
        f.write_str(name)
    }
}

/// Embedding provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    /// Model identifier understood by the provider
    pub model: String,
    /// Texts per provider call (default: 64)
    pub batch_size: usize,
    /// Output dimension; required by the hash provider, optional for http
    pub dimension: Option<usize>,
    /// Base URL of the http provider, e.g. `https://api.openai.com/v1`
    pub base_url: Option<String>,
    /// Per-request timeout of the http provider (default: 30)
    pub timeout_secs: u64,
    /// Model cache directory for fastembed
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            batch_size: 64,
            dimension: None,
            base_url: None,
            timeout_secs: 30,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RagError::config("embedding.batch_size must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(RagError::config("embedding.model must not be empty"));
        }
        if self.dimension == Some(0) {
            return Err(RagError::config("embedding.dimension must be at least 1"));
        }
        if self.provider == ProviderKind::Http && self.base_url.is_none() {
            return Err(RagError::config(
                "embedding.base_url is required for the http provider",
            ));
        }
        Ok(())
    }
}

/// Query-time settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    /// Results per query (default: 5)
    pub top_k: usize,
    /// Drop hits scoring below this
    pub min_score: Option<f32>,
    /// Row count from which an HNSW graph is built; 0 keeps exact search
    pub hnsw_threshold: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
            hnsw_threshold: 10_000,
        }
    }
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of the extracted `.txt` tree
    pub text_dir: PathBuf,
    /// Chunk store written by the chunker
    pub chunk_path: PathBuf,
    /// Directory holding the published index and metadata pair
    pub index_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            text_dir: PathBuf::from("data_text"),
            chunk_path: PathBuf::from("data_chunks").join("chunks.jsonl"),
            index_dir: PathBuf::from("vector_index"),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub chunking: ChunkConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchSettings,
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        log::info!("Loaded config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Resolve the config source with priority:
    /// 1. Explicit path
    /// 2. HEALTHRAG_CONFIG environment variable
    /// 3. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        log::debug!("No config file given, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        if let Some(min) = self.search.min_score {
            if !min.is_finite() {
                return Err(RagError::config("search.min_score must be finite"));
            }
        }
        Ok(())
    }
}
