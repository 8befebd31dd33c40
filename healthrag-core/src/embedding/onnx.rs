//! Local sentence embeddings through fastembed (ONNX runtime)
//!
//! The default model is the multilingual paraphrase MiniLM (384 dimensions),
//! which covers the English, Tamil and Hindi documents in the corpus.

use fastembed::{InitOptions, TextEmbedding};
use std::path::Path;

use super::discovery::find_model_cache_dir;
use super::EmbeddingProvider;
use crate::error::{RagError, Result};

/// fastembed model wrapper
pub struct FastEmbedProvider {
    model: TextEmbedding,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Load a model by name, downloading it into the cache on first use.
    ///
    /// `name` may be the full model code (`Xenova/paraphrase-multilingual-MiniLM-L12-v2`)
    /// or any name with the same final path segment
    /// (`sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2`).
    pub fn new(name: &str, cache_dir: Option<&Path>) -> Result<Self> {
        let info = resolve_model(name)?;
        let cache_dir = find_model_cache_dir(cache_dir);

        log::info!(
            "Loading {} from cache {}",
            info.model_code,
            cache_dir.display()
        );

        let opts = InitOptions::new(info.model.clone())
            .with_cache_dir(cache_dir)
            .with_show_download_progress(true);
        let model = TextEmbedding::try_new(opts)
            .map_err(|e| RagError::provider(format!("Failed to load {}: {}", info.model_code, e)))?;

        // Get dimension by encoding test string
        let sample = model
            .embed(vec!["test"], None)
            .map_err(|e| RagError::provider(format!("Failed to encode test string: {}", e)))?;
        let dimension = sample
            .first()
            .map(Vec::len)
            .ok_or_else(|| RagError::provider("model returned no embeddings"))?;

        log::info!("Loaded {} ({}d)", info.model_code, dimension);

        Ok(Self {
            model,
            model_name: info.model_code,
            dimension,
        })
    }
}

struct ResolvedModel {
    model: fastembed::EmbeddingModel,
    model_code: String,
}

fn resolve_model(name: &str) -> Result<ResolvedModel> {
    let wanted = name.trim().to_lowercase();
    let wanted_tail = wanted.rsplit('/').next().unwrap_or(&wanted).to_string();
    let supported = TextEmbedding::list_supported_models();

    let found = supported
        .iter()
        .find(|m| m.model_code.to_lowercase() == wanted)
        .or_else(|| {
            supported.iter().find(|m| {
                let code = m.model_code.to_lowercase();
                code.rsplit('/').next() == Some(wanted_tail.as_str())
            })
        });

    match found {
        Some(info) => Ok(ResolvedModel {
            model: info.model.clone(),
            model_code: info.model_code.clone(),
        }),
        None => Err(RagError::config(format!(
            "embedding model '{}' is not supported by fastembed",
            name
        ))),
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.model
            .embed(texts.to_vec(), Some(texts.len()))
            .map_err(|e| RagError::provider(format!("Failed to encode texts: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
