//! Embedding providers
//!
//! The pipeline only needs one capability from a model: a batch of texts in,
//! one fixed-length vector per text out, in input order. Providers implement
//! [`EmbeddingProvider`]; [`EmbeddingEngine`] wraps one provider with
//! batching, validation, normalization and a text cache and is what the
//! indexer and retriever are handed.

mod discovery;
mod engine;
mod onnx;
mod hashing;
mod http;

pub use discovery::find_model_cache_dir;
pub use engine::EmbeddingEngine;
pub use onnx::FastEmbedProvider;
pub use hashing::HashEmbedder;
pub use http::HttpEmbedder;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::error::Result;

/// Dimension used by the hash provider when none is configured
pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// A text embedding backend
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch; output `i` must belong to input `i`
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Model identifier recorded alongside built indexes
    fn model_name(&self) -> &str;
}

/// Construct the provider named by the config
pub fn build_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    config.validate()?;
    let provider: Box<dyn EmbeddingProvider> = match config.provider {
        ProviderKind::Fastembed => Box::new(FastEmbedProvider::new(
            &config.model,
            config.cache_dir.as_deref(),
        )?),
        ProviderKind::Http => Box::new(HttpEmbedder::from_config(config)?),
        ProviderKind::Hash => Box::new(HashEmbedder::new(
            config.dimension.unwrap_or(DEFAULT_HASH_DIMENSION),
        )),
    };
    log::info!(
        "Embedding provider: {} ({}, {}d)",
        config.provider,
        provider.model_name(),
        provider.dimension()
    );
    Ok(provider)
}

/// L2-normalize in place; zero vectors are left unchanged
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Inner product; equals cosine similarity on normalized vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
