//! Vector embedding engine
//!
//! High-level API for generating, validating and caching embeddings.

use dashmap::DashMap;

use super::{build_provider, normalize, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Embedding engine with batching and caching
///
/// Wraps one provider, constructed once and shared by reference with the
/// indexer and the retriever. Every returned vector is L2-normalized and has
/// exactly [`dimension`](Self::dimension) components; provider output that
/// breaks this is rejected as [`RagError::Provider`].
pub struct EmbeddingEngine {
    provider: Box<dyn EmbeddingProvider>,
    cache: DashMap<String, Vec<f32>>,
    cache_enabled: bool,
    batch_size: usize,
    dimension: usize,
}

impl EmbeddingEngine {
    /// Wrap an already constructed provider
    pub fn new(provider: Box<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        let dimension = provider.dimension();
        Self {
            provider,
            cache: DashMap::new(),
            cache_enabled: true,
            batch_size: batch_size.max(1),
            dimension,
        }
    }

    /// Build the configured provider and wrap it
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let provider = build_provider(config)?;
        Ok(Self::new(provider, config.batch_size))
    }

    /// Disable the text cache (large one-off builds)
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self.cache.clear();
        self
    }

    /// Embed a single text
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| RagError::provider("no embedding returned for query"))
    }

    /// Batch embed, preserving input order
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Check cache for all texts
        let mut results: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| {
                if self.cache_enabled {
                    self.cache.get(*text).map(|v| v.clone())
                } else {
                    None
                }
            })
            .collect();

        // Find uncached texts
        let uncached: Vec<(usize, &str)> = results
            .iter()
            .enumerate()
            .filter(|(_, cached)| cached.is_none())
            .map(|(i, _)| (i, texts[i]))
            .collect();

        for (batch_no, batch) in uncached.chunks(self.batch_size).enumerate() {
            let batch_texts: Vec<&str> = batch.iter().map(|(_, t)| *t).collect();
            let vectors = self.embed_validated(&batch_texts)?;
            log::debug!(
                "Embedded batch {} ({} texts)",
                batch_no + 1,
                batch_texts.len()
            );

            for ((idx, text), vector) in batch.iter().zip(vectors) {
                if self.cache_enabled {
                    self.cache.insert(text.to_string(), vector.clone());
                }
                results[*idx] = Some(vector);
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| RagError::provider(format!("missing embedding for input {}", i)))
            })
            .collect()
    }

    /// One provider call with shape checks and normalization
    /// Embed in provider batches without reading or filling the cache.
    ///
    /// Used for bulk corpus passes where every text is seen once.
    pub fn embed_batch_uncached(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            results.extend(self.embed_validated(batch)?);
        }
        Ok(results)
    }

    fn embed_validated(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = self.provider.embed(texts)?;

        if vectors.len() != texts.len() {
            return Err(RagError::provider(format!(
                "{} returned {} vectors for a batch of {}",
                self.provider.model_name(),
                vectors.len(),
                texts.len()
            )));
        }

        for (i, vector) in vectors.iter_mut().enumerate() {
            if vector.len() != self.dimension {
                return Err(RagError::provider(format!(
                    "vector {} has dimension {}, expected {}",
                    i,
                    vector.len(),
                    self.dimension
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(RagError::provider(format!(
                    "vector {} contains non-finite values",
                    i
                )));
            }
            normalize(vector);
        }

        Ok(vectors)
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Model identifier of the wrapped provider
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Provider that records every batch size it sees
    struct Recording {
        calls: Arc<AtomicUsize>,
        largest: Arc<AtomicUsize>,
    }

    impl EmbeddingProvider for Recording {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.largest.fetch_max(texts.len(), Ordering::SeqCst);
            // Component ratio encodes the input's numeric suffix
            Ok(texts
                .iter()
                .map(|t| {
                    let n: f32 = t.trim_start_matches("text").parse().unwrap();
                    vec![n + 1.0, 1.0]
                })
                .collect())
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct Short;

    impl EmbeddingProvider for Short {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "short"
        }
    }

    struct WrongDim;

    impl EmbeddingProvider for WrongDim {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0, 0.0]; texts.len()])
        }
        fn dimension(&self) -> usize {
            2
        }
        fn model_name(&self) -> &str {
            "wrong-dim"
        }
    }

    #[test]
    fn test_batches_preserve_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let largest = Arc::new(AtomicUsize::new(0));
        let engine = EmbeddingEngine::new(
            Box::new(Recording {
                calls: calls.clone(),
                largest: largest.clone(),
            }),
            4,
        )
        .without_cache();

        let texts: Vec<String> = (0..10).map(|i| format!("text{i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let out = engine.embed_batch(&refs).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(largest.load(Ordering::SeqCst), 4);
        for (i, v) in out.iter().enumerate() {
            assert!((v[0] / v[1] - (i as f32 + 1.0)).abs() < 1e-4, "row {i}");
        }
    }

    #[test]
    fn test_cache_skips_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = EmbeddingEngine::new(
            Box::new(Recording {
                calls: calls.clone(),
                largest: Arc::new(AtomicUsize::new(0)),
            }),
            8,
        );
        engine.embed_batch(&["text1", "text2"]).unwrap();
        engine.embed_batch(&["text2", "text1"]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cache_size(), 2);

        engine.clear_cache();
        engine.embed("text1").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_uncached_batch_leaves_cache_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let largest = Arc::new(AtomicUsize::new(0));
        let engine = EmbeddingEngine::new(
            Box::new(Recording {
                calls: calls.clone(),
                largest: largest.clone(),
            }),
            3,
        );

        let texts: Vec<String> = (0..7).map(|i| format!("text{i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let out = engine.embed_batch_uncached(&refs).unwrap();

        assert_eq!(out.len(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(largest.load(Ordering::SeqCst), 3);
        assert_eq!(engine.cache_size(), 0);
        for (i, v) in out.iter().enumerate() {
            assert!((v[0] / v[1] - (i as f32 + 1.0)).abs() < 1e-4, "row {i}");
        }
    }

    #[test]
    fn test_short_batch_rejected() {
        let engine = EmbeddingEngine::new(Box::new(Short), 8);
        let err = engine.embed_batch(&["a", "b", "c"]).unwrap_err();
        assert!(matches!(err, RagError::Provider(_)));
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let engine = EmbeddingEngine::new(Box::new(WrongDim), 8);
        let err = engine.embed("a").unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn test_output_normalized() {
        let engine = EmbeddingEngine::new(Box::new(HashEmbedder::new(32)), 8);
        let v = engine.embed("Persistent cough with blood").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
