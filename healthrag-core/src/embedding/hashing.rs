//! Feature-hashing embedder
//!
//! Bag-of-words vectors built with the hashing trick: every lowercased token
//! adds ±1 to one bucket. No model, no network, fully deterministic across
//! processes, so an index built with it can be queried later by another run.

use super::{normalize, EmbeddingProvider};
use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic hashing embedder
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_name: format!("hash-{}", dimension),
        }
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dimension];
        for token in Self::tokenize(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        normalize(&mut v);
        v
    }
}

// Stable across Rust releases, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::dot;

    #[test]
    fn test_same_text_same_vector() {
        let e = HashEmbedder::new(64);
        let out = e.embed(&["Fever and chills", "fever AND chills"]).unwrap();
        assert_eq!(out[0], out[1]);
        assert!((dot(&out[0], &out[1]) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let e = HashEmbedder::new(128);
        let v = &e.embed(&["dengue fever symptoms include rash"]).unwrap()[0];
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_related_text_scores_higher() {
        let e = HashEmbedder::new(256);
        let out = e
            .embed(&[
                "malaria mosquito bite fever",
                "mosquito bite malaria",
                "broken arm plaster cast",
            ])
            .unwrap();
        assert!(dot(&out[0], &out[1]) > dot(&out[0], &out[2]));
    }

    #[test]
    fn test_no_tokens_gives_zero_vector() {
        let e = HashEmbedder::new(8);
        assert_eq!(e.embed(&["?!"]).unwrap()[0], vec![0.0; 8]);
    }

    #[test]
    fn test_fnv_reference_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
