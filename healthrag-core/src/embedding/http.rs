//! OpenAI-compatible embeddings endpoint

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Environment variable holding the bearer token, if the endpoint needs one
pub const API_KEY_ENV: &str = "HEALTHRAG_EMBEDDING_API_KEY";

const MAX_RETRIES: usize = 3;

/// Blocking client for `POST {base_url}/embeddings`
pub struct HttpEmbedder {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Build from config; queries the endpoint once when no dimension is configured
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| RagError::config("embedding.base_url is required for the http provider"))?;
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(
            base_url,
            &config.model,
            api_key,
            Duration::from_secs(config.timeout_secs),
            config.dimension,
        )
    }

    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
        dimension: Option<usize>,
    ) -> Result<Self> {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let mut embedder = Self {
            agent,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            dimension: dimension.unwrap_or(0),
        };

        if dimension.is_none() {
            let sample = embedder.request(&["test"])?;
            embedder.dimension = sample.first().map(Vec::len).unwrap_or(0);
            if embedder.dimension == 0 {
                return Err(RagError::provider(format!(
                    "{} returned an empty embedding",
                    embedder.endpoint
                )));
            }
        }

        log::info!("HTTP embedder ready: {} ({}d)", embedder.endpoint, embedder.dimension);
        Ok(embedder)
    }

    fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let mut attempt = 0usize;
        loop {
            let mut req = self.agent.post(&self.endpoint);
            if let Some(key) = &self.api_key {
                req = req.set("Authorization", &format!("Bearer {}", key.trim()));
            }

            match req.send_json(&body) {
                Ok(resp) => {
                    let mut parsed: EmbeddingResponse = resp.into_json().map_err(|e| {
                        RagError::provider(format!("Failed to parse embedding response: {}", e))
                    })?;
                    parsed.data.sort_by_key(|entry| entry.index);
                    if parsed.data.len() != inputs.len() {
                        return Err(RagError::provider(format!(
                            "{} returned {} embeddings for {} inputs",
                            self.endpoint,
                            parsed.data.len(),
                            inputs.len()
                        )));
                    }
                    if let Some((pos, entry)) = parsed
                        .data
                        .iter()
                        .enumerate()
                        .find(|(pos, entry)| entry.index != *pos)
                    {
                        return Err(RagError::provider(format!(
                            "{} returned embedding index {} at position {}; expected indices 0..{}",
                            self.endpoint,
                            entry.index,
                            pos,
                            inputs.len()
                        )));
                    }
                    return Ok(parsed.data.into_iter().map(|e| e.embedding).collect());
                }
                Err(ureq::Error::Status(code, resp)) => {
                    if is_retryable_status(code) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        log::warn!("Embedding request got {}, retrying ({})", code, attempt);
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    let body = resp
                        .into_string()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    return Err(RagError::provider(format!(
                        "Embedding request failed ({}): {}",
                        code, body
                    )));
                }
                Err(ureq::Error::Transport(t)) => {
                    if attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        log::warn!("Embedding request failed: {}, retrying ({})", t, attempt);
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(RagError::provider(format!(
                        "Embedding endpoint unreachable: {}",
                        t
                    )));
                }
            }
        }
    }
}

fn is_retryable_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

fn retry_backoff(attempt: usize) -> Duration {
    Duration::from_millis(250 * (1 << attempt.min(4)) as u64)
}

impl EmbeddingProvider for HttpEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.request(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
