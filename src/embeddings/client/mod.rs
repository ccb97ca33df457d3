
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Embedder;
use crate::config::{ApiKey, Config};
use crate::http::{HttpClient, endpoint};

/// Client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    endpoint: Url,
    model: String,
    dimension: usize,
    batch_size: usize,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &Config, api_key: ApiKey) -> Result<Self> {
        let endpoint = endpoint(&config.api.base_url, "embeddings")
            .context("Failed to generate embeddings URL from config")?;

        Ok(Self {
            endpoint,
            model: config.embedding.model.clone(),
            dimension: config.embedding.dimension as usize,
            batch_size: (config.embedding.batch_size as usize).max(1),
            http: HttpClient::new(api_key, config.timeout()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http = self.http.with_retry_attempts(attempts);
        self
    }

    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.http = self.http.with_backoff(backoff);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .http
            .post_json(&self.endpoint, &request_json)
            .context("Failed to generate embeddings")?;

        let mut response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        response.data.sort_by_key(|item| item.index);

        let mut embeddings = Vec::with_capacity(texts.len());
        for (expected_index, item) in response.data.into_iter().enumerate() {
            if item.index != expected_index {
                return Err(anyhow::anyhow!(
                    "Embedding response is missing index {}",
                    expected_index
                ));
            }
            if item.embedding.len() != self.dimension {
                return Err(anyhow::anyhow!(
                    "Embedding {} has {} dimensions, expected {}",
                    expected_index,
                    item.embedding.len(),
                    self.dimension
                ));
            }
            embeddings.push(item.embedding);
        }

        Ok(embeddings)
    }
}

impl Embedder for EmbeddingClient {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let mut embeddings = self.request_embeddings(&[text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding response was empty"))
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let batch = self
                .request_embeddings(chunk)
                .with_context(|| format!("Failed to process batch of {} texts", chunk.len()))?;
            results.extend(batch);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    #[inline]
    fn preferred_batch_size(&self) -> usize {
        self.batch_size
    }
}
