//! REST-backed embedding provider.
//!
//! Talks to a hosted embedding API over synchronous HTTP: the request is a
//! JSON body with the batch of texts, the response a parallel array of f32
//! vectors. Any transport or shape problem surfaces as
//! `QuiverError::Embedding` and leaves every index untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QuiverError, Result};
use crate::types::Embedding;

use super::EmbeddingProvider;

/// Request body sent to the embedding endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [&'a str],
    model: &'a str,
}

/// Response body expected from the embedding endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Embedding>,
}

/// Embedding provider backed by a hosted HTTP API.
///
/// # Example
///
/// ```rust,no_run
/// use quiver::embedding::RestEmbedding;
///
/// let provider = RestEmbedding::new(
///     "https://api.example.com/v1/embed",
///     "embed-v4",
///     1536,
/// )
/// .with_api_key("secret-token");
/// ```
#[derive(Clone, Debug)]
pub struct RestEmbedding {
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

impl RestEmbedding {
    /// Creates a provider for the given endpoint, model name, and expected
    /// embedding dimension.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            dimension,
            api_key: None,
        }
    }

    /// Attaches a bearer token sent with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validates the response against the request: one embedding per text,
    /// each with the configured dimension.
    fn check_response(&self, texts: &[&str], embeddings: &[Embedding]) -> Result<()> {
        if embeddings.len() != texts.len() {
            return Err(QuiverError::embedding(format!(
                "Provider returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        for embedding in embeddings {
            if embedding.len() != self.dimension {
                return Err(QuiverError::embedding(format!(
                    "Provider returned dimension {}, expected {}",
                    embedding.len(),
                    self.dimension
                )));
            }
        }
        Ok(())
    }
}

impl EmbeddingProvider for RestEmbedding {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), "Requesting embeddings");

        let body = EmbedRequest {
            texts,
            model: &self.model,
        };

        let mut request = ureq::post(&self.endpoint).set("Content-Type", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.set("Authorization", &format!("Bearer {}", key));
        }

        let response = request
            .send_json(&body)
            .map_err(|e| QuiverError::embedding(format!("Embedding request failed: {}", e)))?;

        let parsed: EmbedResponse = response
            .into_json()
            .map_err(|e| QuiverError::embedding(format!("Invalid embedding response: {}", e)))?;

        self.check_response(texts, &parsed.embeddings)?;

        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
