//! Embedding provider abstractions for quiver.
//!
//! This module provides the trait and implementation for mapping text to
//! dense vectors. Every index embeds its query text through a provider
//! before ranking; the collection embeds record content on insert and on
//! content updates.
//!
//! # Providers
//!
//! - [`RestEmbedding`] - Synchronous JSON-over-HTTP client for a hosted
//!   embedding API
//!
//! Custom providers implement [`EmbeddingProvider`]; tests typically use a
//! small table-backed stub.

mod rest;

pub use rest::RestEmbedding;

use crate::error::{QuiverError, Result, ValidationError};
use crate::types::Embedding;

/// Embedding provider trait for generating vector representations of text.
///
/// Implementations must be thread-safe (`Send + Sync`): queries on
/// different indexes may embed concurrently. Calls may block on I/O, so
/// indexes are careful to embed *before* acquiring any internal guard and
/// a slow provider never blocks writers.
///
/// # Implementing a Custom Provider
///
/// ```rust,ignore
/// use quiver::embedding::EmbeddingProvider;
/// use quiver::{Embedding, Result};
///
/// struct MyProvider {
///     client: MyApiClient,
///     dimension: usize,
/// }
///
/// impl EmbeddingProvider for MyProvider {
///     fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
///         Ok(self.client.get_embeddings(texts)?)
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
/// }
/// ```
pub trait EmbeddingProvider: Send + Sync {
    /// Generates embeddings for multiple texts in a batch.
    ///
    /// Batch processing is typically more efficient than individual calls
    /// due to reduced API overhead.
    ///
    /// # Errors
    ///
    /// Returns `QuiverError::Embedding` if the provider is unreachable or
    /// returns an unusable response. Failures are not retried here; retry
    /// policy is a caller concern.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Generates an embedding for a single text.
    ///
    /// The default implementation forwards through
    /// [`embed_batch`](Self::embed_batch) with a one-element slice.
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut batch = self.embed_batch(&[text])?;
        if batch.len() != 1 {
            return Err(QuiverError::embedding(format!(
                "Provider returned {} embeddings for 1 text",
                batch.len()
            )));
        }
        Ok(batch.remove(0))
    }

    /// Returns the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Validates that an embedding has the correct dimension.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DimensionMismatch` if dimensions don't match.
    fn validate_embedding(&self, embedding: &Embedding) -> Result<()> {
        let expected = self.dimension();
        let actual = embedding.len();

        if actual != expected {
            return Err(QuiverError::Validation(ValidationError::dimension_mismatch(
                expected, actual,
            )));
        }

        Ok(())
    }
}
