//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. [`embed_batch`](EmbeddingProvider::embed_batch) is the primary
/// operation and must return vectors in input order; the default
/// [`embed`](EmbeddingProvider::embed) sends a one-element batch and guards
/// against an empty response.
///
/// # Example
///
/// ```rust,ignore
/// use nlp_rag::EmbeddingProvider;
///
/// let vectors = provider.embed_batch(&["cats", "dogs"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::embedding(self.name(), "provider returned no embedding for the input")
        })
    }

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}
