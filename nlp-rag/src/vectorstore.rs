//! Vector store trait for storing and searching document embeddings.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// A persistent id → (text, embedding) collection with nearest-neighbor search.
///
/// Implementations must be safe for concurrent upserts and queries. A query
/// running alongside an upsert may observe either the old or the new state.
///
/// # Example
///
/// ```rust,ignore
/// use nlp_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&documents).await?;
/// let nearest = store.query_nearest(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite documents by id, returning how many were stored.
    ///
    /// When some documents are rejected the error is
    /// [`RagError::StoreWrite`](crate::RagError::StoreWrite) carrying the
    /// stored and requested counts.
    async fn upsert(&self, documents: &[Document]) -> Result<usize>;

    /// Return every stored id. Empty for a store that was never populated.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Return up to `k` documents ordered by descending similarity.
    ///
    /// Returned embeddings may be empty; only `text` is guaranteed.
    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<Document>>;

    /// Look up a single document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Number of stored documents.
    async fn len(&self) -> Result<usize> {
        Ok(self.list_ids().await?.len())
    }

    /// Whether the store holds no documents.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Backend name used in logs and error messages.
    fn backend(&self) -> &str;
}
