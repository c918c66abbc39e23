//! Reranker trait for re-scoring retrieval candidates.

use async_trait::async_trait;

use crate::error::Result;

/// A reranker that scores candidate texts against a query.
///
/// Implementations can call cross-encoder services, LLM-based scoring, or
/// other strategies to improve precision beyond initial vector similarity.
/// The returned vector holds one score per candidate, aligned with the
/// `candidates` slice; higher is more relevant.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score each candidate against the query.
    async fn rerank(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "reranker"
    }
}

/// A no-op reranker that gives every candidate the same score.
///
/// Because retrieval sorts stably, this keeps nearest-neighbor order.
///
/// # Example
///
/// ```rust,ignore
/// use nlp_rag::{NoOpReranker, Reranker};
///
/// let scores = NoOpReranker.rerank("query", &["a", "b"]).await?;
/// assert_eq!(scores, vec![0.0, 0.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        Ok(vec![0.0; candidates.len()])
    }

    fn name(&self) -> &str {
        "noop"
    }
}
