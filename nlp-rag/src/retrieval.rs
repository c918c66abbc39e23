//! Search-and-rerank retrieval.
//!
//! A single [`Retriever::retrieve`] call moves through
//! `EMBEDDING_QUERY → NEAREST_NEIGHBOR_SEARCH → RERANKING → DONE`, with early
//! exits for an empty store or an empty candidate set, and a degraded exit
//! returning unreranked candidates when the reranker fails. Nothing is kept
//! between calls.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::document::{Document, RankedText};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::descending;
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;

/// Embeds a query, searches the store, and reranks the nearest neighbors.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
}

impl Retriever {
    /// Create a retriever over the given provider, store, and reranker.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self { embedding_provider, vector_store, reranker }
    }

    /// Return up to `top_k` texts relevant to `query`, most relevant first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingProvider`] only when the query embedding
    /// cannot be obtained. Store query failures and reranker failures degrade
    /// to empty or unreranked results respectively.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let ranked = self.retrieve_scored(query, top_k).await?;
        Ok(ranked.into_iter().map(|r| r.text).collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps the relevance scores.
    ///
    /// When reranking fails the scores are `1 / (1 + rank)` of the
    /// nearest-neighbor order.
    #[instrument(name = "rag.retrieve", skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve_scored(&self, query: &str, top_k: usize) -> Result<Vec<RankedText>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        match self.vector_store.is_empty().await {
            Ok(true) => {
                info!("no documents in vector store, skipping retrieval");
                return Ok(Vec::new());
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "failed to list stored documents, treating as empty");
                return Ok(Vec::new());
            }
        }

        debug!(state = "EMBEDDING_QUERY");
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| match e {
            RagError::EmbeddingProvider { .. } => e,
            other => RagError::embedding(self.embedding_provider.name(), other.to_string()),
        })?;
        if query_embedding.is_empty() {
            return Err(RagError::embedding(
                self.embedding_provider.name(),
                "provider returned an empty query embedding",
            ));
        }

        debug!(state = "NEAREST_NEIGHBOR_SEARCH", dimensions = query_embedding.len());
        let candidates = match self.vector_store.query_nearest(&query_embedding, top_k).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(backend = self.vector_store.backend(), error = %e, "nearest-neighbor query failed");
                Vec::new()
            }
        };
        if candidates.is_empty() {
            info!("no similar documents found");
            return Ok(Vec::new());
        }

        debug!(state = "RERANKING", candidates = candidates.len());
        let ranked = match self.rerank(query, &candidates).await {
            Ok(mut ranked) => {
                ranked.truncate(top_k);
                ranked
            }
            Err(e) => {
                warn!(reranker = self.reranker.name(), error = %e, "reranking failed, returning unreranked candidates");
                unreranked(candidates, top_k)
            }
        };

        debug!(state = "DONE", results = ranked.len());
        Ok(ranked)
    }

    async fn rerank(&self, query: &str, candidates: &[Document]) -> Result<Vec<RankedText>> {
        let texts: Vec<&str> = candidates.iter().map(|d| d.text.as_str()).collect();
        let scores = self.reranker.rerank(query, &texts).await?;
        if scores.len() != candidates.len() {
            return Err(RagError::rerank(
                self.reranker.name(),
                format!("expected {} scores, got {}", candidates.len(), scores.len()),
            ));
        }
        Ok(sort_by_score(candidates, &scores))
    }
}

/// Pair candidates with scores and sort descending; `sort_by` is stable, so
/// equal scores keep nearest-neighbor order. NaN scores sink to the end.
fn sort_by_score(candidates: &[Document], scores: &[f32]) -> Vec<RankedText> {
    let mut ranked: Vec<RankedText> = candidates
        .iter()
        .zip(scores)
        .map(|(doc, score)| RankedText { text: doc.text.clone(), score: *score })
        .collect();
    ranked.sort_by(|a, b| descending(a.score, b.score));
    ranked
}

fn unreranked(candidates: Vec<Document>, top_k: usize) -> Vec<RankedText> {
    candidates
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(rank, doc)| RankedText { text: doc.text, score: 1.0 / (1.0 + rank as f32) })
        .collect()
}
