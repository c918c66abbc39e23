//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and small-scale use cases. The same index type backs
//! the persistent [`FileVectorStore`](crate::file::FileVectorStore).

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Descending order on scores that is total: NaN sorts after every number.
pub(crate) fn descending(a: f32, b: f32) -> Ordering {
    let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
    key(b).total_cmp(&key(a))
}

/// The id → document map shared by the in-process stores.
///
/// Remembers the embedding dimension of the first non-empty vector it stores
/// and rejects later vectors of a different length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct DocumentIndex {
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    documents: HashMap<String, Document>,
}

/// Outcome of applying a batch to a [`DocumentIndex`].
#[derive(Debug, Default)]
pub(crate) struct ApplyOutcome {
    pub stored: usize,
    /// Ids whose embedding length differs from the index dimension.
    pub rejected: Vec<String>,
    /// Ids whose embedding holds an infinite or NaN component.
    pub non_finite: Vec<String>,
}

impl ApplyOutcome {
    /// Convert into the store's result, reporting rejected ids as a partial write.
    pub(crate) fn into_result(self, backend: &str, requested: usize) -> Result<usize> {
        let mut problems = Vec::new();
        if !self.rejected.is_empty() {
            problems.push(format!("embedding dimension mismatch for ids: {}", self.rejected.join(", ")));
        }
        if !self.non_finite.is_empty() {
            problems.push(format!("non-finite embedding values for ids: {}", self.non_finite.join(", ")));
        }
        if problems.is_empty() {
            return Ok(self.stored);
        }
        Err(RagError::StoreWrite {
            backend: backend.to_string(),
            message: problems.join("; "),
            stored: self.stored,
            requested,
        })
    }
}

impl DocumentIndex {
    pub(crate) fn apply(&mut self, documents: &[Document]) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        for document in documents {
            if document.embedding.iter().any(|x| !x.is_finite()) {
                outcome.non_finite.push(document.id.clone());
                continue;
            }
            let len = document.embedding.len();
            if len > 0 {
                match self.dimension {
                    Some(dim) if dim != len => {
                        outcome.rejected.push(document.id.clone());
                        continue;
                    }
                    Some(_) => {}
                    None => self.dimension = Some(len),
                }
            }
            self.documents.insert(document.id.clone(), document.clone());
            outcome.stored += 1;
        }
        outcome
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn get(&self, id: &str) -> Option<Document> {
        self.documents.get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    /// Rank all documents by cosine similarity; ties break on id for stable output.
    pub(crate) fn nearest(&self, embedding: &[f32], k: usize) -> Vec<Document> {
        let mut scored: Vec<(f32, &Document)> = self
            .documents
            .values()
            .map(|doc| (cosine_similarity(&doc.embedding, embedding), doc))
            .collect();

        scored.sort_by(|a, b| descending(a.0, b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored.truncate(k);
        scored.into_iter().map(|(_, doc)| doc.clone()).collect()
    }
}

/// An in-memory vector store using cosine similarity for search.
///
/// All operations are async-safe via `tokio::sync::RwLock`; queries only take
/// the read lock.
///
/// # Example
///
/// ```rust,ignore
/// use nlp_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&documents).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    index: RwLock<DocumentIndex>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<usize> {
        let mut index = self.index.write().await;
        let outcome = index.apply(documents);
        debug!(backend = BACKEND, stored = outcome.stored, requested = documents.len(), "upsert");
        outcome.into_result(BACKEND, documents.len())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.index.read().await.ids())
    }

    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<Document>> {
        Ok(self.index.read().await.nearest(embedding, k))
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.index.read().await.get(id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.index.read().await.len())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document { id: id.into(), text: format!("text {id}"), embedding }
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let s = cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]);
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_empty_or_mismatched_vector_is_zero() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn apply_rejects_mismatched_dimension_but_keeps_the_rest() {
        let mut index = DocumentIndex::default();
        let outcome = index.apply(&[
            doc("a", vec![1.0, 0.0]),
            doc("b", vec![1.0, 0.0, 0.0]),
            doc("c", vec![0.0, 1.0]),
        ]);
        assert_eq!(outcome.stored, 2);
        assert_eq!(outcome.rejected, vec!["b".to_string()]);
        assert_eq!(index.ids(), vec!["a".to_string(), "c".to_string()]);

        let err = outcome.into_result(BACKEND, 3).unwrap_err();
        match err {
            RagError::StoreWrite { stored, requested, .. } => {
                assert_eq!(stored, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_embeddings_are_stored_and_rank_last() {
        let mut index = DocumentIndex::default();
        index.apply(&[doc("empty", vec![]), doc("full", vec![1.0, 0.0])]);
        let nearest = index.nearest(&[1.0, 0.0], 5);
        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].id, "full");
        assert_eq!(nearest[1].id, "empty");
    }

    #[test]
    fn apply_rejects_non_finite_components() {
        let mut index = DocumentIndex::default();
        let outcome = index.apply(&[doc("ok", vec![1.0, 0.0]), doc("inf", vec![f32::INFINITY, 1.0])]);
        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.non_finite, vec!["inf".to_string()]);
        assert_eq!(index.ids(), vec!["ok".to_string()]);
        assert!(matches!(
            outcome.into_result(BACKEND, 2),
            Err(RagError::StoreWrite { stored: 1, requested: 2, .. })
        ));
    }

    #[test]
    fn nearest_ranks_nan_scores_last_without_panicking() {
        // Bypass `apply` to mimic vectors that reached the index before validation.
        let mut index = DocumentIndex::default();
        for i in 0..200 {
            let embedding = if i % 3 == 0 { vec![f32::INFINITY, 1.0] } else { vec![1.0, i as f32] };
            index.documents.insert(format!("d{i:03}"), doc(&format!("d{i:03}"), embedding));
        }

        let nearest = index.nearest(&[1.0, 0.5], 200);
        assert_eq!(nearest.len(), 200);
        let scores: Vec<f32> =
            nearest.iter().map(|d| cosine_similarity(&d.embedding, &[1.0, 0.5])).collect();
        let first_nan = scores.iter().position(|s| s.is_nan()).unwrap();
        assert!(scores[..first_nan].iter().all(|s| !s.is_nan()));
        assert!(scores[first_nan..].iter().all(|s| s.is_nan()));
        assert!(scores[..first_nan].windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn descending_is_total_with_nan() {
        assert_eq!(descending(0.9, 0.1), Ordering::Less);
        assert_eq!(descending(0.1, 0.9), Ordering::Greater);
        assert_eq!(descending(f32::NAN, 0.1), Ordering::Greater);
        assert_eq!(descending(f32::NAN, f32::NAN), Ordering::Equal);
    }

    #[tokio::test]
    async fn empty_store_lists_nothing_and_queries_nothing() {
        let store = InMemoryVectorStore::new();
        assert!(store.list_ids().await.unwrap().is_empty());
        assert!(store.query_nearest(&[1.0, 0.0], 3).await.unwrap().is_empty());
        assert!(store.is_empty().await.unwrap());
    }
}
