//! Document ingestion: validate → embed → store.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::document::{Document, DocumentInput, IngestReport};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Embeds caller documents in one batch and upserts them into a [`VectorStore`].
pub struct Ingestor {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl Ingestor {
    /// Create an ingestor over the given provider and store.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store }
    }

    /// Ingest a batch of documents.
    ///
    /// Every id must be non-empty; empty text is allowed and still embedded.
    /// All texts go to the embedding provider in a single call, and the
    /// response must contain exactly one vector per input.
    ///
    /// # Errors
    ///
    /// - [`RagError::Validation`] if any id is empty.
    /// - [`RagError::EmbeddingProvider`] if the provider call fails or returns
    ///   a different number of vectors than inputs.
    /// - [`RagError::StoreWrite`] if the store rejects the write.
    #[instrument(name = "rag.ingest", skip_all, fields(documents = documents.len()))]
    pub async fn ingest(&self, documents: &[DocumentInput]) -> Result<IngestReport> {
        if let Some(position) = documents.iter().position(|d| d.id.is_empty()) {
            return Err(RagError::Validation(format!(
                "document at position {position} has an empty id"
            )));
        }

        if documents.is_empty() {
            return Ok(IngestReport {
                accepted_count: 0,
                stored_total: self.vector_store.len().await?,
                embedded_count: 0,
            });
        }

        info!(count = documents.len(), "adding documents to knowledge base");

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed during ingestion");
            match e {
                RagError::EmbeddingProvider { .. } => e,
                other => RagError::embedding(self.embedding_provider.name(), other.to_string()),
            }
        })?;

        if embeddings.len() != documents.len() {
            error!(
                requested = documents.len(),
                returned = embeddings.len(),
                "embedding count does not match document count"
            );
            return Err(RagError::embedding(
                self.embedding_provider.name(),
                format!(
                    "expected {} embeddings, provider returned {}",
                    documents.len(),
                    embeddings.len()
                ),
            ));
        }
        let embedded_count = embeddings.len();

        let stored: Vec<Document> = documents
            .iter()
            .zip(embeddings)
            .map(|(input, embedding)| {
                if embedding.is_empty() {
                    warn!(document.id = %input.id, "provider returned an empty embedding");
                }
                Document::from_input(input, embedding)
            })
            .collect();

        self.vector_store.upsert(&stored).await.map_err(|e| {
            error!(backend = self.vector_store.backend(), error = %e, "upsert failed during ingestion");
            e
        })?;

        let stored_total = self.vector_store.len().await?;
        info!(embedded_count, stored_total, "ingested documents");

        Ok(IngestReport { accepted_count: documents.len(), stored_total, embedded_count })
    }
}
